/// HTTP middleware
///
/// - `current_user`: resolves request credentials into an identity and
///   attaches it to request extensions; also the `CurrentUser` extractor
/// - `security`: response security headers

pub mod current_user;
pub mod security;
