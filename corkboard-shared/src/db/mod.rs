/// Database utilities
///
/// - [`pool`]: PostgreSQL connection pool management

pub mod pool;
