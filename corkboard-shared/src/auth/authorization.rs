/// The membership lattice and the board authorization gate
///
/// Access to a board flows from four independent sources:
///
/// 1. **Project manager** on the owning project: full control.
/// 2. **Board membership**: editor or viewer on the board itself.
/// 3. **List membership**: a narrow grant that exposes the owning board.
/// 4. **Card membership**: likewise, via the card's board.
///
/// The narrow grants deliberately bypass board membership: inviting someone
/// to one list must not require inviting them to the whole board. The
/// sources are unioned, never intersected.
///
/// # Existence hiding
///
/// A user with no grant on a board gets [`AuthzError::NotFound`], never a
/// 403: the authorization answer must be indistinguishable from the board
/// not existing. [`AuthzError::NotEnoughRights`] is reserved for users who
/// can already see the resource but hold an insufficient role (viewers
/// attempting writes).

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::board::Board;
use crate::models::card::Card;
use crate::models::list::List;
use crate::models::membership::{BoardMembership, CardMembership, ListMembership, MembershipRole};
use crate::models::project::{Project, ProjectManager};
use crate::models::user::{User, UserRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The resource does not exist, or the actor may not know it exists
    #[error("Not found")]
    NotFound,

    /// The actor can see the resource but lacks the required role
    #[error("Not enough rights")]
    NotEnoughRights,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// How an actor relates to a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRole {
    /// Manager of the owning project; full control
    ProjectManager,

    /// Direct board membership
    Member(MembershipRole),
}

impl BoardRole {
    /// Whether this role permits mutating the board's contents
    pub fn can_edit(&self) -> bool {
        match self {
            BoardRole::ProjectManager => true,
            BoardRole::Member(MembershipRole::Editor) => true,
            BoardRole::Member(MembershipRole::Viewer) => false,
        }
    }
}

/// A board together with the actor's resolved standing on it
#[derive(Debug, Clone)]
pub struct BoardContext {
    pub board: Board,
    pub project: Project,
    pub role: BoardRole,
}

/// Pure role decision over already-fetched grants
///
/// Project management dominates board membership; no grant at all means the
/// board must appear nonexistent.
pub fn decide_board_role(
    is_project_manager: bool,
    membership: Option<&BoardMembership>,
) -> Option<BoardRole> {
    if is_project_manager {
        return Some(BoardRole::ProjectManager);
    }
    membership.map(|m| BoardRole::Member(m.role))
}

/// Resolves the actor's standing on a board
///
/// # Errors
///
/// `NotFound` when the board does not exist or the actor holds no grant on
/// it (the two cases are indistinguishable on purpose).
pub async fn board_context(
    pool: &PgPool,
    user: &User,
    board_id: Uuid,
) -> Result<BoardContext, AuthzError> {
    let Some(board) = Board::find_by_id(pool, board_id).await? else {
        return Err(AuthzError::NotFound);
    };

    let Some(project) = Project::find_by_id(pool, board.project_id).await? else {
        return Err(AuthzError::NotFound);
    };

    let is_manager = ProjectManager::exists(pool, user.id, project.id).await?;
    let membership = BoardMembership::find_by_board_and_user(pool, board_id, user.id).await?;

    match decide_board_role(is_manager, membership.as_ref()) {
        Some(role) => Ok(BoardContext {
            board,
            project,
            role,
        }),
        None => Err(AuthzError::NotFound),
    }
}

/// Requires an editor-grade standing on a board
///
/// # Errors
///
/// `NotFound` for non-members, `NotEnoughRights` for viewers.
pub async fn require_board_editor(
    pool: &PgPool,
    user: &User,
    board_id: Uuid,
) -> Result<BoardContext, AuthzError> {
    let context = board_context(pool, user, board_id).await?;

    if !context.role.can_edit() {
        return Err(AuthzError::NotEnoughRights);
    }

    Ok(context)
}

/// Requires the actor to manage the project owning a board
///
/// The gate for minting and revoking public access tokens.
pub async fn require_project_manager(
    pool: &PgPool,
    user: &User,
    board_id: Uuid,
) -> Result<BoardContext, AuthzError> {
    let context = board_context(pool, user, board_id).await?;

    match context.role {
        BoardRole::ProjectManager => Ok(context),
        // Board members can see the board, so 403 rather than 404
        BoardRole::Member(_) => Err(AuthzError::NotEnoughRights),
    }
}

/// Resolves a list id up to its board, gated on editor standing
pub async fn require_list_editor(
    pool: &PgPool,
    user: &User,
    list_id: Uuid,
) -> Result<(List, BoardContext), AuthzError> {
    let Some(list) = List::find_by_id(pool, list_id).await? else {
        return Err(AuthzError::NotFound);
    };

    let context = require_board_editor(pool, user, list.board_id).await?;
    Ok((list, context))
}

/// Resolves a card id up to its board, gated on editor standing
pub async fn require_card_editor(
    pool: &PgPool,
    user: &User,
    card_id: Uuid,
) -> Result<(Card, BoardContext), AuthzError> {
    let Some(card) = Card::find_by_id(pool, card_id).await? else {
        return Err(AuthzError::NotFound);
    };

    let context = require_board_editor(pool, user, card.board_id).await?;
    Ok((card, context))
}

/// Ids of every board the user can see, from all four grant sources
pub async fn accessible_board_ids(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<HashSet<Uuid>, sqlx::Error> {
    let mut board_ids = HashSet::new();

    let managed = ProjectManager::get_project_ids_by_user_id(pool, user_id).await?;
    if !managed.is_empty() {
        for board in Board::get_by_project_ids(pool, &managed).await? {
            board_ids.insert(board.id);
        }
    }

    for membership in BoardMembership::get_by_user_id(pool, user_id).await? {
        board_ids.insert(membership.board_id);
    }

    let list_ids: Vec<Uuid> = ListMembership::get_by_user_id(pool, user_id)
        .await?
        .into_iter()
        .map(|m| m.list_id)
        .collect();
    if !list_ids.is_empty() {
        for list in List::get_by_ids(pool, &list_ids).await? {
            board_ids.insert(list.board_id);
        }
    }

    let card_ids: Vec<Uuid> = CardMembership::get_by_user_id(pool, user_id)
        .await?
        .into_iter()
        .map(|m| m.card_id)
        .collect();
    if !card_ids.is_empty() {
        for card in Card::get_by_ids(pool, &card_ids).await? {
            board_ids.insert(card.board_id);
        }
    }

    Ok(board_ids)
}

/// Ids of every project the user can see
///
/// The union of managed projects, the projects owning boards reachable
/// through any membership source, and (for admins) all shared projects.
/// Computed once per request, never cached across requests.
pub async fn accessible_project_ids(
    pool: &PgPool,
    user: &User,
) -> Result<HashSet<Uuid>, sqlx::Error> {
    let mut project_ids: HashSet<Uuid> =
        ProjectManager::get_project_ids_by_user_id(pool, user.id)
            .await?
            .into_iter()
            .collect();

    let board_ids: Vec<Uuid> = accessible_board_ids(pool, user.id).await?.into_iter().collect();
    if !board_ids.is_empty() {
        for board in Board::get_by_ids(pool, &board_ids).await? {
            project_ids.insert(board.project_id);
        }
    }

    if user.role == UserRole::Admin {
        let known: Vec<Uuid> = project_ids.iter().copied().collect();
        for project in Project::get_shared_except(pool, &known).await? {
            project_ids.insert(project.id);
        }
    }

    Ok(project_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn membership_with_role(role: MembershipRole) -> BoardMembership {
        BoardMembership {
            id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_manager_dominates_membership() {
        let viewer = membership_with_role(MembershipRole::Viewer);

        assert_eq!(
            decide_board_role(true, Some(&viewer)),
            Some(BoardRole::ProjectManager)
        );
        assert_eq!(decide_board_role(true, None), Some(BoardRole::ProjectManager));
    }

    #[test]
    fn test_membership_role_passes_through() {
        let editor = membership_with_role(MembershipRole::Editor);
        let viewer = membership_with_role(MembershipRole::Viewer);

        assert_eq!(
            decide_board_role(false, Some(&editor)),
            Some(BoardRole::Member(MembershipRole::Editor))
        );
        assert_eq!(
            decide_board_role(false, Some(&viewer)),
            Some(BoardRole::Member(MembershipRole::Viewer))
        );
    }

    #[test]
    fn test_no_grant_means_no_role() {
        assert_eq!(decide_board_role(false, None), None);
    }

    #[test]
    fn test_can_edit() {
        assert!(BoardRole::ProjectManager.can_edit());
        assert!(BoardRole::Member(MembershipRole::Editor).can_edit());
        assert!(!BoardRole::Member(MembershipRole::Viewer).can_edit());
    }
}
