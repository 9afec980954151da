//! Position maintenance for ordered sibling lists (a user's profile
//! links, a collection's links).
//!
//! Positions are zero-based array indexes. Full replaces and reorders
//! renumber the whole list; `append` takes the current sibling count;
//! deletes leave gaps that heal on the next full pass.

use uuid::Uuid;

use crate::database::{ProfileLinkCreate, ProfileLinkRow, SqlStorage, SqlStorageError};

/// Position for an item appended at the end of a list of
/// `current_count` siblings.
///
/// Concurrent appends to the same parent can both observe the same
/// count and produce duplicate positions; that is accepted noise,
/// corrected on the next full reorder.
pub fn append_position(current_count: i64) -> i32 {
    current_count.clamp(0, i32::MAX as i64) as i32
}

/// Turn a caller-supplied complete ordering into `(id, position)`
/// assignments, position = index of first occurrence.
///
/// Duplicated ids keep their first index. Ids that are not actually
/// siblings of the parent become storage-level no-ops, and siblings
/// the caller omitted keep their previous position; both halves of
/// that contract are load-bearing for API compatibility.
pub fn assignments_by_index(ordered_ids: &[Uuid]) -> Vec<(Uuid, i32)> {
    let mut seen = std::collections::HashSet::new();
    ordered_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| seen.insert(**id))
        .map(|(index, id)| (*id, index as i32))
        .collect()
}

/// New profile link payload before a position is assigned.
#[derive(Debug, Clone)]
pub struct ProfileLinkDraft {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
}

/// Append a link at the end of the user's profile list
/// (position = current sibling count, active by default).
pub async fn append_profile_link<S: SqlStorage>(
    storage: &S,
    user_id: Uuid,
    draft: ProfileLinkDraft,
) -> Result<ProfileLinkRow, SqlStorageError> {
    let count = storage.profile_links_count(user_id).await?;
    storage
        .profile_link_insert(ProfileLinkCreate {
            user_id,
            title: draft.title,
            url: draft.url,
            icon: draft.icon,
            position: append_position(count),
            is_active: true,
        })
        .await
}

/// Apply a caller-supplied complete ordering of the user's links.
pub async fn reorder_profile_links<S: SqlStorage>(
    storage: &S,
    user_id: Uuid,
    ordered_ids: &[Uuid],
) -> Result<(), SqlStorageError> {
    storage
        .profile_links_set_positions(user_id, assignments_by_index(ordered_ids))
        .await
}
