//! Vote ledger for collections.
//!
//! At most one vote row exists per `(collection, voter)` pair;
//! repeated casts toggle, switch, or remove that row. The aggregate
//! score shown to visitors is clamped at zero so a heavily downvoted
//! collection reads "0", never a negative number.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{SqlStorage, SqlStorageError, VoteRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            _ => None,
        }
    }
}

/// What a `cast_vote` call did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteAction {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "updated")]
    Updated,
    #[serde(rename = "removed")]
    Removed,
}

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    /// A fresh downvote would push the displayed score below its
    /// floor; switching or removing an existing vote is never blocked.
    #[error("Downvoting is not available while the score is 0")]
    ScoreFloor,
    #[error(transparent)]
    Storage(#[from] SqlStorageError),
}

/// Aggregate view over one collection's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    pub fn from_rows(rows: &[VoteRow]) -> Self {
        let upvotes = rows
            .iter()
            .filter(|v| v.direction == VoteDirection::Up)
            .count() as i64;
        let downvotes = rows.len() as i64 - upvotes;
        Self { upvotes, downvotes }
    }

    /// Displayed score, clamped so it never goes negative.
    pub fn score(&self) -> i64 {
        (self.upvotes - self.downvotes).max(0)
    }
}

/// The viewer's own vote direction within a ledger, if any.
pub fn viewer_vote(rows: &[VoteRow], viewer_id: Uuid) -> Option<VoteDirection> {
    rows.iter()
        .find(|v| v.user_id == viewer_id)
        .map(|v| v.direction)
}

/// Record a voter's stance on a collection: three-way toggle.
///
/// - no existing row: insert, `Created`
/// - existing row, same direction: delete (un-vote), `Removed`
/// - existing row, opposite direction: update in place, `Updated`
///
/// Exactly one ledger row is created, mutated, or deleted. Persistence
/// failures propagate unchanged; nothing is retried. A brand-new
/// downvote is refused while the collection's score is already 0.
pub async fn cast_vote<S: SqlStorage>(
    storage: &S,
    collection_id: Uuid,
    voter_id: Uuid,
    direction: VoteDirection,
) -> Result<VoteAction, VoteError> {
    match storage.vote_get(collection_id, voter_id).await? {
        Some(existing) if existing.direction == direction => {
            storage.vote_delete(collection_id, voter_id).await?;
            Ok(VoteAction::Removed)
        }
        Some(_) => {
            storage
                .vote_set_direction(collection_id, voter_id, direction)
                .await?;
            Ok(VoteAction::Updated)
        }
        None => {
            if direction == VoteDirection::Down {
                let rows = storage.votes_for_collection(collection_id).await?;
                if VoteTally::from_rows(&rows).score() == 0 {
                    return Err(VoteError::ScoreFloor);
                }
            }
            storage
                .vote_insert(collection_id, voter_id, direction)
                .await?;
            Ok(VoteAction::Created)
        }
    }
}
