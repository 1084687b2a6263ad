use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Signed vote value. Stored as SMALLINT: `1` for up, `-1` for down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i16 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl TryFrom<i16> for VoteDirection {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(format!("Unknown vote direction: {}", other)),
        }
    }
}

/// Per (post, user) state. Derived from the ledger row, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    UpVoted,
    DownVoted,
}

impl VoteState {
    pub fn from_direction(direction: Option<VoteDirection>) -> Self {
        match direction {
            None => VoteState::NoVote,
            Some(VoteDirection::Up) => VoteState::UpVoted,
            Some(VoteDirection::Down) => VoteState::DownVoted,
        }
    }

    /// State after casting `direction`. Casting the current direction again is a no-op.
    pub fn apply(self, direction: VoteDirection) -> Self {
        Self::from_direction(Some(direction))
    }

    pub fn clear(self) -> Self {
        VoteState::NoVote
    }

    pub fn direction(self) -> Option<VoteDirection> {
        match self {
            VoteState::NoVote => None,
            VoteState::UpVoted => Some(VoteDirection::Up),
            VoteState::DownVoted => Some(VoteDirection::Down),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Vote {
    pub post_id: i64,
    pub user_id: Uuid,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Raw ledger row; `direction` is validated on the way out.
#[derive(Debug, Clone, FromRow)]
pub struct VoteRow {
    pub post_id: i64,
    pub user_id: Uuid,
    pub direction: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = String;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            post_id: row.post_id,
            user_id: row.user_id,
            direction: VoteDirection::try_from(row.direction)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct VoteTally {
    pub up_vote: i64,
    pub down_vote: i64,
}

impl VoteTally {
    pub fn total(&self) -> i64 {
        self.up_vote + self.down_vote
    }
}

// Vote response
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub post_id: i64,
    pub user_vote: Option<VoteDirection>,
    pub up_vote: i64,
    pub down_vote: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_storage_value() {
        assert_eq!(VoteDirection::Up.value(), 1);
        assert_eq!(VoteDirection::Down.value(), -1);
        assert_eq!(VoteDirection::try_from(1), Ok(VoteDirection::Up));
        assert_eq!(VoteDirection::try_from(-1), Ok(VoteDirection::Down));
        assert!(VoteDirection::try_from(0).is_err());
        assert!(VoteDirection::try_from(2).is_err());
    }

    #[test]
    fn state_machine_transitions() {
        use VoteDirection::*;
        use VoteState::*;

        assert_eq!(NoVote.apply(Up), UpVoted);
        assert_eq!(NoVote.apply(Down), DownVoted);
        assert_eq!(UpVoted.apply(Down), DownVoted);
        assert_eq!(DownVoted.apply(Up), UpVoted);
        assert_eq!(UpVoted.apply(Up), UpVoted);
        assert_eq!(DownVoted.apply(Down), DownVoted);
        assert_eq!(UpVoted.clear(), NoVote);
        assert_eq!(DownVoted.clear(), NoVote);
    }

    #[test]
    fn direction_serializes_lowercase() {
        let json = serde_json::to_string(&VoteDirection::Down).unwrap();
        assert_eq!(json, "\"down\"");
    }
}
