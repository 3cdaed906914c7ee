use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two distinct participants of a direct conversation.
///
/// Order carries no meaning; two pairs with swapped members are equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "Vec<Uuid>", into = "Vec<Uuid>")]
pub struct ParticipantPair([Uuid; 2]);

impl ParticipantPair {
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, AppError> {
        if a == b {
            return Err(AppError::BadRequest(
                "a conversation needs two different participants".into(),
            ));
        }
        Ok(Self([a, b]))
    }

    pub fn contains(&self, user: Uuid) -> bool {
        self.0.contains(&user)
    }

    /// The participant that is not `user`, or `None` when `user` is not in the pair.
    pub fn other(&self, user: Uuid) -> Option<Uuid> {
        match self.0 {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }

    pub fn members(&self) -> [Uuid; 2] {
        self.0
    }
}

impl PartialEq for ParticipantPair {
    fn eq(&self, other: &Self) -> bool {
        self.contains(other.0[0]) && self.contains(other.0[1])
    }
}

impl Eq for ParticipantPair {}

impl TryFrom<Vec<Uuid>> for ParticipantPair {
    type Error = AppError;

    fn try_from(ids: Vec<Uuid>) -> Result<Self, Self::Error> {
        match ids.as_slice() {
            [a, b] => ParticipantPair::new(*a, *b),
            _ => Err(AppError::BadRequest(format!(
                "a conversation has exactly 2 participants, got {}",
                ids.len()
            ))),
        }
    }
}

impl From<ParticipantPair> for Vec<Uuid> {
    fn from(pair: ParticipantPair) -> Self {
        pair.0.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageSummary {
    pub text: String,
    pub sender_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub participants: ParticipantPair,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessageSummary>,
    pub muted_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(participants: ParticipantPair) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            participants,
            last_message: None,
            muted_by: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user: Uuid) -> bool {
        self.participants.contains(user)
    }

    pub fn other_participant(&self, user: Uuid) -> Option<Uuid> {
        self.participants.other(user)
    }

    pub fn is_muted_by(&self, user: Uuid) -> bool {
        self.muted_by.contains(&user)
    }

    pub fn set_muted(&mut self, user: Uuid, muted: bool) {
        if muted {
            if !self.muted_by.contains(&user) {
                self.muted_by.push(user);
            }
        } else {
            self.muted_by.retain(|u| *u != user);
        }
    }
}
