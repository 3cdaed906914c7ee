pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{Conversation, LastMessageSummary, ParticipantPair};
pub use message::{
    Message, MessageStatus, MessageType, NewMessage, ReactionGroup, ReplyPreview,
    TOMBSTONE_CONTENT,
};
pub use user::UserProfile;
