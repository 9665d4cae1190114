use crate::domain::order::{Decision, RequestId, UserId};

/// Text that restarts the dialogue from any state.
pub const RESTART_COMMAND: &str = "/start";

#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Text(String),
    Image(Vec<u8>),
    /// Any attachment that is not an image (documents, stickers, ...).
    Other,
}

impl UserInput {
    pub fn is_restart(&self) -> bool {
        matches!(self, UserInput::Text(text) if text.trim() == RESTART_COMMAND)
    }
}

/// An inbound event, already serialized per user by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message {
        user: UserId,
        username: Option<String>,
        input: UserInput,
    },
    Decision {
        request_id: RequestId,
        decision: Decision,
    },
}
