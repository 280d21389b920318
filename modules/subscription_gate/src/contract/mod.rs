pub mod error;
pub mod model;

pub use error::{LedgerError, TransportError};
pub use model::{
    CallbackAction, CallbackEvent, ConversationId, LedgerEntry, MemberStatus, MessageRef, Screen,
    StartEvent, UnknownCallback, User, UserId,
};
