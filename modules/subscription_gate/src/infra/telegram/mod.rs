pub mod keyboard;
pub mod membership;
pub mod messenger;

pub use membership::TelegramMembership;
pub use messenger::TelegramMessenger;
