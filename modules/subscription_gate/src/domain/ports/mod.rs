pub mod ledger;
pub mod membership;
pub mod messenger;

pub use ledger::UserLedger;
pub use membership::MembershipDirectory;
pub use messenger::Messenger;
