pub mod memory;
pub mod sheets;
pub mod telegram;

pub use memory::InMemoryLedger;
