pub mod handlers;
pub mod schema;

pub use schema::{schema, Command};
