pub mod menu;
pub mod oracle;
pub mod ports;
pub mod service;
