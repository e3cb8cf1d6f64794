//! Database initialization and shared settings storage

pub mod init;
pub mod settings;

pub use init::*;
pub use settings::*;
