//! # SMK3 Common Library
//!
//! Shared code for the SMK3 audit service:
//! - Configuration loading
//! - SQLite schema initialization and settings storage
//! - Bearer token and password primitives
//! - Time and id helpers

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
