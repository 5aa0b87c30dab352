//! `vera-core`: configuration and shared error type for the VERA workspace.

pub mod config;
pub mod error;

pub use config::VeraConfig;
pub use error::{Result, VeraError};
