//! Shared types for Vestibule

mod error;

pub use error::{Result, VestibuleError};
