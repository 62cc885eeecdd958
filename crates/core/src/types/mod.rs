//! Core types for EasyHome.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod profile;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use profile::UserInfo;
pub use status::*;
