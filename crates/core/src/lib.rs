//! EasyHome Core - Shared session and access-control types.
//!
//! This crate provides the types used across the EasyHome console components:
//! - `admin` - Administrative console (session store, navigation guard, pages)
//! - `cli` - Command-line session tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. The navigation decision in [`access`] is a pure function
//! over a route requirement and a session snapshot, so it can be tested
//! without a router.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, account status, user profiles
//! - [`session`] - The in-memory session state and its invariants
//! - [`access`] - Per-route requirements and the navigation decision

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod session;
pub mod types;

pub use access::{GuardPaths, Navigation, NavigationTarget, Redirect, RouteRequirement, decide};
pub use session::SessionState;
pub use types::*;
