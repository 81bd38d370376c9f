//! # lockbox-types
//!
//! Shared types, errors, and configuration for the **LockBox** custody engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`TimePoint`], [`Amount`]
//! - **Lock model**: [`LockRecord`], [`LockState`], [`LockRequest`]
//! - **Receipt model**: [`CustodyReceipt`], [`ReceiptKind`]
//! - **Configuration**: [`CustodyConfig`]
//! - **Errors**: [`LockboxError`] with `LB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod receipt;
pub mod record;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use receipt::*;
pub use record::*;

// Constants are accessed via `lockbox_types::constants::FOO`
// (not re-exported to avoid name collisions).
