//! Drop-in replacements for `tokio` filesystem types.
//!
//! See the parent [`shim`](super) module for full documentation.

pub mod fs;
