//! Windows-specific filesystem extensions.
//!
//! Usable on any host against the Windows profile.

pub mod fs;
