//! OS-specific filesystem extensions for the shim types.

pub mod unix;
pub mod windows;
