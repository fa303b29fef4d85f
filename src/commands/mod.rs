//! Command implementations

pub mod sync;
