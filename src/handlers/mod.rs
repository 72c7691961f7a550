//! HTTP handlers for the race catalog.

pub mod race;
pub use race::*;
