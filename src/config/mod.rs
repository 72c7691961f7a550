//! Process configuration, read once at startup and passed down explicitly.

pub mod types;
pub mod loader;
pub mod validator;

pub use types::*;
pub use validator::*;
