//! Data models for the invitation service.
//!
//! JSON field names follow the camelCase layout the remote store already holds.

mod defaults;
mod department;

pub use defaults::*;
pub use department::*;
