//! Data models for harlens
//!
//! Inputs shared by the analysis engines and the diagram generators.

pub mod entry;
pub mod exchange;

pub use entry::*;
pub use exchange::*;
