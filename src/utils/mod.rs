//! Shared helpers.

pub mod date;
pub mod mime;
pub mod path;
