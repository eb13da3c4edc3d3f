//! Project model: descriptor, asset layout and on-disk state.
//!
//! # Module Structure
//!
//! - `descriptor` - `project.toml` types
//! - `category` - asset directories and extension rules
//! - `frames` - sprite-sheet frame inference
//! - `store` - descriptor read/write with a TTL cache
//! - `manifest` - versioned file listing
//! - `resolve` - project root lookup

pub mod category;
pub mod descriptor;
pub mod error;
pub mod frames;
pub mod manifest;
pub mod resolve;
pub mod store;

pub use category::Category;
pub use error::ProjectError;
pub use manifest::{ProjectInfo, build_manifest};
pub use resolve::ProjectResolver;
pub use store::{ConfigStore, SpriteProperties};
