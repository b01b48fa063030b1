//! Artifact publishing.
//!
//! Lists existing pipeline images, filters them and removes or uploads
//! them in bulk.

pub mod clear;
pub mod filter;
pub mod push;
pub mod select;

pub use clear::{clear_images, ClearReport};
pub use filter::TagFilter;
pub use push::push_images;
pub use select::{select_images, ImageEntry, ImageTable, SelectOptions};
