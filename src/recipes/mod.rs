//! Build recipes.
//!
//! Discovery turns recipe folders into build units; expansion synthesizes
//! derived and composite units on top of them.

pub mod descriptor;
pub mod discover;
pub mod expand;

pub use descriptor::CompositeDescriptor;
pub use discover::{discover, DiscoverOptions, Discovery};
pub use expand::{expand, CustomImage, ExpandOptions};
