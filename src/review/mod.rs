//! Review workflow: deciding photo by photo, then deleting in one commit.

pub mod controller;
pub mod error;

pub use controller::{LoadedImage, ReviewController, TogglePolicy};
pub use error::ReviewError;
