//! Photo triage: walk a photo library one photo at a time, keep or mark each
//! one for deletion, then delete everything marked in a single commit.

pub mod config;
pub mod library;
pub mod review;
pub mod settings;
pub mod state;
