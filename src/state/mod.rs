//! State management module
//!
//! This module handles the review state, including:
//! - Shared data structures (data.rs)
//! - The review session store: ordered photos, cursor, decisions (session.rs)

pub mod data;
pub mod session;

pub use data::{AssetInfo, PhotoRecord, RelatedGroup, ReviewState, SessionSummary};
pub use session::ReviewSession;
