//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `LinkState`: The derived crawl state of a link (pending, yanked, fetched)
//! - `YankReason`: Why a link is excluded from fetching

mod link_state;
mod yank_reason;

// Re-export main types
pub use link_state::LinkState;
pub use yank_reason::YankReason;
