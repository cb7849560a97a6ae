//! State module for tracking crawl progress
//!
//! This module provides the state machines units and items move through during
//! a crawl session.
//!
//! # Components
//!
//! - `UnitState`: Tracks a unit through the unit worker pool
//! - `ItemState`: Tracks an item through the item worker pool
//! - `StateTally`: Counts terminal states for the end-of-session report

mod item_state;
mod tally;
mod unit_state;

// Re-export main types
pub use item_state::ItemState;
pub use tally::StateTally;
pub use unit_state::UnitState;
