//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Cursor`: the persisted (category, index page, product slot) position
//! - `Advance`: the outcome of one pagination transition
//! - `CursorError`: invariant violations, always fatal to a run

mod cursor;

pub use cursor::{Advance, Cursor, CursorError};
