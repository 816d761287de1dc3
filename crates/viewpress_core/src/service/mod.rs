//! Read-side use-case services built on top of the document store.
//!
//! # Responsibility
//! - Cursor pagination over publish-order views.
//! - Category aggregation and category browse.
//!
//! # Invariants
//! - No page counters or offsets are kept; the view order is the only state.
//! - Only posts handed back to the caller are rendered.

pub mod category_service;
pub mod pagination;
