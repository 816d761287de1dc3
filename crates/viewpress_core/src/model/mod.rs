//! Domain records read from and written to the document store.
//!
//! # Responsibility
//! - Define the `post` document shape and its mutable field set.
//! - Define the singleton `links` document shape.
//!
//! # Invariants
//! - A post `id` is assigned by the store and never changes afterwards.
//! - Documents of unknown `type` are never decoded as posts.

pub mod link;
pub mod post;
