//! Repository layer over the document store.
//!
//! # Responsibility
//! - Translate post/link use-cases into `DocumentStore` calls.
//! - Decode store documents into typed records.
//!
//! # Invariants
//! - Only documents of `type = "post"` are read, written or deleted as posts.
//! - Save propagates write conflicts; delete downgrades them to `false`.

pub mod link_repo;
pub mod post_repo;
