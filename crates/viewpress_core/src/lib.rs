//! Core of a blog engine layered over document-store views.
//!
//! Posts are stored as JSON documents; reads go through ordered views.
//! This crate owns the cursor pagination, the category aggregation and the
//! post CRUD rules on top of any `DocumentStore`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::link::Link;
pub use model::post::{Post, PostFields, PostId, PostSummary};
pub use render::{CmarkEngine, MarkdownEngine, RenderScope};
pub use repo::link_repo::LinkRepository;
pub use repo::post_repo::{InitialPost, PostError, PostRepository, PostResult, Visibility};
pub use service::category_service::{BrowseQuery, CategorizedPost, CategoryAggregator};
pub use service::pagination::{Cursor, PageResult, Paginator};
pub use store::{
    Document, DocumentStore, SqliteDocumentStore, StoreError, StoreResult, ViewName, WriteAck,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
