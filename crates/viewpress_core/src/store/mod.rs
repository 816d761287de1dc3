//! Document store contract consumed by the post/pagination/category layers.
//!
//! # Responsibility
//! - Define the narrow query surface the core needs: ordered range scans,
//!   grouped reduce, single-document CRUD and the category list query.
//! - Define store-level errors shared by every adapter.
//!
//! # Invariants
//! - `put` and `delete` report stale revisions as `StoreError::Conflict`,
//!   never by silently overwriting.
//! - Absence of rows is an empty `Vec`, never an error.
//! - View rows are returned in key collation order (see [`collate`]).

pub mod collate;
pub mod sqlite;

use crate::db::DbError;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use sqlite::SqliteDocumentStore;

/// A JSON document; `_id` and `_rev` members carry identity and revision.
pub type Document = serde_json::Map<String, Value>;

/// An orderable view key.
pub type ViewKey = Value;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// No document with this id exists.
    NotFound(String),
    /// The write carried a stale or missing revision for this id.
    Conflict(String),
    /// A key of the wrong shape was passed to a view.
    InvalidKey { view: ViewName, key: ViewKey },
    /// A persisted document or a query could not be decoded.
    InvalidData(String),
    /// Transport failure from the backing database.
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::Conflict(id) => write!(f, "document update conflict: {id}"),
            Self::InvalidKey { view, key } => write!(f, "invalid key {key} for view {view}"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Named views maintained by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewName {
    /// Published posts keyed by id.
    BlogPosts,
    /// Every post (drafts included) keyed by id.
    Unpublished,
    /// One row per (published post, category), keyed
    /// `["categories", category, post_id]`.
    Categories,
    /// The singleton links document.
    Links,
}

impl ViewName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlogPosts => "blogPosts/blog-posts",
            Self::Unpublished => "blogPosts/unpublished",
            Self::Categories => "blogPosts/categories",
            Self::Links => "blogPosts/links",
        }
    }
}

impl Display for ViewName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List functions that post-process a view into a paged window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListName {
    /// Category browse formatter over `ViewName::Categories`.
    Format,
}

impl ListName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "blogPosts/format",
        }
    }
}

/// Ordered range scan over one view.
///
/// With `descending`, rows come back in reverse key order and `start_key`
/// is the upper bound, matching the usual view-server convention.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeScan {
    pub view: ViewName,
    pub descending: bool,
    pub start_key: Option<ViewKey>,
    /// Tie-breaker among rows sharing `start_key`.
    pub start_doc_id: Option<String>,
    pub end_key: Option<ViewKey>,
    pub inclusive_end: bool,
    /// `None` scans to the end of the range.
    pub limit: Option<u32>,
    pub include_docs: bool,
}

impl RangeScan {
    /// Forward, unbounded scan including documents.
    pub fn new(view: ViewName) -> Self {
        Self {
            view,
            descending: false,
            start_key: None,
            start_doc_id: None,
            end_key: None,
            inclusive_end: true,
            limit: None,
            include_docs: true,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_key(mut self, key: impl Into<ViewKey>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn end_key(mut self, key: impl Into<ViewKey>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }
}

/// One row of a view scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub id: String,
    pub key: ViewKey,
    pub value: Value,
    /// Present when the scan asked for `include_docs`.
    pub doc: Option<Document>,
}

/// Grouped reduce over one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceQuery {
    pub view: ViewName,
    pub start_key: Option<ViewKey>,
    pub end_key: Option<ViewKey>,
    pub inclusive_end: bool,
    /// Number of leading array-key elements rows are grouped by; `0` reduces
    /// the whole range into one row.
    pub group_level: u32,
}

/// One aggregate produced by a grouped reduce.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceRow {
    pub key: ViewKey,
    pub value: Value,
}

/// List query producing an already-paged window of categorized documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub view: ViewName,
    pub list: ListName,
    pub limit: u32,
    /// Only documents sharing at least one category; empty means all.
    pub categories: Vec<String>,
    pub start_key: Option<ViewKey>,
    pub start_doc_id: Option<String>,
    pub end_key: Option<ViewKey>,
    /// Return the last `limit` rows up to `end_key` instead of the first.
    pub get_last: bool,
}

/// One entry of a list query window.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub categories: Vec<String>,
    pub doc: Document,
}

/// Write acknowledgment returned by `put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteAck {
    pub id: String,
    pub rev: String,
}

/// Query and write surface of a document store.
pub trait DocumentStore {
    fn range_scan(&self, scan: &RangeScan) -> StoreResult<Vec<ViewRow>>;
    fn reduce(&self, query: &ReduceQuery) -> StoreResult<Vec<ReduceRow>>;
    fn get(&self, id: &str) -> StoreResult<Document>;
    /// Creates (no `_id`, or unknown `_id` without `_rev`) or replaces a
    /// document. Replacement requires the current `_rev`.
    fn put(&self, document: &Document) -> StoreResult<WriteAck>;
    fn delete(&self, document: &Document) -> StoreResult<()>;
    fn list_query(&self, query: &ListQuery) -> StoreResult<Vec<ListItem>>;
}

pub fn document_id(document: &Document) -> Option<&str> {
    document.get("_id").and_then(Value::as_str)
}

pub fn document_rev(document: &Document) -> Option<&str> {
    document.get("_rev").and_then(Value::as_str)
}
