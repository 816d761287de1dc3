//! Post repository.
//!
//! # Responsibility
//! - Save (create or full overwrite), get, delete posts.
//! - Provide the landing post and the all-posts summary listing.
//!
//! # Invariants
//! - `save` with an id replaces every mutable field of the stored document.
//! - `get` only returns the post whose id was asked for.
//! - `delete` never fails because the post is gone or changed concurrently.

use crate::model::post::{Post, PostFields, PostId, PostSummary, POST_TYPE};
use crate::render::excerpt::excerpt;
use crate::render::RenderScope;
use crate::store::{DocumentStore, RangeScan, StoreError, ViewName, ViewRow, WriteAck};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PostResult<T> = Result<T, PostError>;

/// Errors surfaced by post operations.
#[derive(Debug)]
pub enum PostError {
    /// No post with this id in the queried index.
    NotFound(PostId),
    /// Concurrent write detected while saving this post.
    Conflict(PostId),
    /// A stored document could not be decoded as a post.
    InvalidData(String),
    /// Transport or adapter failure.
    Store(StoreError),
}

impl Display for PostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "post not found: {id}"),
            Self::Conflict(id) => write!(f, "post was modified concurrently: {id}"),
            Self::InvalidData(message) => write!(f, "invalid post document: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for PostError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Conflict(id) => Self::Conflict(id),
            other => Self::Store(other),
        }
    }
}

impl From<serde_json::Error> for PostError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Which publish-order index a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Published posts only.
    #[default]
    Published,
    /// Drafts and published posts.
    Unpublished,
}

impl Visibility {
    pub fn view(self) -> ViewName {
        match self {
            Self::Published => ViewName::BlogPosts,
            Self::Unpublished => ViewName::Unpublished,
        }
    }
}

/// Landing entry: the first published post, or an explicit empty record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialPost {
    First(Post),
    Empty,
}

impl InitialPost {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the post, or an all-default record when no post exists.
    pub fn into_post(self) -> Post {
        match self {
            Self::First(post) => post,
            Self::Empty => Post::default(),
        }
    }
}

/// Post CRUD over a document store.
pub struct PostRepository<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> PostRepository<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Creates a post (no `id`) or fully overwrites an existing one.
    ///
    /// # Errors
    /// - `NotFound` when `id` names no post.
    /// - `Conflict` when the post changed between load and write.
    pub fn save(&self, fields: &PostFields, id: Option<&str>) -> PostResult<WriteAck> {
        let document = match id {
            Some(id) => {
                let mut document = self.store.get(id)?;
                if document.get("type").and_then(|kind| kind.as_str()) != Some(POST_TYPE) {
                    return Err(PostError::NotFound(id.to_string()));
                }
                fields.apply_to(&mut document);
                document
            }
            None => fields.to_new_document(),
        };

        match self.store.put(&document) {
            Ok(ack) => {
                info!(
                    "event=post_save module=repo status=ok mode={} id={} rev={} draft={}",
                    if id.is_some() { "overwrite" } else { "create" },
                    ack.id,
                    ack.rev,
                    fields.draft
                );
                Ok(ack)
            }
            Err(err) => {
                error!(
                    "event=post_save module=repo status=error id={} error={}",
                    id.unwrap_or("new"),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Gets one post with its content rendered through `scope`.
    pub fn get(
        &self,
        scope: &mut RenderScope<'_>,
        id: &str,
        visibility: Visibility,
    ) -> PostResult<Post> {
        let post = self.get_source(id, visibility)?;
        Ok(scope.render_post(post))
    }

    /// Gets one post with its raw markup untouched.
    ///
    /// Scans the index for `visibility` forward from `id` and accepts the
    /// first row only if it is `id` itself.
    pub fn get_source(&self, id: &str, visibility: Visibility) -> PostResult<Post> {
        let scan = RangeScan::new(visibility.view()).start_key(id).limit(1);
        let row = self
            .store
            .range_scan(&scan)?
            .into_iter()
            .next()
            .filter(|row| row.id == id);

        match row {
            Some(row) => decode_row(row),
            None => {
                info!(
                    "event=post_get module=repo status=not_found id={id} view={}",
                    scan.view
                );
                Err(PostError::NotFound(id.to_string()))
            }
        }
    }

    /// Deletes a post; `false` when it is missing or changed concurrently.
    pub fn delete(&self, id: &str) -> PostResult<bool> {
        let document = match self.store.get(id) {
            Ok(document) => document,
            Err(StoreError::NotFound(_)) => {
                info!("event=post_delete module=repo status=missing id={id}");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        if document.get("type").and_then(|kind| kind.as_str()) != Some(POST_TYPE) {
            info!("event=post_delete module=repo status=not_a_post id={id}");
            return Ok(false);
        }

        match self.store.delete(&document) {
            Ok(()) => {
                info!("event=post_delete module=repo status=ok id={id}");
                Ok(true)
            }
            Err(err @ (StoreError::NotFound(_) | StoreError::Conflict(_))) => {
                warn!("event=post_delete module=repo status=no_effect id={id} error={err}");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the first published post, rendered, or `InitialPost::Empty`.
    pub fn initial(&self, scope: &mut RenderScope<'_>) -> PostResult<InitialPost> {
        let scan = RangeScan::new(ViewName::BlogPosts).limit(2);
        match self.store.range_scan(&scan)?.into_iter().next() {
            Some(row) => Ok(InitialPost::First(scope.render_post(decode_row(row)?))),
            None => Ok(InitialPost::Empty),
        }
    }

    /// Lists every post (drafts included) in key order.
    pub fn summaries(&self, max_excerpt_chars: usize) -> PostResult<Vec<PostSummary>> {
        let scan = RangeScan::new(ViewName::Unpublished);
        self.store
            .range_scan(&scan)?
            .into_iter()
            .map(|row| -> PostResult<PostSummary> {
                let post = decode_row(row)?;
                Ok(PostSummary {
                    excerpt: excerpt(&post.content, max_excerpt_chars),
                    id: post.id,
                    title: post.title,
                    author: post.author,
                })
            })
            .collect()
    }
}

/// Decodes the document attached to a view row.
pub(crate) fn decode_row(row: ViewRow) -> PostResult<Post> {
    let document = row.doc.ok_or_else(|| {
        PostError::InvalidData(format!("view row `{}` carries no document", row.id))
    })?;
    Ok(Post::from_document(document)?)
}
