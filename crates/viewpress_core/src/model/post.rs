//! Post domain model.
//!
//! # Responsibility
//! - Decode store documents into typed `Post` records.
//! - Build and overwrite post documents from `PostFields`.
//!
//! # Invariants
//! - `type` is always `"post"` for documents built here.
//! - Saving replaces every mutable field; nothing is merged.

use crate::store::Document;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Discriminator stored in the `type` member of every post document.
pub const POST_TYPE: &str = "post";

/// Opaque store-assigned post identifier.
pub type PostId = String;

/// One blog entry as stored in (and returned from) the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,
    /// Store revision marker; absent on records that were never persisted.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub title: String,
    /// Raw markup, or rendered HTML once passed through a `RenderScope`.
    pub content: String,
    pub author: String,
    /// Insertion order preserved; duplicates allowed.
    pub categories: Vec<String>,
    /// `true` keeps the post out of the published index; `null` reads as `false`.
    #[serde(deserialize_with = "null_as_published")]
    pub draft: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: String::new(),
            rev: None,
            title: String::new(),
            content: String::new(),
            author: String::new(),
            categories: Vec::new(),
            draft: false,
            kind: POST_TYPE.to_string(),
        }
    }
}

impl Post {
    /// Decodes a store document into a post.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(document))
    }

    /// Returns the mutable field set of this post.
    pub fn fields(&self) -> PostFields {
        PostFields {
            title: self.title.clone(),
            content: self.content.clone(),
            author: self.author.clone(),
            categories: self.categories.clone(),
            draft: self.draft,
        }
    }
}

/// Matches the store's published filter, which treats a null draft as unset.
fn null_as_published<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Mutable field set accepted by `PostRepository::save`.
///
/// `Default` yields an empty draft with its own empty category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub author: String,
    pub categories: Vec<String>,
    pub draft: bool,
}

impl Default for PostFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            author: String::new(),
            categories: Vec::new(),
            draft: true,
        }
    }
}

impl PostFields {
    /// Builds a fresh post document; the store assigns `_id` on write.
    pub fn to_new_document(&self) -> Document {
        let mut document = Document::new();
        document.insert("type".to_string(), Value::from(POST_TYPE));
        self.apply_to(&mut document);
        document
    }

    /// Overwrites every mutable field of an existing document in place.
    ///
    /// `_id`, `_rev` and unrelated members are left untouched.
    pub fn apply_to(&self, document: &mut Document) {
        document.insert("title".to_string(), Value::from(self.title.as_str()));
        document.insert("content".to_string(), Value::from(self.content.as_str()));
        document.insert("author".to_string(), Value::from(self.author.as_str()));
        document.insert(
            "categories".to_string(),
            Value::Array(
                self.categories
                    .iter()
                    .map(|category| Value::from(category.as_str()))
                    .collect(),
            ),
        );
        document.insert("draft".to_string(), Value::Bool(self.draft));
    }
}

/// Lightweight listing entry for every stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub author: String,
    /// Plain-text prefix of the raw content; `None` when nothing remains.
    pub excerpt: Option<String>,
}
