//! Category aggregation and category browse.
//!
//! # Responsibility
//! - Flatten the grouped category reduce into one deduplicated set.
//! - Drive the category list query with forward/backward cursors.
//!
//! # Invariants
//! - Category order is not significant; results are a set.
//! - Browse windows are sized by the store; empty windows are not errors.
//! - Browse limits default to 10 and clamp to 50.

use crate::model::post::Post;
use crate::render::RenderScope;
use crate::repo::post_repo::PostResult;
use crate::store::{
    DocumentStore, ListName, ListQuery, ReduceQuery, StoreResult, ViewKey, ViewName,
};
use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

const BROWSE_DEFAULT_LIMIT: u32 = 10;
const BROWSE_LIMIT_MAX: u32 = 50;
const CATEGORY_NAMESPACE: &str = "categories";
const CATEGORY_GROUP_LEVEL: u32 = 2;

/// Category browse request.
///
/// `start_key` pages forward from a post already shown; `end_key` pages
/// backward to the window ending before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseQuery {
    /// Window size. Defaults to 10 and clamps to 50.
    pub limit: Option<u32>,
    /// Posts sharing at least one of these; empty selects every post.
    pub categories: Vec<String>,
    pub start_key: Option<ViewKey>,
    pub end_key: Option<ViewKey>,
}

/// One browse entry: the post's categories alongside the rendered post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorizedPost {
    pub categories: Vec<String>,
    pub post: Post,
}

pub struct CategoryAggregator<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> CategoryAggregator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Returns every category in use by a published post.
    pub fn list_categories(&self) -> StoreResult<BTreeSet<String>> {
        let query = ReduceQuery {
            view: ViewName::Categories,
            start_key: Some(json!([CATEGORY_NAMESPACE])),
            end_key: Some(json!([CATEGORY_NAMESPACE, {}])),
            inclusive_end: false,
            group_level: CATEGORY_GROUP_LEVEL,
        };

        let rows = self.store.reduce(&query)?;
        let groups = rows.len();
        let categories: BTreeSet<String> = rows
            .into_iter()
            .flat_map(|row| category_names(row.value))
            .collect();

        debug!(
            "event=list_categories module=categories status=ok groups={groups} categories={}",
            categories.len()
        );
        Ok(categories)
    }

    /// Returns one rendered browse window.
    pub fn browse(
        &self,
        scope: &mut RenderScope<'_>,
        query: &BrowseQuery,
    ) -> PostResult<Vec<CategorizedPost>> {
        let list_query = ListQuery {
            view: ViewName::Categories,
            list: ListName::Format,
            limit: normalize_browse_limit(query.limit),
            categories: query.categories.clone(),
            start_key: query.start_key.clone(),
            start_doc_id: query
                .start_key
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string),
            end_key: query.end_key.clone(),
            get_last: query.end_key.is_some(),
        };

        let posts = self
            .store
            .list_query(&list_query)?
            .into_iter()
            .map(|item| -> PostResult<CategorizedPost> {
                let post = Post::from_document(item.doc)?;
                Ok(CategorizedPost {
                    categories: item.categories,
                    post: scope.render_post(post),
                })
            })
            .collect::<PostResult<Vec<_>>>()?;

        info!(
            "event=browse module=categories status=ok filter_size={} limit={} get_last={} rows={}",
            list_query.categories.len(),
            list_query.limit,
            list_query.get_last,
            posts.len()
        );
        Ok(posts)
    }
}

/// Normalizes a browse window size.
pub fn normalize_browse_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => BROWSE_DEFAULT_LIMIT,
        Some(value) if value > BROWSE_LIMIT_MAX => BROWSE_LIMIT_MAX,
        Some(value) => value,
    }
}

/// A reduce value is a list of names; a bare string counts as one name.
fn category_names(value: Value) -> Vec<String> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        Value::String(name) => vec![name],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{category_names, normalize_browse_limit};
    use serde_json::json;

    #[test]
    fn browse_limit_defaults_and_clamps() {
        assert_eq!(normalize_browse_limit(None), 10);
        assert_eq!(normalize_browse_limit(Some(0)), 10);
        assert_eq!(normalize_browse_limit(Some(7)), 7);
        assert_eq!(normalize_browse_limit(Some(500)), 50);
    }

    #[test]
    fn category_names_skips_non_string_members() {
        assert_eq!(
            category_names(json!(["go", 3, null, "rust"])),
            vec!["go".to_string(), "rust".to_string()]
        );
        assert_eq!(category_names(json!("solo")), vec!["solo".to_string()]);
        assert!(category_names(json!({"a": 1})).is_empty());
    }
}
