use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::BTreeSet;
use viewpress_core::store::{
    Document, DocumentStore, ListItem, ListQuery, RangeScan, ReduceQuery, ReduceRow, StoreResult,
    ViewName, ViewRow,
};
use viewpress_core::{
    BrowseQuery, CategoryAggregator, CmarkEngine, PostFields, RenderScope, SqliteDocumentStore,
    WriteAck,
};

/// Serves canned reduce rows and records the queries it receives.
struct ScriptedStore {
    reduce_rows: Vec<ReduceRow>,
    reduce_queries: RefCell<Vec<ReduceQuery>>,
    list_queries: RefCell<Vec<ListQuery>>,
}

impl ScriptedStore {
    fn with_reduce_rows(reduce_rows: Vec<ReduceRow>) -> Self {
        Self {
            reduce_rows,
            reduce_queries: RefCell::new(Vec::new()),
            list_queries: RefCell::new(Vec::new()),
        }
    }
}

impl DocumentStore for ScriptedStore {
    fn range_scan(&self, _scan: &RangeScan) -> StoreResult<Vec<ViewRow>> {
        Ok(Vec::new())
    }

    fn reduce(&self, query: &ReduceQuery) -> StoreResult<Vec<ReduceRow>> {
        self.reduce_queries.borrow_mut().push(query.clone());
        Ok(self.reduce_rows.clone())
    }

    fn get(&self, id: &str) -> StoreResult<Document> {
        Err(viewpress_core::StoreError::NotFound(id.to_string()))
    }

    fn put(&self, _document: &Document) -> StoreResult<WriteAck> {
        unreachable!("category reads never write")
    }

    fn delete(&self, _document: &Document) -> StoreResult<()> {
        unreachable!("category reads never delete")
    }

    fn list_query(&self, query: &ListQuery) -> StoreResult<Vec<ListItem>> {
        self.list_queries.borrow_mut().push(query.clone());
        Ok(Vec::new())
    }
}

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn seed(store: &SqliteDocumentStore, id: &str, categories: &[&str], draft: bool) {
    let fields = PostFields {
        title: format!("Post {id}"),
        content: format!("_{id}_"),
        author: "ana".to_string(),
        categories: categories.iter().map(|name| name.to_string()).collect(),
        draft,
    };
    let mut document = fields.to_new_document();
    document.insert("_id".to_string(), json!(id));
    store.put(&document).unwrap();
}

fn browse_ids(store: &SqliteDocumentStore, query: &BrowseQuery) -> Vec<String> {
    let engine = CmarkEngine::default();
    let mut scope = RenderScope::new(&engine);
    CategoryAggregator::new(store)
        .browse(&mut scope, query)
        .unwrap()
        .into_iter()
        .map(|entry| entry.post.id)
        .collect()
}

#[test]
fn grouped_reduce_values_flatten_into_one_set() {
    let store = ScriptedStore::with_reduce_rows(vec![
        ReduceRow {
            key: json!(["categories", "tech"]),
            value: json!(["go", "rust"]),
        },
        ReduceRow {
            key: json!(["categories", "life"]),
            value: json!(["travel"]),
        },
    ]);

    let categories = CategoryAggregator::new(&store).list_categories().unwrap();
    assert_eq!(categories, names(&["go", "rust", "travel"]));

    let queries = store.reduce_queries.borrow();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].view, ViewName::Categories);
    assert_eq!(queries[0].start_key, Some(json!(["categories"])));
    assert_eq!(queries[0].end_key, Some(json!(["categories", {}])));
    assert!(!queries[0].inclusive_end);
    assert_eq!(queries[0].group_level, 2);
}

#[test]
fn overlapping_groups_are_deduplicated() {
    let store = ScriptedStore::with_reduce_rows(vec![
        ReduceRow {
            key: json!(["categories", "a"]),
            value: json!(["rust", "go"]),
        },
        ReduceRow {
            key: json!(["categories", "b"]),
            value: json!(["rust"]),
        },
    ]);
    let categories = CategoryAggregator::new(&store).list_categories().unwrap();
    assert_eq!(categories, names(&["go", "rust"]));
}

#[test]
fn list_categories_is_stable_without_writes() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    seed(&store, "p1", &["rust", "life"], false);
    seed(&store, "p2", &["rust"], false);
    seed(&store, "p3", &["secret"], true);

    let aggregator = CategoryAggregator::new(&store);
    let first = aggregator.list_categories().unwrap();
    let second = aggregator.list_categories().unwrap();

    assert_eq!(first, names(&["life", "rust"]));
    assert_eq!(first, second);
}

#[test]
fn empty_store_has_no_categories_and_empty_browse() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    assert!(CategoryAggregator::new(&store)
        .list_categories()
        .unwrap()
        .is_empty());
    assert!(browse_ids(&store, &BrowseQuery::default()).is_empty());
}

#[test]
fn browse_filters_by_category_and_renders_posts() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    seed(&store, "p1", &["rust"], false);
    seed(&store, "p2", &["go"], false);
    seed(&store, "p3", &["go", "rust"], false);
    seed(&store, "p4", &["rust"], true);

    let engine = CmarkEngine::default();
    let mut scope = RenderScope::new(&engine);
    let entries = CategoryAggregator::new(&store)
        .browse(
            &mut scope,
            &BrowseQuery {
                categories: vec!["rust".to_string()],
                ..BrowseQuery::default()
            },
        )
        .unwrap();

    let ids: Vec<&str> = entries.iter().map(|entry| entry.post.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);
    assert_eq!(entries[1].categories, vec!["go".to_string(), "rust".to_string()]);
    assert_eq!(entries[0].post.content, "<p><em>p1</em></p>\n");
}

#[test]
fn browse_pages_forward_and_backward_by_window() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for id in ["p1", "p2", "p3", "p4", "p5"] {
        seed(&store, id, &["log"], false);
    }

    let first = browse_ids(
        &store,
        &BrowseQuery {
            limit: Some(2),
            ..BrowseQuery::default()
        },
    );
    assert_eq!(first, vec!["p1", "p2"]);

    let second = browse_ids(
        &store,
        &BrowseQuery {
            limit: Some(2),
            start_key: Some(Value::from("p2")),
            ..BrowseQuery::default()
        },
    );
    assert_eq!(second, vec!["p3", "p4"]);

    let back = browse_ids(
        &store,
        &BrowseQuery {
            limit: Some(2),
            end_key: Some(Value::from("p3")),
            ..BrowseQuery::default()
        },
    );
    assert_eq!(back, vec!["p1", "p2"]);
}

#[test]
fn browse_passes_cursor_conventions_to_the_list_query() {
    let store = ScriptedStore::with_reduce_rows(Vec::new());
    let engine = CmarkEngine::default();
    let mut scope = RenderScope::new(&engine);
    let aggregator = CategoryAggregator::new(&store);

    let forward = aggregator
        .browse(
            &mut scope,
            &BrowseQuery {
                limit: Some(500),
                categories: vec!["rust".to_string()],
                start_key: Some(json!("p7")),
                end_key: None,
            },
        )
        .unwrap();
    assert!(forward.is_empty());

    aggregator
        .browse(
            &mut scope,
            &BrowseQuery {
                end_key: Some(json!("p3")),
                ..BrowseQuery::default()
            },
        )
        .unwrap();

    let queries = store.list_queries.borrow();
    assert_eq!(queries[0].limit, 50);
    assert_eq!(queries[0].start_key, Some(json!("p7")));
    assert_eq!(queries[0].start_doc_id.as_deref(), Some("p7"));
    assert!(!queries[0].get_last);
    assert_eq!(queries[0].categories, vec!["rust".to_string()]);

    assert_eq!(queries[1].limit, 10);
    assert_eq!(queries[1].end_key, Some(json!("p3")));
    assert!(queries[1].get_last);
    assert!(queries[1].categories.is_empty());
}
