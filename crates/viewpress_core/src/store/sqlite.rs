//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents with revision markers in the `documents` table.
//! - Evaluate the fixed blog views and the category browse list query.
//!
//! # Invariants
//! - Revisions are `<generation>-<uuid>`; every successful write bumps the
//!   generation by one.
//! - Revision check and write happen in one immediate transaction.
//! - Publish-order views are keyed by document id; category rows are keyed
//!   `["categories", category, id]`.

use super::collate::{collate_row, group_key, in_range};
use super::{
    document_id, document_rev, Document, DocumentStore, ListItem, ListName, ListQuery, RangeScan,
    ReduceQuery, ReduceRow, StoreError, StoreResult, ViewKey, ViewName, ViewRow, WriteAck,
};
use crate::db::{open_db, open_db_in_memory};
use crate::model::link::LINKS_TYPE;
use crate::model::post::POST_TYPE;
use log::{debug, info, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior,
};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

const PUBLISHED_FILTER: &str = "IFNULL(json_extract(body, '$.draft'), 0) = 0";

/// Document store over one migrated SQLite connection.
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (and migrates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens an empty in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn scan_by_id(
        &self,
        scan: &RangeScan,
        doc_type: &str,
        published_only: bool,
    ) -> StoreResult<Vec<ViewRow>> {
        let mut sql = String::from(
            "SELECT id, rev, body
             FROM documents
             WHERE json_extract(body, '$.type') = ?",
        );
        let mut bind_values = vec![SqlValue::Text(doc_type.to_string())];

        if published_only {
            sql.push_str(" AND ");
            sql.push_str(PUBLISHED_FILTER);
        }

        if let Some(key) = scan.start_key.as_ref() {
            sql.push_str(if scan.descending {
                " AND id <= ?"
            } else {
                " AND id >= ?"
            });
            bind_values.push(SqlValue::Text(id_key(scan.view, key)?));
        }

        if let Some(key) = scan.end_key.as_ref() {
            let op = match (scan.descending, scan.inclusive_end) {
                (false, true) => "<=",
                (false, false) => "<",
                (true, true) => ">=",
                (true, false) => ">",
            };
            sql.push_str(&format!(" AND id {op} ?"));
            bind_values.push(SqlValue::Text(id_key(scan.view, key)?));
        }

        sql.push_str(if scan.descending {
            " ORDER BY id DESC"
        } else {
            " ORDER BY id ASC"
        });
        sql.push_str(" LIMIT ?");
        bind_values.push(SqlValue::Integer(scan.limit.map_or(-1, i64::from)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut view_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let doc = if scan.include_docs {
                let rev: String = row.get("rev")?;
                let body: String = row.get("body")?;
                Some(compose_document(&id, &rev, &body)?)
            } else {
                None
            };
            view_rows.push(ViewRow {
                key: Value::String(id.clone()),
                id,
                value: Value::Null,
                doc,
            });
        }

        Ok(view_rows)
    }

    /// Emits the full category index in collation order.
    fn category_rows(&self, include_docs: bool) -> StoreResult<Vec<ViewRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT d.id AS id, d.rev AS rev, d.body AS body, c.value AS category
             FROM documents d, json_each(d.body, '$.categories') c
             WHERE json_extract(d.body, '$.type') = ?1
               AND {PUBLISHED_FILTER}
               AND c.type = 'text';"
        ))?;

        let mut rows = stmt.query([POST_TYPE])?;
        let mut view_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let category: String = row.get("category")?;
            let doc = if include_docs {
                let rev: String = row.get("rev")?;
                let body: String = row.get("body")?;
                Some(compose_document(&id, &rev, &body)?)
            } else {
                None
            };
            view_rows.push(ViewRow {
                key: json!(["categories", category.as_str(), id.as_str()]),
                value: Value::String(category),
                id,
                doc,
            });
        }

        view_rows.sort_by(|a, b| collate_row((&a.key, &a.id), (&b.key, &b.id)));
        Ok(view_rows)
    }

    fn scan_categories(&self, scan: &RangeScan) -> StoreResult<Vec<ViewRow>> {
        let mut rows = self.category_rows(scan.include_docs)?;
        if scan.descending {
            rows.reverse();
        }

        let start = scan
            .start_key
            .as_ref()
            .map(|key| (key, scan.start_doc_id.as_deref()));
        let limit = scan.limit.map_or(usize::MAX, |limit| limit as usize);

        Ok(rows
            .into_iter()
            .filter(|row| {
                in_range(
                    &row.key,
                    &row.id,
                    start,
                    scan.end_key.as_ref(),
                    scan.inclusive_end,
                    scan.descending,
                )
            })
            .take(limit)
            .collect())
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn range_scan(&self, scan: &RangeScan) -> StoreResult<Vec<ViewRow>> {
        let started_at = Instant::now();
        let rows = match scan.view {
            ViewName::BlogPosts => self.scan_by_id(scan, POST_TYPE, true)?,
            ViewName::Unpublished => self.scan_by_id(scan, POST_TYPE, false)?,
            ViewName::Links => self.scan_by_id(scan, LINKS_TYPE, false)?,
            ViewName::Categories => self.scan_categories(scan)?,
        };
        debug!(
            "event=view_scan module=store status=ok view={} descending={} rows={} duration_ms={}",
            scan.view,
            scan.descending,
            rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(rows)
    }

    fn reduce(&self, query: &ReduceQuery) -> StoreResult<Vec<ReduceRow>> {
        if query.view != ViewName::Categories {
            return Err(StoreError::InvalidData(format!(
                "view {} has no reduce function",
                query.view
            )));
        }

        let start = query.start_key.as_ref().map(|key| (key, None));
        let mut groups: Vec<ReduceRow> = Vec::new();
        for row in self.category_rows(false)?.into_iter().filter(|row| {
            in_range(
                &row.key,
                &row.id,
                start,
                query.end_key.as_ref(),
                query.inclusive_end,
                false,
            )
        }) {
            let key = group_key(&row.key, query.group_level);
            match groups.last_mut() {
                Some(last) if last.key == key => {
                    if let Value::Array(values) = &mut last.value {
                        if !values.contains(&row.value) {
                            values.push(row.value);
                        }
                    }
                }
                _ => groups.push(ReduceRow {
                    key,
                    value: Value::Array(vec![row.value]),
                }),
            }
        }

        debug!(
            "event=view_reduce module=store status=ok view={} group_level={} groups={}",
            query.view,
            query.group_level,
            groups.len()
        );
        Ok(groups)
    }

    fn get(&self, id: &str) -> StoreResult<Document> {
        let stored: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT rev, body FROM documents WHERE id = ?1;",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match stored {
            Some((rev, body)) => compose_document(id, &rev, &body),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn put(&self, document: &Document) -> StoreResult<WriteAck> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let id = document_id(document)
            .map(str::to_string)
            .unwrap_or_else(new_document_id);
        let current = current_rev(&tx, &id)?;

        let rev = match (current.as_deref(), document_rev(document)) {
            (None, None) => revision(1),
            (Some(current), Some(given)) if current == given => {
                revision(rev_generation(current)? + 1)
            }
            (current, given) => {
                warn!(
                    "event=doc_put module=store status=conflict id={} current_rev={} given_rev={}",
                    id,
                    current.unwrap_or("none"),
                    given.unwrap_or("none")
                );
                return Err(StoreError::Conflict(id));
            }
        };

        tx.execute(
            "INSERT INTO documents (id, rev, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                rev = excluded.rev,
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![id.as_str(), rev.as_str(), document_body(document)?],
        )?;
        tx.commit()?;

        info!("event=doc_put module=store status=ok id={id} rev={rev}");
        Ok(WriteAck { id, rev })
    }

    fn delete(&self, document: &Document) -> StoreResult<()> {
        let id = document_id(document)
            .ok_or_else(|| StoreError::InvalidData("document without `_id`".to_string()))?;
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        match (current_rev(&tx, id)?, document_rev(document)) {
            (None, _) => return Err(StoreError::NotFound(id.to_string())),
            (Some(current), Some(given)) if current == given => {}
            _ => {
                warn!("event=doc_delete module=store status=conflict id={id}");
                return Err(StoreError::Conflict(id.to_string()));
            }
        }

        tx.execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!("event=doc_delete module=store status=ok id={id}");
        Ok(())
    }

    fn list_query(&self, query: &ListQuery) -> StoreResult<Vec<ListItem>> {
        if query.view != ViewName::Categories || query.list != ListName::Format {
            return Err(StoreError::InvalidData(format!(
                "list {} is not defined over view {}",
                query.list.as_str(),
                query.view
            )));
        }

        let scan = RangeScan {
            view: ViewName::BlogPosts,
            descending: false,
            start_key: query.start_key.clone(),
            start_doc_id: None,
            end_key: query.end_key.clone(),
            inclusive_end: true,
            limit: None,
            include_docs: true,
        };

        // Anchors were already shown by the caller's previous window.
        let forward_anchor = query
            .start_doc_id
            .as_deref()
            .or_else(|| query.start_key.as_ref().and_then(Value::as_str));
        let backward_anchor = query.end_key.as_ref().and_then(Value::as_str);

        let matching: Vec<ListItem> = self
            .scan_by_id(&scan, POST_TYPE, true)?
            .into_iter()
            .filter(|row| Some(row.id.as_str()) != forward_anchor)
            .filter(|row| !query.get_last || Some(row.id.as_str()) != backward_anchor)
            .filter_map(|row| row.doc)
            .filter_map(|doc| {
                let categories = document_categories(&doc);
                let selected = query.categories.is_empty()
                    || categories
                        .iter()
                        .any(|category| query.categories.contains(category));
                selected.then_some(ListItem { categories, doc })
            })
            .collect();

        let limit = query.limit as usize;
        let window: Vec<ListItem> = if query.get_last {
            let skip = matching.len().saturating_sub(limit);
            matching.into_iter().skip(skip).collect()
        } else {
            matching.into_iter().take(limit).collect()
        };

        debug!(
            "event=list_query module=store status=ok list={} get_last={} rows={}",
            query.list.as_str(),
            query.get_last,
            window.len()
        );
        Ok(window)
    }
}

fn id_key(view: ViewName, key: &ViewKey) -> StoreResult<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidKey {
            view,
            key: key.clone(),
        })
}

fn compose_document(id: &str, rev: &str, body: &str) -> StoreResult<Document> {
    let mut document: Document = serde_json::from_str(body)?;
    document.insert("_id".to_string(), Value::from(id));
    document.insert("_rev".to_string(), Value::from(rev));
    Ok(document)
}

fn document_body(document: &Document) -> StoreResult<String> {
    let mut body = document.clone();
    body.remove("_id");
    body.remove("_rev");
    Ok(serde_json::to_string(&body)?)
}

fn document_categories(document: &Document) -> Vec<String> {
    document
        .get("categories")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn current_rev(conn: &Connection, id: &str) -> StoreResult<Option<String>> {
    Ok(conn
        .query_row("SELECT rev FROM documents WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .optional()?)
}

/// Time-ordered id so id-keyed views list documents in creation order.
fn new_document_id() -> String {
    Uuid::now_v7().simple().to_string()
}

fn revision(generation: u64) -> String {
    format!("{generation}-{}", Uuid::new_v4().simple())
}

fn rev_generation(rev: &str) -> StoreResult<u64> {
    rev.split_once('-')
        .and_then(|(generation, _)| generation.parse().ok())
        .ok_or_else(|| StoreError::InvalidData(format!("malformed revision `{rev}`")))
}

#[cfg(test)]
mod tests {
    use super::{new_document_id, rev_generation, revision};

    #[test]
    fn revision_generation_round_trips() {
        assert_eq!(rev_generation(&revision(7)).expect("valid revision"), 7);
    }

    #[test]
    fn generated_ids_sort_in_creation_order() {
        let ids: Vec<String> = (0..64).map(|_| new_document_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn malformed_revision_is_rejected() {
        assert!(rev_generation("abc").is_err());
        assert!(rev_generation("x-abc").is_err());
    }
}
