//! Links repository: reads the singleton links document.

use crate::model::link::{Link, LinksDocument};
use crate::store::{DocumentStore, RangeScan, StoreResult, ViewName};
use serde_json::Value;

pub struct LinkRepository<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> LinkRepository<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Returns the stored links; empty when no links document exists.
    pub fn links(&self) -> StoreResult<Vec<Link>> {
        let scan = RangeScan::new(ViewName::Links).limit(1);
        let Some(document) = self
            .store
            .range_scan(&scan)?
            .into_iter()
            .next()
            .and_then(|row| row.doc)
        else {
            return Ok(Vec::new());
        };

        let parsed: LinksDocument = serde_json::from_value(Value::Object(document))?;
        Ok(parsed.links)
    }
}
