//! Cursor pagination over a publish-order view.
//!
//! # Responsibility
//! - Serve "first page", "next page" and "previous page" one post at a time.
//! - Detect both ends of the view without counting rows.
//!
//! # Invariants
//! - Every lookup fetches at most two rows; the extra row only marks a
//!   boundary and is never rendered or returned.
//! - Reaching either end is a value (`End` / `Start`), not an error.
//! - Paging forward from each returned key never yields a post twice.

use crate::model::post::Post;
use crate::render::RenderScope;
use crate::repo::post_repo::{decode_row, PostResult, Visibility};
use crate::store::collate::collate;
use crate::store::{DocumentStore, RangeScan, ViewKey, ViewName, ViewRow};
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;

/// Rows fetched per lookup: the candidate plus one boundary probe.
const PEEK_ROWS: u32 = 2;

/// Position to page from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Beginning of the view.
    Start,
    /// Resume after the post with this key.
    Forward(ViewKey),
    /// Go back from the post with this key.
    Backward(ViewKey),
}

/// Outcome of one pagination step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageResult {
    /// One post; `key` is the cursor value for the next step.
    Page { key: ViewKey, post: Post },
    /// Nothing (more) to show going forward.
    End,
    /// Already at the beginning; the caller should show the first page.
    Start,
}

enum Selection {
    Row(ViewRow),
    End,
    Start,
}

/// Single-post pager over one publish-order view.
pub struct Paginator<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    view: ViewName,
}

impl<'s, S: DocumentStore + ?Sized> Paginator<'s, S> {
    pub fn new(store: &'s S, visibility: Visibility) -> Self {
        Self {
            store,
            view: visibility.view(),
        }
    }

    /// Pager over published posts only.
    pub fn published(store: &'s S) -> Self {
        Self::new(store, Visibility::Published)
    }

    /// Returns the page at `cursor`, rendering only the selected post.
    pub fn page(&self, scope: &mut RenderScope<'_>, cursor: &Cursor) -> PostResult<PageResult> {
        let selection = match cursor {
            Cursor::Start => self.first()?,
            Cursor::Forward(start_key) => self.after(start_key)?,
            Cursor::Backward(end_key) => self.before(end_key)?,
        };

        let result = match selection {
            Selection::Row(row) => {
                let key = row.key.clone();
                let post = scope.render_post(decode_row(row)?);
                PageResult::Page { key, post }
            }
            Selection::End => PageResult::End,
            Selection::Start => PageResult::Start,
        };

        debug!(
            "event=page module=pagination status=ok view={} cursor={} outcome={}",
            self.view,
            cursor_kind(cursor),
            outcome_kind(&result)
        );
        Ok(result)
    }

    fn first(&self) -> PostResult<Selection> {
        let rows = self
            .store
            .range_scan(&RangeScan::new(self.view).limit(PEEK_ROWS))?;

        // A lone row is returned as-is; with two, the second only proves a
        // next page exists.
        Ok(rows.into_iter().next().map_or(Selection::End, Selection::Row))
    }

    fn after(&self, start_key: &ViewKey) -> PostResult<Selection> {
        let rows = self.store.range_scan(
            &RangeScan::new(self.view)
                .start_key(start_key.clone())
                .limit(PEEK_ROWS),
        )?;

        let mut rows = rows.into_iter().peekable();
        if rows
            .peek()
            .is_some_and(|row| collate(&row.key, start_key) == Ordering::Equal)
        {
            // The anchor is the page the caller is already showing.
            rows.next();
        }
        Ok(rows.next().map_or(Selection::End, Selection::Row))
    }

    fn before(&self, end_key: &ViewKey) -> PostResult<Selection> {
        // The last two rows at or before `end_key`, back in forward order.
        let mut window = self.store.range_scan(
            &RangeScan::new(self.view)
                .descending()
                .start_key(end_key.clone())
                .limit(PEEK_ROWS),
        )?;
        window.reverse();

        let anchor_present = window
            .last()
            .is_some_and(|row| collate(&row.key, end_key) == Ordering::Equal);
        if !anchor_present {
            // The anchor is gone; the nearest earlier row is the previous page.
            return Ok(window.pop().map_or(Selection::Start, Selection::Row));
        }

        if window.len() < 2 {
            return Ok(Selection::Start);
        }
        Ok(Selection::Row(window.swap_remove(0)))
    }
}

fn cursor_kind(cursor: &Cursor) -> &'static str {
    match cursor {
        Cursor::Start => "start",
        Cursor::Forward(_) => "forward",
        Cursor::Backward(_) => "backward",
    }
}

fn outcome_kind(result: &PageResult) -> &'static str {
    match result {
        PageResult::Page { .. } => "page",
        PageResult::End => "end",
        PageResult::Start => "start",
    }
}
