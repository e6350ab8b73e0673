//! Flattened, navigable view of a workspace history
//!
//! A [`HistoryView`] starts as one item per top-level record. Unrolling an
//! item splices its children in directly after it, one level deeper; rolling
//! removes them again. Filters act on the current list only.

use crate::algorithm::AlgorithmHistory;
use crate::error::HistoryError;
use crate::workspace_history::WorkspaceHistory;
use chrono::{DateTime, Utc};

/// One entry of a [`HistoryView`]
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    history: AlgorithmHistory,
    depth: usize,
    unrolled: bool,
}

impl HistoryItem {
    fn new(history: AlgorithmHistory, depth: usize) -> Self {
        Self {
            history,
            depth,
            unrolled: false,
        }
    }

    /// Record shown by this item
    #[inline]
    #[must_use]
    pub fn algorithm_history(&self) -> &AlgorithmHistory {
        &self.history
    }

    /// Nesting depth, `0` for top-level records
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the item's children are currently spliced in
    #[inline]
    #[must_use]
    pub fn is_unrolled(&self) -> bool {
        self.unrolled
    }

    /// Number of direct children of the record
    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.history.child_count()
    }
}

/// Flattenable list of algorithm records
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    items: Vec<HistoryItem>,
}

impl HistoryView {
    /// Snapshot the top level of `history`
    #[must_use]
    pub fn new(history: &WorkspaceHistory) -> Self {
        Self {
            items: history
                .algorithm_histories()
                .map(|h| HistoryItem::new(h.clone(), 0))
                .collect(),
        }
    }

    /// Current items in display order
    #[inline]
    #[must_use]
    pub fn algorithms(&self) -> &[HistoryItem] {
        &self.items
    }

    /// Number of items currently shown
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is shown
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Show the children of item `index` directly after it
    ///
    /// Already unrolled items and items without children are left alone.
    ///
    /// # Errors
    /// [`HistoryError::OutOfRange`]
    pub fn unroll(&mut self, index: usize) -> Result<(), HistoryError> {
        self.check(index)?;
        self.unroll_at(index);
        Ok(())
    }

    /// Hide everything nested below item `index`
    ///
    /// # Errors
    /// [`HistoryError::OutOfRange`]
    pub fn roll(&mut self, index: usize) -> Result<(), HistoryError> {
        self.check(index)?;
        self.roll_at(index);
        Ok(())
    }

    /// Unroll every item, recursively
    pub fn unroll_all(&mut self) {
        let mut index = 0;
        while index < self.items.len() {
            self.unroll_at(index);
            index += 1;
        }
    }

    /// Roll every item back to the top level
    pub fn roll_all(&mut self) {
        self.items.retain(|item| item.depth == 0);
        for item in &mut self.items {
            item.unrolled = false;
        }
    }

    /// Keep only items whose start lies in `[start, end]`
    pub fn filter_between_exec_date(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.items.retain(|item| {
            let date = item.history.execution_date();
            date >= start && date <= end
        });
    }

    /// Keep only items started at or after `start`
    pub fn filter_since(&mut self, start: DateTime<Utc>) {
        self.filter_between_exec_date(start, Utc::now());
    }

    fn check(&self, index: usize) -> Result<(), HistoryError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(HistoryError::OutOfRange {
                index,
                size: self.items.len(),
            })
        }
    }

    fn unroll_at(&mut self, index: usize) {
        let item = &mut self.items[index];
        if item.unrolled || item.history.child_count() == 0 {
            return;
        }
        item.unrolled = true;
        let depth = item.depth + 1;
        let children: Vec<HistoryItem> = item
            .history
            .child_histories()
            .iter()
            .map(|child| HistoryItem::new(child.clone(), depth))
            .collect();
        self.items.splice(index + 1..index + 1, children);
    }

    fn roll_at(&mut self, index: usize) {
        let depth = self.items[index].depth;
        let end = self.items[index + 1..]
            .iter()
            .position(|item| item.depth <= depth)
            .map_or(self.items.len(), |offset| index + 1 + offset);
        self.items.drain(index + 1..end);
        self.items[index].unrolled = false;
    }
}
