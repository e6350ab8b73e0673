//! Ordered provenance of one workspace
//!
//! Provides [`WorkspaceHistory`]: the algorithm records that produced a
//! workspace, kept ordered by `(execution start, execution index)`, together
//! with the environment captured when the history was created.
//!
//! # Persistence
//!
//! [`WorkspaceHistory::save_nexus`] writes a `process` group:
//!
//! ```text
//! process (NXprocess)
//! ├── MantidEnvironment (NXnote): author[@date], description, data
//! ├── MantidAlgorithm_0 (NXnote): author[@date], description, data
//! │   └── MantidAlgorithm_1 (NXnote)   child of _0
//! └── MantidAlgorithm_2 (NXnote)
//! ```
//!
//! Loading never fails: a missing `process` group or an unreadable entry is
//! logged and skipped so the rest of the workspace can still be loaded.

use crate::algorithm::{AlgorithmHistory, HistoryKey};
use crate::codec::{HistoryRecordCodec, LegacyTextCodec};
use crate::environment::EnvironmentHistory;
use crate::error::HistoryError;
use crate::nexus::NexusGroup;
use crate::replay::{AlgorithmFactory, ReplayableAlgorithm};
use crate::view::HistoryView;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Name of the group holding the history
pub const PROCESS_GROUP: &str = "process";
/// Name of the environment entry
pub const ENVIRONMENT_ENTRY: &str = "MantidEnvironment";
/// Prefix of algorithm entries
pub const ALGORITHM_ENTRY_PREFIX: &str = "MantidAlgorithm_";

static ALGORITHM_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^MantidAlgorithm_(\d+)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Algorithm records of one workspace, in execution order
#[derive(Debug, Clone, Default)]
pub struct WorkspaceHistory {
    algorithms: BTreeMap<HistoryKey, AlgorithmHistory>,
    environment: EnvironmentHistory,
}

impl PartialEq for WorkspaceHistory {
    fn eq(&self, other: &Self) -> bool {
        self.algorithms.len() == other.algorithms.len()
            && self
                .algorithms
                .values()
                .zip(other.algorithms.values())
                .all(|(a, b)| a == b)
    }
}

impl WorkspaceHistory {
    /// Create an empty history, capturing the current environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one algorithm record
    pub fn add_history(&mut self, record: AlgorithmHistory) {
        self.algorithms.insert(record.key(), record);
    }

    /// Merge in every record of `other`
    ///
    /// The result is the union of both histories, still ordered by
    /// execution start. Execution indices are unique per process, so a
    /// record present in both is stored once.
    pub fn add_workspace_history(&mut self, other: &WorkspaceHistory) {
        for (key, record) in &other.algorithms {
            self.algorithms
                .entry(*key)
                .or_insert_with(|| record.clone());
        }
    }

    /// Forget every record
    pub fn clear_history(&mut self) {
        self.algorithms.clear();
    }

    /// Number of top-level records
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.algorithms.len()
    }

    /// Whether no algorithm has been recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Records in execution order
    pub fn algorithm_histories(&self) -> impl Iterator<Item = &AlgorithmHistory> + '_ {
        self.algorithms.values()
    }

    /// Record at `index` in execution order
    ///
    /// # Errors
    /// [`HistoryError::OutOfRange`]
    pub fn get_algorithm_history(&self, index: usize) -> Result<&AlgorithmHistory, HistoryError> {
        self.algorithms
            .values()
            .nth(index)
            .ok_or(HistoryError::OutOfRange {
                index,
                size: self.algorithms.len(),
            })
    }

    /// Most recent record
    ///
    /// # Errors
    /// [`HistoryError::Empty`]
    pub fn last_algorithm(&self) -> Result<&AlgorithmHistory, HistoryError> {
        self.algorithms
            .values()
            .next_back()
            .ok_or(HistoryError::Empty)
    }

    /// Recreate the algorithm recorded at `index`, ready to re-execute
    ///
    /// # Errors
    /// [`HistoryError::OutOfRange`] when `index >= size()`, otherwise see
    /// [`AlgorithmHistory::create_algorithm`]
    pub fn get_algorithm(
        &self,
        index: usize,
        factory: &dyn AlgorithmFactory,
    ) -> Result<Box<dyn ReplayableAlgorithm>, HistoryError> {
        self.get_algorithm_history(index)?.create_algorithm(factory)
    }

    /// Environment captured when the history was created
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &EnvironmentHistory {
        &self.environment
    }

    /// Independent, flattenable snapshot for display or script export
    #[must_use]
    pub fn create_view(&self) -> HistoryView {
        HistoryView::new(self)
    }

    /// Write the history into `parent` using the legacy text records
    pub fn save_nexus(&self, parent: &mut NexusGroup) {
        self.save_nexus_with(parent, &LegacyTextCodec);
    }

    /// Write the history into `parent` with a specific record codec
    pub fn save_nexus_with(&self, parent: &mut NexusGroup, codec: &dyn HistoryRecordCodec) {
        let process = parent.make_group(PROCESS_GROUP, "NXprocess");
        let stamp = Utc::now().to_rfc3339();

        let environment = process.make_group(ENVIRONMENT_ENTRY, "NXnote");
        environment
            .write_data("author", "mantid")
            .put_attr("date", stamp.as_str());
        environment.write_data("description", "Mantid Environment data");
        environment.write_data("data", self.environment.to_string());

        let mut counter = 0usize;
        for record in self.algorithms.values() {
            save_record(process, record, &mut counter, &stamp, codec);
        }
        tracing::debug!(entries = counter, "workspace history saved");
    }

    /// Load history from `parent` using the legacy text records
    ///
    /// Loaded records are added to any already present.
    pub fn load_nexus(&mut self, parent: &NexusGroup) {
        self.load_nexus_with(parent, &LegacyTextCodec);
    }

    /// Load history from `parent` with a specific record codec
    pub fn load_nexus_with(&mut self, parent: &NexusGroup, codec: &dyn HistoryRecordCodec) {
        let Some(process) = parent.open_group(PROCESS_GROUP) else {
            tracing::warn!(
                "error opening the algorithm history field '{PROCESS_GROUP}'; workspace will have no history"
            );
            return;
        };
        for record in load_level(process, codec) {
            self.add_history(record);
        }
    }
}

fn save_record(
    group: &mut NexusGroup,
    record: &AlgorithmHistory,
    counter: &mut usize,
    stamp: &str,
    codec: &dyn HistoryRecordCodec,
) {
    let entry = group.make_group(format!("{ALGORITHM_ENTRY_PREFIX}{counter}"), "NXnote");
    *counter += 1;
    entry.write_data("author", "mantid").put_attr("date", stamp);
    entry.write_data("description", "Mantid Algorithm data");
    entry.write_data("data", codec.encode(record));
    for child in record.child_histories() {
        save_record(entry, child, counter, stamp, codec);
    }
}

/// Algorithm entries of `group`, ordered by their numeric suffix
fn find_history_entries(group: &NexusGroup) -> Vec<(u64, &str)> {
    let mut entries: Vec<(u64, &str)> = group
        .groups
        .keys()
        .filter_map(|name| {
            let number = ALGORITHM_ENTRY.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.as_str()))
        })
        .collect();
    entries.sort_unstable_by_key(|(number, _)| *number);
    entries
}

/// Parse every algorithm entry of `group`, attaching nested entries as children
fn load_level(group: &NexusGroup, codec: &dyn HistoryRecordCodec) -> Vec<AlgorithmHistory> {
    let mut records = Vec::new();
    for (_, name) in find_history_entries(group) {
        let Some(entry) = group.open_group(name) else {
            continue;
        };
        let Some(raw) = entry.read_data("data") else {
            tracing::warn!(entry = name, "algorithm history entry has no data field; skipping");
            continue;
        };
        match codec.decode(raw) {
            Ok(mut record) => {
                for child in load_level(entry, codec) {
                    record.add_child_history(child);
                }
                records.push(record);
            }
            Err(e) => {
                tracing::warn!(entry = name, error = %e, "skipping malformed algorithm history entry");
            }
        }
    }
    records
}

impl Display for WorkspaceHistory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.environment)?;
        for record in self.algorithms.values() {
            writeln!(f)?;
            write!(f, "{record}")?;
        }
        Ok(())
    }
}
