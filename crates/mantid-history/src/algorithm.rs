//! Algorithm execution records
//!
//! Provides [`AlgorithmHistory`], the record of one successful algorithm
//! execution, including the histories of any child algorithms it ran.
//!
//! Every record receives a process-wide execution index when constructed.
//! Together with the execution start this gives a total order across all
//! records in the process, which [`WorkspaceHistory`](crate::WorkspaceHistory)
//! relies on when merging histories.

use crate::codec::{HistoryRecordCodec, LegacyTextCodec};
use crate::error::HistoryError;
use crate::property::PropertyHistory;
use crate::replay::{AlgorithmFactory, ReplayableAlgorithm};
use chrono::{DateTime, Utc};
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

static EXECUTION_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Claim the next process-wide execution index
#[inline]
#[must_use]
pub fn next_execution_index() -> usize {
    EXECUTION_COUNT.fetch_add(1, Ordering::Relaxed)
}

/// Total ordering key of a record: execution start, then execution index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryKey {
    /// When the algorithm started
    pub start: DateTime<Utc>,
    /// Process-wide execution index
    pub index: usize,
}

/// Record of one algorithm execution
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmHistory {
    name: String,
    version: i32,
    execution_date: DateTime<Utc>,
    execution_duration: f64,
    execution_index: usize,
    properties: Vec<PropertyHistory>,
    children: Vec<AlgorithmHistory>,
}

impl AlgorithmHistory {
    /// Record an execution that started at `start` and ran for `duration_secs`
    ///
    /// Negative or NaN durations are stored as zero.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: i32,
        start: DateTime<Utc>,
        duration_secs: f64,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            execution_date: start,
            execution_duration: duration_secs.max(0.0),
            execution_index: next_execution_index(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// With one more recorded property
    #[inline]
    #[must_use]
    pub fn with_property(mut self, property: PropertyHistory) -> Self {
        self.properties.push(property);
        self
    }

    /// With several recorded properties
    #[inline]
    #[must_use]
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = PropertyHistory>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Nest the history of a child algorithm run by this one
    pub fn add_child_history(&mut self, child: AlgorithmHistory) {
        self.children.push(child);
    }

    /// Algorithm name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Algorithm version
    #[inline]
    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Execution start
    #[inline]
    #[must_use]
    pub fn execution_date(&self) -> DateTime<Utc> {
        self.execution_date
    }

    /// Execution duration in seconds
    #[inline]
    #[must_use]
    pub fn execution_duration(&self) -> f64 {
        self.execution_duration
    }

    /// Process-wide execution index
    #[inline]
    #[must_use]
    pub fn execution_index(&self) -> usize {
        self.execution_index
    }

    /// Ordering key used by workspace histories
    #[inline]
    #[must_use]
    pub fn key(&self) -> HistoryKey {
        HistoryKey {
            start: self.execution_date,
            index: self.execution_index,
        }
    }

    /// Recorded properties in declaration order
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &[PropertyHistory] {
        &self.properties
    }

    /// Look up a recorded property by name
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyHistory> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Value of a recorded property
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.property(name).map(PropertyHistory::value)
    }

    /// Child algorithm histories in execution order
    #[inline]
    #[must_use]
    pub fn child_histories(&self) -> &[AlgorithmHistory] {
        &self.children
    }

    /// Number of direct children
    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Direct child at `index`
    ///
    /// # Errors
    /// [`HistoryError::OutOfRange`]
    pub fn child_algorithm_history(&self, index: usize) -> Result<&AlgorithmHistory, HistoryError> {
        self.children.get(index).ok_or(HistoryError::OutOfRange {
            index,
            size: self.children.len(),
        })
    }

    /// Create a fresh algorithm populated with the recorded values
    ///
    /// Only properties that were not left at their defaults are replayed.
    ///
    /// # Errors
    /// [`HistoryError::UnknownAlgorithm`] if the factory cannot create the
    /// algorithm, [`HistoryError::PropertyRejected`] if a value is refused
    pub fn create_algorithm(
        &self,
        factory: &dyn AlgorithmFactory,
    ) -> Result<Box<dyn ReplayableAlgorithm>, HistoryError> {
        let mut algorithm =
            factory
                .create(&self.name, self.version)
                .ok_or_else(|| HistoryError::UnknownAlgorithm {
                    name: self.name.clone(),
                    version: self.version,
                })?;

        for property in self.properties.iter().filter(|p| !p.is_default()) {
            algorithm
                .set_property_value(property.name(), property.value())
                .map_err(|reason| HistoryError::PropertyRejected {
                    algorithm: self.name.clone(),
                    property: property.name().to_string(),
                    reason,
                })?;
        }
        Ok(algorithm)
    }

    fn print_self(&self, f: &mut Formatter<'_>, indent: usize) -> fmt::Result {
        let record = LegacyTextCodec.encode(self);
        for line in record.lines() {
            writeln!(f, "{:indent$}{line}", "")?;
        }
        for child in &self.children {
            child.print_self(f, indent + 2)?;
        }
        Ok(())
    }
}

impl Display for AlgorithmHistory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.print_self(f, 0)
    }
}
