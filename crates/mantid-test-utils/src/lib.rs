//! Testing utilities for the Mantid data service workspace
//!
//! Shared fixtures for workspaces, groups and histories.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use mantid_ads::{AdsConfig, AnalysisDataService};
use mantid_history::{AlgorithmHistory, Direction, PropertyHistory, WorkspaceHistory};
use mantid_workspace::{DataWorkspace, Workspace, WorkspaceGroup};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Fixed instant so histories compare equal across runs
pub fn epoch_plus(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_234_567_890 + secs, 0).unwrap()
}

pub fn setup_ads() -> Arc<AnalysisDataService> {
    Arc::new(AnalysisDataService::new(AdsConfig::new()))
}

pub fn setup_strict_ads() -> Arc<AnalysisDataService> {
    Arc::new(AnalysisDataService::new(
        AdsConfig::new().with_illegal_characters(" +-*/%<>&|^~=!@()[]{},:.`$#\"'?;\\"),
    ))
}

pub fn data_workspace() -> Arc<dyn Workspace> {
    Arc::new(DataWorkspace::new(vec![1.0, 2.0, 3.0]))
}

/// Unregistered workspace that already carries `name`
pub fn named_workspace(name: &str) -> Arc<dyn Workspace> {
    let ws = data_workspace();
    ws.set_name(name);
    ws
}

pub fn group_of(members: Vec<Arc<dyn Workspace>>) -> Arc<WorkspaceGroup> {
    Arc::new(WorkspaceGroup::with_members(members))
}

pub fn anonymous_group(size: usize) -> Arc<WorkspaceGroup> {
    group_of((0..size).map(|_| data_workspace()).collect())
}

pub fn as_workspace(group: &Arc<WorkspaceGroup>) -> Arc<dyn Workspace> {
    Arc::clone(group) as Arc<dyn Workspace>
}

pub fn algorithm(name: &str, secs: i64) -> AlgorithmHistory {
    AlgorithmHistory::new(name, 1, epoch_plus(secs), 0.25)
}

pub fn algorithm_with_input(name: &str, secs: i64, input: &str) -> AlgorithmHistory {
    algorithm(name, secs)
        .with_property(PropertyHistory::new("InputWorkspace", input, "str", false, Direction::Input))
        .with_property(PropertyHistory::new("OutputWorkspace", name.to_lowercase(), "str", false, Direction::Output))
}

/// `Load`, then `Reduce` which ran `Rebin` (which ran `Sum`) and `Scale`
pub fn nested_history() -> WorkspaceHistory {
    let mut rebin = algorithm("Rebin", 2);
    rebin.add_child_history(algorithm("Sum", 3));
    let mut reduce = algorithm_with_input("Reduce", 1, "raw");
    reduce.add_child_history(rebin);
    reduce.add_child_history(algorithm("Scale", 4));

    let mut history = WorkspaceHistory::new();
    history.add_history(algorithm("Load", 0));
    history.add_history(reduce);
    history
}

pub fn names_of(workspaces: &[Arc<dyn Workspace>]) -> Vec<String> {
    workspaces.iter().map(|ws| ws.name()).collect()
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with `WARN` and above captured; returns its result and the log text
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
