//! Workspace histories of registered workspaces, including persistence

use mantid_history::{NexusFile, NexusGroup, WorkspaceHistory};
use mantid_test_utils::*;
use mantid_workspace::{merge_history_from, DataWorkspace, Workspace};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn structure(history: &WorkspaceHistory) -> Vec<(String, i32, usize)> {
    fn walk(record: &mantid_history::AlgorithmHistory, out: &mut Vec<(String, i32, usize)>) {
        out.push((record.name().to_string(), record.version(), record.child_count()));
        for child in record.child_histories() {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    for record in history.algorithm_histories() {
        walk(record, &mut out);
    }
    out
}

#[test]
fn ordering_ignores_insertion_order() {
    let ws = data_workspace();
    ws.record_algorithm(algorithm("Later", 20));
    ws.record_algorithm(algorithm("Earlier", 10));
    let names: Vec<String> = ws
        .history()
        .algorithm_histories()
        .map(|h| h.name().to_string())
        .collect();
    assert_eq!(names, vec!["Earlier", "Later"]);
}

#[test]
fn combining_inputs_produces_a_union() {
    let ads = setup_ads();
    let lhs = data_workspace();
    let rhs = data_workspace();
    lhs.record_algorithm(algorithm("LoadLeft", 0));
    rhs.record_algorithm(algorithm("LoadRight", 1));
    ads.add("lhs", Arc::clone(&lhs)).unwrap();
    ads.add("rhs", Arc::clone(&rhs)).unwrap();

    let sum: Arc<dyn Workspace> = Arc::new(DataWorkspace::new(vec![]));
    for input in ads.retrieve_workspaces(&["lhs", "rhs"], false).unwrap() {
        merge_history_from(&*sum, &*input);
    }
    merge_history_from(&*sum, &*lhs);
    sum.record_algorithm(algorithm("Plus", 5));
    ads.add("sum", Arc::clone(&sum)).unwrap();

    let stored = ads.retrieve("sum").unwrap();
    let names: Vec<String> = stored
        .history()
        .algorithm_histories()
        .map(|h| h.name().to_string())
        .collect();
    assert_eq!(names, vec!["LoadLeft", "LoadRight", "Plus"]);
}

#[test]
fn nested_history_round_trips_through_a_file() {
    let ws: Arc<dyn Workspace> = Arc::new(DataWorkspace::with_history(vec![1.0], nested_history()));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reduced.json");

    let mut file = NexusFile::new();
    ws.history()
        .save_nexus(file.root_mut().make_group("mantid_workspace_1", "NXentry"));
    file.save(&path).unwrap();

    let reopened = NexusFile::open(&path).unwrap();
    let mut loaded = WorkspaceHistory::new();
    loaded.load_nexus(reopened.root().open_group("mantid_workspace_1").unwrap());

    assert_eq!(structure(&loaded), structure(&ws.history()));
    for (saved, restored) in ws.history().algorithm_histories().zip(loaded.algorithm_histories()) {
        assert!((saved.execution_duration() - restored.execution_duration()).abs() < 1e-9);
    }
}

#[test]
fn truncated_entry_is_dropped_on_load() {
    let mut history = WorkspaceHistory::new();
    history.add_history(algorithm("Load", 0));
    let mut entry = NexusGroup::new("NXentry");
    history.save_nexus(&mut entry);

    let process = entry.groups.get_mut("process").unwrap();
    let corrupt = process.make_group("MantidAlgorithm_1", "NXnote");
    corrupt.write_data("data", "Algorithm Load v1\nExecution Date: 2009-Feb-18 09:43:21");

    let mut loaded = WorkspaceHistory::new();
    let ((), logs) = capture_warnings(|| loaded.load_nexus(&entry));
    assert_eq!(loaded.size(), 1);
    assert!(logs.contains("WARN") && logs.contains("MantidAlgorithm_1"), "logs: {logs}");
}

#[test]
fn view_unrolls_registered_history() {
    let ads = setup_ads();
    ads.add(
        "reduced",
        Arc::new(DataWorkspace::with_history(vec![], nested_history())),
    )
    .unwrap();

    let mut view = ads.retrieve("reduced").unwrap().history().create_view();
    assert_eq!(view.size(), 2);
    view.unroll_all();
    let flat: Vec<(String, usize)> = view
        .algorithms()
        .iter()
        .map(|item| (item.algorithm_history().name().to_string(), item.depth()))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("Load".to_string(), 0),
            ("Reduce".to_string(), 0),
            ("Rebin".to_string(), 1),
            ("Sum".to_string(), 2),
            ("Scale".to_string(), 1),
        ]
    );
}
