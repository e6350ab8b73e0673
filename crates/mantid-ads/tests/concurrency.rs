//! Parallel use of one data service and unique name generation

use mantid_ads::{HiddenFilter, NameOrder};
use mantid_test_utils::*;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn unique_hidden_names_never_collide() {
    let ads = setup_ads();
    for _ in 0..1000 {
        let name = ads.unique_hidden_name().unwrap();
        assert!(name.starts_with("__"));
        assert_eq!(name.len(), 11);
        ads.add(&name, data_workspace()).unwrap();
    }
    assert_eq!(ads.size(), 1000);
    assert!(ads.object_names(NameOrder::Unsorted, HiddenFilter::Auto).is_empty());
}

#[test]
fn parallel_workers_register_without_loss() {
    let ads = setup_ads();
    (0..64).into_par_iter().for_each(|worker| {
        for step in 0..25 {
            ads.add(&format!("w{worker}_{step}"), data_workspace()).unwrap();
        }
    });
    assert_eq!(ads.size(), 64 * 25);
}

#[test]
fn parallel_group_registration_is_never_half_visible() {
    let ads = setup_ads();
    let incomplete = Arc::new(AtomicUsize::new(0));

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..200 {
                ads.add(&format!("g{i}"), as_workspace(&anonymous_group(3))).unwrap();
            }
        });
        scope.spawn(|| {
            for i in 0..200 {
                if ads.does_exist(&format!("g{i}")) && !ads.does_exist(&format!("g{i}_3")) {
                    incomplete.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
    });

    assert_eq!(incomplete.load(Ordering::SeqCst), 0);
    assert_eq!(ads.size(), 200 * 4);
}

#[test]
fn concurrent_rename_and_remove_keep_the_map_consistent() {
    let ads = setup_ads();
    for i in 0..100 {
        ads.add(&format!("ws{i}"), data_workspace()).unwrap();
    }

    (0..100).into_par_iter().for_each(|i| {
        if i % 2 == 0 {
            ads.rename(&format!("ws{i}"), &format!("renamed{i}")).unwrap();
        } else {
            ads.remove(&format!("ws{i}"));
        }
    });

    let names = ads.object_names(NameOrder::Sorted, HiddenFilter::Auto);
    assert_eq!(names.len(), 50);
    assert!(names.iter().all(|n| n.starts_with("renamed")));
    for name in names {
        assert_eq!(ads.retrieve(&name).unwrap().name(), name);
    }
}
