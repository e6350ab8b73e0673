//! Group cascading through the Analysis Data Service

use mantid_ads::{AdsError, ErrorKind, NotificationKind};
use mantid_test_utils::*;
use mantid_workspace::{same_workspace, Workspace};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn group_updates(ads: &mantid_ads::AnalysisDataService) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    ads.notification_center()
        .subscribe(NotificationKind::GroupUpdated, move |n| {
            if let Some(name) = n.object_name() {
                sink.lock().unwrap().push(name.to_string());
            }
        });
    seen
}

#[test]
fn anonymous_members_get_generated_names() {
    let ads = setup_ads();
    let group = anonymous_group(2);
    ads.add("G", as_workspace(&group)).unwrap();

    let members = group.members();
    assert!(same_workspace(&*ads.retrieve("G_1").unwrap(), &*members[0]));
    assert!(same_workspace(&*ads.retrieve("G_2").unwrap(), &*members[1]));
    assert_eq!(group.names(), vec!["G_1", "G_2"]);
    assert!(group.is_observing_ads());
}

#[test]
fn nested_groups_are_mirrored_recursively() {
    let ads = setup_ads();
    let inner = group_of(vec![named_workspace("deep")]);
    let outer = group_of(vec![as_workspace(&inner), data_workspace()]);
    ads.add("outer", as_workspace(&outer)).unwrap();

    assert!(ads.does_exist("outer_1"));
    assert!(ads.does_exist("outer_2"));
    assert!(ads.does_exist("deep"));
    assert!(inner.is_observing_ads());
}

#[test]
fn already_registered_members_are_not_re_added() {
    let ads = setup_ads();
    let existing = data_workspace();
    ads.add("existing", Arc::clone(&existing)).unwrap();

    let group = group_of(vec![Arc::clone(&existing), data_workspace()]);
    ads.add("G", as_workspace(&group)).unwrap();
    assert_eq!(ads.size(), 3);
    assert!(same_workspace(&*ads.retrieve("existing").unwrap(), &*existing));
}

#[test]
fn member_collision_is_skipped_but_group_stays() {
    let ads = setup_ads();
    let squatter = data_workspace();
    ads.add("G_1", Arc::clone(&squatter)).unwrap();

    let group = anonymous_group(2);
    ads.add("G", as_workspace(&group)).unwrap();

    assert!(ads.does_exist("G"));
    assert!(ads.does_exist("G_2"));
    assert!(same_workspace(&*ads.retrieve("G_1").unwrap(), &*squatter));
    assert_eq!(group.size(), 2);
}

#[test]
fn add_or_replace_overwrites_generated_member_names() {
    let ads = setup_ads();
    ads.add("G_1", data_workspace()).unwrap();

    let group = anonymous_group(1);
    ads.add_or_replace("G", as_workspace(&group)).unwrap();
    assert!(same_workspace(&*ads.retrieve("G_1").unwrap(), &*group.members()[0]));
}

#[test]
fn group_cannot_take_the_name_of_a_descendant() {
    let ads = setup_ads();
    let inner = group_of(vec![named_workspace("X")]);
    let group = group_of(vec![as_workspace(&inner)]);

    let err = ads.add("X", as_workspace(&group)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.to_string(), "Unable to add group as name matches its members");
    assert!(!ads.does_exist("X"));
    assert!(ads.add_or_replace("X", as_workspace(&group)).is_err());

    ads.add("G", as_workspace(&group)).unwrap();
    let err = ads.rename("G", "X").unwrap_err();
    assert!(matches!(err, AdsError::RenameMatchesMember));
    assert!(ads.does_exist("G"));
}

#[test]
fn deep_remove_clears_group_and_members() {
    let ads = setup_ads();
    let inner = anonymous_group(2);
    let group = group_of(vec![data_workspace(), as_workspace(&inner), data_workspace()]);
    ads.add("G", as_workspace(&group)).unwrap();
    ads.add("bystander", data_workspace()).unwrap();
    assert_eq!(ads.size(), 7);

    ads.deep_remove_group("G").unwrap();
    assert_eq!(ads.object_names(Default::default(), Default::default()), vec!["bystander"]);
    assert!(!group.is_observing_ads());
    assert!(!inner.is_observing_ads());
}

#[test]
fn deep_remove_handles_shared_members_once() {
    let ads = setup_ads();
    let shared = named_workspace("shared");
    let left = group_of(vec![Arc::clone(&shared)]);
    let right = group_of(vec![Arc::clone(&shared)]);
    let both = group_of(vec![as_workspace(&left), as_workspace(&right)]);
    ads.add("both", as_workspace(&both)).unwrap();

    ads.deep_remove_group("both").unwrap();
    assert_eq!(ads.size(), 0);
    assert_eq!(shared.name(), "");
}

#[test]
fn deep_remove_requires_a_group() {
    let ads = setup_ads();
    ads.add("plain", data_workspace()).unwrap();
    let err = ads.deep_remove_group("plain").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(err.to_string(), "Workspace plain is not a workspace group.");
}

#[test]
fn plain_remove_leaves_members_registered() {
    let ads = setup_ads();
    ads.add("G", as_workspace(&anonymous_group(2))).unwrap();
    ads.remove("G");
    assert!(ads.does_exist("G_1"));
    assert!(ads.does_exist("G_2"));
}

#[test]
fn removing_a_member_from_the_registry_drops_it_from_the_group() {
    let ads = setup_ads();
    let group = anonymous_group(2);
    ads.add("G", as_workspace(&group)).unwrap();

    ads.remove("G_1");
    assert_eq!(group.names(), vec!["G_2"]);
}

#[test]
fn replacing_a_member_updates_the_group() {
    let ads = setup_ads();
    let updates = group_updates(&ads);
    let group = anonymous_group(2);
    ads.add("G", as_workspace(&group)).unwrap();

    let replacement = data_workspace();
    ads.add_or_replace("G_2", Arc::clone(&replacement)).unwrap();
    assert!(same_workspace(&*group.get_item(1).unwrap(), &*replacement));
    assert_eq!(*updates.lock().unwrap(), vec!["G"]);
}

#[test]
fn add_and_remove_from_group_post_updates() {
    let ads = setup_ads();
    let updates = group_updates(&ads);
    ads.add("G", as_workspace(&anonymous_group(1))).unwrap();
    ads.add("extra", data_workspace()).unwrap();

    ads.add_to_group("G", "extra").unwrap();
    assert_eq!(ads.retrieve_group("G").unwrap().names(), vec!["G_1", "extra"]);

    ads.remove_from_group("G", "G_1").unwrap();
    assert_eq!(ads.retrieve_group("G").unwrap().names(), vec!["extra"]);
    assert!(ads.does_exist("G_1"));

    assert_eq!(*updates.lock().unwrap(), vec!["G", "G"]);
}

#[test]
fn group_editing_errors() {
    let ads = setup_ads();
    ads.add("G", as_workspace(&anonymous_group(1))).unwrap();
    ads.add("plain", data_workspace()).unwrap();

    let err = ads.add_to_group("G", "G").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = ads.add_to_group("plain", "G").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);

    let err = ads.add_to_group("G", "nothing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = ads.remove_from_group("G", "plain").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(err.to_string(), "WorkspaceGroup G does not contain workspace plain");
}

#[test]
fn nested_cycle_through_add_to_group_is_rejected() {
    let ads = setup_ads();
    let inner = anonymous_group(0);
    let outer = group_of(vec![as_workspace(&inner)]);
    ads.add("outer", as_workspace(&outer)).unwrap();
    assert_eq!(inner.name(), "outer_1");

    let err = ads.add_to_group("outer_1", "outer").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn sort_group_by_name_reorders_and_notifies() {
    let ads = setup_ads();
    let updates = group_updates(&ads);
    let group = group_of(vec![named_workspace("b"), named_workspace("c"), named_workspace("a")]);
    ads.add("G", as_workspace(&group)).unwrap();

    ads.sort_group_by_name("G").unwrap();
    assert_eq!(group.names(), vec!["a", "b", "c"]);
    assert_eq!(updates.lock().unwrap().len(), 1);
    assert!(ads.sort_group_by_name("a").is_err());
}

#[test]
fn retrieve_workspaces_unrolls_groups_in_place() {
    let ads = setup_ads();
    let a = named_workspace("A");
    let b = named_workspace("B");
    let c = named_workspace("C");
    let inner = group_of(vec![Arc::clone(&b), Arc::clone(&c)]);
    ads.add("G", as_workspace(&group_of(vec![Arc::clone(&a), as_workspace(&inner)])))
        .unwrap();
    ads.add("D", data_workspace()).unwrap();

    let flat = ads.retrieve_workspaces(&["G", "D"], true).unwrap();
    assert_eq!(names_of(&flat), vec!["A", "B", "C", "D"]);

    let kept = ads.retrieve_workspaces(&["G"], false).unwrap();
    assert_eq!(names_of(&kept), vec!["G"]);

    let err = ads.retrieve_workspaces(&["D", "missing", "G"], true).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn top_level_items_hide_group_members() {
    let ads = setup_ads();
    ads.add("loose", data_workspace()).unwrap();
    let inner = anonymous_group(1);
    ads.add("G", as_workspace(&group_of(vec![as_workspace(&inner)]))).unwrap();

    let top: Vec<String> = ads.top_level_items().into_keys().collect();
    assert_eq!(top, vec!["G", "loose"]);
    assert!(ads.does_exist("G_1"));
    assert!(ads.does_exist("G_1_1"));
    let member: Arc<dyn Workspace> = ads.retrieve("G_1_1").unwrap();
    assert!(ads.retrieve_group("G").unwrap().is_in_child_group(&*member));
}
