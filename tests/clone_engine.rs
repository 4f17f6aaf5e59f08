// tests/clone_engine.rs
//! End-to-end behaviour of clone chains, cascades and menubars.

use tearoff::config::{EngineConfig, TearoffDeletePolicy};
use tearoff::core::{
    EntryConfig, EntryType, MenuConfig, MenuError, MenuId, MenuIndex, MenuSystem, MenuType,
    WindowId,
};
use tearoff::platform::{HeadlessPlatform, PlatformCall};
use tearoff::utils::test_helpers::setup_test_logging;

fn system() -> MenuSystem {
    setup_test_logging();
    MenuSystem::headless(EngineConfig::default())
}

fn referrers(system: &MenuSystem, name: &str) -> usize {
    system
        .registry()
        .find(name)
        .map_or(0, |record| record.parent_entries().len())
}

/// `M = [Open, Sub -> S, separator, Quit]`, `S = [Item]`, both without
/// tear-off entries.
fn scenario_a() -> (MenuSystem, MenuId, MenuId, MenuId) {
    let mut system = system();
    let s = system.create_menu("S", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(s, EntryType::Command, EntryConfig::label("Item"))
        .unwrap();

    let m = system.create_menu("M", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(m, EntryType::Command, EntryConfig::label("Open"))
        .unwrap();
    system
        .add_entry(m, EntryType::Cascade, EntryConfig::cascade("Sub", "S"))
        .unwrap();
    system
        .add_entry(m, EntryType::Separator, EntryConfig::default())
        .unwrap();
    system
        .add_entry(m, EntryType::Command, EntryConfig::label("Quit"))
        .unwrap();

    let tear = system.clone_menu(m, "M.tear", MenuType::Tearoff).unwrap();
    (system, m, s, tear)
}

#[test]
fn test_clone_gets_parallel_cascade_clone() {
    let (system, m, s, tear) = scenario_a();

    let clone = system.menu(tear).unwrap();
    assert_eq!(clone.len(), 4);
    assert_eq!(clone.menu_type(), MenuType::Tearoff);
    assert_eq!(clone.master(), m);

    let cascade = system.entry_at(tear, 1).unwrap();
    assert_eq!(cascade.entry_type(), EntryType::Cascade);
    let posted = cascade.child_instance().unwrap();
    assert_ne!(posted, s, "clone must not post the master submenu");
    assert_eq!(system.menu(posted).unwrap().master(), s);
    assert_eq!(system.menu(s).unwrap().instances(), &[posted]);
    assert_eq!(system.entry_at(posted, 0).unwrap().label(), Some("Item"));

    assert_eq!(referrers(&system, "S"), 2);
    system.verify_consistency().unwrap();
}

#[test]
fn test_deleting_cascade_unhooks_every_instance() {
    let (mut system, m, s, tear) = scenario_a();
    let posted = system.entry_at(tear, 1).unwrap().child_instance().unwrap();

    system.delete_clone_entries(m, 1, 1).unwrap();

    assert_eq!(system.menu(m).unwrap().len(), 3);
    assert_eq!(system.menu(tear).unwrap().len(), 3);
    assert_eq!(referrers(&system, "S"), 0);
    assert!(!system.is_live(posted), "the clone's child clone goes with it");
    assert!(system.menu(s).unwrap().instances().is_empty());
    assert!(system.registry().contains("S"), "S itself is still live");
    system.verify_consistency().unwrap();

    system.destroy_menu(s).unwrap();
    assert!(!system.registry().contains("S"));
}

#[test]
fn test_menubar_set_and_clear_leaves_no_residue() {
    let (mut system, m, _, _) = scenario_a();
    let window = WindowId::from(".win");

    let bar = system
        .set_window_menubar(&window, None, Some("M"))
        .unwrap()
        .unwrap();
    assert_eq!(system.menu(bar).unwrap().menu_type(), MenuType::Menubar);
    assert_eq!(system.menu(bar).unwrap().parent_toplevel(), Some(&window));
    assert_eq!(system.registry().find("M").unwrap().top_levels(), &[window.clone()]);
    system.verify_consistency().unwrap();

    system.set_window_menubar(&window, Some("M"), None).unwrap();
    assert!(system.registry().find("M").unwrap().top_levels().is_empty());
    let chain_types: Vec<MenuType> = system
        .chain(m)
        .into_iter()
        .filter_map(|id| system.menu(id).map(|menu| menu.menu_type()))
        .collect();
    assert!(!chain_types.contains(&MenuType::Menubar));
    system.verify_consistency().unwrap();
}

#[test]
fn test_menubar_named_by_clone_is_recorded_on_master() {
    let (mut system, m, _, _) = scenario_a();
    let window = WindowId::from(".win");

    let bar = system
        .set_window_menubar(&window, None, Some("M.tear"))
        .unwrap()
        .unwrap();
    assert_eq!(system.menu(bar).unwrap().master(), m);
    assert_eq!(system.registry().find("M").unwrap().top_levels(), &[window.clone()]);
    assert!(system.registry().find("M.tear").unwrap().top_levels().is_empty());
    system.verify_consistency().unwrap();

    system.set_window_menubar(&window, Some("M.tear"), None).unwrap();
    assert!(!system.is_live(bar));
    assert_eq!(system.window_menubar(&window), None);
    assert!(system.registry().find("M").unwrap().top_levels().is_empty());
    system.verify_consistency().unwrap();
}

#[test]
fn test_clone_empty_and_destroy_restores_master_record() {
    let (mut system, m, _, tear) = scenario_a();
    let record_before = system.registry().find("M").cloned();
    let instances_before = system.menu(m).unwrap().instances().to_vec();

    let n1 = system.clone_menu(m, "n1", MenuType::Tearoff).unwrap();
    assert_eq!(system.menu(m).unwrap().instances(), &[tear, n1]);
    let last = system.menu(n1).unwrap().len() - 1;
    system.delete_clone_entries(n1, 0, last).unwrap();
    assert!(system.menu(n1).unwrap().is_empty());
    system.destroy_menu(n1).unwrap();

    assert_eq!(system.registry().find("M").cloned(), record_before);
    assert_eq!(system.menu(m).unwrap().instances(), instances_before.as_slice());
    assert!(!system.registry().contains("n1"));
    system.verify_consistency().unwrap();
}

#[test]
fn test_retargeting_cascade_moves_referrers() {
    let (mut system, m, s, tear) = scenario_a();
    let t = system.create_menu("T", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(t, EntryType::Command, EntryConfig::label("Other"))
        .unwrap();
    let old_posted = system.entry_at(tear, 1).unwrap().child_instance().unwrap();

    system
        .configure_clone_entries(m, 1, &EntryConfig::cascade("Sub", "T"))
        .unwrap();

    assert_eq!(referrers(&system, "S"), 0);
    assert_eq!(referrers(&system, "T"), 2);
    assert!(!system.is_live(old_posted));
    assert_eq!(system.entry_at(m, 1).unwrap().child_instance(), Some(t));

    let new_posted = system.entry_at(tear, 1).unwrap().child_instance().unwrap();
    assert_ne!(new_posted, t);
    assert_eq!(system.menu(new_posted).unwrap().master(), t);
    assert_eq!(system.entry_at(tear, 1).unwrap().cascade_target(), Some("T"));
    assert!(system.menu(s).unwrap().instances().is_empty());
    system.verify_consistency().unwrap();
}

#[test]
fn test_configuration_reaches_every_instance() {
    let (mut system, m, _, tear) = scenario_a();
    let bar = system
        .set_window_menubar(&WindowId::from(".w"), None, Some("M"))
        .unwrap()
        .unwrap();

    system
        .configure_clone_entries(m, 0, &EntryConfig::label("Open..."))
        .unwrap();
    for instance in [m, tear, bar] {
        assert_eq!(system.entry_at(instance, 0).unwrap().label(), Some("Open..."));
    }

    let index = system
        .insert_entry(tear, 2, EntryType::Command, EntryConfig::label("Save"))
        .unwrap();
    assert_eq!(index, 2);
    for instance in [m, tear, bar] {
        assert_eq!(system.menu(instance).unwrap().len(), 5);
        assert_eq!(system.entry_at(instance, 2).unwrap().label(), Some("Save"));
        assert_eq!(system.entry_at(instance, 4).unwrap().index(), 4);
    }
    system.verify_consistency().unwrap();
}

#[test]
fn test_tearoff_entry_survives_range_delete() {
    let mut system = system();
    let menu = system.create_menu(".m", MenuConfig::with_tearoff(true)).unwrap();
    for label in ["A", "B"] {
        system
            .add_entry(menu, EntryType::Command, EntryConfig::label(label))
            .unwrap();
    }
    let removed = system
        .delete_entries(menu, &MenuIndex::Number(0), Some(&MenuIndex::End))
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(system.menu(menu).unwrap().len(), 1);
    assert_eq!(system.entry_at(menu, 0).unwrap().entry_type(), EntryType::Tearoff);
}

#[test]
fn test_tearoff_delete_can_be_rejected() {
    setup_test_logging();
    let mut system = MenuSystem::headless(EngineConfig {
        tearoff_delete_policy: TearoffDeletePolicy::Reject,
        ..EngineConfig::default()
    });
    let menu = system.create_menu(".m", MenuConfig::default()).unwrap();
    assert!(matches!(
        system.delete_entries(menu, &MenuIndex::Number(0), None),
        Err(MenuError::InvalidIndex(_))
    ));
    assert_eq!(system.menu(menu).unwrap().len(), 1);
}

#[test]
fn test_cascade_to_missing_menu_binds_on_creation() {
    let mut system = system();
    let m = system.create_menu("M", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(m, EntryType::Cascade, EntryConfig::cascade("Later", "L"))
        .unwrap();
    let tear = system.clone_menu(m, "M.tear", MenuType::Tearoff).unwrap();
    assert_eq!(system.entry_at(m, 0).unwrap().child_instance(), None);
    assert_eq!(referrers(&system, "L"), 2);
    assert!(system.registry().find("L").unwrap().menu().is_none());

    let l = system.create_menu("L", MenuConfig::with_tearoff(false)).unwrap();
    assert_eq!(system.entry_at(m, 0).unwrap().child_instance(), Some(l));
    let posted = system.entry_at(tear, 0).unwrap().child_instance().unwrap();
    assert_eq!(system.menu(posted).unwrap().master(), l);
    system.verify_consistency().unwrap();
}

#[test]
fn test_destroying_submenu_clears_cascades_but_keeps_hooks() {
    let (mut system, m, s, tear) = scenario_a();
    system.destroy_menu(s).unwrap();

    assert_eq!(system.entry_at(m, 1).unwrap().child_instance(), None);
    assert_eq!(system.entry_at(tear, 1).unwrap().child_instance(), None);
    assert_eq!(referrers(&system, "S"), 2);
    system.verify_consistency().unwrap();

    let s2 = system.create_menu("S", MenuConfig::with_tearoff(false)).unwrap();
    assert_eq!(system.entry_at(m, 1).unwrap().child_instance(), Some(s2));
    assert!(system.entry_at(tear, 1).unwrap().child_instance().is_some());
    system.verify_consistency().unwrap();
}

#[test]
fn test_destroying_master_destroys_chain() {
    let (mut system, m, s, tear) = scenario_a();
    let window = WindowId::from(".w");
    system.set_window_menubar(&window, None, Some("M")).unwrap();

    system.destroy_menu(m).unwrap();
    assert!(!system.is_live(tear));
    assert!(system.window_menubar(&window).is_none());
    assert!(system.menu(s).unwrap().instances().is_empty());
    assert_eq!(referrers(&system, "S"), 0);
    assert_eq!(
        system.registry().find("M").unwrap().top_levels(),
        &[window.clone()],
        "the toplevel still asks for M"
    );
    assert!(!system.registry().contains("M.tear"));
    system.verify_consistency().unwrap();
}

#[test]
fn test_self_cascade_does_not_recurse() {
    let mut system = system();
    let m = system.create_menu("M", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(m, EntryType::Cascade, EntryConfig::cascade("Again", "M"))
        .unwrap();
    assert_eq!(system.entry_at(m, 0).unwrap().child_instance(), Some(m));

    let tear = system.clone_menu(m, "M.tear", MenuType::Tearoff).unwrap();
    assert_eq!(system.entry_at(tear, 0).unwrap().child_instance(), None);
    assert_eq!(system.menu(m).unwrap().instances(), &[tear]);
    system.verify_consistency().unwrap();
}

#[test]
fn test_mutual_cascades_clone_one_level() {
    let mut system = system();
    let a = system.create_menu("A", MenuConfig::with_tearoff(false)).unwrap();
    let b = system.create_menu("B", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(a, EntryType::Cascade, EntryConfig::cascade("To B", "B"))
        .unwrap();
    system
        .add_entry(b, EntryType::Cascade, EntryConfig::cascade("To A", "A"))
        .unwrap();

    let tear = system.clone_menu(a, "A.tear", MenuType::Tearoff).unwrap();
    let b_clone = system.entry_at(tear, 0).unwrap().child_instance().unwrap();
    assert_eq!(system.menu(b_clone).unwrap().master(), b);
    assert_eq!(system.entry_at(b_clone, 0).unwrap().child_instance(), None);
    system.verify_consistency().unwrap();
}

#[test]
fn test_failed_child_clone_rolls_back_parent_clone() {
    setup_test_logging();
    let platform = HeadlessPlatform::new().with_handle_limit(Some(3));
    let journal = platform.journal();
    let mut system = MenuSystem::new(EngineConfig::default(), Box::new(platform));
    let _s = system.create_menu("S", MenuConfig::with_tearoff(false)).unwrap();
    let m = system.create_menu("M", MenuConfig::with_tearoff(false)).unwrap();
    system
        .add_entry(m, EntryType::Cascade, EntryConfig::cascade("Sub", "S"))
        .unwrap();

    // M.tear itself gets the third handle; cloning S for it fails.
    let err = system.clone_menu(m, "M.tear", MenuType::Tearoff).unwrap_err();
    assert!(matches!(err, MenuError::NativeResourceExhausted(_)));
    assert!(system.menu_by_name("M.tear").is_none());
    assert!(!system.registry().contains("M.tear"));
    assert!(system.menu(m).unwrap().instances().is_empty());
    assert_eq!(referrers(&system, "S"), 1);
    assert_eq!(journal.borrow().live_handles.len(), 2);
    system.verify_consistency().unwrap();
}

#[test]
fn test_reentrant_post_command_destroying_menu() {
    let mut system = system();
    let m = system
        .create_menu(
            "M",
            MenuConfig {
                post_command: Some("destroy-self".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let tear = system.clone_menu(m, "M.tear", MenuType::Tearoff).unwrap();
    system.register_command("destroy-self", |system, context| {
        let master = system.master_of(context.menu).map_err(|e| e.to_string())?;
        system.destroy_menu(master).map_err(|e| e.to_string())
    });

    assert_eq!(system.post(tear), Ok(()));
    assert!(!system.is_live(tear));
    assert!(!system.is_live(m));
    assert_eq!(system.run_idle(), 0);
    assert!(system.registry().is_empty());
}

#[test]
fn test_idle_requests_are_coalesced() {
    setup_test_logging();
    let platform = HeadlessPlatform::new();
    let journal = platform.journal();
    let mut system = MenuSystem::new(EngineConfig::default(), Box::new(platform));
    let m = system.create_menu("M", MenuConfig::with_tearoff(false)).unwrap();
    for label in ["A", "B", "C"] {
        system
            .add_entry(m, EntryType::Command, EntryConfig::label(label))
            .unwrap();
    }
    system.run_idle();
    assert_eq!(journal.borrow().recompute_count("M"), 1);

    system.post(m).unwrap();
    system.post(m).unwrap();
    system.run_idle();
    assert_eq!(journal.borrow().recompute_count("M"), 2);
    let destroyed = journal
        .borrow()
        .calls
        .iter()
        .filter(|call| matches!(call, PlatformCall::Destroy(_)))
        .count();
    assert_eq!(destroyed, 0);
}

#[test]
fn test_describe_snapshot() {
    let (system, ..) = scenario_a();
    insta::assert_snapshot!(system.describe(), @r#"
    registry:
      M menu=live referrers=0 toplevels=[]
      M.tear menu=live referrers=0 toplevels=[]
      M.tear.S menu=live referrers=0 toplevels=[]
      S menu=live referrers=2 toplevels=[]
    menus:
      M (normal, master)
        0 command "Open"
        1 cascade "Sub" -> S [S]
        2 separator
        3 command "Quit"
      M.tear (tearoff, clone of M)
        0 command "Open"
        1 cascade "Sub" -> S [M.tear.S]
        2 separator
        3 command "Quit"
      M.tear.S (normal, clone of S)
        0 command "Item"
      S (normal, master)
        0 command "Item"
    "#);
}
