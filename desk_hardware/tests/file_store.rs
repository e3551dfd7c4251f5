use std::fs;

use desk_hardware::{FilePositionStore, MemoryStore};
use desk_traits::PositionStore;
use rstest::rstest;

#[test]
fn missing_file_loads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FilePositionStore::new(dir.path().join("position.txt"));
    assert_eq!(store.load_position().unwrap(), None);
}

#[test]
fn stored_value_survives_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("position.txt");

    let mut store = FilePositionStore::new(&path);
    store.store_position(1234).unwrap();
    store.store_position(-7).unwrap();

    let mut reopened = FilePositionStore::new(&path);
    assert_eq!(reopened.load_position().unwrap(), Some(-7));
    assert_eq!(fs::read_to_string(&path).unwrap(), "-7");
}

#[test]
fn no_temp_file_is_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FilePositionStore::new(dir.path().join("position.txt"));
    store.store_position(42).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["position.txt".to_string()]);
}

#[rstest]
#[case("")]
#[case("12a")]
#[case("99999999999999")]
#[case("\u{0}\u{0}")]
fn torn_or_garbled_content_loads_as_absent(#[case] content: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("position.txt");
    fs::write(&path, content).unwrap();

    let mut store = FilePositionStore::new(&path);
    assert_eq!(store.load_position().unwrap(), None);
}

#[test]
fn surrounding_whitespace_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("position.txt");
    fs::write(&path, " 900\n").unwrap();

    let mut store = FilePositionStore::new(&path);
    assert_eq!(store.load_position().unwrap(), Some(900));
}

#[test]
fn memory_store_shares_state_between_clones() {
    let store = MemoryStore::with_value(5);
    let mut writer = store.clone();
    writer.store_position(10).unwrap();
    assert_eq!(store.value(), Some(10));
    assert_eq!(store.writes(), 1);

    store.set_fail_stores(true);
    assert!(writer.store_position(11).is_err());
    assert_eq!(store.value(), Some(10));

    store.set_fail_loads(true);
    assert!(writer.load_position().is_err());
}
