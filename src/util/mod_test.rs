use super::*;

#[test]
fn atomic_write_creates_parents_and_content() {
    let dir = std::env::temp_dir().join(format!("fluree-util-test-{}", rand::random::<u64>()));
    let file = dir.join("nested").join("leaf.json");
    write_file_atomic(&file, b"{}").unwrap();
    assert_eq!(fs::read(&file).unwrap(), b"{}");
    fs::remove_dir_all(&dir).ok();
}
