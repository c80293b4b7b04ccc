use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn rfseek() -> Command {
    let mut cmd = Command::cargo_bin("rfseek").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn sample_tree(root: &Path) {
    fs::write(root.join("file1.txt"), "pattern\nHashMap in this file\nsome other line\n").unwrap();
    fs::write(root.join("file2.dat"), "file1\npattern\n").unwrap();
    fs::create_dir_all(root.join("subdir")).unwrap();
    fs::write(root.join("subdir/nested.txt"), "nested content\n").unwrap();
    fs::write(root.join("binary.bin"), b"pattern\x00\x01\x02").unwrap();
}

#[test]
fn search_prints_matching_files() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    rfseek()
        .arg("search")
        .arg("pattern")
        .arg(dir.path())
        .arg("--skip-binary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files:"))
        .stdout(predicate::str::contains("file1.txt"))
        .stdout(predicate::str::contains("file2.dat"))
        .stdout(predicate::str::contains("binary.bin").not())
        .stdout(predicate::str::contains("Occurrences: 2 total, at most 1 in one file"))
        .stderr(predicate::str::contains("2 results, 2 occurrences"));
}

#[test]
fn search_without_matches() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    rfseek()
        .args(["search", "absent-token"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No matches found"));
}

#[test]
fn inverted_recursive_search() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    rfseek()
        .args(["search", "pattern", "-r", "-v"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("nested.txt"))
        .stdout(predicate::str::contains("file1.txt").not());
}

#[test]
fn json_output_is_parseable() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());

    let output = rfseek()
        .args(["search", "hashmap", "-o", "json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_results"], 1);
    assert_eq!(value["results"][0]["name"], "file1.txt");
    assert_eq!(value["results"][0]["content"]["lines"][0], 2);
    assert_eq!(value["statistics"]["processed_files"], 3);
    assert_eq!(value["summary"]["total_occurrences"], 1);
    assert_eq!(value["summary"]["files_found"], 1);
    assert!(value["timing"]["elapsed"].is_string());
}

#[test]
fn export_then_rescan() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    sample_tree(&data);
    let csv = dir.path().join("results.csv");

    rfseek()
        .args(["search", "pattern", "--skip-binary", "--export"])
        .arg(&csv)
        .arg(&data)
        .assert()
        .success();
    let exported = fs::read_to_string(&csv).unwrap();
    assert!(exported.starts_with("\"√\";\"File\";\"Path\""));
    assert_eq!(exported.lines().count(), 3);

    fs::write(data.join("file2.dat"), "no longer\n").unwrap();
    rfseek()
        .arg("rescan")
        .arg(&csv)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 removed"));

    let rescanned = fs::read_to_string(&csv).unwrap();
    assert_eq!(rescanned.lines().count(), 2);
    assert!(rescanned.contains("file1.txt"));
}

#[test]
fn rescan_rejects_foreign_csv() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("other.csv");
    fs::write(&csv, "a;b;c\n1;2;3\n").unwrap();

    rfseek()
        .arg("rescan")
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected header"));
}

#[test]
fn invalid_regex_fails() {
    let dir = tempdir().unwrap();

    rfseek()
        .args(["search", "(unclosed", "--syntax", "regex"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Regex"));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = tempdir().unwrap();
    sample_tree(dir.path());
    let config = dir.path().join("rfseek.toml");
    fs::write(&config, "[search]\nrecursive = true\n\n[display]\noutput_format = \"csv\"\n").unwrap();

    rfseek()
        .arg("--config")
        .arg(&config)
        .args(["search", "nested"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("\"√\""))
        .stdout(predicate::str::contains("nested.txt"));
}

#[test]
fn hash_of_empty_file() {
    let dir = tempdir().unwrap();
    let empty = dir.path().join("empty");
    fs::write(&empty, "").unwrap();

    rfseek()
        .arg("hash")
        .arg(&empty)
        .args(["--variant", "x86_32", "--sha256"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("00000000  "))
        .stdout(predicate::str::contains(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        ));
}

#[test]
fn completions_are_generated() {
    rfseek()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rfseek"));
}
