//! Integration tests for the dirlog binary

mod harness;

use std::fs;

use assert_cmd::Command;
use harness::{TestTree, run_dirlog};
use predicates::prelude::*;

#[test]
fn test_default_text_to_stdout() {
    let tree = TestTree::sample();

    let (stdout, _stderr, success) = run_dirlog(tree.path(), &[]);
    assert!(success, "dirlog should succeed");
    assert!(stdout.starts_with("Directory log: "), "header: {}", stdout);
    assert!(stdout.contains("[F] file1.txt"), "should list file1.txt");
    assert!(stdout.contains("  [D] dir1/"), "dir1 at depth 1: {}", stdout);
    assert!(
        stdout.contains("    [F] file3.py"),
        "file3.py at depth 2: {}",
        stdout
    );
    assert!(
        stdout.contains("4 directories, 3 files, 0 symlinks, 0 other, 0 errors"),
        "footer: {}",
        stdout
    );
}

#[test]
fn test_summary_goes_to_stderr() {
    let tree = TestTree::sample();

    let (stdout, stderr, success) = run_dirlog(tree.path(), &["-f", "json"]);
    assert!(success);
    assert!(stderr.contains("dirlog: 4 directories, 3 files, 0 errors"));
    assert!(stderr.contains("entries/s) -> "), "throughput: {}", stderr);
    assert!(!stdout.contains("dirlog:"), "stdout is only the log");
}

#[test]
fn test_json_logfile_parses() {
    let tree = TestTree::sample();
    let out = tree.path().join("log.json");

    let (_stdout, _stderr, success) =
        run_dirlog(tree.path(), &["dir1", out.to_str().unwrap(), "--format", "json"]);
    assert!(success);

    let doc = dirlog::parse_json(fs::File::open(&out).unwrap()).expect("valid JSON log");
    let paths: Vec<&str> = doc.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec![".", "file2.txt", "file3.py", "subdir1"]);
    assert_eq!(doc.summary.files, 2);
    assert!(doc.root.ends_with("dir1"), "root: {}", doc.root);
}

#[test]
fn test_csv_header_and_rows() {
    let tree = TestTree::sample();

    let (stdout, _stderr, success) = run_dirlog(tree.path(), &["-f", "csv"]);
    assert!(success);
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("path,name,kind,size_bytes,modified_time,created_time,depth,extension,error")
    );
    assert_eq!(lines.count(), 7, "one row per entry");
    assert!(stdout.contains("dir1/file3.py,file3.py,file,20,"));
}

#[test]
fn test_xml_output() {
    let tree = TestTree::sample();

    let (stdout, _stderr, success) = run_dirlog(tree.path(), &["-f", "xml"]);
    assert!(success);
    assert!(stdout.starts_with("<?xml"), "declaration: {}", stdout);
    assert!(stdout.contains("<directory_log"));
    assert!(stdout.contains("path=\"dir1/file2.txt\""));
    assert!(stdout.trim_end().ends_with("</directory_log>"));
}

#[test]
fn test_extension_filter() {
    let tree = TestTree::sample();

    let (stdout, _stderr, success) = run_dirlog(tree.path(), &["-e", ".py"]);
    assert!(success);
    assert!(stdout.contains("file3.py"));
    assert!(!stdout.contains("file1.txt"), "txt filtered: {}", stdout);
    assert!(!stdout.contains("[D] dir1/"), "non-matching directories hidden");
    assert!(stdout.contains("    [F] file3.py"), "still descended: {}", stdout);
    assert!(stdout.contains("5 entries skipped by filter"), "{}", stdout);
}

#[test]
fn test_max_depth() {
    let tree = TestTree::sample();

    let (stdout, _stderr, success) = run_dirlog(tree.path(), &["-L", "1"]);
    assert!(success);
    assert!(stdout.contains("[D] dir1/"));
    assert!(stdout.contains("[F] file1.txt"));
    assert!(!stdout.contains("file2.txt"), "depth 2 pruned: {}", stdout);
    assert!(!stdout.contains("subdir1"));
}

#[test]
fn test_files_only_without_root() {
    let tree = TestTree::sample();

    let (stdout, _stderr, success) =
        run_dirlog(tree.path(), &["--files-only", "--no-root", "-f", "csv"]);
    assert!(success);
    let rows: Vec<&str> = stdout.lines().skip(1).collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.contains(",file,")), "{:?}", rows);
}

#[test]
fn test_console_echoes_logfile() {
    let tree = TestTree::sample();
    let out = tree.path().join("tree.txt");

    let (stdout, _stderr, success) =
        run_dirlog(tree.path(), &[".", out.to_str().unwrap(), "--console"]);
    assert!(success);
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(stdout, written);
}

#[test]
fn test_save_then_load_config() {
    let tree = TestTree::sample();
    let config = tree.path().join("settings.json");

    let (_stdout, _stderr, success) = run_dirlog(
        tree.path(),
        &["-f", "csv", "-e", "txt", "--save-config", config.to_str().unwrap()],
    );
    assert!(success);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&config).unwrap()).unwrap();
    assert_eq!(saved["output_format"], "csv");
    assert_eq!(saved["extension_filter"], "txt");

    let (stdout, _stderr, success) =
        run_dirlog(tree.path(), &["--config", config.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.starts_with("path,name,kind"), "csv from config");
    assert!(stdout.contains("file2.txt"));
    assert!(!stdout.contains("file3.py"));
}

#[test]
fn test_flag_overrides_config() {
    let tree = TestTree::sample();
    let config = tree.add_file("settings.json", r#"{"output_format": "xml"}"#);

    let (stdout, _stderr, success) = run_dirlog(
        tree.path(),
        &["--config", config.to_str().unwrap(), "--format", "json"],
    );
    assert!(success);
    assert!(stdout.starts_with('{'), "json wins: {}", stdout);
}

#[test]
fn test_missing_root_fails() {
    let tree = TestTree::new();

    Command::cargo_bin("dirlog")
        .unwrap()
        .current_dir(tree.path())
        .arg("does-not-exist")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no such file or directory"));
}

#[test]
fn test_file_root_fails() {
    let tree = TestTree::sample();

    Command::cargo_bin("dirlog")
        .unwrap()
        .current_dir(tree.path())
        .arg("file1.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_bad_config_fails() {
    let tree = TestTree::new();
    let config = tree.add_file("broken.json", "{ not json");

    Command::cargo_bin("dirlog")
        .unwrap()
        .current_dir(tree.path())
        .args(["--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn test_invalid_entry_timeout() {
    let tree = TestTree::new();

    let (_stdout, stderr, success) = run_dirlog(tree.path(), &["--entry-timeout", "soon"]);
    assert!(!success);
    assert!(stderr.contains("invalid --entry-timeout"));
}

#[test]
fn test_sequential_and_parallel_agree() {
    let tree = TestTree::sample();
    for i in 0..40 {
        tree.add_file(&format!("bulk/d{}/f{}.dat", i % 5, i), "x");
    }

    let strip = |s: String| -> Vec<String> {
        // The generated_at timestamp differs between runs
        s.lines()
            .filter(|l| !l.contains("generated_at"))
            .map(str::to_string)
            .collect()
    };

    let (seq, _, ok1) = run_dirlog(tree.path(), &["-j", "1", "-f", "json"]);
    let (par, _, ok2) = run_dirlog(tree.path(), &["-j", "8", "-f", "json"]);
    assert!(ok1 && ok2);
    assert_eq!(strip(seq), strip(par));
}

#[test]
fn test_diagnostics_file() {
    let tree = TestTree::sample();
    let diag = tree.path().join("diag.log");

    let (_stdout, _stderr, success) = run_dirlog(
        tree.path(),
        &["dir1", "-v", "--diagnostics-file", diag.to_str().unwrap()],
    );
    assert!(success);
    let text = fs::read_to_string(&diag).unwrap();
    assert!(text.contains("traversal finished"), "diagnostics: {}", text);
}

#[test]
fn test_fatal_root_keeps_previous_log() {
    let tree = TestTree::new();
    let previous = tree.add_file("previous.log", "earlier run\n");
    let fresh = tree.path().join("fresh.log");

    let (_stdout, _stderr, success) =
        run_dirlog(tree.path(), &["missing", previous.to_str().unwrap()]);
    assert!(!success);
    assert_eq!(fs::read_to_string(&previous).unwrap(), "earlier run\n");

    let (_stdout, _stderr, success) =
        run_dirlog(tree.path(), &["missing", fresh.to_str().unwrap()]);
    assert!(!success);
    assert!(!fresh.exists(), "no empty log left behind");
}

#[test]
fn test_new_logfile_is_not_listed() {
    let tree = TestTree::sample();
    let out = tree.path().join("self.csv");

    let (_stdout, _stderr, success) =
        run_dirlog(tree.path(), &[".", out.to_str().unwrap(), "-f", "csv"]);
    assert!(success);
    let written = fs::read_to_string(&out).unwrap();
    assert!(!written.contains("self.csv"), "{}", written);
}
