//! Test harness for dirlog integration tests

use std::path::Path;
use std::process::Command;

pub use dirlog::test_utils::TestTree;

pub fn run_dirlog(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_dirlog");
    let output = Command::new(binary)
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run dirlog");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_creates_temp_dir() {
        let tree = TestTree::new();
        assert!(tree.path().exists());
    }

    #[test]
    fn test_harness_sample_layout() {
        let tree = TestTree::sample();
        assert!(tree.path().join("file1.txt").is_file());
        assert!(tree.path().join("dir1/file3.py").is_file());
        assert!(tree.path().join("dir1/subdir1").is_dir());
        assert!(tree.path().join("dir2").is_dir());
    }

    #[test]
    fn test_harness_add_file() {
        let tree = TestTree::new();
        let file_path = tree.add_file("a/b/c.txt", "c");
        assert!(file_path.exists());
    }
}
