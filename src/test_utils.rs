//! Test utilities for building temporary directory trees.
//!
//! This module is only compiled with the `test-utils` feature, for
//! integration tests and benchmarks.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory tree for testing.
///
/// The tree is removed when dropped.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Create a new empty temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    /// A small mixed tree:
    ///
    /// ```text
    /// file1.txt
    /// dir1/file2.txt
    /// dir1/file3.py
    /// dir1/subdir1/
    /// dir2/
    /// ```
    pub fn sample() -> Self {
        let tree = Self::new();
        tree.add_file("file1.txt", "Test file 1");
        tree.add_file("dir1/file2.txt", "Test file 2");
        tree.add_file("dir1/file3.py", "print('Test file 3')");
        tree.add_dir("dir1/subdir1");
        tree.add_dir("dir2");
        tree
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a file, creating parent directories as needed.
    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Add an empty directory, creating parents as needed.
    pub fn add_dir(&self, path: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        fs::create_dir_all(&full_path).expect("Failed to create dir");
        full_path
    }

    /// Create a symlink at `link` pointing to `target` (taken verbatim, so
    /// relative targets resolve against the link's directory).
    #[cfg(unix)]
    pub fn add_symlink(&self, target: &str, link: &str) -> PathBuf {
        let link_path = self.dir.path().join(link);
        if let Some(parent) = link_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::os::unix::fs::symlink(target, &link_path).expect("Failed to create symlink");
        link_path
    }

    /// Remove all permissions from a directory until the guard is dropped.
    ///
    /// Returns `None` when permissions are not enforced for the current
    /// user (root), so callers can skip the test.
    #[cfg(unix)]
    pub fn lock_dir(&self, path: &str) -> Option<LockedDir> {
        use std::os::unix::fs::PermissionsExt;

        let full_path = self.dir.path().join(path);
        fs::set_permissions(&full_path, fs::Permissions::from_mode(0o000))
            .expect("Failed to lock dir");
        let guard = LockedDir { path: full_path };
        if fs::read_dir(&guard.path).is_ok() {
            return None;
        }
        Some(guard)
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores a locked directory's permissions so the tree can be removed.
#[cfg(unix)]
pub struct LockedDir {
    path: PathBuf,
}

#[cfg(unix)]
impl Drop for LockedDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o755));
    }
}
