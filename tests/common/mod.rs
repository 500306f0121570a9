#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory holding a minimal `db.json`.
    pub fn new() -> Self {
        let workspace = Self::bare();
        workspace.write("db.json", r#"{"account": "acme", "token": "test"}"#);
        workspace
    }

    /// Creates a scratch directory without any config files.
    pub fn bare() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// The binary, run from inside the workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sheetload").expect("binary exists");
        cmd.current_dir(self.path());
        cmd
    }
}
