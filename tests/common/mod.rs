//! Shared test infrastructure for integration tests.
//!
//! Every test runs the `rama` binary against a local JSON workbook in a
//! temporary directory, with a cleared environment and no network.

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A port nothing listens on, so portal calls fail fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

pub struct RamaFixture {
    pub dir: TempDir,
    env: Vec<(String, String)>,
}

impl RamaFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fixture = Self {
            dir,
            env: Vec::new(),
        };
        let lock = fixture.lock_path();
        let history = fixture.history_path();
        fixture
            .set("RAMA_LOCK_PATH", lock.display().to_string())
            .set("RAMA_HISTORY_PATH", history.display().to_string())
            .set("RAMA_API_BASE_URL", UNREACHABLE_URL)
            .set("RAMA_LEGACY_URL", UNREACHABLE_URL)
            .set("RAMA_FETCH_TIMEOUT_SECS", "5")
            .set("RAMA_LOG", "warn");
        fixture
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.dir.path().join("workbook.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.path().join("procesos.lock")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.path().join("history.jsonl")
    }

    /// Write a workbook holding `cases` (header first) as the Procesos tab.
    pub fn with_cases(&mut self, cases: &[&[&str]]) -> &mut Self {
        let book = json!({ "tabs": { "Procesos": cases } });
        fs::write(
            self.workbook_path(),
            serde_json::to_string_pretty(&book).expect("serialize workbook"),
        )
        .expect("write workbook");
        let path = self.workbook_path();
        self.set("RAMA_WORKBOOK_PATH", path.display().to_string())
    }

    pub fn with_mail(&mut self) -> &mut Self {
        self.set("SMTP_SERVER", "127.0.0.1")
            .set("SMTP_PORT", "9")
            .set("SMTP_USERNAME", "robot@example.org")
            .set("SMTP_PASSWORD", "secret")
            .set("EMAIL_RECIPIENT", "abogada@example.org")
    }

    pub fn workbook(&self) -> Value {
        let text = fs::read_to_string(self.workbook_path()).expect("read workbook");
        serde_json::from_str(&text).expect("parse workbook")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_rama"))
            .args(args)
            .current_dir(self.dir.path())
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .expect("spawn rama")
    }
}

impl Default for RamaFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

pub fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
