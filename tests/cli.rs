//! CLI integration tests for apihub admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::{Path, PathBuf};

use apihub::store::{SqliteStore, Store};
use apihub::types::{Token, User};
use assert_cmd::Command;
use assert_fs::TempDir;
use chrono::{Duration, Utc};
use predicates::prelude::*;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn db_path(&self) -> PathBuf {
        self.data_dir().join("apihub.db")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("apihub").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn reap(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "reap-tokens", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn insert_token(&self, access_token: &str, age: Duration, ttl: i64) {
        let store = SqliteStore::new(self.db_path()).expect("open store");
        store
            .create_token(&Token {
                access_token: access_token.to_string(),
                expires: ttl,
                token_type: "Token".to_string(),
                user: User {
                    name: "Alice".to_string(),
                    email: "alice@example.org".to_string(),
                    password: String::new(),
                },
                client_id: None,
                created_at: Utc::now() - age,
            })
            .expect("create token");
    }
}

#[test]
fn test_init_creates_database() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Initialized database"));

    assert!(ctx.db_path().exists());
}

#[test]
fn test_init_is_idempotent() {
    let ctx = TestContext::new();

    ctx.init().success();
    ctx.init().success();
}

#[test]
fn test_init_creates_missing_data_dir() {
    let ctx = TestContext::new();
    let nested = ctx.data_dir().join("nested").join("data");

    ctx.cmd()
        .args(["admin", "init", "--data-dir", &nested.to_string_lossy()])
        .assert()
        .success();

    assert!(nested.join("apihub.db").exists());
}

#[test]
fn test_reap_tokens_requires_init() {
    let ctx = TestContext::new();

    ctx.reap()
        .failure()
        .stderr(predicate::str::contains("apihub admin init"));
}

#[test]
fn test_reap_tokens_removes_only_expired() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.insert_token("stale", Duration::hours(2), 60);
    ctx.insert_token("fresh", Duration::zero(), 3600);

    ctx.reap()
        .success()
        .stdout(predicate::str::contains("Removed 1 expired token(s)"));

    let store = SqliteStore::new(ctx.db_path()).expect("open store");
    assert!(store.find_token("fresh").is_ok());
    assert!(store.delete_token("stale").is_err());
}

#[test]
fn test_reap_tokens_with_nothing_to_remove() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.reap()
        .success()
        .stdout(predicate::str::contains("Removed 0 expired token(s)"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("apihub admin init"));
}

#[test]
fn test_serve_rejects_invalid_ttl() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "serve",
            "--data-dir",
            &ctx.data_dir_str(),
            "--token-ttl",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token_ttl_seconds"));
}

#[test]
fn test_serve_rejects_oversized_ttl() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "serve",
            "--data-dir",
            &ctx.data_dir_str(),
            "--token-ttl",
            "10000000000000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token_ttl_seconds is too large"));
}
