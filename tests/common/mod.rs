// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use fitbit_to_kml::config::Config;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::{env, fs};

static NEXT_DIR_ID: AtomicU32 = AtomicU32::new(0);

/// Scratch directory removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    #[allow(dead_code)]
    pub fn new(prefix: &str) -> Self {
        let id = NEXT_DIR_ID.fetch_add(1, Ordering::SeqCst);
        let path = env::temp_dir().join(format!(
            "fitbit-to-kml-{prefix}-{}-{id}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[allow(dead_code)]
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Config with OAuth credentials filled in.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        client_id: Some("test-client-id".to_string()),
        client_secret: Some("test-client-secret".to_string()),
        token_file: PathBuf::from("tokens.json"),
    }
}

/// Write a token document into `dir` and return its path.
#[allow(dead_code)]
pub fn write_token_json(dir: &TempDir, body: &Value) -> PathBuf {
    let path = dir.join("tokens.json");
    fs::write(&path, serde_json::to_string_pretty(body).expect("serialize token"))
        .expect("write token file");
    path
}

/// Write an arbitrary file, creating parent directories.
#[allow(dead_code)]
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}
