//! Integration tests driving the `attrib` binary end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use serde_json::json;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const SEP: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Test context that sets up an isolated workspace for one attrib run
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        fs::create_dir_all(temp_dir.path().join("metadata")).expect("failed to create metadata dir");
        Self { temp_dir }
    }

    fn attrib_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_attrib");
        let mut cmd = Command::new(bin_path);
        cmd.current_dir(self.temp_dir.path());
        cmd
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a metadata document at metadata/<group>/<name>/<version>.toml
    fn write_metadata(&self, group: &str, name: &str, version: &str, doc: &str) {
        let dir = self.path().join("metadata").join(group).join(name);
        fs::create_dir_all(&dir).expect("failed to create metadata document dir");
        fs::write(dir.join(format!("{version}.toml")), doc).expect("failed to write metadata");
    }

    /// Write an artifact archive carrying bundled license data
    fn write_archive(&self, file_name: &str, index_json: &str, text: &[u8]) -> PathBuf {
        let path = self.path().join(file_name);
        let mut writer = ZipWriter::new(fs::File::create(&path).expect("failed to create archive"));
        writer
            .start_file("third_party_licenses.json", SimpleFileOptions::default())
            .expect("failed to start index entry");
        writer.write_all(index_json.as_bytes()).expect("failed to write index entry");
        writer
            .start_file("third_party_licenses.txt", SimpleFileOptions::default())
            .expect("failed to start text entry");
        writer.write_all(text).expect("failed to write text entry");
        writer.finish().expect("failed to finish archive");
        path
    }

    /// Write the dependency list and return its path
    fn write_dependencies(&self, deps: &serde_json::Value) -> PathBuf {
        let path = self.path().join("dependencies.json");
        fs::write(&path, deps.to_string()).expect("failed to write dependency list");
        path
    }

    fn run(&self, deps_path: &Path) -> std::process::Output {
        self.attrib_cmd()
            .arg("--dependencies")
            .arg(deps_path)
            .arg("--metadata-dir")
            .arg(self.path().join("metadata"))
            .arg("--out-dir")
            .arg(self.path().join("out"))
            .output()
            .expect("failed to run attrib")
    }

    fn read_outputs(&self) -> (Vec<u8>, String) {
        let blob = fs::read(self.path().join("out").join("third_party_licenses"))
            .expect("blob output missing");
        let index = fs::read_to_string(self.path().join("out").join("third_party_license_metadata"))
            .expect("index output missing");
        (blob, index)
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .attrib_cmd()
        .arg("--help")
        .output()
        .expect("failed to run attrib");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_end_to_end_run() {
    let ctx = TestContext::new();
    ctx.write_metadata(
        "com.example",
        "libfoo",
        "1.0",
        "[[licenses]]\nname = \"MIT\"\nurl = \"https://x/MIT\"\n",
    );
    let archive = ctx.write_archive(
        "play-services-base-15.0.aar",
        r#"{"A":{"start":0,"length":5}}"#,
        b"HELLOworld",
    );
    let deps = ctx.write_dependencies(&json!([
        {
            "group": "com.example",
            "name": "libfoo",
            "version": "1.0",
            "artifact": ctx.path().join("unused.aar"),
        },
        {
            "group": "com.google.android.gms",
            "name": "play-services-base",
            "version": "15.0",
            "artifact": archive,
        },
    ]));

    let output = ctx.run(&deps);
    assert!(
        output.status.success(),
        "attrib failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (blob, index) = ctx.read_outputs();
    assert_eq!(blob, format!("https://x/MIT{SEP}HELLO{SEP}").into_bytes());
    assert_eq!(
        index,
        format!(
            "0:13 com.example:libfoo{SEP}{}:5 com.google.android.gms:play-services-base A{SEP}",
            13 + SEP.len()
        )
    );
}

#[test]
fn test_index_ranges_slice_the_blob() {
    let ctx = TestContext::new();
    ctx.write_metadata(
        "com.example",
        "libfoo",
        "1.0",
        "[[licenses]]\nname = \"MIT\"\nurl = \"https://x/MIT\"\n",
    );
    ctx.write_metadata(
        "com.example",
        "libbar",
        "2.1",
        concat!(
            "[[licenses]]\nname = \"MIT\"\nurl = \"https://x/MIT\"\n\n",
            "[[licenses]]\nname = \"Apache-2.0\"\nurl = \"https://x/APACHE\"\n",
        ),
    );
    let deps = ctx.write_dependencies(&json!([
        {"group": "com.example", "name": "libfoo", "version": "1.0", "artifact": "unused.aar"},
        {"group": "com.example", "name": "libbar", "version": "2.1", "artifact": "unused.aar"},
    ]));

    let output = ctx.run(&deps);
    assert!(output.status.success());

    let (blob, index) = ctx.read_outputs();
    assert_eq!(index.lines().count(), 3);
    for line in index.lines() {
        let (range, key) = line.split_once(' ').expect("malformed index line");
        let (offset, length) = range.split_once(':').expect("malformed range");
        let offset: usize = offset.parse().unwrap();
        let length: usize = length.parse().unwrap();
        let content = &blob[offset..offset + length];
        assert!(!key.is_empty());
        assert!(content.starts_with(b"https://x/"), "unexpected content for {key}");
    }
}

#[test]
fn test_rerun_overwrites_outputs() {
    let ctx = TestContext::new();
    ctx.write_metadata(
        "com.example",
        "libfoo",
        "1.0",
        "[[licenses]]\nname = \"MIT\"\nurl = \"https://x/MIT\"\n",
    );
    let deps = ctx.write_dependencies(&json!([
        {"group": "com.example", "name": "libfoo", "version": "1.0", "artifact": "unused.aar"},
    ]));

    assert!(ctx.run(&deps).status.success());
    let first = ctx.read_outputs();
    assert!(ctx.run(&deps).status.success());
    let second = ctx.read_outputs();

    assert_eq!(first, second);
}

#[test]
fn test_missing_metadata_is_not_fatal() {
    let ctx = TestContext::new();
    let deps = ctx.write_dependencies(&json!([
        {"group": "com.example", "name": "undocumented", "version": "0.1", "artifact": "unused.aar"},
    ]));

    let output = ctx.run(&deps);
    assert!(output.status.success());

    let (blob, index) = ctx.read_outputs();
    assert!(blob.is_empty());
    assert!(index.is_empty());
}

#[test]
fn test_unreadable_dependency_list_is_fatal() {
    let ctx = TestContext::new();
    let output = ctx.run(&ctx.path().join("nonexistent.json"));
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dependency list"), "unexpected stderr: {stderr}");
}
