//! End-to-end CLI tests driving the `patchkit` binary directly, covering
//! the create/apply/validate round trip.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_file(dir: &Path, name: &str, content: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn cmd() -> Command {
    Command::cargo_bin("patchkit").unwrap()
}

/// S1: small round trip without compression.
#[test]
fn s1_small_round_trip_without_compression() {
    let source = tempdir().unwrap();
    write_file(source.path(), "foo.txt", b"hello world");
    write_file(source.path(), "bar.txt", b"another file content");

    let patch_data = tempdir().unwrap();
    cmd()
        .args([
            "create",
            source.path().to_str().unwrap(),
            "--output",
            patch_data.path().to_str().unwrap(),
            "--block-size",
            "1024",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files, 1 bundles"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(patch_data.path().join("patchData.json")).unwrap()).unwrap();
    assert_eq!(manifest["files"].as_object().unwrap().len(), 2);
    let bundles = manifest["bundles"].as_object().unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles.values().next().unwrap().as_object().unwrap().len(), 2);

    let install_root = tempdir().unwrap();
    cmd()
        .args([
            "apply",
            install_root.path().to_str().unwrap(),
            "--patch-data",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files patched"));

    let install_dir = install_root.path().join("install");
    assert_eq!(fs::read(install_dir.join("foo.txt")).unwrap(), b"hello world");
    assert_eq!(fs::read(install_dir.join("bar.txt")).unwrap(), b"another file content");

    cmd()
        .args(["validate", install_root.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout("1");
}

/// Property 7: applying the same manifest twice leaves the install tree
/// byte-identical (idempotence).
#[test]
fn property_apply_is_idempotent() {
    let source = tempdir().unwrap();
    write_file(source.path(), "data.bin", &vec![7u8; 5000]);

    let patch_data = tempdir().unwrap();
    cmd()
        .args([
            "create",
            source.path().to_str().unwrap(),
            "--output",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    let install_root = tempdir().unwrap();
    for _ in 0..2 {
        cmd()
            .args([
                "apply",
                install_root.path().to_str().unwrap(),
                "--patch-data",
                patch_data.path().to_str().unwrap(),
            ])
            .assert()
            .success();
    }

    let content = fs::read(install_root.path().join("install").join("data.bin")).unwrap();
    assert_eq!(content, vec![7u8; 5000]);
}

/// Property 9: after apply, no file outside `manifest.files` remains, and
/// no empty directory remains.
#[test]
fn property_cleaner_removes_stale_files_and_empty_directories() {
    let source = tempdir().unwrap();
    write_file(source.path(), "keep.txt", b"kept content");

    let patch_data = tempdir().unwrap();
    cmd()
        .args([
            "create",
            source.path().to_str().unwrap(),
            "--output",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    let install_root = tempdir().unwrap();
    let install_dir = install_root.path().join("install");
    fs::create_dir_all(install_dir.join("stale_dir")).unwrap();
    fs::write(install_dir.join("stale_dir").join("stale.txt"), b"gone soon").unwrap();

    cmd()
        .args([
            "apply",
            install_root.path().to_str().unwrap(),
            "--patch-data",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(install_dir.join("keep.txt").exists());
    assert!(!install_dir.join("stale_dir").exists());
}

/// S6 / Property 10: mutating a tracked file flips `validate` from 1 to 0.
#[test]
fn s6_validate_detects_tampering() {
    let source = tempdir().unwrap();
    write_file(source.path(), "tracked.txt", b"original content of a certain length");

    let patch_data = tempdir().unwrap();
    cmd()
        .args([
            "create",
            source.path().to_str().unwrap(),
            "--output",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    let install_root = tempdir().unwrap();
    cmd()
        .args([
            "apply",
            install_root.path().to_str().unwrap(),
            "--patch-data",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    cmd()
        .args(["validate", install_root.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout("1");

    let tracked = install_root.path().join("install").join("tracked.txt");
    fs::write(&tracked, b"a completely different length of content, tampered").unwrap();

    cmd()
        .args(["validate", install_root.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout("0");
}

#[test]
fn create_rejects_missing_source_directory() {
    let missing = tempdir().unwrap();
    let missing_path = missing.path().join("does-not-exist");
    let patch_data = tempdir().unwrap();

    cmd()
        .args([
            "create",
            missing_path.to_str().unwrap(),
            "--output",
            patch_data.path().to_str().unwrap(),
        ])
        .assert()
        .failure();
}

#[test]
fn config_set_get_round_trips_through_cli() {
    let home = tempdir().unwrap();
    cmd()
        .env("XDG_CONFIG_HOME", home.path())
        .args(["config", "set", "chunking.block_size", "128KB"])
        .assert()
        .success();

    cmd()
        .env("XDG_CONFIG_HOME", home.path())
        .args(["config", "get", "chunking.block_size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("131072"));
}
