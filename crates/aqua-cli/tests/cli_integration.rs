//! Integration tests driving the `aqua` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn aqua(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aqua"))
        .current_dir(dir)
        .env_remove("AQUA_DOMAIN_ID")
        .env_remove("AQUA_STORE")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to execute aqua")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn initialized() -> TempDir {
    let dir = TempDir::new().unwrap();
    let output = aqua(dir.path(), &["init", "--domain-id", "a1b2c3d4e5"]);
    assert!(output.status.success(), "init failed: {output:?}");
    dir
}

fn edit(dir: &Path, title: &str, text: &str) {
    let output = aqua(dir, &["edit", title, "--text", text]);
    assert!(output.status.success(), "edit failed: {output:?}");
}

fn show(dir: &Path, rev_id: u64) -> serde_json::Value {
    let output = aqua(dir, &["show", &rev_id.to_string()]);
    assert!(output.status.success(), "show failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_init_writes_config_and_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let output = aqua(dir.path(), &["init"]);
    assert!(output.status.success());
    let config = fs::read_to_string(dir.path().join("aqua.toml")).unwrap();
    assert!(config.contains("domain_id"));

    let again = aqua(dir.path(), &["init"]);
    assert!(!again.status.success());
}

#[test]
fn test_commands_need_a_domain_id() {
    let dir = TempDir::new().unwrap();
    let output = aqua(dir.path(), &["log", "Main Page"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("aqua init"));
}

#[test]
fn test_edit_log_verify() {
    let dir = initialized();
    edit(dir.path(), "Main Page", "first");
    edit(dir.path(), "Main Page", "second");

    let log = aqua(dir.path(), &["log", "Main Page"]);
    assert!(log.status.success());
    let text = stdout(&log);
    assert!(text.contains("Revision"));
    assert!(text.contains("genesis"));

    let verify = aqua(dir.path(), &["verify", "Main Page"]);
    assert!(verify.status.success());
    assert!(stdout(&verify).contains("VALID"));
}

#[test]
fn test_show_returns_verify_page_fields() {
    let dir = initialized();
    edit(dir.path(), "Main Page", "first");
    edit(dir.path(), "Main Page", "second");

    let first = show(dir.path(), 1);
    let second = show(dir.path(), 2);
    for key in [
        "rev_id",
        "domain_id",
        "verification_hash",
        "time_stamp",
        "signature",
        "public_key",
        "wallet_address",
        "witness_event_id",
    ] {
        assert!(second.get(key).is_some(), "missing {key}");
    }
    assert_eq!(second["rev_id"], 2);
    assert_eq!(second["domain_id"], "a1b2c3d4e5");
    assert_eq!(second["verification_hash"].as_str().unwrap().len(), 128);
    assert_ne!(first["verification_hash"], second["verification_hash"]);

    let missing = aqua(dir.path(), &["show", "99"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("not found"));
}

#[test]
fn test_sign_then_verify() {
    let dir = initialized();
    edit(dir.path(), "Signed", "one");
    edit(dir.path(), "Signed", "two");

    let keygen = aqua(dir.path(), &["keygen", "key.json"]);
    assert!(keygen.status.success());

    let key: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("key.json")).unwrap()).unwrap();

    let sign = aqua(dir.path(), &["sign", "1", "--key", "key.json"]);
    assert!(sign.status.success(), "sign failed: {sign:?}");
    let signed = show(dir.path(), 1);
    assert!(signed["wallet_address"].as_str().unwrap().starts_with("0x"));
    assert_eq!(signed["wallet_address"], key["wallet_address"]);

    let again = aqua(dir.path(), &["sign", "1", "--key", "key.json"]);
    assert!(!again.status.success());

    let verify = aqua(dir.path(), &["verify", "Signed"]);
    assert!(verify.status.success(), "verify failed: {verify:?}");
}

#[test]
fn test_delete_relinks_chain() {
    let dir = initialized();
    for text in ["r1", "r2", "r3", "r4", "r5"] {
        edit(dir.path(), "Chain", text);
    }
    let first = show(dir.path(), 1);

    let delete = aqua(dir.path(), &["delete", "2", "3", "4"]);
    assert!(delete.status.success(), "delete failed: {delete:?}");

    let log = stdout(&aqua(dir.path(), &["log", "Chain"]));
    assert!(log.contains(first["verification_hash"].as_str().unwrap()));
    assert!(aqua(dir.path(), &["verify", "Chain"]).status.success());
    assert!(!aqua(dir.path(), &["show", "3"]).status.success());
}

#[test]
fn test_export_import_round_trip() {
    let dir = initialized();
    edit(dir.path(), "Source", "alpha");
    edit(dir.path(), "Source", "beta");
    let tip = show(dir.path(), 2);

    let export = aqua(dir.path(), &["export", "Source", "-o", "source.json"]);
    assert!(export.status.success(), "export failed: {export:?}");

    let other = initialized();
    fs::copy(
        dir.path().join("source.json"),
        other.path().join("source.json"),
    )
    .unwrap();
    let import = aqua(other.path(), &["import", "source.json"]);
    assert!(import.status.success(), "import failed: {import:?}");

    let imported = show(other.path(), 2);
    assert_eq!(imported["verification_hash"], tip["verification_hash"]);
    assert!(aqua(other.path(), &["verify", "Source"]).status.success());
}

#[test]
fn test_import_rejects_malformed_file() {
    let dir = initialized();
    fs::write(dir.path().join("bad.json"), r#"{"site_info": {}}"#).unwrap();
    let import = aqua(dir.path(), &["import", "bad.json"]);
    assert!(!import.status.success());
}

#[test]
fn test_transclusion_states_and_refresh() {
    let dir = initialized();
    edit(dir.path(), "Template:Nav", "v1");
    edit(dir.path(), "Host", "{{Nav}} [[Missing]]");
    edit(dir.path(), "Template:Nav", "v2");

    let states = stdout(&aqua(dir.path(), &["transclusions", "Host"]));
    assert!(states.contains("NEW_VERSION"));
    assert!(states.contains("NO_RECORD"));

    let refresh = aqua(dir.path(), &["refresh", "Host", "Template:Nav"]);
    assert!(refresh.status.success(), "refresh failed: {refresh:?}");
    let states = stdout(&aqua(dir.path(), &["transclusions", "Host"]));
    assert!(states.contains("UNCHANGED"));
}

#[test]
fn test_tree_and_fast_forward() {
    let dir = initialized();
    edit(dir.path(), "Remote", "shared");
    let export = aqua(dir.path(), &["export", "Remote", "-o", "remote.json"]);
    assert!(export.status.success());
    let import = aqua(dir.path(), &["import", "remote.json", "--title", "Local"]);
    assert!(import.status.success(), "import failed: {import:?}");
    edit(dir.path(), "Remote", "remote only");

    let tree = aqua(dir.path(), &["tree", "Remote", "Local", "--json"]);
    assert!(tree.status.success());
    let tree: serde_json::Value = serde_json::from_slice(&tree.stdout).unwrap();
    assert_eq!(tree["change_type"], "remote");

    let forward = aqua(dir.path(), &["fast-forward", "Remote", "Local"]);
    assert!(forward.status.success(), "fast-forward failed: {forward:?}");
    let tree = aqua(dir.path(), &["tree", "Remote", "Local", "--json"]);
    let tree: serde_json::Value = serde_json::from_slice(&tree.stdout).unwrap();
    assert!(tree["change_type"].is_null());
}

#[test]
fn test_witness_is_idempotent() {
    let dir = initialized();
    edit(dir.path(), "Main Page", "witnessed");

    let first = aqua(dir.path(), &["witness", "Main Page", "--tx", "0xabc"]);
    assert!(first.status.success(), "witness failed: {first:?}");
    let second = aqua(dir.path(), &["witness", "Main Page", "--tx", "0xabc"]);
    assert!(second.status.success());
    assert!(stdout(&second).contains("already recorded"));

    let record = show(dir.path(), 1);
    assert_eq!(record["witness_event_id"], 1);
}

#[test]
fn test_upload_distinguishes_binary_files() {
    let dir = initialized();
    fs::write(dir.path().join("a.png"), [0xff_u8, 0x00]).unwrap();
    fs::write(dir.path().join("b.png"), [0xfe_u8, 0x00]).unwrap();

    let first = aqua(dir.path(), &["upload", "File:Logo.png", "a.png"]);
    assert!(first.status.success(), "upload failed: {first:?}");
    let second = aqua(dir.path(), &["upload", "File:Logo.png", "b.png"]);
    assert!(second.status.success(), "upload failed: {second:?}");

    assert_ne!(
        show(dir.path(), 1)["verification_hash"],
        show(dir.path(), 2)["verification_hash"]
    );
    assert!(aqua(dir.path(), &["verify", "File:Logo.png"]).status.success());

    let wrong_page = aqua(dir.path(), &["upload", "Logo", "a.png"]);
    assert!(!wrong_page.status.success());
}

#[test]
fn test_range_import_needs_matching_history() {
    let dir = initialized();
    for text in ["r1", "r2", "r3"] {
        edit(dir.path(), "Source", text);
    }
    let export = aqua(
        dir.path(),
        &["export", "Source", "--from", "2", "--to", "3", "-o", "tail.json"],
    );
    assert!(export.status.success(), "export failed: {export:?}");

    let other = initialized();
    fs::copy(dir.path().join("tail.json"), other.path().join("tail.json")).unwrap();
    let import = aqua(other.path(), &["import", "tail.json"]);
    assert!(!import.status.success());
    let log = aqua(other.path(), &["log", "Source"]);
    assert!(stdout(&log).contains("No revisions"));
}
