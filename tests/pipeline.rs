//! Integration tests assembling the trust-pipeline stages against a fixture
//! filesystem under a temp directory, the way the end-to-end scenarios in
//! this crate's design are described. These exercise the composable
//! building blocks directly (path/trust/env/script/identity) rather than
//! the full binary flow, since that needs an actual setuid-root install (a
//! real `CGI_HANDLER` binary, root-owned fixture trees, an actual
//! privilege drop) that a test process cannot set up for itself.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use cgi_suexec::{env, identity, path, script, trust};

fn fixture_root(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("cgi-suexec-pipeline-{name}-{}", std::process::id()))
}

fn make_dir(p: &std::path::Path, mode: u32) {
    fs::create_dir_all(p).unwrap();
    let mut perms = fs::metadata(p).unwrap().permissions();
    perms.set_mode(mode);
    fs::set_permissions(p, perms).unwrap();
}

fn make_file(p: &std::path::Path, mode: u32) {
    fs::write(p, b"<?php echo \"hi\"; ?>").unwrap();
    let mut perms = fs::metadata(p).unwrap().permissions();
    perms.set_mode(mode);
    fs::set_permissions(p, perms).unwrap();
}

#[test]
fn happy_path_script_is_within_base_and_document_root_with_correct_suffix() {
    let root = fixture_root("happy");
    let home = root.join("home").join("alice");
    make_dir(&root.join("home"), 0o755);
    make_dir(&home, 0o755);
    let script_path = home.join("app.php");
    make_file(&script_path, 0o755);

    let canon_script = path::canonicalise(&script_path).unwrap();
    let canon_base = path::canonicalise(&root.join("home")).unwrap();
    let canon_home = path::canonicalise(&home).unwrap();

    assert!(path::is_within(&canon_script, &canon_base));
    assert!(path::is_within(&canon_script, &canon_home));
    assert!(script::has_suffix(&canon_script, ".php"));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn escapes_base_directory() {
    let root = fixture_root("escape");
    make_dir(&root.join("home"), 0o755);
    let outside = root.join("tmp");
    make_dir(&outside, 0o755);
    let evil = outside.join("evil.php");
    make_file(&evil, 0o755);

    let canon_evil = path::canonicalise(&evil).unwrap();
    let canon_base = path::canonicalise(&root.join("home")).unwrap();
    assert!(!path::is_within(&canon_evil, &canon_base));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn wrong_suffix_is_rejected() {
    let root = fixture_root("suffix");
    let home = root.join("home").join("alice");
    make_dir(&home, 0o755);
    let script_path = home.join("app.cgi");
    make_file(&script_path, 0o755);

    let canon_script = path::canonicalise(&script_path).unwrap();
    assert!(!script::has_suffix(&canon_script, ".php"));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn ancestor_world_writable_directory_breaks_trust_chain() {
    let root = fixture_root("worldwritable");
    let home = root.join("home").join("alice");
    make_dir(&root.join("home"), 0o755);
    make_dir(&home, 0o777);
    let script_path = home.join("app.php");
    make_file(&script_path, 0o755);

    let me = unsafe { libc::getuid() };
    let my_gid = unsafe { libc::getgid() };
    let canon_script = path::canonicalise(&script_path).unwrap();
    let canon_root = path::canonicalise(&root).unwrap();

    let result = trust::trust_chain(me, my_gid, &canon_script, Some(&canon_root));
    assert!(result.is_err());

    fs::remove_dir_all(&root).ok();
}

#[test]
fn environment_hygiene_drops_proxy_and_unlisted_vars_keeps_allowlisted() {
    let captured = vec![
        "HTTP_PROXY=http://evil.example".to_string(),
        "LD_PRELOAD=/tmp/x.so".to_string(),
        "HTTP_HOST=good".to_string(),
    ];
    let result = env::sanitise(captured);
    let map: std::collections::HashMap<_, _> = result.into_iter().collect();

    assert_eq!(map.get("HTTP_HOST").map(String::as_str), Some("good"));
    assert!(!map.contains_key("HTTP_PROXY"));
    assert!(!map.contains_key("LD_PRELOAD"));
    assert_eq!(map.get("PATH").map(String::as_str), Some("/usr/bin:/bin"));
}

#[test]
fn privileged_and_out_of_range_owners_are_rejected() {
    assert!(identity::resolve_owner(0, 1001).is_err());
    assert!(identity::resolve_owner(500, 500).is_err());
}
