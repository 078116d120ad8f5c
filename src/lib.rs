//! The pre-exec trust pipeline: check the caller, sanitise the environment,
//! validate configuration, resolve and check the script, resolve its owner,
//! drop privileges, exec the interpreter.
//!
//! Control flow is strictly linear: any failure at any stage is fatal and
//! reported through [`error::die`] by the thin binary wrapper in `bin/`.

pub mod config;
pub mod cutils;
pub mod env;
pub mod error;
pub mod exec;
pub mod identity;
pub mod log;
pub mod names;
pub mod path;
pub mod privdrop;
pub mod script;
pub mod trust;

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use error::Error;

/// Returns `Infallible` on the (never-taken) happy path: a successful run
/// ends in `exec`, which replaces this process image and never returns
/// here at all.
pub fn run(self_exe: PathBuf) -> Result<Infallible, Error> {
    // Working directory is set to `/` before any `path_max` probe.
    std::env::set_current_dir("/").map_err(|e| Error::OsErr(format!("chdir(/): {e}")))?;

    // The caller's identity is captured before anything in the request is
    // trusted: real uid/gid only ever equal the web server's identity here,
    // before the privilege drop below replaces them with the script
    // owner's. Checking this post-drop can never succeed.
    exec::check_caller()?;

    // Environment is sanitised before any identity lookup or further read.
    env::sanitise_process_environment();

    let log_level = desired_log_level();
    log::init(log_level);
    ::log::debug!(target: "cgi_suexec::env", "environment sanitised, self = {}", self_exe.display());

    config::validate(&self_exe)?;
    ::log::debug!(target: "cgi_suexec::config", "configuration validated");

    let descriptor = script::resolve()?;
    ::log::debug!(target: "cgi_suexec::script", "script resolved: {}", descriptor.path.display());

    let (owner, _group) = identity::resolve_owner(descriptor.uid, descriptor.gid)?;
    ::log::debug!(target: "cgi_suexec::identity", "owner resolved: {} ({}:{})", owner.name, descriptor.uid, descriptor.gid);

    let owner_home = path::canonicalise(&owner.home)?;
    descriptor.require_within_home(&owner_home)?;
    descriptor.recheck_mode()?;

    // Identities are resolved before privileges are dropped.
    privdrop::drop_to(&owner.name, descriptor.uid, descriptor.gid)?;
    ::log::debug!(target: "cgi_suexec::privdrop", "privileges dropped to {}:{}", descriptor.uid, descriptor.gid);

    let env_for_handler: Vec<(String, String)> = std::env::vars().collect();
    Err(exec::exec_handler(env_for_handler))
}

/// Canonical path of the running executable: `/proc/self/exe` where
/// available, otherwise argument zero canonicalised (resolved against
/// `PATH` first if it is a bare name). The `PATH`-search fallback is the
/// one place this program reads the environment before sanitising it, and
/// only runs on platforms without a `/proc/self/exe`-style oracle.
pub fn discover_self_path() -> Result<PathBuf, Error> {
    if let Ok(target) = std::fs::read_link("/proc/self/exe") {
        return path::canonicalise(&target);
    }

    let argv0 = std::env::args()
        .next()
        .ok_or_else(|| Error::OsErr("argv[0] is unavailable".into()))?;

    if argv0.contains('/') {
        return path::canonicalise(Path::new(&argv0));
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(&argv0);
        if candidate.is_file() {
            return path::canonicalise(&candidate);
        }
    }

    Err(Error::OsErr(format!(
        "could not determine this executable's own path (argv[0] = {argv0:?})"
    )))
}

/// Diagnostic verbosity, read from `RUST_LOG` after the environment has
/// been sanitised. `RUST_LOG` is not in the CGI allow-list, so in practice
/// this only ever sees it set when a developer exports it on a debug build;
/// that's an acceptable trade for not reading the environment before the
/// sanitiser runs. Debug builds default to `debug`; release builds default
/// to `info`.
fn desired_log_level() -> ::log::LevelFilter {
    match std::env::var("RUST_LOG") {
        Ok(value) => value.parse().unwrap_or(::log::LevelFilter::Info),
        Err(_) if cfg!(debug_assertions) => ::log::LevelFilter::Debug,
        Err(_) => ::log::LevelFilter::Info,
    }
}
