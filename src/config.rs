//! Compile-time configuration and the runtime validator that certifies it.
//!
//! Grounded on the teacher's `defaults` module in spirit only: the teacher
//! builds a runtime `SudoDefault` table parsed from `/etc/sudoers`, but this
//! program has no configuration file to parse, so the values are plain
//! `const` items, matching the historical C implementation's `config.h`.

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use crate::error::Error;
use crate::names::is_portable;
use crate::path::canonicalise;
use crate::trust::trust_chain;

/// Absolute path to the interpreter every script is handed to.
pub const CGI_HANDLER: &str = "/usr/lib/cgi-bin/php";

/// Directory enclosing every permitted script.
pub const SCRIPT_BASE_DIR: &str = "/home";

/// Required filename suffix, including the leading dot.
pub const SCRIPT_SUFFIX: &str = ".php";

pub const SCRIPT_MIN_UID: u32 = 1000;
pub const SCRIPT_MAX_UID: u32 = 50_000;
pub const SCRIPT_MIN_GID: u32 = 1000;
pub const SCRIPT_MAX_GID: u32 = 50_000;

/// Replacement value for `PATH` in the sanitised environment.
pub const SECURE_PATH: &str = "/usr/bin:/bin";

/// The identity the web server (and therefore this program's caller) runs
/// as.
pub const WWW_USER: &str = "www-data";
pub const WWW_GROUP: &str = "www-data";

/// `strftime` format used for the single diagnostic line when stderr is not
/// a terminal.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Environment allow-list: a pattern ending in `=` matches the full
/// variable name; otherwise it is a prefix match on the whole `name=value`
/// entry. Reproduced from Apache suEXEC's safe-variable table, the same
/// list the historical implementation this program descends from compiled
/// in.
pub const SAFE_ENV_PATTERNS: &[&str] = &[
    "HTTP_",
    "SSL_",
    "AUTH_TYPE=",
    "CONTENT_LENGTH=",
    "CONTENT_TYPE=",
    "CONTEXT_DOCUMENT_ROOT=",
    "CONTEXT_PREFIX=",
    "DATE_GMT=",
    "DATE_LOCAL=",
    "DOCUMENT_NAME=",
    "DOCUMENT_PATH_INFO=",
    "DOCUMENT_ROOT=",
    "DOCUMENT_URI=",
    "GATEWAY_INTERFACE=",
    "HTTPS=",
    "LAST_MODIFIED=",
    "PATH_INFO=",
    "PATH_TRANSLATED=",
    "QUERY_STRING=",
    "QUERY_STRING_UNESCAPED=",
    "REMOTE_ADDR=",
    "REMOTE_HOST=",
    "REMOTE_IDENT=",
    "REMOTE_PORT=",
    "REMOTE_USER=",
    "REDIRECT_ERROR_NOTES=",
    "REDIRECT_HANDLER=",
    "REDIRECT_QUERY_STRING=",
    "REDIRECT_REMOTE_USER=",
    "REDIRECT_SCRIPT_FILENAME=",
    "REDIRECT_STATUS=",
    "REDIRECT_URL=",
    "REQUEST_METHOD=",
    "REQUEST_URI=",
    "REQUEST_SCHEME=",
    "SCRIPT_FILENAME=",
    "SCRIPT_NAME=",
    "SCRIPT_URI=",
    "SCRIPT_URL=",
    "SERVER_ADMIN=",
    "SERVER_NAME=",
    "SERVER_ADDR=",
    "SERVER_PORT=",
    "SERVER_PROTOCOL=",
    "SERVER_SIGNATURE=",
    "SERVER_SOFTWARE=",
    "UNIQUE_ID=",
    "USER_NAME=",
    "TZ=",
];

/// Environment deny-list, checked after the allow-list. `HTTP_PROXY` is
/// here specifically to defeat the httpoxy class of attacks: without it, a
/// client-supplied `Proxy:` header would land in `HTTP_PROXY` via the
/// `HTTP_` prefix rule above and get picked up by HTTP client libraries
/// that honour the `http_proxy` environment variable.
pub const UNSAFE_ENV_PATTERNS: &[&str] = &["HTTP_PROXY="];

/// Runs after environment sanitising. Checks every compile-time constant
/// for presence, type, ownership and range sanity, including a self-check
/// of the running executable.
///
/// `self_exe` is the canonicalised path to this running binary, as
/// produced by the self-discovery step in `main`.
pub fn validate(self_exe: &Path) -> Result<(), Error> {
    validate_handler()?;
    validate_base_dir()?;

    if SCRIPT_SUFFIX.is_empty() {
        return Err(Error::Config("SCRIPT_SUFFIX must not be empty".into()));
    }

    validate_uid_gid_range("UID", SCRIPT_MIN_UID, SCRIPT_MAX_UID)?;
    validate_uid_gid_range("GID", SCRIPT_MIN_GID, SCRIPT_MAX_GID)?;

    if SECURE_PATH.is_empty() || SECURE_PATH.len() > 1024 {
        return Err(Error::Config(
            "SECURE_PATH must be non-empty and at most 1024 bytes".into(),
        ));
    }

    if DATE_FORMAT.is_empty() {
        return Err(Error::Config("DATE_FORMAT must not be empty".into()));
    }

    if !is_portable(WWW_USER) {
        return Err(Error::Config(format!("WWW_USER {WWW_USER:?} is not portable")));
    }
    if !is_portable(WWW_GROUP) {
        return Err(Error::Config(format!("WWW_GROUP {WWW_GROUP:?} is not portable")));
    }
    crate::identity::User::from_name(WWW_USER)?;
    crate::identity::Group::from_name(WWW_GROUP)?;

    validate_self(self_exe)?;

    Ok(())
}

fn validate_handler() -> Result<(), Error> {
    if CGI_HANDLER.is_empty() {
        return Err(Error::Config("CGI_HANDLER must not be empty".into()));
    }
    let path = canonicalise(Path::new(CGI_HANDLER))?;
    if path != Path::new(CGI_HANDLER) {
        return Err(Error::Config(format!(
            "CGI_HANDLER {CGI_HANDLER:?} is not canonical (resolves to {})",
            path.display()
        )));
    }
    let meta = std::fs::metadata(&path)?;
    if !meta.is_file() {
        return Err(Error::Config(format!("{CGI_HANDLER}: not a regular file")));
    }
    if meta.uid() != 0 || meta.gid() != 0 {
        return Err(Error::Config(format!("{CGI_HANDLER}: must be owned by root:root")));
    }
    let mode = meta.permissions().mode();
    if mode & libc::S_IWOTH != 0 {
        return Err(Error::Config(format!("{CGI_HANDLER}: must not be world-writable")));
    }
    if mode & libc::S_IXOTH == 0 {
        return Err(Error::Config(format!("{CGI_HANDLER}: must be world-executable")));
    }
    if mode & (libc::S_ISUID | libc::S_ISGID) != 0 {
        return Err(Error::Config(format!("{CGI_HANDLER}: must not be setuid/setgid")));
    }
    trust_chain(0, 0, &path, None)
}

fn validate_base_dir() -> Result<(), Error> {
    if SCRIPT_BASE_DIR.is_empty() {
        return Err(Error::Config("SCRIPT_BASE_DIR must not be empty".into()));
    }
    let path = canonicalise(Path::new(SCRIPT_BASE_DIR))?;
    if path != Path::new(SCRIPT_BASE_DIR) {
        return Err(Error::Config(format!(
            "SCRIPT_BASE_DIR {SCRIPT_BASE_DIR:?} is not canonical (resolves to {})",
            path.display()
        )));
    }
    let meta = std::fs::metadata(&path)?;
    if !meta.is_dir() {
        return Err(Error::Config(format!("{SCRIPT_BASE_DIR}: not a directory")));
    }
    if meta.uid() != 0 || meta.gid() != 0 {
        return Err(Error::Config(format!("{SCRIPT_BASE_DIR}: must be owned by root:root")));
    }
    if meta.permissions().mode() & libc::S_IWOTH != 0 {
        return Err(Error::Config(format!(
            "{SCRIPT_BASE_DIR}: must not be world-writable"
        )));
    }
    trust_chain(0, 0, &path, None)
}

fn validate_uid_gid_range(label: &str, min: u32, max: u32) -> Result<(), Error> {
    if min < 1 {
        return Err(Error::Config(format!("SCRIPT_MIN_{label} must be >= 1")));
    }
    if min >= max {
        return Err(Error::Config(format!(
            "SCRIPT_MIN_{label} must be less than SCRIPT_MAX_{label}"
        )));
    }
    Ok(())
}

/// The running executable must be root-owned, live under a root-owned
/// ancestor chain, and be neither world-writable nor world-executable:
/// clients reach it through the web server's CGI dispatch, never directly.
fn validate_self(self_exe: &Path) -> Result<(), Error> {
    let meta = std::fs::metadata(self_exe)?;
    if meta.uid() != 0 || meta.gid() != 0 {
        return Err(Error::NoPerm(format!("{}: must be owned by root:root", self_exe.display())));
    }
    let mode = meta.permissions().mode();
    if mode & libc::S_IWOTH != 0 {
        return Err(Error::NoPerm(format!("{}: must not be world-writable", self_exe.display())));
    }
    if mode & libc::S_IXOTH != 0 {
        return Err(Error::NoPerm(format!(
            "{}: must not be world-executable",
            self_exe.display()
        )));
    }
    trust_chain(0, 0, self_exe, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_gid_range_rejects_inverted_bounds() {
        assert!(validate_uid_gid_range("UID", 2000, 1000).is_err());
        assert!(validate_uid_gid_range("UID", 0, 1000).is_err());
        assert!(validate_uid_gid_range("UID", 1000, 50_000).is_ok());
    }

    #[test]
    fn www_names_are_portable() {
        assert!(is_portable(WWW_USER));
        assert!(is_portable(WWW_GROUP));
    }
}
