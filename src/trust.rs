//! Filesystem-trust predicate: every directory in a chain must be owned by
//! a specific identity and not world-writable.
//!
//! Grounded on the teacher's `system::audit::checks` (root-ownership and
//! world-writable checks on the sudoers file and its ancestor chain),
//! generalised from a single fixed identity (`root:root`) to an arbitrary
//! `(uid, gid)` pair so it can also certify a script owner's home directory.

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::Error;
use crate::path::ancestors;

/// Asserts that every directory in `ancestors(start, stop)` is owned by
/// `uid:gid` and carries no world-write bit. Any failure is `NoPerm`.
pub fn trust_chain(uid: u32, gid: u32, start: &Path, stop: Option<&Path>) -> Result<(), Error> {
    for dir in ancestors(start, stop) {
        let meta = std::fs::symlink_metadata(&dir)
            .map_err(|e| Error::NoPerm(format!("{}: {e}", dir.display())))?;

        if meta.uid() != uid || meta.gid() != gid {
            return Err(Error::NoPerm(format!(
                "{}: expected owner {uid}:{gid}, found {}:{}",
                dir.display(),
                meta.uid(),
                meta.gid()
            )));
        }

        if meta.mode() & libc::S_IWOTH != 0 {
            return Err(Error::NoPerm(format!(
                "{}: world-writable directory in trust chain",
                dir.display()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn rejects_world_writable_ancestor() {
        let tmp = std::env::temp_dir().join(format!("trust-test-{}", std::process::id()));
        let a = tmp.join("a");
        fs::create_dir_all(&a).unwrap();
        let mut perms = fs::metadata(&a).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o777);
        fs::set_permissions(&a, perms).unwrap();

        let me = unsafe { libc::getuid() };
        let my_gid = unsafe { libc::getgid() };
        // Bound the walk at `tmp` so it never reaches real system directories.
        let result = trust_chain(me, my_gid, &a.join("b"), Some(&tmp));
        assert!(matches!(result, Err(Error::NoPerm(_))));

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn accepts_matching_owner_non_writable() {
        let tmp = std::env::temp_dir().join(format!("trust-test-ok-{}", std::process::id()));
        let a = tmp.join("a");
        fs::create_dir_all(&a).unwrap();
        let mut perms = fs::metadata(&a).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        fs::set_permissions(&a, perms).unwrap();

        let me = unsafe { libc::getuid() };
        let my_gid = unsafe { libc::getgid() };
        assert!(trust_chain(me, my_gid, &a.join("b"), Some(&tmp)).is_ok());

        fs::remove_dir_all(&tmp).ok();
    }
}
