//! Privilege drop: clear supplementary groups, set GID, set UID, then
//! prove the drop is irreversible.
//!
//! Grounded on the teacher's `system::mod::set_supplementary_groups` (the
//! `setgroups` call and its FreeBSD `i32`-length caveat) and
//! `set_target_user`, but adapted from "configure a child `Command` via
//! `pre_exec`" to "mutate the current process in place", since this
//! program execs itself rather than forking a child.

use std::ffi::CString;

use crate::cutils::cerr;
use crate::error::Error;

/// Ordered, all-or-nothing: clear supplementary groups, set GID, set UID,
/// then verify regaining UID 0 now fails. Any failure at steps 1-3 is
/// `OsErr`; succeeding at step 4 is `NoPerm` (the drop would not have been
/// permanent). `owner_name` is only consulted if the platform cannot clear
/// the supplementary group list directly.
pub fn drop_to(owner_name: &str, uid: u32, gid: u32) -> Result<(), Error> {
    clear_supplementary_groups(owner_name, gid)?;

    // SAFETY: setgid/setuid take plain integer arguments and cannot cause
    // memory unsafety regardless of their validity.
    cerr(unsafe { libc::setgid(gid) }).map_err(|e| Error::OsErr(format!("setgid({gid}): {e}")))?;
    cerr(unsafe { libc::setuid(uid) }).map_err(|e| Error::OsErr(format!("setuid({uid}): {e}")))?;

    // SAFETY: same as above.
    let regained_root = unsafe { libc::setuid(0) };
    if regained_root == 0 {
        return Err(Error::NoPerm(
            "setuid(0) succeeded after privilege drop; the drop was not permanent".into(),
        ));
    }

    Ok(())
}

fn clear_supplementary_groups(owner_name: &str, primary_gid: u32) -> Result<(), Error> {
    // SAFETY: a zero-length group list is always a valid argument to setgroups.
    match cerr(unsafe { libc::setgroups(0, std::ptr::null()) }) {
        Ok(_) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EINVAL) || e.raw_os_error() == Some(libc::ENOSYS) => {
            initialise_to_owner_groups(owner_name, primary_gid)
        }
        Err(e) => Err(Error::OsErr(format!("setgroups(0, []): {e}"))),
    }
}

/// Fallback for platforms that refuse an empty supplementary-group list:
/// initialise to the owner's own groups instead, via `getgrouplist`. The
/// intent is still "no groups beyond what the owner already has".
fn initialise_to_owner_groups(owner_name: &str, primary_gid: u32) -> Result<(), Error> {
    let name_c = CString::new(owner_name)
        .map_err(|_| Error::Software(format!("{owner_name}: contains a NUL byte")))?;

    let mut buf_len: libc::c_int = 32;
    let mut groups: Vec<libc::gid_t>;
    loop {
        groups = vec![0; buf_len as usize];
        // SAFETY: groups points to buf_len gid_t-sized slots, as getgrouplist requires.
        let result =
            unsafe { libc::getgrouplist(name_c.as_ptr(), primary_gid, groups.as_mut_ptr(), &mut buf_len) };
        if result != -1 {
            break;
        }
        if buf_len >= 65536 {
            return Err(Error::OsErr(format!("{owner_name}: too many groups")));
        }
        buf_len *= 2;
    }
    groups.truncate(buf_len as usize);

    let len = groups.len() as libc::c_int;
    // SAFETY: groups points to a slice of len gid_t entries.
    cerr(unsafe { libc::setgroups(len as usize, groups.as_ptr()) })
        .map_err(|e| Error::OsErr(format!("setgroups({owner_name}'s groups): {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_to_requires_privilege_outside_root() {
        if unsafe { libc::getuid() } == 0 {
            return;
        }
        let err = drop_to("nobody", 1, 1).unwrap_err();
        assert!(matches!(err, Error::OsErr(_)));
    }
}
