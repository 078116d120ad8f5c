//! `/etc/passwd` and `/etc/group` lookups, trimmed from the teacher's
//! `system::mod::{User, Group}` to what a read-only identity check needs:
//! no supplementary-group enumeration (`getgrouplist`), since this program
//! clears supplementary groups rather than inheriting the target's.

use std::ffi::CString;
use std::mem::MaybeUninit;
use std::path::PathBuf;

use crate::cutils::{cerr, string_from_ptr, sysconf};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub uid: u32,
    pub gid: u32,
    pub name: String,
    pub home: PathBuf,
}

impl User {
    /// # Safety
    /// `pwd` must be the result of a successful `getpwXXX_r` call.
    unsafe fn from_libc(pwd: &libc::passwd) -> User {
        User {
            uid: pwd.pw_uid,
            gid: pwd.pw_gid,
            // SAFETY: pw_name was populated by getpwXXX_r, as required by this function's contract.
            name: unsafe { string_from_ptr(pwd.pw_name) },
            // SAFETY: pw_dir was populated by getpwXXX_r, as required by this function's contract.
            home: PathBuf::from(unsafe { string_from_ptr(pwd.pw_dir) }),
        }
    }

    pub fn from_uid(uid: u32) -> Result<Option<User>, Error> {
        let max_pw_size = sysconf(libc::_SC_GETPW_R_SIZE_MAX).unwrap_or(16_384);
        let mut buf = vec![0u8; max_pw_size as usize];
        let mut pwd = MaybeUninit::uninit();
        let mut pwd_ptr = std::ptr::null_mut();

        // SAFETY: buf points to buf.len() valid bytes; pwd is written only on success.
        cerr(unsafe {
            libc::getpwuid_r(uid, pwd.as_mut_ptr(), buf.as_mut_ptr() as *mut _, buf.len(), &mut pwd_ptr)
        })
        .map_err(|e| Error::OsErr(format!("getpwuid_r({uid}): {e}")))?;

        if pwd_ptr.is_null() {
            Ok(None)
        } else {
            // SAFETY: pwd_ptr non-null means getpwuid_r populated `pwd`.
            let pwd = unsafe { pwd.assume_init() };
            // SAFETY: pwd was populated by getpwuid_r.
            Ok(Some(unsafe { Self::from_libc(&pwd) }))
        }
    }

    pub fn from_name(name: &str) -> Result<User, Error> {
        let name_c = CString::new(name)
            .map_err(|_| Error::NoUser(format!("{name}: contains a NUL byte")))?;
        let max_pw_size = sysconf(libc::_SC_GETPW_R_SIZE_MAX).unwrap_or(16_384);
        let mut buf = vec![0u8; max_pw_size as usize];
        let mut pwd = MaybeUninit::uninit();
        let mut pwd_ptr = std::ptr::null_mut();

        // SAFETY: name_c is NUL-terminated; buf points to buf.len() valid bytes.
        cerr(unsafe {
            libc::getpwnam_r(
                name_c.as_ptr(),
                pwd.as_mut_ptr(),
                buf.as_mut_ptr() as *mut _,
                buf.len(),
                &mut pwd_ptr,
            )
        })
        .map_err(|e| Error::OsErr(format!("getpwnam_r({name}): {e}")))?;

        if pwd_ptr.is_null() {
            Err(Error::NoUser(format!("{name}: no such user")))
        } else {
            // SAFETY: pwd_ptr non-null means getpwnam_r populated `pwd`.
            let pwd = unsafe { pwd.assume_init() };
            // SAFETY: pwd was populated by getpwnam_r.
            Ok(unsafe { Self::from_libc(&pwd) })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub gid: u32,
    pub name: String,
}

impl Group {
    /// # Safety
    /// `grp` must be the result of a successful `getgrXXX_r` call.
    unsafe fn from_libc(grp: &libc::group) -> Group {
        Group {
            gid: grp.gr_gid,
            // SAFETY: gr_name was populated by getgrXXX_r, as required by this function's contract.
            name: unsafe { string_from_ptr(grp.gr_name) },
        }
    }

    pub fn from_gid(gid: u32) -> Result<Group, Error> {
        let max_gr_size = sysconf(libc::_SC_GETGR_R_SIZE_MAX).unwrap_or(16_384);
        let mut buf = vec![0u8; max_gr_size as usize];
        let mut grp = MaybeUninit::uninit();
        let mut grp_ptr = std::ptr::null_mut();

        // SAFETY: buf points to buf.len() valid bytes; grp is written only on success.
        cerr(unsafe {
            libc::getgrgid_r(gid, grp.as_mut_ptr(), buf.as_mut_ptr() as *mut _, buf.len(), &mut grp_ptr)
        })
        .map_err(|e| Error::OsErr(format!("getgrgid_r({gid}): {e}")))?;

        if grp_ptr.is_null() {
            Err(Error::NoUser(format!("group {gid}: no such group")))
        } else {
            // SAFETY: grp_ptr non-null means getgrgid_r populated `grp`.
            let grp = unsafe { grp.assume_init() };
            // SAFETY: grp was populated by getgrgid_r.
            Ok(unsafe { Self::from_libc(&grp) })
        }
    }

    pub fn from_name(name: &str) -> Result<Group, Error> {
        let name_c = CString::new(name)
            .map_err(|_| Error::NoUser(format!("{name}: contains a NUL byte")))?;
        let max_gr_size = sysconf(libc::_SC_GETGR_R_SIZE_MAX).unwrap_or(16_384);
        let mut buf = vec![0u8; max_gr_size as usize];
        let mut grp = MaybeUninit::uninit();
        let mut grp_ptr = std::ptr::null_mut();

        // SAFETY: name_c is NUL-terminated; buf points to buf.len() valid bytes.
        cerr(unsafe {
            libc::getgrnam_r(
                name_c.as_ptr(),
                grp.as_mut_ptr(),
                buf.as_mut_ptr() as *mut _,
                buf.len(),
                &mut grp_ptr,
            )
        })
        .map_err(|e| Error::OsErr(format!("getgrnam_r({name}): {e}")))?;

        if grp_ptr.is_null() {
            Err(Error::NoUser(format!("{name}: no such group")))
        } else {
            // SAFETY: grp_ptr non-null means getgrnam_r populated `grp`.
            let grp = unsafe { grp.assume_init() };
            // SAFETY: grp was populated by getgrnam_r.
            Ok(unsafe { Self::from_libc(&grp) })
        }
    }
}

/// Resolve the script owner's user and group records and check every
/// invariant from the owner-resolver component: UID/GID strictly positive
/// and in-range, the user's primary GID matching the script's GID, and
/// both names portable.
pub fn resolve_owner(script_uid: u32, script_gid: u32) -> Result<(User, Group), Error> {
    use crate::config::{SCRIPT_MAX_GID, SCRIPT_MAX_UID, SCRIPT_MIN_GID, SCRIPT_MIN_UID};
    use crate::names::is_portable;

    if script_uid == 0 || script_gid == 0 {
        return Err(Error::NoPerm("script is owned by uid/gid 0".into()));
    }
    if !(SCRIPT_MIN_UID..=SCRIPT_MAX_UID).contains(&script_uid) {
        return Err(Error::NoPerm(format!(
            "script owner uid {script_uid} outside [{SCRIPT_MIN_UID}, {SCRIPT_MAX_UID}]"
        )));
    }
    if !(SCRIPT_MIN_GID..=SCRIPT_MAX_GID).contains(&script_gid) {
        return Err(Error::NoPerm(format!(
            "script owner gid {script_gid} outside [{SCRIPT_MIN_GID}, {SCRIPT_MAX_GID}]"
        )));
    }

    let user = User::from_uid(script_uid)?
        .ok_or_else(|| Error::NoUser(format!("uid {script_uid}: no passwd entry")))?;
    if !is_portable(&user.name) {
        return Err(Error::NoPerm(format!("{}: not a portable username", user.name)));
    }
    if user.gid != script_gid {
        return Err(Error::NoPerm(format!(
            "{}: primary gid {} does not match script gid {script_gid}",
            user.name, user.gid
        )));
    }

    let group = Group::from_gid(script_gid)?;
    if !is_portable(&group.name) {
        return Err(Error::NoPerm(format!("{}: not a portable group name", group.name)));
    }

    Ok((user, group))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_user_lookup_by_name() {
        let user = User::from_name("root").unwrap();
        assert_eq!(user.uid, 0);
        assert_eq!(user.name, "root");
    }

    #[test]
    fn root_user_lookup_by_uid() {
        let user = User::from_uid(0).unwrap().unwrap();
        assert_eq!(user.name, "root");
    }

    #[test]
    fn root_group_lookup_by_gid() {
        let group = Group::from_gid(0).unwrap();
        assert_eq!(group.gid, 0);
    }

    #[test]
    fn unknown_user_is_no_user_error() {
        let err = User::from_name("no-such-user-e8f2b1").unwrap_err();
        assert!(matches!(err, Error::NoUser(_)));
    }

    #[test]
    fn rejects_uid_zero() {
        let err = resolve_owner(0, 1000).unwrap_err();
        assert!(matches!(err, Error::NoPerm(_)));
    }

    #[test]
    fn rejects_out_of_range_uid() {
        let err = resolve_owner(1, 1000).unwrap_err();
        assert!(matches!(err, Error::NoPerm(_)));
    }
}
