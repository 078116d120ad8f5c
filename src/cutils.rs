//! Thin wrappers around the handful of libc calls the trust pipeline needs.
//!
//! Grounded on the `cutils` module of the teacher this crate is built from:
//! the same `cerr`/`sysconf`/`string_from_ptr` shapes, trimmed to what a
//! read-only identity/filesystem pipeline actually calls.

use std::ffi::CStr;

/// Turn a libc call's `-1`-on-error convention into a `Result`.
pub fn cerr<Int: Copy + TryInto<libc::c_long>>(res: Int) -> std::io::Result<Int> {
    match res.try_into() {
        Ok(-1) => Err(std::io::Error::last_os_error()),
        _ => Ok(res),
    }
}

extern "C" {
    #[cfg_attr(
        any(target_os = "macos", target_os = "ios", target_os = "freebsd"),
        link_name = "__error"
    )]
    #[cfg_attr(
        any(target_os = "openbsd", target_os = "netbsd", target_os = "android"),
        link_name = "__errno"
    )]
    #[cfg_attr(target_os = "linux", link_name = "__errno_location")]
    fn errno_location() -> *mut libc::c_int;
}

pub fn set_errno(no: libc::c_int) {
    unsafe { *errno_location() = no };
}

/// Query a `sysconf(3)` variable, returning `None` if the system reports it
/// as unbounded (the historical "no limit" convention: a `-1` return with
/// `errno` left unset).
pub fn sysconf(name: libc::c_int) -> Option<libc::c_long> {
    set_errno(0);
    cerr(unsafe { libc::sysconf(name) }).ok()
}

/// Query a `pathconf(3)` variable for a specific path.
///
/// # Safety
/// `path` must be a valid pointer to a NUL-terminated C string.
pub fn pathconf(path: &CStr, name: libc::c_int) -> Option<libc::c_long> {
    set_errno(0);
    cerr(unsafe { libc::pathconf(path.as_ptr(), name) }).ok()
}

/// Copy a C string pointer into an owned Rust `String`, lossily.
///
/// # Safety
/// `ptr` must be either null or point to a valid NUL-terminated C string.
pub unsafe fn string_from_ptr(ptr: *const libc::c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        let cstr = unsafe { CStr::from_ptr(ptr) };
        cstr.to_string_lossy().to_string()
    }
}

/// Rust's standard library `IsTerminal` calls `isatty` unconditionally,
/// which performs an ioctl on whatever fd is passed; since stderr's fd
/// identity is not under this program's control before the environment is
/// sanitised, check it is a character device first.
pub fn safe_isatty(fildes: libc::c_int) -> bool {
    let mut maybe_stat = std::mem::MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fildes, maybe_stat.as_mut_ptr()) } == 0 {
        let mode = unsafe { maybe_stat.assume_init() }.st_mode;
        let is_char_device = (mode & libc::S_IFMT) == libc::S_IFCHR;
        is_char_device && unsafe { libc::isatty(fildes) != 0 }
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::string_from_ptr;

    #[test]
    fn str_to_ptr() {
        let strp = |ptr| unsafe { string_from_ptr(ptr) };
        assert_eq!(strp(std::ptr::null()), "");
        assert_eq!(strp("\0".as_ptr() as *const libc::c_char), "");
        assert_eq!(strp("hello\0".as_ptr() as *const libc::c_char), "hello");
    }

    #[test]
    fn tty_detection() {
        use std::fs::File;
        use std::os::fd::AsRawFd;
        assert!(!super::safe_isatty(
            File::open("/bin/sh").or_else(|_| File::open("/bin/ls")).unwrap().as_raw_fd()
        ));
        assert!(!super::safe_isatty(-837492));
    }
}
