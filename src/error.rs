use std::ffi::CString;
use std::fmt;

use crate::cutils::safe_isatty;
use crate::config::DATE_FORMAT;

/// The `sysexits`-flavoured exit taxonomy this program reports through.
///
/// Every failure in the trust pipeline is fatal: there is no recoverable
/// branch, so a single enum carrying both the exit code and a message is
/// exhausted exactly once, at the top of `main`.
#[derive(Debug)]
pub enum Error {
    /// A required file or environment variable is missing or empty.
    NoInput(String),
    /// A named user or group does not exist.
    NoUser(String),
    /// An invariant was violated: path too long, not canonical, wrong type,
    /// suffix mismatch.
    Unavailable(String),
    /// Internal bug: something that should never be `None`/null was.
    Software(String),
    /// A system call failed (`stat`, `setuid`, `setgid`, `exec`, ...).
    OsErr(String),
    /// An ownership/mode check failed, or the caller's identity didn't match.
    NoPerm(String),
    /// Compile-time configuration is invalid.
    Config(String),
}

impl Error {
    /// The `sysexits(3)` exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NoInput(_) => 66,
            Error::NoUser(_) => 67,
            Error::Unavailable(_) => 69,
            Error::Software(_) => 70,
            Error::OsErr(_) => 71,
            Error::NoPerm(_) => 77,
            Error::Config(_) => 78,
        }
    }

    fn message(&self) -> &str {
        match self {
            Error::NoInput(m)
            | Error::NoUser(m)
            | Error::Unavailable(m)
            | Error::Software(m)
            | Error::OsErr(m)
            | Error::NoPerm(m)
            | Error::Config(m) => m,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::OsErr(err.to_string())
    }
}

/// The single exit path: write one line to standard error (prefixed with
/// the program name, and with a timestamp when standard error is not a
/// terminal) and terminate with the error's `sysexits` code. Never
/// returns.
pub fn die(prog_name: &str, err: Error) -> ! {
    let code = err.exit_code();
    if safe_isatty(libc::STDERR_FILENO) {
        eprintln!("{prog_name}: {err}");
    } else {
        eprintln!("{}: {prog_name}: {err}", timestamp());
    }
    std::process::exit(code);
}

/// Render the current local time per `DATE_FORMAT` using raw
/// `libc::time`/`libc::localtime_r`/`libc::strftime`, so this doesn't pull
/// in a dependency the rest of the crate has no other use for.
fn timestamp() -> String {
    let format = match CString::new(DATE_FORMAT) {
        Ok(f) => f,
        Err(_) => return String::from("?"),
    };

    // SAFETY: `time`/`localtime_r` are passed valid pointers to
    // appropriately-sized, owned local variables.
    let rendered = unsafe {
        let mut clock: libc::time_t = libc::time(std::ptr::null_mut());
        let mut tm: libc::tm = std::mem::zeroed();
        if libc::localtime_r(&mut clock, &mut tm).is_null() {
            return String::from("?");
        }
        let mut buf = vec![0u8; 64];
        let len = libc::strftime(
            buf.as_mut_ptr() as *mut libc::c_char,
            buf.len(),
            format.as_ptr(),
            &tm,
        );
        buf.truncate(len);
        buf
    };

    String::from_utf8_lossy(&rendered).into_owned()
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn exit_codes_match_sysexits() {
        assert_eq!(Error::NoInput("x".into()).exit_code(), 66);
        assert_eq!(Error::NoUser("x".into()).exit_code(), 67);
        assert_eq!(Error::Unavailable("x".into()).exit_code(), 69);
        assert_eq!(Error::Software("x".into()).exit_code(), 70);
        assert_eq!(Error::OsErr("x".into()).exit_code(), 71);
        assert_eq!(Error::NoPerm("x".into()).exit_code(), 77);
        assert_eq!(Error::Config("x".into()).exit_code(), 78);
    }

    #[test]
    fn display_is_the_message() {
        assert_eq!(Error::NoPerm("nope".into()).to_string(), "nope");
    }
}
