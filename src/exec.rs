//! Post-drop caller check and the final exec.
//!
//! Grounded on the teacher's `exec::run_command` for the `Command`/
//! `CommandExt` shape, adapted from "fork a child under the target
//! identity" to "replace this already-dropped process in place", since
//! this helper has no fork: `Command::exec` calls `execvp` and only
//! returns on failure.

use std::os::unix::process::CommandExt;
use std::process::Command;

use crate::config::{CGI_HANDLER, WWW_GROUP, WWW_USER};
use crate::error::Error;
use crate::identity::{Group, User};

/// The real UID/GID, captured before any privilege drop, must equal
/// `WWW_USER`'s UID and `WWW_GROUP`'s GID: this is what proves the process
/// was invoked by the web server. Must run before `privdrop::drop_to`,
/// which overwrites the real/effective/saved IDs with the script owner's —
/// checked afterwards, this comparison could never succeed.
pub fn check_caller() -> Result<(), Error> {
    let real_uid = unsafe { libc::getuid() };
    let real_gid = unsafe { libc::getgid() };

    let www_user = User::from_name(WWW_USER)?;
    let www_group = Group::from_name(WWW_GROUP)?;

    if real_uid != www_user.uid {
        return Err(Error::NoPerm(format!(
            "real uid {real_uid} does not match {WWW_USER} ({})",
            www_user.uid
        )));
    }
    if real_gid != www_group.gid {
        return Err(Error::NoPerm(format!(
            "real gid {real_gid} does not match {WWW_GROUP} ({})",
            www_group.gid
        )));
    }

    Ok(())
}

/// Replace the process image with `CGI_HANDLER`, argv `[CGI_HANDLER]`, and
/// `env` as the entire environment. Only returns on failure: a successful
/// `exec` never returns to this code.
pub fn exec_handler(env: Vec<(String, String)>) -> Error {
    let mut command = Command::new(CGI_HANDLER);
    command.env_clear();
    command.envs(env);

    let io_err = command.exec();
    Error::OsErr(format!("execve({CGI_HANDLER}): {io_err}"))
}
