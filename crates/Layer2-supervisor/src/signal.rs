//! Termination signals
//!
//! Unix gets SIGTERM then SIGKILL, optionally to the whole process group.
//! Elsewhere there is no graceful signal; callers go straight to
//! `Child::start_kill`.

use std::io;

/// Ask the process (group) to terminate
#[cfg(unix)]
pub(crate) fn terminate(pid: u32, group: bool) -> io::Result<()> {
    send(pid, group, libc::SIGTERM)
}

/// Kill the process group outright; the leader is also killed via `Child`
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) -> io::Result<()> {
    send(pid, true, libc::SIGKILL)
}

#[cfg(unix)]
fn send(pid: u32, group: bool, signal: libc::c_int) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    let target = if group { -pid } else { pid };
    // SAFETY: kill(2) has no memory-safety preconditions
    let rc = unsafe { libc::kill(target, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate(_pid: u32, _group: bool) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination not supported on this platform",
    ))
}

#[cfg(not(unix))]
pub(crate) fn kill_group(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process groups not supported on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_signal_missing_process() {
        // Highest pid_t is never a live process
        let err = terminate(i32::MAX as u32, false).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }

    #[test]
    fn test_pid_out_of_range() {
        let err = terminate(u32::MAX, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
