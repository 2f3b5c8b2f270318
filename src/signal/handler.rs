//! Process-wide forwarding target and the interrupt-context handler.
//!
//! Signal handlers cannot capture per-instance data, so the pid that receives
//! forwarded signals lives in a single atomic word. Only one forwarder may own
//! it at a time: [`claim`] swaps it from unset to a pid, [`release`] swaps it
//! back. The handler itself only ever loads it.
//!
//! Everything reachable from [`forward_signal`] must be async-signal-safe: no
//! allocation, no locks, no logging, no panics. It calls straight into libc
//! for that reason.

use nix::errno::Errno;
use nix::libc;
use nix::unistd::Pid;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};

/// Value of [`ACTIVE_TARGET`] when no forwarder is active.
const UNSET: i32 = 0;

/// Pid of the child currently receiving forwarded signals.
static ACTIVE_TARGET: AtomicI32 = AtomicI32::new(UNSET);

/// Make `pid` the active target.
///
/// Fails with the pid already being targeted if another forwarder owns the
/// slot; the existing target is left untouched.
pub(crate) fn claim(pid: Pid) -> Result<(), i32> {
    ACTIVE_TARGET
        .compare_exchange(UNSET, pid.as_raw(), Ordering::AcqRel, Ordering::Acquire)
        .map(|_| ())
}

/// Clear the active target if it still belongs to `pid`.
pub(crate) fn release(pid: Pid) {
    let _ = ACTIVE_TARGET.compare_exchange(
        pid.as_raw(),
        UNSET,
        Ordering::AcqRel,
        Ordering::Acquire,
    );
}

/// The pid currently receiving forwarded signals, if any.
pub fn active_target() -> Option<Pid> {
    match ACTIVE_TARGET.load(Ordering::Acquire) {
        UNSET => None,
        raw => Some(Pid::from_raw(raw)),
    }
}

/// Whether a forwarder is active anywhere in this process.
pub fn is_active() -> bool {
    active_target().is_some()
}

/// Installed as the handler for every forwarded signal.
///
/// Resends `signum` to the active target. When the target has already been
/// cleared the signal is re-raised against the supervisor's own disposition
/// instead, so it is neither lost nor sent to a stale pid.
pub(crate) extern "C" fn forward_signal(signum: libc::c_int) {
    let saved_errno = Errno::last_raw();

    let target = ACTIVE_TARGET.load(Ordering::Acquire);
    if target > 0 {
        // ESRCH after the child exited is fine to drop.
        unsafe {
            libc::kill(target, signum);
        }
    } else {
        fall_back(signum);
    }

    Errno::set_raw(saved_errno);
}

/// Deliver `signum` to the supervisor itself.
///
/// If this handler is still installed for `signum` it is replaced by the
/// default action first; otherwise the restored disposition is kept. The
/// re-raised signal stays pending until the handler returns.
fn fall_back(signum: libc::c_int) {
    unsafe {
        let mut current: libc::sigaction = mem::zeroed();
        if libc::sigaction(signum, ptr::null(), &mut current) == 0
            && current.sa_sigaction == handler_address()
        {
            libc::signal(signum, libc::SIG_DFL);
        }
        libc::raise(signum);
    }
}

/// Address of [`forward_signal`] as stored in `sa_sigaction`.
pub(crate) fn handler_address() -> libc::sighandler_t {
    forward_signal as extern "C" fn(libc::c_int) as libc::sighandler_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(signals)]
    fn test_claim_is_exclusive() {
        let first = Pid::from_raw(1001);
        let second = Pid::from_raw(1002);

        assert!(claim(first).is_ok());
        assert_eq!(active_target(), Some(first));

        assert_eq!(claim(second), Err(1001));
        assert_eq!(active_target(), Some(first));

        release(first);
        assert!(!is_active());
    }

    #[test]
    #[serial(signals)]
    fn test_release_ignores_foreign_pid() {
        let owner = Pid::from_raw(2001);
        claim(owner).unwrap();

        release(Pid::from_raw(2002));
        assert_eq!(active_target(), Some(owner));

        release(owner);
        assert_eq!(active_target(), None);
    }
}
