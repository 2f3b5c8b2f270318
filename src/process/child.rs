use crate::process::SpawnedProcess;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// A process that signals can be forwarded to.
///
/// Implementors only need to expose the pid. `None` means the handle was
/// never started or has already been reaped.
pub trait MonitoredChild {
    fn pid(&self) -> Option<Pid>;

    /// Check whether the process still exists by sending it signal 0
    fn is_alive(&self) -> bool {
        match self.pid() {
            Some(pid) => match kill(pid, None) {
                Ok(_) => true,
                Err(Errno::EPERM) => true, // Process exists but we don't have permission
                Err(_) => false,
            },
            None => false,
        }
    }
}

impl MonitoredChild for Pid {
    fn pid(&self) -> Option<Pid> {
        Some(*self)
    }
}

impl MonitoredChild for std::process::Child {
    fn pid(&self) -> Option<Pid> {
        Some(Pid::from_raw(self.id() as i32))
    }
}

impl MonitoredChild for tokio::process::Child {
    fn pid(&self) -> Option<Pid> {
        self.id().map(|id| Pid::from_raw(id as i32))
    }
}

impl MonitoredChild for SpawnedProcess {
    /// The recorded `pid` field outlives the process; only the live handle
    /// knows whether it has been reaped.
    fn pid(&self) -> Option<Pid> {
        self.child.pid()
    }
}
