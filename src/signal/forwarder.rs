use crate::config::ForwardConfig;
use crate::error::{RestoreFailure, Result, SigrelayError};
use crate::process::MonitoredChild;
use crate::signal::handler;
use crate::signal::set::SigNum;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{SaFlags, SigHandler};
use nix::unistd::Pid;
use std::fmt;
use std::mem;
use std::sync::Mutex;

/// Restoration failures from forwarders that were dropped rather than
/// explicitly restored.
static UNREPORTED_FAILURES: Mutex<Vec<RestoreFailure>> = Mutex::new(Vec::new());

/// Drain restoration failures recorded by dropped forwarders.
pub fn take_restore_failures() -> Vec<RestoreFailure> {
    let mut failures = UNREPORTED_FAILURES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::take(&mut *failures)
}

/// Install `action` for `signal` and return the action it replaced.
///
/// Goes through libc directly because realtime signals have no
/// [`nix::sys::signal::Signal`] variant.
///
/// # Safety
///
/// `action` must name a handler that is safe to run in interrupt context.
unsafe fn swap_action(signal: SigNum, action: &libc::sigaction) -> nix::Result<libc::sigaction> {
    let mut previous: libc::sigaction = mem::zeroed();
    Errno::result(libc::sigaction(signal.as_raw(), action, &mut previous))?;
    Ok(previous)
}

/// The action pointing every forwarded signal at the trampoline.
fn forwarding_action(flags: SaFlags) -> libc::sigaction {
    // SAFETY: all-zero is a valid `sigaction`; the mask is then initialised
    // through libc.
    let mut action: libc::sigaction = unsafe { mem::zeroed() };
    action.sa_sigaction = handler::handler_address();
    action.sa_flags = flags.bits();
    unsafe {
        libc::sigemptyset(&mut action.sa_mask);
    }
    action
}

fn handler_of(action: &libc::sigaction) -> SigHandler {
    match action.sa_sigaction {
        libc::SIG_DFL => SigHandler::SigDfl,
        libc::SIG_IGN => SigHandler::SigIgn,
        // SAFETY: anything else was installed as a function pointer of the
        // shape SA_SIGINFO selects.
        address if action.sa_flags & libc::SA_SIGINFO != 0 => unsafe {
            SigHandler::SigAction(mem::transmute::<
                libc::sighandler_t,
                extern "C" fn(libc::c_int, *mut libc::siginfo_t, *mut libc::c_void),
            >(address))
        },
        address => unsafe {
            SigHandler::Handler(mem::transmute::<libc::sighandler_t, extern "C" fn(libc::c_int)>(
                address,
            ))
        },
    }
}

/// Previous dispositions of every signal a forwarder replaced, in
/// installation order.
#[derive(Default)]
pub struct DispositionTable {
    entries: Vec<(SigNum, libc::sigaction)>,
}

impl DispositionTable {
    fn new() -> Self {
        Self::default()
    }

    /// Install `action` for `signal`, remembering what it replaced.
    fn install(&mut self, signal: SigNum, action: &libc::sigaction) -> nix::Result<()> {
        // SAFETY: the installed handler only touches atomics and
        // async-signal-safe libc calls.
        let previous = unsafe { swap_action(signal, action)? };
        self.entries.push((signal, previous));
        Ok(())
    }

    /// Put back every recorded disposition, newest first.
    ///
    /// Keeps going past failures and reports all of them. The table is empty
    /// afterwards.
    fn restore_all(&mut self) -> Vec<RestoreFailure> {
        let mut failures = Vec::new();

        while let Some((signal, previous)) = self.entries.pop() {
            // SAFETY: reinstalls exactly the action the process had before.
            if let Err(errno) = unsafe { swap_action(signal, &previous) } {
                failures.push(RestoreFailure { signal, errno });
            }
        }

        failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signals recorded in the table, in installation order
    pub fn signals(&self) -> impl Iterator<Item = SigNum> + '_ {
        self.entries.iter().map(|(signal, _)| *signal)
    }

    /// The disposition `signal` had before forwarding started
    pub fn previous(&self, signal: impl Into<SigNum>) -> Option<SigHandler> {
        let signal = signal.into();
        self.entries
            .iter()
            .find(|(recorded, _)| *recorded == signal)
            .map(|(_, action)| handler_of(action))
    }
}

impl fmt::Debug for DispositionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(signal, action)| (signal, handler_of(action))))
            .finish()
    }
}

/// Forwards every catchable signal this process receives to one child for as
/// long as it is alive.
///
/// Construction claims the process-wide forwarding slot and installs the
/// forwarding handler; dropping (or [`restore`](Self::restore)) reinstalls
/// the previous dispositions and releases the slot. Only one forwarder can be
/// active per process; a second construction fails with
/// [`SigrelayError::AlreadyActive`].
///
/// The forwarder copies the child's pid and does not borrow the child, so the
/// owner can keep waiting on it. Tear the forwarder down before the child is
/// reaped, while its pid still cannot be reused.
///
/// There is no `Clone` and no `Default`. Moving the guard moves the single
/// teardown responsibility with it.
#[derive(Debug)]
#[must_use = "signals stop being forwarded as soon as the forwarder is dropped"]
pub struct SignalForwarder {
    target: Pid,
    table: DispositionTable,
    released: bool,
}

impl SignalForwarder {
    /// Forward signals to `child` using the default configuration.
    pub fn new<C: MonitoredChild + ?Sized>(child: &C) -> Result<Self> {
        Self::with_config(child, &ForwardConfig::default())
    }

    /// Forward signals to `child`, excluding what `config` excludes.
    pub fn with_config<C: MonitoredChild + ?Sized>(
        child: &C,
        config: &ForwardConfig,
    ) -> Result<Self> {
        let pid = child.pid().ok_or_else(|| {
            SigrelayError::InvalidChild("child has no process id".to_string())
        })?;
        let signals = config.signals()?;
        Self::install(pid, &signals, config.sa_flags())
    }

    pub(crate) fn install(pid: Pid, signals: &[SigNum], flags: SaFlags) -> Result<Self> {
        if pid.as_raw() <= 0 {
            return Err(SigrelayError::InvalidChild(format!(
                "process id {} cannot receive signals",
                pid
            )));
        }

        handler::claim(pid).map_err(|current| SigrelayError::AlreadyActive { pid: current })?;

        let action = forwarding_action(flags);
        let mut table = DispositionTable::new();

        for &signal in signals {
            if let Err(errno) = table.install(signal, &action) {
                let leftovers = table.restore_all();
                handler::release(pid);

                for failure in &leftovers {
                    tracing::warn!(
                        "Failed to roll back {} after install error: {}",
                        failure.signal,
                        failure.errno
                    );
                }

                return Err(SigrelayError::Install {
                    signal,
                    source: errno,
                });
            }
        }

        tracing::debug!(
            "Forwarding {} signals to child process {}",
            table.len(),
            pid
        );

        Ok(Self {
            target: pid,
            table,
            released: false,
        })
    }

    /// Pid of the child receiving forwarded signals
    pub fn target(&self) -> Pid {
        self.target
    }

    /// Signals currently being forwarded
    pub fn signals(&self) -> impl Iterator<Item = SigNum> + '_ {
        self.table.signals()
    }

    /// Dispositions that will be restored on teardown
    pub fn dispositions(&self) -> &DispositionTable {
        &self.table
    }

    /// Stop forwarding and report any disposition that could not be restored.
    pub fn restore(mut self) -> Result<()> {
        let failures = self.release();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SigrelayError::Restore(failures))
        }
    }

    fn release(&mut self) -> Vec<RestoreFailure> {
        if self.released {
            return Vec::new();
        }
        self.released = true;

        // Dispositions go back before the target is cleared, so a signal
        // arriving mid-teardown still reaches the child or the original
        // handler.
        let restored = self.table.len();
        let failures = self.table.restore_all();
        handler::release(self.target);

        tracing::debug!(
            "Stopped forwarding to child process {} ({} of {} dispositions restored)",
            self.target,
            restored - failures.len(),
            restored
        );

        failures
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        let failures = self.release();
        if failures.is_empty() {
            return;
        }

        for failure in &failures {
            tracing::warn!(
                "Failed to restore disposition of {}: {}",
                failure.signal,
                failure.errno
            );
        }

        UNREPORTED_FAILURES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(failures);
    }
}
