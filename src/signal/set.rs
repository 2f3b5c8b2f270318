use crate::error::{Result, SigrelayError};
use nix::libc::c_int;
use nix::sys::signal::Signal;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Signals that are never forwarded.
///
/// SIGKILL and SIGSTOP cannot be caught. SIGCHLD belongs to whoever reaps the
/// child. The rest are raised synchronously by the supervisor itself: faults,
/// `abort()`, breakpoints and file-size overruns. Returning from a handler
/// for a fault re-executes the faulting instruction, and the child never
/// earned any of them.
pub const NEVER_FORWARDED: &[Signal] = &[
    Signal::SIGKILL,
    Signal::SIGSTOP,
    Signal::SIGCHLD,
    Signal::SIGSEGV,
    Signal::SIGBUS,
    Signal::SIGFPE,
    Signal::SIGILL,
    Signal::SIGSYS,
    Signal::SIGABRT,
    Signal::SIGTRAP,
    Signal::SIGXFSZ,
];

/// A signal number, standard or realtime.
///
/// [`Signal`] only names the standard signals; realtime signals between
/// `SIGRTMIN` and `SIGRTMAX` are only known at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SigNum(c_int);

impl SigNum {
    /// Wrap a raw signal number in `1..=SIGRTMAX`.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        if raw >= 1 && raw <= max_signal() {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// `SIGRTMIN + offset`, if that is still a realtime signal.
    pub fn realtime(offset: c_int) -> Option<Self> {
        let range = realtime_range();
        let raw = range.start().checked_add(offset)?;
        range.contains(&raw).then_some(Self(raw))
    }

    pub fn as_raw(self) -> c_int {
        self.0
    }

    /// The standard signal this number names, if any
    pub fn as_signal(self) -> Option<Signal> {
        Signal::try_from(self.0).ok()
    }

    pub fn is_realtime(self) -> bool {
        realtime_range().contains(&self.0)
    }
}

impl From<Signal> for SigNum {
    fn from(signal: Signal) -> Self {
        Self(signal as c_int)
    }
}

impl PartialEq<Signal> for SigNum {
    fn eq(&self, other: &Signal) -> bool {
        self.0 == *other as c_int
    }
}

impl fmt::Display for SigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(signal) = self.as_signal() {
            return f.write_str(signal.as_str());
        }

        let range = realtime_range();
        match self.0 - range.start() {
            0 if range.contains(&self.0) => f.write_str("SIGRTMIN"),
            offset if range.contains(&self.0) => write!(f, "SIGRTMIN+{}", offset),
            _ => write!(f, "signal {}", self.0),
        }
    }
}

/// Signals applications may use freely, `SIGRTMIN()..=SIGRTMAX()`.
///
/// The numbers between the standard signals and `SIGRTMIN` are reserved by
/// libc for its threading implementation.
#[cfg(target_os = "linux")]
fn realtime_range() -> RangeInclusive<c_int> {
    nix::libc::SIGRTMIN()..=nix::libc::SIGRTMAX()
}

#[cfg(not(target_os = "linux"))]
fn realtime_range() -> RangeInclusive<c_int> {
    1..=0
}

fn max_signal() -> c_int {
    let standard = Signal::iterator()
        .map(|signal| signal as c_int)
        .max()
        .unwrap_or(0);
    standard.max(*realtime_range().end())
}

/// Parse a signal from `SIGTERM`, `TERM`, `term`, `15`, `SIGRTMIN+2` or
/// `RTMAX-1`.
pub fn parse_signal(spec: &str) -> Result<SigNum> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(SigrelayError::InvalidSignal("empty signal name".to_string()));
    }

    if let Ok(number) = trimmed.parse::<c_int>() {
        return SigNum::from_raw(number).ok_or_else(|| {
            SigrelayError::InvalidSignal(format!("unknown signal number: {}", number))
        });
    }

    let upper = trimmed.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };

    if let Some(rest) = name.strip_prefix("SIGRTMIN") {
        return parse_realtime(spec, rest, false);
    }
    if let Some(rest) = name.strip_prefix("SIGRTMAX") {
        return parse_realtime(spec, rest, true);
    }

    Signal::from_str(&name)
        .map(SigNum::from)
        .map_err(|_| SigrelayError::InvalidSignal(format!("unknown signal name: {}", spec)))
}

/// `rest` is what follows `SIGRTMIN` (`+n`) or `SIGRTMAX` (`-n`).
fn parse_realtime(spec: &str, rest: &str, from_max: bool) -> Result<SigNum> {
    let invalid = || SigrelayError::InvalidSignal(format!("unknown signal name: {}", spec));

    let offset = if rest.is_empty() {
        0
    } else {
        let digits = rest
            .strip_prefix(if from_max { '-' } else { '+' })
            .ok_or_else(invalid)?;
        digits.parse::<c_int>().map_err(|_| invalid())?
    };

    let range = realtime_range();
    let raw = if from_max {
        range.end().checked_sub(offset)
    } else {
        range.start().checked_add(offset)
    };

    match raw {
        Some(raw) if range.contains(&raw) => Ok(SigNum(raw)),
        _ => Err(invalid()),
    }
}

/// Whether `signal` may be forwarded at all.
pub fn is_forwardable(signal: SigNum) -> bool {
    if signal.is_realtime() {
        return true;
    }
    match signal.as_signal() {
        Some(standard) => !NEVER_FORWARDED.contains(&standard),
        None => false,
    }
}

/// Every standard and realtime signal of the platform, ascending, minus the
/// never-forwarded set and `excluded`.
pub fn forwardable(excluded: &[SigNum]) -> Vec<SigNum> {
    let mut signals: Vec<SigNum> = Signal::iterator()
        .map(SigNum::from)
        .chain(realtime_range().map(SigNum))
        .filter(|signal| is_forwardable(*signal) && !excluded.contains(signal))
        .collect();
    signals.sort();
    signals.dedup();
    signals
}
