// Signal module - Forwarding of received signals to a supervised child

mod forwarder;
mod handler;
pub mod set;

pub use forwarder::{take_restore_failures, DispositionTable, SignalForwarder};
pub use handler::{active_target, is_active};
pub use set::{forwardable, is_forwardable, parse_signal, SigNum, NEVER_FORWARDED};
