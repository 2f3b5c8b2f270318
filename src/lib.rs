// Library exports for sigrelay

pub mod cli;
pub mod config;
pub mod error;
pub mod process;
pub mod signal;

pub use config::ForwardConfig;
pub use error::{Result, SigrelayError};
pub use process::{supervise, CommandSpec, MonitoredChild};
pub use signal::{SigNum, SignalForwarder};
