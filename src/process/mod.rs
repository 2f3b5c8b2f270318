// Process module - The supervised child and how it gets run

mod child;
pub mod spawner;
pub mod supervisor;

pub use child::MonitoredChild;
pub use spawner::{spawn_process, CommandSpec, SpawnedProcess};
pub use supervisor::{exit_code, supervise};
