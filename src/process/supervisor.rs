use crate::config::ForwardConfig;
use crate::error::{Result, SigrelayError};
use crate::process::spawner::{spawn_process, CommandSpec};
use crate::signal::SignalForwarder;
use nix::errno::Errno;
use nix::sys::wait::{waitid, Id, WaitPidFlag};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use tracing::{info, warn};

/// Run a command, forwarding every signal the supervisor receives to it
/// until it exits.
///
/// The forwarder is torn down once the child has exited but before it is
/// reaped. Until the reap the zombie keeps its pid, so no signal can reach an
/// unrelated process that inherited it. Failing to restore a disposition is
/// logged and does not affect the returned status.
///
/// # Arguments
/// * `spec` - Command to run
/// * `config` - Which signals to forward
///
/// # Returns
/// * `Ok(ExitStatus)` - The child ran to completion
/// * `Err(SigrelayError)` - The child could not be started, forwarding could
///   not be set up, or waiting for it failed
pub async fn supervise(spec: &CommandSpec, config: &ForwardConfig) -> Result<ExitStatus> {
    let mut spawned = spawn_process(spec).await?;

    let forwarder = match SignalForwarder::with_config(&spawned, config) {
        Ok(forwarder) => forwarder,
        Err(e) => {
            // Don't leave a child running that nobody forwards to or waits for.
            let _ = spawned.child.start_kill();
            let _ = spawned.child.wait().await;
            return Err(e);
        }
    };

    let exited = wait_for_exit(forwarder.target()).await;

    if let Err(e) = forwarder.restore() {
        warn!("{}", e);
    }

    if let Err(e) = exited {
        let _ = spawned.child.start_kill();
        let _ = spawned.child.wait().await;
        return Err(e);
    }

    let status = spawned
        .child
        .wait()
        .await
        .map_err(|e| SigrelayError::WaitError(format!("PID {}: {}", spawned.pid, e)))?;

    info!("Execution finished with status: {}", status);

    Ok(status)
}

/// Block until `pid` has exited, leaving it unreaped.
///
/// `WNOWAIT` keeps the zombie in place, so `pid` stays reserved until the
/// owner's own wait collects the status.
pub(crate) async fn wait_for_exit(pid: Pid) -> Result<()> {
    tokio::task::spawn_blocking(move || loop {
        match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
            Err(Errno::EINTR) => continue,
            // ECHILD: somebody else already reaped it.
            Ok(_) | Err(Errno::ECHILD) => return Ok(()),
            Err(e) => {
                return Err(SigrelayError::WaitError(format!("PID {}: {}", pid, e)))
            }
        }
    })
    .await
    .map_err(|e| SigrelayError::WaitError(format!("PID {}: {}", pid, e)))?
}

/// Exit code a wrapper should report for `status`
///
/// Follows the shell convention of `128 + signal` for children killed by a
/// signal.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        code
    } else if let Some(signal) = status.signal() {
        128 + signal
    } else {
        1
    }
}
