use crate::error::{Result, SigrelayError};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::{Child, Command};

/// A command to run under supervision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute, resolved through PATH when it has no slash
    pub program: PathBuf,

    /// Command-line arguments
    pub args: Vec<String>,

    /// Working directory for the process
    pub cwd: Option<PathBuf>,

    /// Extra environment variables on top of the inherited environment
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from a `[program, args...]` vector as given on a command line
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SigrelayError::SpawnError("No command given".to_string()))?;

        Ok(Self::new(program).args(args.iter().cloned()))
    }
}

/// Metadata returned when spawning a process
#[derive(Debug)]
pub struct SpawnedProcess {
    /// The child process handle
    pub child: Child,

    /// Process ID assigned by the OS
    pub pid: u32,
}

/// Spawn a process for supervision
///
/// The child inherits stdin, stdout and stderr from the supervisor, so it
/// shares the terminal the user is sending signals from.
///
/// # Arguments
/// * `spec` - Program, arguments, working directory and environment
///
/// # Returns
/// * `Ok(SpawnedProcess)` - Successfully spawned process with its pid
/// * `Err(SigrelayError)` - Failed to spawn process
pub async fn spawn_process(spec: &CommandSpec) -> Result<SpawnedProcess> {
    if spec.program.as_os_str().is_empty() {
        return Err(SigrelayError::SpawnError("Program name is empty".to_string()));
    }

    let mut command = Command::new(&spec.program);
    command.args(&spec.args);

    if let Some(ref cwd) = spec.cwd {
        command.current_dir(cwd);
    }

    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let child = command.spawn().map_err(|e| {
        SigrelayError::SpawnError(format!(
            "Failed to spawn '{}': {}",
            spec.program.display(),
            e
        ))
    })?;

    let pid = child.id().ok_or_else(|| {
        SigrelayError::SpawnError(format!(
            "Failed to get PID for '{}'",
            spec.program.display()
        ))
    })?;

    tracing::info!("Spawned {} (PID: {})", spec.program.display(), pid);

    Ok(SpawnedProcess { child, pid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_argv() {
        let argv = vec!["make".to_string(), "-j4".to_string(), "all".to_string()];
        let spec = CommandSpec::from_argv(&argv).unwrap();

        assert_eq!(spec.program, PathBuf::from("make"));
        assert_eq!(spec.args, vec!["-j4", "all"]);
        assert!(spec.cwd.is_none());
    }

    #[test]
    fn test_from_argv_empty() {
        let result = CommandSpec::from_argv(&[]);
        assert!(matches!(result, Err(SigrelayError::SpawnError(_))));
    }

    #[tokio::test]
    async fn test_spawn_simple_process() {
        let spec = CommandSpec::new("/bin/echo").arg("hello");

        let mut spawned = spawn_process(&spec).await.unwrap();
        assert!(spawned.pid > 0);

        let status = spawned.child.wait().await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_spawn_resolves_through_path() {
        let spec = CommandSpec::new("true");

        let mut spawned = spawn_process(&spec).await.unwrap();
        assert!(spawned.child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_spawn_with_env_and_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let mut spec = CommandSpec::new("/bin/sh").args(["-c", "test \"$SIGRELAY_TEST\" = yes && test -d ."]);
        spec.cwd = Some(temp_dir.path().to_path_buf());
        spec.env.insert("SIGRELAY_TEST".to_string(), "yes".to_string());

        let mut spawned = spawn_process(&spec).await.unwrap();
        assert!(spawned.child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_spawn_nonexistent_program() {
        let spec = CommandSpec::new("/nonexistent/program");

        let result = spawn_process(&spec).await;
        assert!(matches!(result, Err(SigrelayError::SpawnError(_))));
    }

    #[tokio::test]
    async fn test_spawn_empty_program() {
        let result = spawn_process(&CommandSpec::default()).await;

        match result {
            Err(SigrelayError::SpawnError(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected SpawnError"),
        }
    }
}
