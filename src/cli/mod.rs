// CLI module - Run a command with signal forwarding

mod output;

use crate::config::ForwardConfig;
use crate::error::{Result, SigrelayError};
use crate::process::{exit_code, supervise, CommandSpec};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use output::print_error;

/// sigrelay - run a command and forward every signal it should see
#[derive(Parser, Debug)]
#[command(name = "sigrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Signal to keep instead of forwarding (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "SIGNAL")]
    exclude: Vec<String>,

    /// Working directory for the command
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Environment variables (KEY=VALUE format)
    #[arg(short, long)]
    env: Vec<String>,

    /// Print the signals that would be forwarded and exit
    #[arg(long)]
    list_signals: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command to run, followed by its arguments
    #[arg(last = true)]
    command: Vec<String>,
}

impl Cli {
    /// Run the CLI application, returning the process exit code
    pub fn run() -> Result<i32> {
        let cli = Cli::parse();
        cli.init_logging();
        cli.execute()
    }

    fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<i32> {
        let config = self.build_config()?;

        if self.list_signals {
            output::print_signals(&config.signals()?);
            return Ok(0);
        }

        let spec = self.build_spec()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let status = runtime.block_on(supervise(&spec, &config))?;

        Ok(exit_code(&status))
    }

    /// Merge the configuration file with command-line exclusions
    fn build_config(&self) -> Result<ForwardConfig> {
        let mut config = match &self.config {
            Some(path) => ForwardConfig::from_file(path)?,
            None => ForwardConfig::default(),
        };

        for name in &self.exclude {
            config.exclude_signal(name)?;
        }
        config.validate()?;

        Ok(config)
    }

    /// Build the command to supervise from the trailing arguments
    fn build_spec(&self) -> Result<CommandSpec> {
        let mut spec = CommandSpec::from_argv(&self.command)?;
        spec.cwd = self.cwd.clone();
        spec.env = parse_env_vars(&self.env)?;
        Ok(spec)
    }
}

/// Parse environment variables from KEY=VALUE format
fn parse_env_vars(env_vars: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for env_str in env_vars {
        if let Some((key, value)) = env_str.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        } else {
            return Err(SigrelayError::ConfigError(format!(
                "Invalid environment variable format: '{}'. Expected KEY=VALUE",
                env_str
            )));
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sigrelay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_env_vars() {
        let env_vars = vec!["CC=clang".to_string(), "JOBS=4".to_string()];
        let result = parse_env_vars(&env_vars).unwrap();
        assert_eq!(result.get("CC"), Some(&"clang".to_string()));
        assert_eq!(result.get("JOBS"), Some(&"4".to_string()));
    }

    #[test]
    fn test_parse_env_vars_invalid() {
        let env_vars = vec!["INVALID".to_string()];
        let result = parse_env_vars(&env_vars);
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_command() {
        let cli = parse(&["-x", "HUP", "--", "make", "-j4"]);
        assert_eq!(cli.command, vec!["make", "-j4"]);

        let spec = cli.build_spec().unwrap();
        assert_eq!(spec.program, PathBuf::from("make"));
        assert_eq!(spec.args, vec!["-j4"]);
    }

    #[test]
    fn test_cli_exclusions_extend_defaults() {
        let cli = parse(&["-x", "HUP", "--exclude", "SIGUSR1", "--", "true"]);
        let config = cli.build_config().unwrap();

        assert_eq!(config.exclude, vec!["SIGPIPE", "SIGHUP", "SIGUSR1"]);
        let signals = config.signals().unwrap();
        assert!(!signals.contains(&Signal::SIGHUP.into()));
        assert!(signals.contains(&Signal::SIGTERM.into()));
    }

    #[test]
    fn test_cli_rejects_unknown_signal() {
        let cli = parse(&["-x", "SIGWHAT", "--", "true"]);
        assert!(matches!(
            cli.build_config(),
            Err(SigrelayError::InvalidSignal(_))
        ));
    }

    #[test]
    fn test_missing_command() {
        let cli = parse(&[]);
        assert!(matches!(
            cli.build_spec(),
            Err(SigrelayError::SpawnError(_))
        ));
    }
}
