// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `launcher`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "launcher",
    version,
    about = "Stage artifacts, start and supervise application runtimes.",
    long_about = None
)]
pub struct CliArgs {
    /// Launcher home directory (profiles, commands, cache).
    ///
    /// Falls back to `LAUNCHER_HOME`, then the current working directory.
    #[arg(long, value_name = "PATH", env = "LAUNCHER_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LAUNCHER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve, stage and start a command in the background.
    Start(LaunchTarget),

    /// Ask a running command to terminate and wait for it to exit.
    Stop(ProcessTarget),

    /// Forcibly terminate a running command.
    Kill(ProcessTarget),

    /// Run the whole resolution and staging pipeline, print the launch plan,
    /// but don't spawn anything.
    DryRun(LaunchTarget),
}

/// Profile + command pair with extra arguments for the started process.
#[derive(Debug, Clone, Args)]
pub struct LaunchTarget {
    pub profile: String,
    pub command: String,

    /// Appended, individually escaped, to the resolved argument list.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ProcessTarget {
    pub profile: String,
    pub command: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Launcher home, defaulting to the current directory.
    pub fn home_dir(&self) -> PathBuf {
        self.home
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
