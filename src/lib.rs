// src/lib.rs

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod launch;
pub mod layout;
pub mod logging;
pub mod repository;
pub mod template;

use anyhow::Result;
use tracing::debug;

use crate::cache::ResourceCache;
use crate::cli::{CliArgs, Command, LaunchTarget};
use crate::config::load_settings;
use crate::launch::{
    DryRunBackend, LaunchOutcome, LaunchRequest, RealLaunchBackend, Supervisor,
};
use crate::layout::Layout;
use crate::repository::LocalRepository;
use crate::template::Ambient;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the launcher home layout and `launcher.toml` settings
/// - the local repository and the staging cache
/// - the supervisor with the real or dry-run backend
///
/// Status lines for stop/kill go to stdout.
pub async fn run(args: CliArgs) -> Result<()> {
    let layout = Layout::new(args.home_dir());
    let settings = load_settings(&layout)?;
    debug!(
        home = %layout.home().display(),
        repository = %settings.repository().display(),
        "launcher home"
    );

    let repository = LocalRepository::new(settings.repository(), settings.default_extension());
    let cache = ResourceCache::new(layout.cache_dir());
    let ambient = Ambient::capture(layout.home());
    let supervisor = Supervisor::new(&layout, &repository, &cache, &ambient);

    match args.command {
        Command::Start(target) => {
            let outcome = supervisor
                .start(&request(target), &RealLaunchBackend::new())
                .await?;
            if let LaunchOutcome::Started { pid } = outcome {
                println!("Process started with PID={pid}");
            }
        }
        Command::DryRun(target) => {
            supervisor.dry_run(&request(target), &DryRunBackend).await?;
        }
        Command::Stop(target) => {
            let outcome = supervisor.stop(&target.profile, &target.command).await?;
            println!("{outcome}");
        }
        Command::Kill(target) => {
            let outcome = supervisor.kill(&target.profile, &target.command).await?;
            println!("{outcome}");
        }
    }

    Ok(())
}

fn request(target: LaunchTarget) -> LaunchRequest {
    LaunchRequest::new(target.profile, target.command).with_args(target.extra_args)
}
