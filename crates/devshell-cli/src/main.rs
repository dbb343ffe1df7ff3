// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! devshell - Declarative Development Shell Resolver CLI

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_check;
mod cmd_init;
mod cmd_load;
mod cmd_lock;
mod cmd_resolve;
mod cmd_shell;
mod cmd_show;
#[cfg(test)]
mod test_fixtures;

use cmd_check::CmdCheck;
use cmd_init::CmdInit;
use cmd_load::CmdLoad;
use cmd_lock::CmdLock;
use cmd_resolve::CmdResolve;
use cmd_shell::CmdShell;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "devshell",
    about = "Declarative Development Shell Resolver",
    version,
    long_about = "Resolve .devshell.yaml descriptors into reproducible development shells"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Flags controlling where sources come from and which platform is resolved.
#[derive(Parser, Clone, Debug, Default)]
pub struct SourceFlags {
    /// Resolve for this platform instead of the host (e.g. aarch64-darwin)
    #[clap(long)]
    pub platform: Option<String>,

    /// Directory holding <owner>/<repo>/<ref>.yaml source snapshots
    #[clap(long)]
    pub mirror_root: Option<PathBuf>,
}

/// Everything a command needs to resolve the descriptor it was pointed at.
pub struct Prepared {
    pub spec: devshell::EnvironmentSpec,
    pub config: devshell::Config,
    pub platform: devshell::Platform,
    pub fetcher: devshell::MirrorFetcher,
}

impl SourceFlags {
    /// Load configuration, apply flag overrides and discover the descriptor.
    pub fn prepare(&self, file: &Path) -> Result<Prepared> {
        let mut config = devshell::Config::load()?;
        if let Some(platform) = &self.platform {
            config.platform = Some(platform.clone());
        }
        if let Some(root) = &self.mirror_root {
            config.mirror_root = Some(root.clone());
        }

        let spec = devshell::discover_spec(file)?;
        let platform = config.platform()?;
        let fetcher = devshell::MirrorFetcher::new(config.mirror_root());
        tracing::debug!(
            spec = ?spec.source_path,
            %platform,
            mirror = %fetcher.root().display(),
            "prepared"
        );

        Ok(Prepared {
            spec,
            config,
            platform,
            fetcher,
        })
    }
}

impl Prepared {
    /// Fetch all sources and resolve the descriptor.
    pub async fn resolve(
        &self,
    ) -> Result<(devshell::ResolvedEnvironment, Vec<devshell::SourceSnapshot>)> {
        // check first so an unsupported platform never touches the mirror
        self.spec.check_platform(&self.platform)?;
        let snapshots = devshell::fetch_sources(&self.spec, &self.fetcher).await?;
        let resolved = devshell::resolve_snapshots(&self.spec, &self.platform, &snapshots)?;
        Ok((resolved, snapshots))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new .devshell.yaml file
    Init(CmdInit),

    /// Display the environment descriptor
    Show(CmdShow),

    /// Resolve build inputs and print the result
    Resolve(CmdResolve),

    /// Enter environment from current directory
    Load(CmdLoad),

    /// Enter interactive shell in environment
    Shell(CmdShell),

    /// Generate or update lock file
    Lock(CmdLock),

    /// Verify environment matches lock file
    Check(CmdCheck),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        match self.cmd {
            Command::Init(mut cmd) => cmd.run().await,
            Command::Show(mut cmd) => cmd.run().await,
            Command::Resolve(mut cmd) => cmd.run().await,
            Command::Load(mut cmd) => cmd.run().await,
            Command::Shell(mut cmd) => cmd.run().await,
            Command::Lock(mut cmd) => cmd.run().await,
            Command::Check(mut cmd) => cmd.run().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}
