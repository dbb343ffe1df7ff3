// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devshell load` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

/// Enter environment from current directory
#[derive(Debug, Args)]
pub struct CmdLoad {
    /// Start discovery from PATH
    #[clap(short = 'f', long, default_value = ".")]
    pub file: PathBuf,

    /// Source and platform selection flags
    #[clap(flatten)]
    pub sources: crate::SourceFlags,

    /// Show what would be loaded without entering
    #[clap(long)]
    pub dry_run: bool,

    /// Command to run (default: $SHELL)
    #[clap(last = true)]
    pub command: Vec<String>,
}

impl CmdLoad {
    pub async fn run(&mut self) -> Result<i32> {
        let prepared = self.sources.prepare(&self.file)?;
        let (resolved, _) = prepared.resolve().await?;

        // Dry run: just show what would be loaded
        if self.dry_run {
            if let Some(path) = &prepared.spec.source_path {
                println!("{} {}", "Descriptor:".bold(), path.display());
            }
            println!("{} build inputs:", resolved.len());
            for input in resolved.inputs.values() {
                println!(
                    "  - {} {}",
                    input.name.green(),
                    format!("{} ({})", input.version, input.source).dimmed()
                );
            }
            return Ok(0);
        }

        let mut stdout = std::io::stdout();
        let shell = devshell::Shell::instantiate(&prepared.spec, &resolved, &mut stdout)?;

        // Determine command to run
        let (command, args) = match self.command.split_first() {
            Some((cmd, args)) => (cmd.clone(), args.to_vec()),
            None => (default_shell(&prepared.config), Vec::new()),
        };

        tracing::info!(%command, digest = %resolved.digest(), "entering environment");
        let code = shell.run(&command, &args)?;
        Ok(code)
    }
}

/// $SHELL, then the configured shell, then /bin/sh.
pub fn default_shell(config: &devshell::Config) -> String {
    std::env::var("SHELL")
        .ok()
        .or_else(|| config.shell.clone())
        .unwrap_or_else(|| "/bin/sh".to_string())
}
