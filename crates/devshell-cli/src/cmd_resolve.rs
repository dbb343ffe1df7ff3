// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devshell resolve` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

/// Resolve build inputs and print the result
#[derive(Debug, Args)]
pub struct CmdResolve {
    /// Start discovery from PATH
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Source and platform selection flags
    #[clap(flatten)]
    sources: crate::SourceFlags,

    /// Output format: table, yaml, json, script
    #[clap(long, default_value = "table")]
    format: String,
}

impl CmdResolve {
    pub async fn run(&mut self) -> Result<i32> {
        let prepared = self.sources.prepare(&self.file)?;
        let (resolved, _) = prepared.resolve().await?;

        match self.format.as_str() {
            "yaml" => print!("{}", resolved.to_yaml()?),
            "json" => {
                let json = serde_json::to_string_pretty(&resolved).into_diagnostic()?;
                println!("{json}");
            }
            "script" => {
                let ops = devshell::env_ops_for(&resolved);
                print!(
                    "{}",
                    devshell::generate_startup_script(&ops, &prepared.spec.shell_hook)
                );
            }
            _ => {
                println!(
                    "{} {}",
                    "Resolved for".bold(),
                    resolved.platform.to_string().yellow()
                );
                println!();
                for input in resolved.inputs.values() {
                    let channel = input
                        .channel
                        .as_deref()
                        .map(|c| format!("@{c}"))
                        .unwrap_or_default();
                    println!(
                        "  {}{} {} {}",
                        input.name.green(),
                        channel,
                        input.version.cyan(),
                        format!("from {}", input.source).dimmed()
                    );
                    println!("    {}", input.prefix.display().to_string().dimmed());
                }
                println!();
                println!("Digest: {}", resolved.digest());
            }
        }

        Ok(0)
    }
}
