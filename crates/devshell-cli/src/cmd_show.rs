// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devshell show` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

/// Display the environment descriptor
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Start discovery from PATH
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Output format: table, yaml, json
    #[clap(long, default_value = "table")]
    format: String,
}

impl CmdShow {
    pub async fn run(&mut self) -> Result<i32> {
        let spec = devshell::discover_spec(&self.file)?;

        match self.format.as_str() {
            "yaml" => print!("{}", spec.to_yaml()?),
            "json" => {
                let json = serde_json::to_string_pretty(&spec).into_diagnostic()?;
                println!("{json}");
            }
            _ => self.show_table(&spec),
        }

        Ok(0)
    }

    fn show_table(&self, spec: &devshell::EnvironmentSpec) {
        let path = spec
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        println!("{} {}", "Descriptor:".bold(), path.cyan());
        if let Some(desc) = &spec.description {
            println!("  {}", desc.dimmed());
        }
        println!();

        println!("{} {}", "Platform:".bold(), spec.platform.to_string().yellow());
        if let Ok(host) = devshell::Platform::current() {
            if host != spec.platform {
                println!(
                    "  {}",
                    format!("(host is {host}, this environment cannot be entered here)").red()
                );
            }
        }
        println!();

        println!("{}", "Package Sources (later sources win):".bold());
        for (i, source) in spec.sources.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                source.name.green(),
                source.locator.to_string().dimmed()
            );
        }
        println!();

        println!("{}", "Build Inputs:".bold());
        for input in spec.sorted_build_inputs() {
            println!("  - {}", input.to_string().green());
        }
        println!();

        println!("{}", "Shell Hook:".bold());
        println!("  {}", spec.shell_hook);
    }
}
