// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devshell shell` command.

use clap::Args;
use miette::Result;
use std::path::PathBuf;

/// Enter interactive shell in environment
#[derive(Debug, Args)]
pub struct CmdShell {
    /// Start discovery from PATH
    #[clap(short = 'f', long, default_value = ".")]
    file: PathBuf,

    /// Source and platform selection flags
    #[clap(flatten)]
    sources: crate::SourceFlags,

    /// Shell to use
    #[clap(long)]
    shell: Option<String>,
}

impl CmdShell {
    pub async fn run(&mut self) -> Result<i32> {
        let shell = match &self.shell {
            Some(shell) => shell.clone(),
            None => super::cmd_load::default_shell(&devshell::Config::load()?),
        };

        // Build load command with our settings
        let mut load_cmd = super::cmd_load::CmdLoad {
            file: self.file.clone(),
            sources: self.sources.clone(),
            dry_run: false,
            command: vec![shell],
        };

        load_cmd.run().await
    }
}
