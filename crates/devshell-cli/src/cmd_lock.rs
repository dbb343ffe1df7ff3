// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Generate or update lock files for devshell environments.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Generate or update lock file
#[derive(Debug, Args)]
pub struct CmdLock {
    /// Start discovery from PATH
    #[clap(short, long, default_value = ".")]
    pub file: PathBuf,

    /// Update existing lock file
    #[clap(long)]
    pub update: bool,

    /// Force regeneration even if up-to-date
    #[clap(long)]
    pub force: bool,

    /// Verify lock is current (exit 1 if not)
    #[clap(long)]
    pub check: bool,

    /// Source and platform selection flags
    #[clap(flatten)]
    pub sources: crate::SourceFlags,
}

impl CmdLock {
    pub async fn run(&mut self) -> Result<i32> {
        let prepared = self.sources.prepare(&self.file)?;
        let lock_path = devshell::lock_path_for(&prepared.spec)?;

        if self.check {
            // Verify mode
            if !lock_path.exists() {
                eprintln!("No lock file found at {:?}", lock_path);
                return Ok(2);
            }

            let lock = devshell::LockFile::load(&lock_path)?;
            let (resolved, snapshots) = prepared.resolve().await?;
            let changes = devshell::verify_lock(&lock, &prepared.spec, &resolved, &snapshots)?;

            if !changes.is_empty() {
                eprintln!("Lock file is out of date:");
                for change in &changes {
                    eprintln!("  - {:?}: {}", change.kind, change.reference);
                }
                return Ok(1);
            }

            println!("Lock file is up to date");
            return Ok(0);
        }

        // Generate / update mode
        if lock_path.exists() && !self.update && !self.force {
            return Err(miette::miette!(
                "Lock file already exists at {:?}. Use --update or --force",
                lock_path
            ));
        }

        let (resolved, snapshots) = prepared.resolve().await?;

        if self.update && !self.force && lock_path.exists() {
            let existing = devshell::LockFile::load(&lock_path)?;
            let changes =
                devshell::verify_lock(&existing, &prepared.spec, &resolved, &snapshots)?;
            if changes.is_empty() {
                println!("Lock file is up to date");
                return Ok(0);
            }
            tracing::info!(changes = changes.len(), "updating lock file");
        }

        let lock = devshell::generate_lock(&prepared.spec, &resolved, &snapshots)?;
        lock.save(&lock_path)?;
        println!("Generated lock file: {:?}", lock_path);

        Ok(0)
    }
}
