// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Verify that the current environment matches the lock file.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Verify environment matches lock file
#[derive(Debug, Args)]
pub struct CmdCheck {
    /// Start discovery from PATH
    #[clap(short, long, default_value = ".")]
    file: PathBuf,

    /// Exit with error on mismatch
    #[clap(long)]
    strict: bool,

    /// Source and platform selection flags
    #[clap(flatten)]
    sources: crate::SourceFlags,
}

impl CmdCheck {
    pub async fn run(&mut self) -> Result<i32> {
        let mut prepared = self.sources.prepare(&self.file)?;

        // A descriptor pinned to another platform cannot be entered on this
        // host. Verify it against its own platform and say so.
        if prepared.platform != prepared.spec.platform {
            println!(
                "Warning: descriptor is pinned to {} but this host is {}",
                prepared.spec.platform, prepared.platform
            );
            if self.sources.platform.is_none() {
                prepared.platform = prepared.spec.platform.clone();
            }
        }

        let lock_path = devshell::lock_path_for(&prepared.spec)?;

        if !lock_path.exists() {
            if self.strict {
                return Err(miette::miette!("No lock file found at {:?}", lock_path));
            } else {
                println!("Warning: No lock file found");
                return Ok(2);
            }
        }

        let lock = devshell::LockFile::load(&lock_path)?;
        let (resolved, snapshots) = prepared.resolve().await?;

        // Verify
        let changes = devshell::verify_lock(&lock, &prepared.spec, &resolved, &snapshots)?;

        if changes.is_empty() {
            println!("✓ Environment matches lock file");
            return Ok(0);
        }

        // Report changes
        if self.strict {
            eprintln!("Error: Environment differs from lock file:");
        } else {
            println!("Warning: Environment differs from lock file:");
        }

        for change in &changes {
            match &change.kind {
                devshell::LockChangeKind::InputChanged => {
                    println!("  - Input '{}' changed", change.reference);
                    if let (Some(exp), Some(act)) = (&change.expected, &change.actual) {
                        println!("    Expected: {}", exp);
                        println!("    Actual:   {}", act);
                    }
                }
                devshell::LockChangeKind::SourceChanged => {
                    println!("  - Source '{}' snapshot changed", change.reference);
                }
                devshell::LockChangeKind::SpecChanged => {
                    println!("  - Descriptor '{}' was modified", change.reference);
                }
                _ => {
                    println!("  - {:?}: {}", change.kind, change.reference);
                }
            }
        }

        if self.strict {
            return Ok(1);
        }

        println!("\nRun 'devshell lock --update' to update the lock file");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::cmd_lock::CmdLock;
    use crate::test_fixtures::Project;

    fn check_cmd(project: &Project, strict: bool) -> CmdCheck {
        CmdCheck {
            file: project.dir.clone(),
            strict,
            sources: project.flags(),
        }
    }

    async fn write_lock(project: &Project) {
        let mut lock = CmdLock {
            file: project.dir.clone(),
            update: false,
            force: false,
            check: false,
            sources: project.flags(),
        };
        assert_eq!(lock.run().await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_check_without_lock() {
        let tmp = tempfile::TempDir::new().unwrap();
        let project = Project::new(tmp.path());

        assert_eq!(check_cmd(&project, false).run().await.unwrap(), 2);
        assert!(check_cmd(&project, true).run().await.is_err());
    }

    #[rstest]
    #[case(false, 0)]
    #[case(true, 1)]
    #[tokio::test]
    async fn test_check_after_snapshot_change(#[case] strict: bool, #[case] expected: i32) {
        let tmp = tempfile::TempDir::new().unwrap();
        let project = Project::new(tmp.path());
        write_lock(&project).await;

        assert_eq!(check_cmd(&project, strict).run().await.unwrap(), 0);

        project.bump_overlay();
        assert_eq!(check_cmd(&project, strict).run().await.unwrap(), expected);
    }
}
