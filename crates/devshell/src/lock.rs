// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Lock file structures and helpers for devshell.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as ShaDigest, Sha256};

use crate::platform::Platform;
use crate::resolve::{ResolvedEnvironment, ResolvedInput};
use crate::source::{Locator, SourceSnapshot};
use crate::{EnvironmentSpec, Error};

#[cfg(test)]
#[path = "./lock_test.rs"]
mod lock_test;

/// Lock file API version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum LockApiVersion {
    #[serde(rename = "devshell/v0/lock")]
    V0,
}

/// Lock file structure capturing source snapshots and resolved inputs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LockFile {
    pub api: LockApiVersion,
    pub generated: GenerationMetadata,
    pub spec: SpecFile,
    pub platform: Platform,
    pub sources: Vec<LockedSource>,
    pub inputs: Vec<ResolvedInput>,
}

/// Metadata about when and where the lock was generated.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub devshell_version: String,
    pub hostname: String,
}

/// Descriptor file tracked by the lock.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SpecFile {
    pub path: PathBuf,
    pub sha256: String,
}

/// Source snapshot pinned by the lock.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LockedSource {
    pub name: String,
    pub locator: Locator,
    pub sha256: String,
}

impl LockFile {
    /// Read a lock file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        serde_yaml::from_str(&yaml).map_err(|e| Error::InvalidYaml {
            error: e,
            yaml_content: yaml,
        })
    }

    /// Write this lock file to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let yaml =
            serde_yaml::to_string(self).map_err(|e| Error::ValidationFailed(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

fn hash_spec_file(spec: &EnvironmentSpec) -> crate::Result<SpecFile> {
    let path = spec.source_path.clone().ok_or_else(|| {
        Error::ValidationFailed("Cannot lock a spec that was not loaded from a file".to_string())
    })?;
    let content = std::fs::read(&path).map_err(|e| Error::ReadFailed {
        path: path.clone(),
        error: e,
    })?;
    Ok(SpecFile {
        path,
        sha256: format!("{:x}", Sha256::digest(&content)),
    })
}

/// Generate lock file from a resolved environment.
pub fn generate_lock(
    spec: &EnvironmentSpec,
    resolved: &ResolvedEnvironment,
    snapshots: &[SourceSnapshot],
) -> crate::Result<LockFile> {
    let sources = snapshots
        .iter()
        .map(|s| LockedSource {
            name: s.source.name.clone(),
            locator: s.source.locator.clone(),
            sha256: s.sha256.clone(),
        })
        .collect();

    Ok(LockFile {
        api: LockApiVersion::V0,
        generated: GenerationMetadata {
            timestamp: Utc::now(),
            devshell_version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
        },
        spec: hash_spec_file(spec)?,
        platform: resolved.platform.clone(),
        sources,
        inputs: resolved.inputs.values().cloned().collect(),
    })
}

/// Verify lock file matches current environment.
pub fn verify_lock(
    lock: &LockFile,
    spec: &EnvironmentSpec,
    resolved: &ResolvedEnvironment,
    snapshots: &[SourceSnapshot],
) -> crate::Result<Vec<LockChange>> {
    let mut changes = Vec::new();

    let current_spec = hash_spec_file(spec)?;
    if current_spec.sha256 != lock.spec.sha256 {
        changes.push(LockChange {
            kind: LockChangeKind::SpecChanged,
            reference: lock.spec.path.display().to_string(),
            expected: Some(lock.spec.sha256.clone()),
            actual: Some(current_spec.sha256),
        });
    }

    if lock.platform != resolved.platform {
        changes.push(LockChange {
            kind: LockChangeKind::PlatformChanged,
            reference: "platform".to_string(),
            expected: Some(lock.platform.to_string()),
            actual: Some(resolved.platform.to_string()),
        });
    }

    // Sources are matched by name. A reordering shows up as changed inputs.
    for locked in &lock.sources {
        match snapshots.iter().find(|s| s.source.name == locked.name) {
            None => changes.push(LockChange {
                kind: LockChangeKind::SourceRemoved,
                reference: locked.name.clone(),
                expected: Some(locked.locator.to_string()),
                actual: None,
            }),
            Some(snapshot) => {
                if snapshot.source.locator != locked.locator || snapshot.sha256 != locked.sha256 {
                    changes.push(LockChange {
                        kind: LockChangeKind::SourceChanged,
                        reference: locked.name.clone(),
                        expected: Some(format!("{} ({})", locked.locator, locked.sha256)),
                        actual: Some(format!("{} ({})", snapshot.source.locator, snapshot.sha256)),
                    });
                }
            }
        }
    }
    for snapshot in snapshots {
        if !lock.sources.iter().any(|l| l.name == snapshot.source.name) {
            changes.push(LockChange {
                kind: LockChangeKind::SourceAdded,
                reference: snapshot.source.name.clone(),
                expected: None,
                actual: Some(snapshot.source.locator.to_string()),
            });
        }
    }

    for locked in &lock.inputs {
        match resolved.get(&locked.name) {
            None => changes.push(LockChange {
                kind: LockChangeKind::InputRemoved,
                reference: locked.name.clone(),
                expected: Some(locked.version.clone()),
                actual: None,
            }),
            Some(current) if current.digest != locked.digest => changes.push(LockChange {
                kind: LockChangeKind::InputChanged,
                reference: locked.name.clone(),
                expected: Some(format!("{} ({})", locked.version, locked.source)),
                actual: Some(format!("{} ({})", current.version, current.source)),
            }),
            Some(_) => {}
        }
    }
    for current in resolved.inputs.values() {
        if !lock.inputs.iter().any(|l| l.name == current.name) {
            changes.push(LockChange {
                kind: LockChangeKind::InputAdded,
                reference: current.name.clone(),
                expected: None,
                actual: Some(current.version.clone()),
            });
        }
    }

    Ok(changes)
}

/// A single detected change between lock and current environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockChange {
    pub kind: LockChangeKind,
    pub reference: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Types of lock mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockChangeKind {
    SpecChanged,
    PlatformChanged,
    SourceChanged,
    SourceAdded,
    SourceRemoved,
    InputChanged,
    InputAdded,
    InputRemoved,
}
