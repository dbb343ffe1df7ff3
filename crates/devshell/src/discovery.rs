// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery of the .devshell.yaml that applies to a directory.

use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

use crate::{EnvironmentSpec, DEVSHELL_FILENAME, DEVSHELL_LOCK_FILENAME};

/// Find and load the descriptor for `start`.
///
/// A file path is loaded as-is. A directory is searched for
/// `.devshell.yaml`, walking up through its parents until one is found.
pub fn discover_spec<P: AsRef<Path>>(start: P) -> crate::Result<EnvironmentSpec> {
    let path = locate_spec(start)?;
    tracing::debug!(path = %path.display(), "loading descriptor");
    EnvironmentSpec::load(path)
}

/// Locate the descriptor file for `start` without loading it.
pub fn locate_spec<P: AsRef<Path>>(start: P) -> crate::Result<PathBuf> {
    let start = resolve_start_path(start.as_ref());

    if start.is_file() {
        return Ok(start);
    }
    if !start.is_dir() {
        return Err(crate::Error::NotFoundAtPath(start));
    }

    let mut current = start.clone();
    loop {
        let candidate = current.join(DEVSHELL_FILENAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    Err(crate::Error::NotFoundInTree(start))
}

/// Lock file location for a descriptor, next to the descriptor itself.
pub fn lock_path_for(spec: &EnvironmentSpec) -> crate::Result<PathBuf> {
    spec.source_path
        .as_ref()
        .and_then(|p| p.parent())
        .map(|dir| dir.join(DEVSHELL_LOCK_FILENAME))
        .ok_or_else(|| {
            crate::Error::ValidationFailed(
                "Cannot place a lock file for a spec without source_path".to_string(),
            )
        })
}

/// Resolve starting path, preferring $PWD to preserve symlinks.
fn resolve_start_path(start_path: &Path) -> PathBuf {
    if start_path.is_absolute() {
        start_path.to_owned()
    } else {
        match std::env::var("PWD").ok() {
            Some(pwd) => PathBuf::from(pwd).join(start_path),
            None => std::env::current_dir()
                .unwrap_or_default()
                .join(start_path),
        }
    }
}
