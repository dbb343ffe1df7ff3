// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Package sources, their locators and the catalogs they resolve to.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::platform::Platform;
use crate::Error;

#[cfg(test)]
#[path = "./source_test.rs"]
mod source_test;

/// Snapshot file name used when a locator carries no ref.
pub const DEFAULT_REF: &str = "default";

/// Reference to an external package repository: `owner/repo[/ref]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    pub owner: String,
    pub repo: String,
    pub reference: Option<String>,
}

impl Locator {
    /// The ref used to pick a snapshot, falling back to [`DEFAULT_REF`].
    pub fn reference_or_default(&self) -> &str {
        self.reference.as_deref().unwrap_or(DEFAULT_REF)
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let invalid = || Error::InvalidLocator(s.to_string());
        let parts: Vec<&str> = s.split('/').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }
        if parts
            .iter()
            .any(|p| p.is_empty() || p.chars().any(char::is_whitespace) || *p == "." || *p == "..")
        {
            return Err(invalid());
        }
        Ok(Self {
            owner: parts[0].to_string(),
            repo: parts[1].to_string(),
            reference: parts.get(2).map(|r| r.to_string()),
        })
    }
}

impl TryFrom<String> for Locator {
    type Error = Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<Locator> for String {
    fn from(value: Locator) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(reference) = &self.reference {
            write!(f, "/{reference}")?;
        }
        Ok(())
    }
}

/// A named package source declared in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    pub name: String,
    pub locator: Locator,
}

/// API version for catalog snapshots.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum CatalogApiVersion {
    #[default]
    #[serde(rename = "devshell/v0/catalog")]
    V0,
}

/// The package set published by one source at one ref.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default)]
    pub api: CatalogApiVersion,

    #[serde(default)]
    pub packages: Vec<CatalogPackage>,
}

/// A single package release within a catalog.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CatalogPackage {
    pub name: String,
    pub version: String,

    /// Release channel, e.g. `stable` or `nightly`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Platforms this release is built for. Empty means all platforms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Platform>,

    /// Install prefix holding `bin/` and `lib/`. Relative prefixes are
    /// resolved against the snapshot's directory.
    pub prefix: PathBuf,
}

impl CatalogPackage {
    pub fn supports(&self, platform: &Platform) -> bool {
        self.platforms.is_empty() || self.platforms.contains(platform)
    }
}

impl Catalog {
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();
        serde_yaml::from_str(&yaml).map_err(|e| Error::InvalidYaml {
            error: e,
            yaml_content: yaml,
        })
    }
}

/// A fetched source: its catalog plus enough identity to lock it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub source: PackageSource,
    pub catalog: Catalog,

    /// Hex sha256 of the raw snapshot content.
    pub sha256: String,

    /// Directory relative package prefixes are resolved against.
    pub base_dir: PathBuf,
}

impl SourceSnapshot {
    /// Build a snapshot from raw catalog content.
    pub fn from_content(
        source: PackageSource,
        content: &str,
        base_dir: PathBuf,
    ) -> crate::Result<Self> {
        let catalog = Catalog::from_yaml(content)?;
        Ok(Self {
            source,
            catalog,
            sha256: format!("{:x}", Sha256::digest(content.as_bytes())),
            base_dir,
        })
    }

    /// Absolute prefix for a package from this snapshot.
    pub fn prefix_for(&self, package: &CatalogPackage) -> PathBuf {
        if package.prefix.is_absolute() {
            package.prefix.clone()
        } else {
            self.base_dir.join(&package.prefix)
        }
    }
}

/// Loads catalog snapshots for package sources.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &PackageSource) -> crate::Result<SourceSnapshot>;
}

/// Fetches snapshots from a local mirror directory laid out as
/// `<root>/<owner>/<repo>/<ref>.yaml`.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    root: PathBuf,
}

impl MirrorFetcher {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the snapshot file for a locator.
    pub fn snapshot_path(&self, locator: &Locator) -> PathBuf {
        self.root
            .join(&locator.owner)
            .join(&locator.repo)
            .join(format!("{}.yaml", locator.reference_or_default()))
    }
}

#[async_trait::async_trait]
impl SourceFetcher for MirrorFetcher {
    async fn fetch(&self, source: &PackageSource) -> crate::Result<SourceSnapshot> {
        let path = self.snapshot_path(&source.locator);
        tracing::debug!(source = %source.name, path = %path.display(), "fetching snapshot");

        let content = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Error::SourceUnreachable {
                    name: source.name.clone(),
                    locator: source.locator.to_string(),
                    error: Some(e),
                }
            }
            _ => Error::ReadFailed {
                path: path.clone(),
                error: e,
            },
        })?;
        // the snapshot exists, bad content is a read failure
        let content = String::from_utf8(content).map_err(|e| Error::ReadFailed {
            path: path.clone(),
            error: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        SourceSnapshot::from_content(source.clone(), &content, base_dir)
    }
}
