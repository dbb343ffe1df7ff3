// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of build inputs against ordered package source layers.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::platform::Platform;
use crate::source::{CatalogPackage, SourceFetcher, SourceSnapshot};
use crate::spec::{BuildInput, EnvironmentSpec};
use crate::Error;

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// A build input pinned to a concrete release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInput {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Name of the source layer that provided this release.
    pub source: String,
    pub prefix: PathBuf,
    pub digest: String,
}

impl ResolvedInput {
    fn new(name: &str, package: &CatalogPackage, snapshot: &SourceSnapshot) -> Self {
        let prefix = snapshot.prefix_for(package);
        let prefix_text = prefix.to_string_lossy().into_owned();
        let mut hasher = Sha256::new();
        for part in [
            name,
            package.version.as_str(),
            package.channel.as_deref().unwrap_or(""),
            snapshot.source.name.as_str(),
            prefix_text.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        Self {
            name: name.to_string(),
            version: package.version.clone(),
            channel: package.channel.clone(),
            source: snapshot.source.name.clone(),
            prefix,
            digest: format!("{:x}", hasher.finalize()),
        }
    }
}

/// The fully resolved build input set for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEnvironment {
    pub platform: Platform,
    pub inputs: BTreeMap<String, ResolvedInput>,
}

impl ResolvedEnvironment {
    /// Content digest over the platform and every resolved input.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.to_string().as_bytes());
        for input in self.inputs.values() {
            hasher.update([0u8]);
            hasher.update(input.digest.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedInput> {
        self.inputs.get(name)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Serialize to YAML; identical environments produce identical bytes.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ValidationFailed(e.to_string()))
    }
}

/// Fetch every declared source, in declaration order.
///
/// Fails on the first unreachable source, nothing is resolved from a
/// partial source set.
pub async fn fetch_sources(
    spec: &EnvironmentSpec,
    fetcher: &dyn SourceFetcher,
) -> crate::Result<Vec<SourceSnapshot>> {
    let mut snapshots = Vec::with_capacity(spec.sources.len());
    for source in &spec.sources {
        let snapshot = fetcher.fetch(source).await?;
        tracing::debug!(
            source = %source.name,
            packages = snapshot.catalog.packages.len(),
            sha256 = %snapshot.sha256,
            "source fetched"
        );
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

/// Resolve a descriptor for the requested platform.
pub async fn resolve(
    spec: &EnvironmentSpec,
    requested: &Platform,
    fetcher: &dyn SourceFetcher,
) -> crate::Result<ResolvedEnvironment> {
    // reject before touching any source
    spec.check_platform(requested)?;
    let snapshots = fetch_sources(spec, fetcher).await?;
    resolve_snapshots(spec, requested, &snapshots)
}

/// Resolve a descriptor against already fetched snapshots.
///
/// Snapshots are resolution layers in declaration order. For every build
/// input the last layer holding a matching release wins, and within that
/// layer the highest version wins.
pub fn resolve_snapshots(
    spec: &EnvironmentSpec,
    requested: &Platform,
    snapshots: &[SourceSnapshot],
) -> crate::Result<ResolvedEnvironment> {
    spec.check_platform(requested)?;

    let mut inputs = BTreeMap::new();
    for input in spec.sorted_build_inputs() {
        let resolved = resolve_input(input, requested, snapshots)?;
        tracing::info!(
            input = %input,
            version = %resolved.version,
            source = %resolved.source,
            "resolved build input"
        );
        inputs.insert(input.name.clone(), resolved);
    }

    Ok(ResolvedEnvironment {
        platform: requested.clone(),
        inputs,
    })
}

fn resolve_input(
    input: &BuildInput,
    platform: &Platform,
    snapshots: &[SourceSnapshot],
) -> crate::Result<ResolvedInput> {
    for snapshot in snapshots.iter().rev() {
        let best = snapshot
            .catalog
            .packages
            .iter()
            .filter(|p| matches_input(p, input, platform))
            .max_by(|a, b| compare_versions(&a.version, &b.version));

        if let Some(package) = best {
            return Ok(ResolvedInput::new(&input.name, package, snapshot));
        }
        tracing::trace!(input = %input, source = %snapshot.source.name, "no match in layer");
    }

    Err(Error::UnresolvedDependency {
        name: input.name.clone(),
        channel: input.channel.clone(),
        similar: similar_releases(&input.name, platform, snapshots),
    })
}

fn matches_input(package: &CatalogPackage, input: &BuildInput, platform: &Platform) -> bool {
    if package.name != input.name || !package.supports(platform) {
        return false;
    }
    match &input.channel {
        Some(channel) => package.channel.as_ref() == Some(channel),
        None => true,
    }
}

fn similar_releases(name: &str, platform: &Platform, snapshots: &[SourceSnapshot]) -> Vec<String> {
    let mut similar = Vec::new();
    for snapshot in snapshots {
        for package in &snapshot.catalog.packages {
            if package.name != name || !package.supports(platform) {
                continue;
            }
            let release = match &package.channel {
                Some(channel) => format!("{}@{} ({})", package.version, channel, snapshot.source.name),
                None => format!("{} ({})", package.version, snapshot.source.name),
            };
            similar.push(release);
        }
    }
    similar
}

/// Compare version strings.
///
/// The dotted release part is compared first, numeric segments
/// numerically and anything else as text, with text sorting below a
/// number. A missing segment sorts lowest, so `1.2 < 1.2.0`. On equal
/// releases a pre-release (`1.82.0-rc1`) sorts below the plain release.
/// Build metadata after `+` is ignored.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_release, a_pre) = split_version(a);
    let (b_release, b_pre) = split_version(b);
    compare_segments(a_release, b_release).then_with(|| match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => compare_segments(l, r),
    })
}

/// Split into release and optional pre-release, dropping build metadata.
fn split_version(version: &str) -> (&str, Option<&str>) {
    let version = version.split_once('+').map_or(version, |(v, _)| v);
    match version.split_once('-') {
        Some((release, pre)) => (release, Some(pre)),
        None => (version, None),
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split(['.', '-']).collect();
    let right: Vec<&str> = b.split(['.', '-']).collect();
    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}
