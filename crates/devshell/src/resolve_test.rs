// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use rstest::{fixture, rstest};

use super::*;
use crate::source::PackageSource;

const NIXPKGS: &str = r#"
api: devshell/v0/catalog
packages:
  - name: rust-toolchain
    version: "1.79.0"
    channel: stable
    prefix: rust-1.79.0
  - name: pkg-config
    version: "0.29.2"
    prefix: pkg-config-0.29.2
  - name: openssl
    version: "3.0.13"
    prefix: openssl-3.0.13
  - name: openssl
    version: "3.3.1"
    platforms: [x86_64-linux]
    prefix: openssl-3.3.1
"#;

const RUST_OVERLAY: &str = r#"
api: devshell/v0/catalog
packages:
  - name: rust-toolchain
    version: "1.81.0"
    channel: stable
    prefix: /overlay/rust-1.81.0
  - name: rust-toolchain
    version: "1.82.0"
    channel: stable
    prefix: /overlay/rust-1.82.0
  - name: rust-toolchain
    version: "1.84.0-nightly"
    channel: nightly
    prefix: /overlay/rust-nightly
"#;

/// Serves snapshots from memory and counts fetches.
struct MemoryFetcher {
    catalogs: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    fn new(catalogs: &[(&str, &str)]) -> Self {
        Self {
            catalogs: catalogs
                .iter()
                .map(|(locator, content)| (locator.to_string(), content.to_string()))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for MemoryFetcher {
    async fn fetch(&self, source: &PackageSource) -> crate::Result<SourceSnapshot> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
        let locator = source.locator.to_string();
        let content = self
            .catalogs
            .get(&locator)
            .ok_or_else(|| Error::SourceUnreachable {
                name: source.name.clone(),
                locator: locator.clone(),
                error: None,
            })?;
        SourceSnapshot::from_content(source.clone(), content, PathBuf::from("/mirror"))
    }
}

#[fixture]
fn mac() -> Platform {
    "aarch64-darwin".parse().unwrap()
}

#[fixture]
fn spec(mac: Platform) -> EnvironmentSpec {
    EnvironmentSpec::reference(mac)
}

#[fixture]
fn fetcher() -> MemoryFetcher {
    MemoryFetcher::new(&[
        ("NixOS/nixpkgs/nixos-unstable", NIXPKGS),
        ("oxalica/rust-overlay", RUST_OVERLAY),
    ])
}

#[rstest]
#[tokio::test]
async fn test_resolve_reference_environment(
    spec: EnvironmentSpec,
    mac: Platform,
    fetcher: MemoryFetcher,
) {
    let env = resolve(&spec, &mac, &fetcher).await.expect("Should resolve");

    assert_eq!(env.platform, mac);
    assert_eq!(env.len(), 3);
    assert_eq!(fetcher.fetch_count(), 2);

    let names: Vec<&str> = env.inputs.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["openssl", "pkg-config", "rust-toolchain"]);
}

#[rstest]
#[tokio::test]
async fn test_overlay_shadows_base_toolchain(
    spec: EnvironmentSpec,
    mac: Platform,
    fetcher: MemoryFetcher,
) {
    let env = resolve(&spec, &mac, &fetcher).await.unwrap();

    let rust = env.get("rust-toolchain").unwrap();
    assert_eq!(rust.source, "rust-overlay");
    // latest release of the stable channel, never the nightly one
    assert_eq!(rust.version, "1.82.0");
    assert_eq!(rust.channel.as_deref(), Some("stable"));
    assert_eq!(rust.prefix, PathBuf::from("/overlay/rust-1.82.0"));

    // not provided by the overlay, falls through to the base layer
    let pkg_config = env.get("pkg-config").unwrap();
    assert_eq!(pkg_config.source, "nixpkgs");
    assert_eq!(pkg_config.prefix, PathBuf::from("/mirror/pkg-config-0.29.2"));
}

#[rstest]
#[tokio::test]
async fn test_release_candidate_loses_to_release(spec: EnvironmentSpec, mac: Platform) {
    let overlay = r#"
api: devshell/v0/catalog
packages:
  - name: rust-toolchain
    version: "1.82.0-rc1"
    channel: stable
    prefix: /overlay/rust-1.82.0-rc1
  - name: rust-toolchain
    version: "1.82.0"
    channel: stable
    prefix: /overlay/rust-1.82.0
"#;
    let fetcher = MemoryFetcher::new(&[
        ("NixOS/nixpkgs/nixos-unstable", NIXPKGS),
        ("oxalica/rust-overlay", overlay),
    ]);

    let env = resolve(&spec, &mac, &fetcher).await.unwrap();
    assert_eq!(env.get("rust-toolchain").unwrap().version, "1.82.0");
}

#[rstest]
#[tokio::test]
async fn test_last_listed_source_wins(mac: Platform, fetcher: MemoryFetcher) {
    let mut spec = EnvironmentSpec::reference(mac.clone());
    spec.sources.reverse();

    let env = resolve(&spec, &mac, &fetcher).await.unwrap();
    let rust = env.get("rust-toolchain").unwrap();
    assert_eq!(rust.source, "nixpkgs");
    assert_eq!(rust.version, "1.79.0");
}

#[rstest]
#[tokio::test]
async fn test_platform_filters_releases(fetcher: MemoryFetcher) {
    let linux: Platform = "x86_64-linux".parse().unwrap();
    let spec = EnvironmentSpec::reference(linux.clone());
    let env = resolve(&spec, &linux, &fetcher).await.unwrap();
    assert_eq!(env.get("openssl").unwrap().version, "3.3.1");

    let mac: Platform = "aarch64-darwin".parse().unwrap();
    let spec = EnvironmentSpec::reference(mac.clone());
    let env = resolve(&spec, &mac, &fetcher).await.unwrap();
    assert_eq!(env.get("openssl").unwrap().version, "3.0.13");
}

#[rstest]
#[tokio::test]
async fn test_resolution_is_deterministic(
    spec: EnvironmentSpec,
    mac: Platform,
    fetcher: MemoryFetcher,
) {
    let first = resolve(&spec, &mac, &fetcher).await.unwrap();
    let second = resolve(&spec, &mac, &fetcher).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.digest(), second.digest());
    assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());

    // declaration order of build inputs has no effect
    let mut shuffled = spec.clone();
    shuffled.build_inputs.reverse();
    let third = resolve(&shuffled, &mac, &fetcher).await.unwrap();
    assert_eq!(first.to_yaml().unwrap(), third.to_yaml().unwrap());
}

#[rstest]
#[tokio::test]
async fn test_unsupported_platform_rejected_before_fetching(
    spec: EnvironmentSpec,
    fetcher: MemoryFetcher,
) {
    let linux: Platform = "x86_64-linux".parse().unwrap();
    match resolve(&spec, &linux, &fetcher).await {
        Err(Error::UnsupportedPlatform { requested, declared }) => {
            assert_eq!(requested, "x86_64-linux");
            assert_eq!(declared, "aarch64-darwin");
        }
        other => panic!("Expected UnsupportedPlatform, got: {:?}", other),
    }
    assert_eq!(fetcher.fetch_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_unreachable_source(spec: EnvironmentSpec, mac: Platform) {
    let fetcher = MemoryFetcher::new(&[("NixOS/nixpkgs/nixos-unstable", NIXPKGS)]);
    match resolve(&spec, &mac, &fetcher).await {
        Err(Error::SourceUnreachable { name, .. }) => assert_eq!(name, "rust-overlay"),
        other => panic!("Expected SourceUnreachable, got: {:?}", other),
    }
}

#[rstest]
#[tokio::test]
async fn test_unresolved_dependency(mut spec: EnvironmentSpec, mac: Platform, fetcher: MemoryFetcher) {
    spec.build_inputs.push(BuildInput::new("sqlite"));
    match resolve(&spec, &mac, &fetcher).await {
        Err(Error::UnresolvedDependency { name, channel, similar }) => {
            assert_eq!(name, "sqlite");
            assert!(channel.is_none());
            assert!(similar.is_empty());
        }
        other => panic!("Expected UnresolvedDependency, got: {:?}", other),
    }
}

#[rstest]
#[tokio::test]
async fn test_missing_channel_is_unresolved(mac: Platform) {
    let mut spec = EnvironmentSpec::reference(mac.clone());
    spec.build_inputs[0] = BuildInput::new("rust-toolchain").with_channel("beta");
    let fetcher = MemoryFetcher::new(&[
        ("NixOS/nixpkgs/nixos-unstable", NIXPKGS),
        ("oxalica/rust-overlay", RUST_OVERLAY),
    ]);

    match resolve(&spec, &mac, &fetcher).await {
        Err(Error::UnresolvedDependency { name, channel, similar }) => {
            assert_eq!(name, "rust-toolchain");
            assert_eq!(channel.as_deref(), Some("beta"));
            assert!(similar.contains(&"1.82.0@stable (rust-overlay)".to_string()));
        }
        other => panic!("Expected UnresolvedDependency, got: {:?}", other),
    }
}

#[rstest]
#[case("1.82.0", "1.81.0", Ordering::Greater)]
#[case("1.9.0", "1.10.0", Ordering::Less)]
#[case("1.2", "1.2.0", Ordering::Less)]
#[case("3.0.13", "3.0.13", Ordering::Equal)]
#[case("1.84.0", "1.84.0-nightly", Ordering::Greater)]
#[case("1.82.0-rc1", "1.82.0", Ordering::Less)]
#[case("1.82.0-rc2", "1.82.0-rc1", Ordering::Greater)]
#[case("1.83.0-rc1", "1.82.0", Ordering::Greater)]
#[case("2.0.0-beta", "2.0.0-alpha", Ordering::Greater)]
#[case("1.82.0+build.7", "1.82.0", Ordering::Equal)]
#[case("1.82.0-rc1+abc", "1.82.0", Ordering::Less)]
fn test_compare_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
    assert_eq!(compare_versions(a, b), expected);
}
