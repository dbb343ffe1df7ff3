// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Spec file parsing and data types for .devshell.yaml files.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::platform::Platform;
use crate::source::{Locator, PackageSource};
use crate::Error;

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// API version for spec files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "devshell/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// A dependency that must be present in the shell: `name` or `name@channel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildInput {
    pub name: String,
    pub channel: Option<String>,
}

impl BuildInput {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            channel: None,
        }
    }

    pub fn with_channel<S: Into<String>>(mut self, channel: S) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

impl FromStr for BuildInput {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let invalid = || Error::InvalidBuildInput(s.to_string());
        let (name, channel) = match s.split_once('@') {
            Some((name, channel)) => (name, Some(channel)),
            None => (s, None),
        };
        let valid = |part: &str| {
            !part.is_empty() && !part.contains('@') && !part.chars().any(char::is_whitespace)
        };
        if !valid(name) || channel.is_some_and(|c| !valid(c)) {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            channel: channel.map(str::to_string),
        })
    }
}

impl TryFrom<String> for BuildInput {
    type Error = Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<BuildInput> for String {
    fn from(value: BuildInput) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BuildInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{}@{}", self.name, channel),
            None => f.write_str(&self.name),
        }
    }
}

/// Greeting printed by the reference descriptor.
pub const DEFAULT_SHELL_HOOK: &str = "Welcome to the loto_cli development environment!";

/// Environment descriptor loaded from a .devshell.yaml file.
///
/// The descriptor is immutable once loaded, it is handed to the resolver and
/// shell by reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvironmentSpec {
    /// API version identifier.
    pub api: ApiVersion,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The one platform this environment is defined for.
    pub platform: Platform,

    /// Package sources in resolution order.
    /// Later sources are overlays and shadow earlier ones per package name.
    #[serde(default)]
    pub sources: Vec<PackageSource>,

    /// Dependencies that must be present in the shell.
    /// Order carries no meaning.
    #[serde(default)]
    pub build_inputs: Vec<BuildInput>,

    /// Text printed once each time the shell is entered.
    pub shell_hook: String,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl EnvironmentSpec {
    /// Parse spec from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            ApiVersion::V0 => serde_yaml::from_value(value).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml,
            }),
        }
    }

    /// Load spec from file path.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut spec = Self::from_yaml(yaml)?;
        spec.source_path = Some(path.to_path_buf());
        spec.validate()?;
        Ok(spec)
    }

    /// Validate spec after loading.
    pub fn validate(&self) -> crate::Result<()> {
        if self.sources.is_empty() {
            return Err(Error::ValidationFailed(
                "at least one package source must be declared".to_string(),
            ));
        }

        let mut source_names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(Error::ValidationFailed(
                    "package source names must not be empty".to_string(),
                ));
            }
            if !source_names.insert(source.name.as_str()) {
                return Err(Error::ValidationFailed(format!(
                    "package source '{}' is declared more than once",
                    source.name
                )));
            }
        }

        // channel is part of the request, not the identity
        let mut input_names = HashSet::new();
        for input in &self.build_inputs {
            if !input_names.insert(input.name.as_str()) {
                return Err(Error::ValidationFailed(format!(
                    "build input '{}' is declared more than once",
                    input.name
                )));
            }
        }

        if self.shell_hook.trim().is_empty() {
            return Err(Error::ValidationFailed(
                "shell_hook must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Reject any platform other than the declared one.
    pub fn check_platform(&self, requested: &Platform) -> crate::Result<()> {
        if requested != &self.platform {
            return Err(Error::UnsupportedPlatform {
                requested: requested.to_string(),
                declared: self.platform.to_string(),
            });
        }
        Ok(())
    }

    /// Build inputs in a stable, order-independent sequence.
    pub fn sorted_build_inputs(&self) -> Vec<&BuildInput> {
        let mut inputs: Vec<&BuildInput> = self.build_inputs.iter().collect();
        inputs.sort();
        inputs
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ValidationFailed(e.to_string()))
    }

    /// The reference descriptor: a pinned base package set, a toolchain
    /// overlay, a stable compiler toolchain, a build configuration helper
    /// and a cryptography library.
    pub fn reference(platform: Platform) -> Self {
        let source = |name: &str, owner: &str, repo: &str, reference: Option<&str>| {
            PackageSource {
                name: name.to_string(),
                locator: Locator {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    reference: reference.map(str::to_string),
                },
            }
        };
        Self {
            api: ApiVersion::V0,
            description: Some("loto_cli development environment".to_string()),
            platform,
            sources: vec![
                source("nixpkgs", "NixOS", "nixpkgs", Some("nixos-unstable")),
                source("rust-overlay", "oxalica", "rust-overlay", None),
            ],
            build_inputs: vec![
                BuildInput::new("rust-toolchain").with_channel("stable"),
                BuildInput::new("pkg-config"),
                BuildInput::new("openssl"),
            ],
            shell_hook: DEFAULT_SHELL_HOOK.to_string(),
            source_path: None,
        }
    }
}
