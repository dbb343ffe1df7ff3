// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! User configuration for devshell.
//!
//! Settings are layered, later layers winning:
//! built-in defaults, `~/.config/devshell/config.yaml`, then `DEVSHELL_*`
//! environment variables. Command line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::platform::Platform;

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Prefix for environment variable overrides, e.g. `DEVSHELL_MIRROR_ROOT`.
pub const ENV_PREFIX: &str = "DEVSHELL";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<owner>/<repo>/<ref>.yaml` source snapshots.
    pub mirror_root: Option<PathBuf>,

    /// Platform to resolve for instead of the host platform.
    pub platform: Option<String>,

    /// Shell started by `devshell shell` when $SHELL is unset.
    pub shell: Option<String>,
}

impl Config {
    /// Load configuration from the default user config file and environment.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(default_config_path().as_deref())
    }

    /// Load configuration from an optional file and the process environment.
    pub fn load_from(file: Option<&Path>) -> crate::Result<Self> {
        Self::load_layers(file, process_env())
    }

    /// Load configuration from an optional file, then `DEVSHELL_*` entries
    /// of `env` on top.
    pub fn load_layers(
        file: Option<&Path>,
        env: config::Map<String, String>,
    ) -> crate::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                config::File::from(file)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(env)))
            .build()?
            .try_deserialize()?;
        tracing::trace!(?config, "configuration loaded");
        Ok(config)
    }

    /// The mirror root, falling back to the user data directory.
    pub fn mirror_root(&self) -> PathBuf {
        self.mirror_root.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("devshell")
                .join("mirror")
        })
    }

    /// The platform to resolve for, falling back to the host platform.
    pub fn platform(&self) -> crate::Result<Platform> {
        match &self.platform {
            Some(platform) => platform.parse(),
            None => Platform::current(),
        }
    }
}

/// The process environment, skipping variables that are not valid UTF-8.
fn process_env() -> config::Map<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// `~/.config/devshell/config.yaml`, when a config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("devshell").join("config.yaml"))
}
