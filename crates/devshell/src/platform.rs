// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Target platform identifiers (`arch-os` pairs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "./platform_test.rs"]
mod platform_test;

/// CPU architectures accepted in a platform identifier.
pub const KNOWN_ARCHES: &[&str] = &["x86_64", "aarch64", "i686", "armv7l", "riscv64"];

/// Operating systems accepted in a platform identifier.
pub const KNOWN_OSES: &[&str] = &["linux", "darwin"];

/// A single target platform, such as `aarch64-darwin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform {
    arch: String,
    os: String,
}

impl Platform {
    pub fn new<A: Into<String>, O: Into<String>>(arch: A, os: O) -> crate::Result<Self> {
        let arch = arch.into();
        let os = os.into();
        if !KNOWN_ARCHES.contains(&arch.as_str()) || !KNOWN_OSES.contains(&os.as_str()) {
            return Err(Error::InvalidPlatform(format!("{arch}-{os}")));
        }
        Ok(Self { arch, os })
    }

    /// The platform of the running machine.
    ///
    /// Rust names macOS `macos` and 32-bit arm `arm`, these are mapped onto
    /// the identifiers used in descriptors.
    pub fn current() -> crate::Result<Self> {
        let arch = match std::env::consts::ARCH {
            "x86" => "i686",
            "arm" => "armv7l",
            other => other,
        };
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        Self::new(arch, os)
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn os(&self) -> &str {
        &self.os
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        // arch names contain underscores but never dashes, so the first
        // dash separates the two halves
        let (arch, os) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidPlatform(s.to_string()))?;
        if os.contains('-') {
            return Err(Error::InvalidPlatform(s.to_string()));
        }
        Self::new(arch, os).map_err(|_| Error::InvalidPlatform(s.to_string()))
    }
}

impl TryFrom<String> for Platform {
    type Error = Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch, self.os)
    }
}
