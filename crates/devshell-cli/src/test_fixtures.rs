// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Project and mirror layouts shared by command tests.

use std::path::{Path, PathBuf};

pub const PLATFORM: &str = "x86_64-linux";

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
"#;

const RUST_OVERLAY: &str = r#"
api: devshell/v0/catalog
packages:
  - name: rust-toolchain
    version: "1.82.0"
    channel: stable
    prefix: rust-1.82.0
"#;

/// A project directory holding the reference descriptor, next to a
/// mirror that can resolve it.
pub struct Project {
    pub dir: PathBuf,
    pub mirror: PathBuf,
}

impl Project {
    pub fn new(root: &Path) -> Self {
        let dir = root.join("project");
        let mirror = root.join("mirror");
        std::fs::create_dir_all(&dir).unwrap();

        let spec = devshell::EnvironmentSpec::reference(PLATFORM.parse().unwrap());
        std::fs::write(dir.join(devshell::DEVSHELL_FILENAME), spec.to_yaml().unwrap()).unwrap();

        let project = Self { dir, mirror };
        project.write_snapshot("NixOS/nixpkgs", "nixos-unstable.yaml", NIXPKGS);
        project.write_snapshot("oxalica/rust-overlay", "default.yaml", RUST_OVERLAY);
        project
    }

    /// Publish a newer stable toolchain in the overlay.
    pub fn bump_overlay(&self) {
        let content = format!(
            "{RUST_OVERLAY}  - name: rust-toolchain\n    version: \"1.83.0\"\n    channel: stable\n    prefix: rust-1.83.0\n"
        );
        self.write_snapshot("oxalica/rust-overlay", "default.yaml", &content);
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(devshell::DEVSHELL_LOCK_FILENAME)
    }

    pub fn flags(&self) -> crate::SourceFlags {
        crate::SourceFlags {
            platform: Some(PLATFORM.to_string()),
            mirror_root: Some(self.mirror.clone()),
        }
    }

    fn write_snapshot(&self, repo: &str, file: &str, content: &str) {
        let dir = self.mirror.join(repo);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), content).unwrap();
    }
}
