// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! devshell - Declarative Development Shell Resolver
//!
//! This crate provides the core library for turning a declarative environment
//! descriptor (`.devshell.yaml`) into a reproducible development shell.
//!
//! # Overview
//!
//! A descriptor pins exactly one platform, lists package sources in
//! resolution order, names the build inputs the shell needs and carries an
//! entry hook printed whenever the shell is entered. Sources are layered:
//! the last listed source that provides a build input wins, which lets an
//! overlay supply a newer toolchain than the base package set.
//!
//! # Example
//!
//! ```yaml
//! # .devshell.yaml
//! api: devshell/v0
//! description: "loto_cli development environment"
//!
//! platform: aarch64-darwin
//!
//! sources:
//!   - name: nixpkgs
//!     locator: NixOS/nixpkgs/nixos-unstable
//!   - name: rust-overlay
//!     locator: oxalica/rust-overlay
//!
//! build_inputs:
//!   - rust-toolchain@stable
//!   - pkg-config
//!   - openssl
//!
//! shell_hook: "Welcome to the loto_cli development environment!"
//! ```

pub mod config;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod lock;
pub mod platform;
pub mod resolve;
pub mod shell;
pub mod source;
pub mod spec;

pub use config::Config;
pub use discovery::{discover_spec, locate_spec, lock_path_for};
pub use environment::{apply_env_ops, env_ops_for, generate_startup_script, EnvOp};
pub use error::{Error, Result};
pub use lock::{generate_lock, verify_lock, LockChange, LockChangeKind, LockFile};
pub use platform::Platform;
pub use resolve::{fetch_sources, resolve, resolve_snapshots, ResolvedEnvironment, ResolvedInput};
pub use shell::{ActivatedShell, Shell};
pub use source::{Locator, MirrorFetcher, PackageSource, SourceFetcher, SourceSnapshot};
pub use spec::{ApiVersion, BuildInput, EnvironmentSpec};

/// Well-known filename for environment descriptors.
pub const DEVSHELL_FILENAME: &str = ".devshell.yaml";

/// Well-known filename for lock files.
pub const DEVSHELL_LOCK_FILENAME: &str = ".devshell.lock.yaml";
