// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for devshell operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with devshell Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during devshell operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No .devshell.yaml found in directory tree
    #[error("No .devshell.yaml found in {0:?} or any parent directory")]
    #[diagnostic(
        code(devshell::not_found_in_tree),
        help("Create a .devshell.yaml file with 'devshell init' or specify a path with -f")
    )]
    NotFoundInTree(PathBuf),

    /// .devshell.yaml not found at specified path
    #[error(".devshell.yaml not found at {0:?}")]
    #[diagnostic(code(devshell::not_found_at_path))]
    NotFoundAtPath(PathBuf),

    /// Invalid YAML in a descriptor, catalog or lock file
    #[error("Invalid YAML document: {error}")]
    #[diagnostic(
        code(devshell::invalid_yaml),
        help("Check YAML syntax and ensure the 'api' field is present")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(devshell::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Platform identifier is not a valid `arch-os` pair
    #[error("Invalid platform identifier: {0:?}")]
    #[diagnostic(
        code(devshell::invalid_platform),
        help("Platforms are written as <arch>-<os>, for example aarch64-darwin or x86_64-linux")
    )]
    InvalidPlatform(String),

    /// Resolution requested for a platform the descriptor does not declare
    #[error("Unsupported platform {requested}: this environment is only defined for {declared}")]
    #[diagnostic(
        code(devshell::unsupported_platform),
        help("Change 'platform' in .devshell.yaml or pass --platform {declared}")
    )]
    UnsupportedPlatform { requested: String, declared: String },

    /// Locator is not of the form owner/repo[/ref]
    #[error("Invalid source locator: {0:?}")]
    #[diagnostic(
        code(devshell::invalid_locator),
        help("Locators are written as owner/repo or owner/repo/ref")
    )]
    InvalidLocator(String),

    /// Build input reference could not be parsed
    #[error("Invalid build input: {0:?}")]
    #[diagnostic(
        code(devshell::invalid_build_input),
        help("Build inputs are written as name or name@channel")
    )]
    InvalidBuildInput(String),

    /// A declared package source could not be fetched
    #[error("Package source '{name}' is unreachable ({locator})")]
    #[diagnostic(
        code(devshell::source_unreachable),
        help("Check that a snapshot for {locator} exists under the mirror root")
    )]
    SourceUnreachable {
        name: String,
        locator: String,
        #[source]
        error: Option<std::io::Error>,
    },

    /// A build input has no version in any declared source
    #[error("Unresolved dependency: {}", display_input(name, channel.as_deref()))]
    #[diagnostic(
        code(devshell::unresolved_dependency),
        help("{}", suggestion_message(similar))
    )]
    UnresolvedDependency {
        name: String,
        channel: Option<String>,
        similar: Vec<String>,
    },

    /// A command could not be started inside the environment
    #[error("Failed to run {program:?}")]
    #[diagnostic(
        code(devshell::spawn_failed),
        help("Check that the command exists on PATH inside the environment")
    )]
    SpawnFailed {
        program: String,
        #[source]
        error: std::io::Error,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(devshell::validation_failed))]
    ValidationFailed(String),

    /// Failed to load user configuration
    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(devshell::config))]
    Config(#[from] config::ConfigError),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(devshell::io_error))]
    Io(#[from] std::io::Error),
}

fn display_input(name: &str, channel: Option<&str>) -> String {
    match channel {
        Some(channel) => format!("{name}@{channel}"),
        None => name.to_string(),
    }
}

fn suggestion_message(similar: &[String]) -> String {
    if similar.is_empty() {
        "No declared source provides a package with this name".to_string()
    } else {
        format!("Available releases: {}", similar.join(", "))
    }
}
