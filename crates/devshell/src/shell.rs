// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Instantiating a resolved environment as a shell.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::process::Command;

use crate::environment::{apply_env_ops, env_ops_for, generate_startup_script, EnvOp};
use crate::resolve::ResolvedEnvironment;
use crate::{EnvironmentSpec, Error};

#[cfg(test)]
#[path = "./shell_test.rs"]
mod shell_test;

/// Entry point for turning a resolved environment into a shell.
pub struct Shell;

impl Shell {
    /// Instantiate the environment on top of the current process
    /// environment.
    ///
    /// The entry hook is written to `out` exactly once, followed by a
    /// newline. Nothing else is written.
    pub fn instantiate<W: Write>(
        spec: &EnvironmentSpec,
        resolved: &ResolvedEnvironment,
        out: &mut W,
    ) -> crate::Result<ActivatedShell> {
        Self::instantiate_with_base(spec, resolved, std::env::vars_os(), out)
    }

    /// Instantiate the environment on top of an explicit base environment.
    pub fn instantiate_with_base<W, I, K, V>(
        spec: &EnvironmentSpec,
        resolved: &ResolvedEnvironment,
        base: I,
        out: &mut W,
    ) -> crate::Result<ActivatedShell>
    where
        W: Write,
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        spec.check_platform(&resolved.platform)?;

        let ops = env_ops_for(resolved);
        let vars = apply_env_ops(&ops, base);

        writeln!(out, "{}", spec.shell_hook)?;
        out.flush()?;
        tracing::debug!(digest = %resolved.digest(), "environment instantiated");

        Ok(ActivatedShell {
            ops,
            vars,
            shell_hook: spec.shell_hook.clone(),
        })
    }
}

/// An instantiated environment, ready to run commands in.
#[derive(Debug, Clone)]
pub struct ActivatedShell {
    ops: Vec<EnvOp>,
    vars: BTreeMap<OsString, OsString>,
    shell_hook: String,
}

impl ActivatedShell {
    /// The full set of variables child processes run with.
    pub fn vars(&self) -> &BTreeMap<OsString, OsString> {
        &self.vars
    }

    pub fn ops(&self) -> &[EnvOp] {
        &self.ops
    }

    /// A script that reproduces this environment when sourced.
    pub fn startup_script(&self) -> String {
        generate_startup_script(&self.ops, &self.shell_hook)
    }

    /// Build a command that runs inside the environment.
    pub fn command<S, I, A>(&self, program: S, args: I) -> Command
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args).env_clear().envs(&self.vars);
        cmd
    }

    /// Run a command inside the environment and wait for its exit code.
    pub fn run<S, I, A>(&self, program: S, args: I) -> crate::Result<i32>
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let program = program.as_ref().to_owned();
        let status = self
            .command(&program, args)
            .status()
            .map_err(|error| Error::SpawnFailed {
                program: program.to_string_lossy().into_owned(),
                error,
            })?;
        // killed by a signal
        Ok(status.code().unwrap_or(1))
    }
}
