// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable operations derived from a resolved environment.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use crate::resolve::ResolvedEnvironment;

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// Separator used for search path variables when none is given.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Variable exported with the platform the shell was resolved for.
pub const PLATFORM_VAR: &str = "DEVSHELL_PLATFORM";

/// Variable exported with the digest of the resolved environment.
pub const DIGEST_VAR: &str = "DEVSHELL_DIGEST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEnv {
    pub set: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrependEnv {
    pub prepend: String,
    pub value: String,
    pub separator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendEnv {
    pub append: String,
    pub value: String,
    pub separator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEnv {
    pub comment: String,
}

/// One operation on the shell's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOp {
    Set(SetEnv),
    Prepend(PrependEnv),
    Append(AppendEnv),
    Comment(CommentEnv),
}

/// Operations that put every resolved input on the search paths.
pub fn env_ops_for(resolved: &ResolvedEnvironment) -> Vec<EnvOp> {
    let mut ops = Vec::new();
    let prepend = |var: &str, value: String| {
        EnvOp::Prepend(PrependEnv {
            prepend: var.to_string(),
            value,
            separator: None,
        })
    };

    // prepended in reverse so the final search paths read in name order
    for input in resolved.inputs.values().rev() {
        ops.push(EnvOp::Comment(CommentEnv {
            comment: format!("{} {} ({})", input.name, input.version, input.source),
        }));
        let lib = input.prefix.join("lib");
        ops.push(prepend("PATH", input.prefix.join("bin").display().to_string()));
        ops.push(prepend(
            "PKG_CONFIG_PATH",
            lib.join("pkgconfig").display().to_string(),
        ));
        ops.push(prepend("LIBRARY_PATH", lib.display().to_string()));
    }

    ops.push(EnvOp::Set(SetEnv {
        set: PLATFORM_VAR.to_string(),
        value: resolved.platform.to_string(),
    }));
    ops.push(EnvOp::Set(SetEnv {
        set: DIGEST_VAR.to_string(),
        value: resolved.digest(),
    }));
    ops
}

/// Apply operations on top of a base environment.
///
/// Names and values are kept as `OsString` so variables that are not
/// valid UTF-8 pass through untouched.
pub fn apply_env_ops<I, K, V>(ops: &[EnvOp], base: I) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    let mut vars: BTreeMap<OsString, OsString> =
        base.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

    for op in ops {
        match op {
            EnvOp::Set(s) => {
                vars.insert(OsString::from(&s.set), OsString::from(&s.value));
            }
            EnvOp::Prepend(p) => {
                let sep = p.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
                let mut value = OsString::from(&p.value);
                if let Some(existing) = non_empty(&vars, &p.prepend) {
                    value.push(sep);
                    value.push(existing);
                }
                vars.insert(OsString::from(&p.prepend), value);
            }
            EnvOp::Append(a) => {
                let sep = a.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
                let value = match non_empty(&vars, &a.append) {
                    Some(existing) => {
                        let mut value = existing.to_owned();
                        value.push(sep);
                        value.push(&a.value);
                        value
                    }
                    None => OsString::from(&a.value),
                };
                vars.insert(OsString::from(&a.append), value);
            }
            EnvOp::Comment(_) => {}
        }
    }

    vars
}

fn non_empty<'a>(vars: &'a BTreeMap<OsString, OsString>, name: &str) -> Option<&'a OsStr> {
    vars.get(OsStr::new(name))
        .map(OsString::as_os_str)
        .filter(|v| !v.is_empty())
}

/// Render a POSIX shell script applying the operations and printing the
/// entry hook once.
pub fn generate_startup_script(ops: &[EnvOp], shell_hook: &str) -> String {
    let mut script = String::from("#!/bin/sh\n# generated by devshell\n\n");

    for op in ops {
        match op {
            EnvOp::Comment(c) => {
                script.push_str(&format!("# {}\n", c.comment));
            }
            EnvOp::Set(s) => {
                script.push_str(&format!("export {}=\"{}\"\n", s.set, escape(&s.value)));
            }
            EnvOp::Prepend(p) => {
                let sep = p.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
                script.push_str(&format!(
                    "export {var}=\"{value}${{{var}:+{sep}${{{var}}}}}\"\n",
                    var = p.prepend,
                    value = escape(&p.value),
                    sep = escape(sep),
                ));
            }
            EnvOp::Append(a) => {
                let sep = a.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
                script.push_str(&format!(
                    "export {var}=\"${{{var}:+${{{var}}}{sep}}}{value}\"\n",
                    var = a.append,
                    value = escape(&a.value),
                    sep = escape(sep),
                ));
            }
        }
    }

    script.push_str(&format!("\nprintf '%s\\n' \"{}\"\n", escape(shell_hook)));
    script
}

/// Escape a value for use inside a double quoted shell string.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
