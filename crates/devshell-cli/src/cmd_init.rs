// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `devshell init` command.

use clap::Args;
use miette::Result;
use std::path::PathBuf;

/// Create a new .devshell.yaml file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Directory to create file in
    #[clap(default_value = ".")]
    path: PathBuf,

    /// Platform to pin (default: the host platform)
    #[clap(long)]
    platform: Option<String>,

    /// Template to use: minimal, standard
    #[clap(long, default_value = "standard")]
    template: String,
}

impl CmdInit {
    pub async fn run(&mut self) -> Result<i32> {
        let spec_path = self.path.join(devshell::DEVSHELL_FILENAME);

        // Check if file already exists
        if spec_path.exists() {
            return Err(miette::miette!(
                ".devshell.yaml already exists at {:?}",
                spec_path
            ));
        }

        let platform = match &self.platform {
            Some(p) => p.parse::<devshell::Platform>()?,
            None => devshell::Platform::current()?,
        };

        // Generate template based on option
        let content = match self.template.as_str() {
            "minimal" => generate_minimal_template(&platform)?,
            _ => generate_standard_template(&platform),
        };

        // Write file
        std::fs::write(&spec_path, content)
            .map_err(|e| miette::miette!("Failed to write .devshell.yaml: {}", e))?;

        println!("Created .devshell.yaml at {:?}", spec_path);
        println!();
        println!("Next steps:");
        println!("  1. Edit the file to adjust sources and build inputs");
        println!("  2. Run 'devshell resolve' to preview the environment");
        println!("  3. Run 'devshell shell' to enter the environment");

        Ok(0)
    }
}

fn generate_minimal_template(platform: &devshell::Platform) -> Result<String> {
    Ok(devshell::EnvironmentSpec::reference(platform.clone()).to_yaml()?)
}

fn generate_standard_template(platform: &devshell::Platform) -> String {
    let reference = devshell::EnvironmentSpec::reference(platform.clone());
    let sources = reference
        .sources
        .iter()
        .map(|s| format!("  - name: {}\n    locator: {}\n", s.name, s.locator))
        .collect::<String>();
    let inputs = reference
        .build_inputs
        .iter()
        .map(|i| format!("  - {}\n", i))
        .collect::<String>();

    format!(
        "# devshell environment descriptor\n\
        \n\
        api: devshell/v0\n\
        \n\
        description: \"{description}\"\n\
        \n\
        # The one platform this environment is defined for (<arch>-<os>).\n\
        # Resolving for any other platform is rejected.\n\
        platform: {platform}\n\
        \n\
        # Package sources in resolution order (owner/repo[/ref]).\n\
        # Later sources are overlays: they win for any package they provide.\n\
        sources:\n\
        {sources}\
        \n\
        # Dependencies required on the search paths (name or name@channel)\n\
        build_inputs:\n\
        {inputs}\
        \n\
        # Printed once every time the shell is entered\n\
        shell_hook: \"{hook}\"\n",
        description = reference.description.unwrap_or_default(),
        platform = platform,
        sources = sources,
        inputs = inputs,
        hook = reference.shell_hook,
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("x86_64-linux")]
    #[case("aarch64-darwin")]
    fn test_standard_template_parses(#[case] platform: &str) {
        let platform: devshell::Platform = platform.parse().unwrap();
        let yaml = generate_standard_template(&platform);

        let spec = devshell::EnvironmentSpec::from_yaml(yaml).expect("template should parse");
        spec.validate().expect("template should validate");
        assert_eq!(spec.platform, platform);
        assert_eq!(spec.sources.len(), 2);
        assert_eq!(spec.build_inputs.len(), 3);
    }

    #[rstest]
    fn test_minimal_template_parses() {
        let platform: devshell::Platform = "x86_64-linux".parse().unwrap();
        let yaml = generate_minimal_template(&platform).unwrap();
        let spec = devshell::EnvironmentSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.shell_hook, devshell::spec::DEFAULT_SHELL_HOOK);
    }

    #[rstest]
    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cmd = CmdInit {
            path: tmp.path().to_path_buf(),
            platform: Some("x86_64-linux".to_string()),
            template: "standard".to_string(),
        };
        assert_eq!(cmd.run().await.unwrap(), 0);
        assert!(tmp.path().join(devshell::DEVSHELL_FILENAME).is_file());
        assert!(cmd.run().await.is_err());
    }
}
