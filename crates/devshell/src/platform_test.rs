// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
#[case("aarch64-darwin", "aarch64", "darwin")]
#[case("x86_64-linux", "x86_64", "linux")]
#[case("riscv64-linux", "riscv64", "linux")]
fn test_parse_valid_platform(#[case] input: &str, #[case] arch: &str, #[case] os: &str) {
    let platform: Platform = input.parse().expect("Should parse platform");
    assert_eq!(platform.arch(), arch);
    assert_eq!(platform.os(), os);
    assert_eq!(platform.to_string(), input);
}

#[rstest]
#[case("")]
#[case("aarch64")]
#[case("aarch64-")]
#[case("-darwin")]
#[case("aarch64-apple-darwin")]
#[case("sparc-linux")]
#[case("x86_64-windows")]
#[case("Aarch64-Darwin")]
fn test_parse_invalid_platform(#[case] input: &str) {
    match input.parse::<Platform>() {
        Err(Error::InvalidPlatform(value)) => assert_eq!(value, input),
        other => panic!("Expected InvalidPlatform, got: {:?}", other),
    }
}

#[rstest]
fn test_platform_serde_as_string() {
    let platform: Platform = serde_yaml::from_str("x86_64-linux").unwrap();
    assert_eq!(platform, Platform::new("x86_64", "linux").unwrap());

    let yaml = serde_yaml::to_string(&platform).unwrap();
    assert_eq!(yaml.trim(), "x86_64-linux");

    let bad: Result<Platform, _> = serde_yaml::from_str("mips-plan9");
    assert!(bad.is_err());
}

#[rstest]
fn test_current_platform_is_valid_on_supported_hosts() {
    // Every host the test suite runs on is a linux or darwin machine.
    let current = Platform::current().expect("host platform should be supported");
    assert!(KNOWN_ARCHES.contains(&current.arch()));
    assert!(KNOWN_OSES.contains(&current.os()));
}
