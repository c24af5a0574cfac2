use std::fmt;

use serde::Serialize;

/// Build information captured at compile time by `build.rs`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub package_version: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "jailbird {} ({}, {} build, {})",
            self.package_version, self.version, self.build_profile, self.build_timestamp
        )
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        build_profile: env!("BUILD_PROFILE"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        version: env!("REPO_VERSION"),
        package_version: env!("CARGO_PKG_VERSION"),
    }
}
