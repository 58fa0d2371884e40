//! Build-time metadata embedded by the build script.

/// Name reported to MCP hosts and in `--version` output.
pub const SERVER_NAME: &str = "vaultpatch";

/// The git commit hash at build time (short form).
pub const GIT_HASH: &str = env!("VAULTPATCH_GIT_HASH");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("VAULTPATCH_BUILD_PROFILE");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version string including git hash and profile, e.g. `"0.1.0 (abc1234, debug)"`.
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}
