//! Build metadata embedded at compile time.
//!
//! Each binary declares `const BUILD_INFO: BuildInfo = build_info!();` at
//! the top of `main.rs`; the result is surfaced through `--version` and the
//! startup log line.

/// Version, source revision, and build time of the running binary.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    /// The crate version, as set by Cargo at build time.
    pub version: &'static str,
    /// The abbreviated git SHA of the commit the binary was built from, if
    /// known. Populated by a build script in real deployments; `"unknown"`
    /// otherwise.
    pub sha: &'static str,
    /// The UTC build timestamp, if known.
    pub time: &'static str,
}

impl BuildInfo {
    /// Renders a human-readable version string, e.g. `v0.1.0 (abc1234)`.
    pub fn human_version(&self) -> String {
        format!("v{} ({})", self.version, self.sha)
    }

    /// A valid, but obviously fake, `BuildInfo` for use in tests.
    pub const DUMMY: BuildInfo = BuildInfo {
        version: "0.0.0",
        sha: "00000000",
        time: "unknown",
    };
}

/// Constructs a [`BuildInfo`] from `CARGO_PKG_VERSION` and the
/// `COLDSTART_BUILD_SHA`/`COLDSTART_BUILD_TIME` environment variables set by
/// the workspace build script, falling back to `"unknown"` when unset (e.g.
/// local `cargo build` outside of CI).
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            sha: match option_env!("COLDSTART_BUILD_SHA") {
                Some(sha) => sha,
                None => "unknown",
            },
            time: match option_env!("COLDSTART_BUILD_TIME") {
                Some(time) => time,
                None => "unknown",
            },
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_version_formats_as_expected() {
        assert_eq!(BuildInfo::DUMMY.human_version(), "v0.0.0 (00000000)");
    }
}
