//! Build identification for logs and `swc --version`.

use std::fmt;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git metadata captured by the build script.
///
/// Fields are `"unknown"` when the crate was built outside a git checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub sha: &'static str,
    pub dirty: bool,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: PKG_VERSION,
            branch: or_unknown(option_env!("VERGEN_GIT_BRANCH")),
            sha: or_unknown(option_env!("VERGEN_GIT_SHA")),
            dirty: is_true(option_env!("VERGEN_GIT_DIRTY")),
        }
    }

    /// Commit SHA cut to seven characters.
    pub fn short_sha(&self) -> &'static str {
        self.sha.get(..7).unwrap_or(self.sha)
    }
}

const fn or_unknown(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "unknown",
    }
}

// `str` equality is not usable in const fn, so compare bytes.
const fn is_true(value: Option<&'static str>) -> bool {
    match value {
        Some(v) => matches!(v.as_bytes(), b"true"),
        None => false,
    }
}

/// `{version}+{branch}.{sha}`, with `.dirty` appended for a dirty tree.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}.{}", self.version, self.branch, self.short_sha())?;
        if self.dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}

/// Full version string of this build, e.g. `0.1.0+main.abc1234`.
pub fn version_string() -> String {
    BuildInfo::current().to_string()
}
