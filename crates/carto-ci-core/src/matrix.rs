//! Build matrix: the set of target platform/architecture pairs built per event.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Error, Result};

/// Name shared by every artifact and status context.
pub const ARTIFACT_PREFIX: &str = "carto";

/// Toolchain version used when a leg does not pin one.
pub const DEFAULT_TOOLCHAIN_VERSION: &str = "1.22";

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
    Darwin,
    Freebsd,
}

impl Platform {
    /// Executables on this platform carry an `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
            Platform::Darwin => write!(f, "darwin"),
            Platform::Freebsd => write!(f, "freebsd"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "freebsd" => Ok(Platform::Freebsd),
            _ => Err(Error::InvalidInput(format!("unknown platform: {}", s))),
        }
    }
}

/// Target CPU architecture, named the way the Go toolchain names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
    Arm,
    #[serde(rename = "386")]
    I386,
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arch::Amd64 => write!(f, "amd64"),
            Arch::Arm64 => write!(f, "arm64"),
            Arch::Arm => write!(f, "arm"),
            Arch::I386 => write!(f, "386"),
        }
    }
}

impl std::str::FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" => Ok(Arch::Amd64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "arm" => Ok(Arch::Arm),
            "386" | "i386" => Ok(Arch::I386),
            _ => Err(Error::InvalidInput(format!("unknown architecture: {}", s))),
        }
    }
}

/// One leg of the build matrix.
///
/// Identity is the (platform, arch) pair; the toolchain version only
/// parameterizes the build environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub platform: Platform,
    pub arch: Arch,
    /// Pinned toolchain version for this leg.
    pub toolchain_version: Option<String>,
}

impl JobSpec {
    pub fn new(platform: Platform, arch: Arch) -> Self {
        Self {
            platform,
            arch,
            toolchain_version: None,
        }
    }

    pub fn with_toolchain_version(mut self, version: impl Into<String>) -> Self {
        self.toolchain_version = Some(version.into());
        self
    }

    /// The leg's pinned version, or `default` when it has none.
    pub fn toolchain_version_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.toolchain_version.as_deref().unwrap_or(default)
    }

    /// Commit status context, e.g. `carto-linux-amd64`.
    pub fn context_label(&self) -> String {
        format!("{}-{}-{}", ARTIFACT_PREFIX, self.platform, self.arch)
    }

    /// Build output filename and release asset name, e.g. `carto-windows-amd64.exe`.
    pub fn artifact_name(&self) -> String {
        let name = self.context_label();
        if self.platform.is_windows() {
            format!("{}.exe", name)
        } else {
            name
        }
    }

    /// Cross-compilation environment for this leg.
    pub fn build_env(&self) -> Vec<(String, String)> {
        vec![
            ("GOOS".to_string(), self.platform.to_string()),
            ("GOARCH".to_string(), self.arch.to_string()),
            ("CGO_ENABLED".to_string(), "0".to_string()),
        ]
    }
}

impl PartialEq for JobSpec {
    fn eq(&self, other: &Self) -> bool {
        self.platform == other.platform && self.arch == other.arch
    }
}

impl Eq for JobSpec {}

impl std::hash::Hash for JobSpec {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.platform.hash(state);
        self.arch.hash(state);
    }
}

/// The ordered set of legs built for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MatrixRepr")]
pub struct Matrix {
    specs: Vec<JobSpec>,
}

/// Unchecked wire shape of [`Matrix`]; deserialization goes through `Matrix::new`.
#[derive(Deserialize)]
struct MatrixRepr {
    specs: Vec<JobSpec>,
}

impl TryFrom<MatrixRepr> for Matrix {
    type Error = Error;

    fn try_from(repr: MatrixRepr) -> Result<Self> {
        Matrix::new(repr.specs)
    }
}

impl Matrix {
    /// Build a matrix, rejecting duplicate legs so that status contexts and
    /// artifact names stay unique per commit and per release.
    pub fn new(specs: Vec<JobSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::InvalidInput("build matrix is empty".to_string()));
        }

        let mut labels = HashSet::new();
        let mut artifacts = HashSet::new();
        for spec in &specs {
            if !labels.insert(spec.context_label()) || !artifacts.insert(spec.artifact_name()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate matrix entry: {}/{}",
                    spec.platform, spec.arch
                )));
            }
        }

        Ok(Self { specs })
    }

    /// linux/amd64, linux/arm64 and windows/amd64.
    pub fn reference() -> Self {
        Self {
            specs: vec![
                JobSpec::new(Platform::Linux, Arch::Amd64),
                JobSpec::new(Platform::Linux, Arch::Arm64),
                JobSpec::new(Platform::Windows, Arch::Amd64),
            ],
        }
    }

    /// Every leg, in configuration order.
    pub fn expand(&self) -> Vec<JobSpec> {
        self.specs.clone()
    }

    pub fn specs(&self) -> &[JobSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::reference()
    }
}
