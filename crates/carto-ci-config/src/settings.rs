//! Orchestrator configuration parsing.

use crate::{ConfigError, ConfigResult};
use carto_ci_core::matrix::{Arch, DEFAULT_TOOLCHAIN_VERSION, JobSpec, Matrix, Platform};
use kdl::{KdlDocument, KdlNode};
use serde::Serialize;
use std::path::Path;

/// Default build command; `/out` is the per-job output mount.
pub const DEFAULT_BUILD_COMMAND: &str = "go build -o /out/${artifact} cmd/carto/main.go";

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CiConfig {
    /// `owner/name` of the repository being built.
    pub repository: String,
    pub release: ReleaseConfig,
    pub toolchain: ToolchainConfig,
    pub build: BuildConfig,
    pub matrix: Matrix,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseConfig {
    /// Tags must start with this to trigger a release.
    pub tag_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolchainConfig {
    /// Container image, tagged with the toolchain version at build time.
    pub image: String,
    /// Version used by legs that do not pin one.
    pub version: String,
}

impl ToolchainConfig {
    /// Full image reference for one leg, e.g. `golang:1.22`.
    pub fn image_for(&self, spec: &JobSpec) -> String {
        format!("{}:{}", self.image, spec.toolchain_version_or(&self.version))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
    /// Shell command run in the checked-out tree; supports `${...}` variables.
    pub command: String,
    /// Clone URL; defaults to the GitHub URL of `repository`.
    pub clone_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerConfig {
    /// Upper bound on jobs running at once.
    pub max_concurrent: usize,
}

/// Read and parse a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<CiConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse a configuration from KDL text.
pub fn parse_config(kdl: &str) -> ConfigResult<CiConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut repository = String::new();
    let mut tag_prefix = "v".to_string();
    let mut image = "golang".to_string();
    let mut version = DEFAULT_TOOLCHAIN_VERSION.to_string();
    let mut command = DEFAULT_BUILD_COMMAND.to_string();
    let mut clone_url = None;
    let mut specs = None;
    let mut max_concurrent = None;

    for node in doc.nodes() {
        match node.name().value() {
            "repository" => {
                repository = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("repository name".to_string()))?;
            }
            "release" => {
                if let Some(prefix) = get_string_prop(node, "prefix") {
                    tag_prefix = prefix;
                }
            }
            "toolchain" => {
                if let Some(i) = get_string_prop(node, "image") {
                    image = i;
                }
                if let Some(v) = get_string_prop(node, "version") {
                    version = v;
                }
            }
            "build" => {
                if let Some(c) = get_string_prop(node, "command") {
                    command = c;
                }
                clone_url = get_string_prop(node, "clone-url");
            }
            "matrix" => {
                specs = Some(parse_matrix(node)?);
            }
            "worker" => {
                max_concurrent = get_usize_prop(node, "max-concurrent")?;
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if repository.is_empty() {
        return Err(ConfigError::MissingField("repository".to_string()));
    }
    validate_repository(&repository)?;

    if tag_prefix.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "release prefix".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    let matrix = match specs {
        Some(specs) => Matrix::new(specs)?,
        None => Matrix::reference(),
    };

    let max_concurrent = max_concurrent.unwrap_or(matrix.len());
    if max_concurrent == 0 {
        return Err(ConfigError::InvalidValue {
            field: "worker max-concurrent".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    let clone_url = clone_url.unwrap_or_else(|| format!("https://github.com/{}.git", repository));

    Ok(CiConfig {
        repository,
        release: ReleaseConfig { tag_prefix },
        toolchain: ToolchainConfig { image, version },
        build: BuildConfig { command, clone_url },
        matrix,
        worker: WorkerConfig { max_concurrent },
    })
}

fn parse_matrix(node: &KdlNode) -> ConfigResult<Vec<JobSpec>> {
    let mut specs = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() != "target" {
                continue;
            }
            specs.push(parse_target(child)?);
        }
    }

    Ok(specs)
}

fn parse_target(node: &KdlNode) -> ConfigResult<JobSpec> {
    let args = get_all_string_args(node);
    let [platform, arch] = args.as_slice() else {
        return Err(ConfigError::InvalidValue {
            field: "target".to_string(),
            message: format!("expected \"<platform>\" \"<arch>\", got {} argument(s)", args.len()),
        });
    };

    let platform: Platform = platform.parse()?;
    let arch: Arch = arch.parse()?;

    let mut spec = JobSpec::new(platform, arch);
    if let Some(version) = get_string_prop(node, "version") {
        spec = spec.with_toolchain_version(version);
    }
    Ok(spec)
}

fn validate_repository(repository: &str) -> ConfigResult<()> {
    let mut parts = repository.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidValue {
            field: "repository".to_string(),
            message: format!("expected owner/name, got '{}'", repository),
        }),
    }
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_usize_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<usize>> {
    let Some(value) = node.get(name) else {
        return Ok(None);
    };
    value
        .as_integer()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected a non-negative integer, got {}", value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        repository "b1naryth1ef/carto"
        release prefix="release-"
        toolchain image="golang" version="1.23"
        build command="go build -o /out/${artifact} ./cmd/carto"

        matrix {
            target "linux" "amd64"
            target "darwin" "arm64" version="1.21"
        }

        worker max-concurrent=1
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap();
        assert_eq!(config.repository, "b1naryth1ef/carto");
        assert_eq!(config.release.tag_prefix, "release-");
        assert_eq!(config.toolchain.version, "1.23");
        assert_eq!(config.build.command, "go build -o /out/${artifact} ./cmd/carto");
        assert_eq!(config.build.clone_url, "https://github.com/b1naryth1ef/carto.git");
        assert_eq!(config.worker.max_concurrent, 1);

        let specs = config.matrix.expand();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].platform, Platform::Darwin);
        assert_eq!(specs[1].toolchain_version.as_deref(), Some("1.21"));
    }

    #[test]
    fn test_defaults() {
        let config = parse_config(r#"repository "b1naryth1ef/carto""#).unwrap();
        assert_eq!(config.release.tag_prefix, "v");
        assert_eq!(config.toolchain.image, "golang");
        assert_eq!(config.toolchain.version, "1.22");
        assert_eq!(config.build.command, DEFAULT_BUILD_COMMAND);
        assert_eq!(config.matrix.len(), 3);
        assert_eq!(config.worker.max_concurrent, 3);
    }

    #[test]
    fn test_image_for_leg() {
        let config = parse_config(FULL).unwrap();
        let specs = config.matrix.expand();
        assert_eq!(config.toolchain.image_for(&specs[0]), "golang:1.23");
        assert_eq!(config.toolchain.image_for(&specs[1]), "golang:1.21");
    }

    #[test]
    fn test_missing_repository() {
        let result = parse_config(r#"toolchain version="1.22""#);
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_bad_repository_shape() {
        let result = parse_config(r#"repository "carto""#);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let kdl = r#"
            repository "b1naryth1ef/carto"
            matrix {
                target "linux" "amd64"
                target "linux" "amd64"
            }
        "#;
        assert!(matches!(parse_config(kdl), Err(ConfigError::Matrix(_))));
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let kdl = r#"
            repository "b1naryth1ef/carto"
            matrix {
                target "plan9" "amd64"
            }
        "#;
        assert!(matches!(parse_config(kdl), Err(ConfigError::Matrix(_))));
    }

    #[test]
    fn test_target_needs_two_args() {
        let kdl = r#"
            repository "b1naryth1ef/carto"
            matrix {
                target "linux"
            }
        "#;
        assert!(matches!(
            parse_config(kdl),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let kdl = r#"
            repository "b1naryth1ef/carto"
            worker max-concurrent=0
        "#;
        assert!(parse_config(kdl).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, FULL.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.matrix.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/carto-ci.kdl");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
