//! Variable interpolation for build commands.
//!
//! Supports variables like:
//! - `${artifact}` - Output filename for the leg (e.g. `carto-windows-amd64.exe`)
//! - `${target.platform}` - Target OS (`GOOS`)
//! - `${target.arch}` - Target architecture (`GOARCH`)
//! - `${toolchain.version}` - Toolchain version used by the leg
//! - `${git.ref}` - Commit SHA or tag being built
//! - `${git.sha}` - Commit SHA, when building a commit
//! - `${git.tag}` - Tag, when building a release
//! - `${env.VAR_NAME}` - Environment variable
//! - `${date}` - ISO date (YYYY-MM-DD)

use carto_ci_core::executor::SourceRef;
use carto_ci_core::matrix::JobSpec;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Values available to `${...}` references in a build command.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    pub artifact: String,
    pub platform: String,
    pub arch: String,
    pub toolchain_version: String,
    pub git_sha: Option<String>,
    pub git_tag: Option<String>,
    pub env: HashMap<String, String>,
}

// Regex for matching ${...} variables
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)?)\}").unwrap()
});

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for one matrix leg building `source`, with `${env.*}` taken
    /// from the current process environment.
    pub fn for_leg(spec: &JobSpec, source: &SourceRef, default_version: &str) -> Self {
        Self::for_leg_with_env(spec, source, default_version, std::env::vars())
    }

    /// Like [`for_leg`](Self::for_leg), with an explicit environment.
    pub fn for_leg_with_env(
        spec: &JobSpec,
        source: &SourceRef,
        default_version: &str,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let builder = VariableContextBuilder::new()
            .with_spec(spec)
            .with_toolchain_version(spec.toolchain_version_or(default_version))
            .with_envs(env);
        let builder = match source {
            SourceRef::Commit(sha) => builder.with_git_sha(sha.clone()),
            SourceRef::Tag(tag) => builder.with_git_tag(tag.clone()),
            SourceRef::DefaultBranch => builder,
        };
        builder.build()
    }

    /// Resolve a variable name to its value.
    pub fn resolve(&self, var_name: &str) -> Option<String> {
        let parts: Vec<&str> = var_name.split('.').collect();

        match parts.as_slice() {
            ["artifact"] => Some(self.artifact.clone()),

            ["target", "platform"] => Some(self.platform.clone()),
            ["target", "arch"] => Some(self.arch.clone()),

            ["toolchain", "version"] => Some(self.toolchain_version.clone()),

            ["git", "sha"] => self.git_sha.clone(),
            ["git", "tag"] => self.git_tag.clone(),
            ["git", "ref"] => self.git_sha.clone().or_else(|| self.git_tag.clone()),

            ["env", name] => self.env.get(*name).cloned(),

            ["date"] => Some(chrono::Utc::now().format("%Y-%m-%d").to_string()),

            _ => None,
        }
    }

    /// Interpolate all variables in a string.
    /// Unknown variables are left as written.
    pub fn interpolate(&self, input: &str) -> String {
        VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let var_name = &caps[1];
                self.resolve(var_name)
                    .unwrap_or_else(|| format!("${{{}}}", var_name))
            })
            .to_string()
    }
}

/// Builder for creating VariableContext.
pub struct VariableContextBuilder {
    ctx: VariableContext,
}

impl VariableContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: VariableContext::new(),
        }
    }

    pub fn with_spec(mut self, spec: &JobSpec) -> Self {
        self.ctx.artifact = spec.artifact_name();
        self.ctx.platform = spec.platform.to_string();
        self.ctx.arch = spec.arch.to_string();
        self
    }

    pub fn with_toolchain_version(mut self, version: impl Into<String>) -> Self {
        self.ctx.toolchain_version = version.into();
        self
    }

    pub fn with_git_sha(mut self, sha: impl Into<String>) -> Self {
        self.ctx.git_sha = Some(sha.into());
        self
    }

    pub fn with_git_tag(mut self, tag: impl Into<String>) -> Self {
        self.ctx.git_tag = Some(tag.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ctx.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.ctx.env.extend(vars);
        self
    }

    pub fn build(self) -> VariableContext {
        self.ctx
    }
}

impl Default for VariableContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
