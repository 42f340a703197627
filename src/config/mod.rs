use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// File name searched for by [`CodegenConfig::find`].
pub const CONFIG_FILE: &str = "kernelgen.toml";

/// Knobs for the device code generator.
///
/// ```toml
/// [codegen]
/// indent_width = 4
/// scope_comments = true
/// max_workgroup_invocations = 256
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Spaces per nesting level in emitted source.
    pub indent_width: usize,
    /// Annotate closing braces with the scope they end (`} // for x`).
    pub scope_comments: bool,
    /// Workgroups larger than this are reported with a warning. 256 is the
    /// WebGPU default for `maxComputeInvocationsPerWorkgroup`.
    pub max_workgroup_invocations: u32,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            scope_comments: true,
            max_workgroup_invocations: 256,
        }
    }
}

impl CodegenConfig {
    /// Load a configuration from a TOML file. Missing keys keep defaults.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse_toml(&content, path)
    }

    /// Search `start_dir` and its ancestors for `kernelgen.toml`.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self, Diagnostic> {
        let err =
            |msg: String| Diagnostic::error(format!("{}: {}", path.display(), msg), Span::dummy());

        let mut config = Self::default();
        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(err(format!("expected 'key = value', found '{}'", trimmed)));
            };
            let key = key.trim();
            // Strip a trailing comment.
            let value = value.split('#').next().unwrap_or("").trim();

            match (section.as_str(), key) {
                ("codegen", "indent_width") => {
                    config.indent_width = value
                        .parse()
                        .map_err(|_| err(format!("invalid codegen.indent_width: {}", value)))?;
                }
                ("codegen", "scope_comments") => {
                    config.scope_comments = match value {
                        "true" => true,
                        "false" => false,
                        _ => {
                            return Err(err(format!(
                                "invalid codegen.scope_comments: {}",
                                value
                            )))
                        }
                    };
                }
                ("codegen", "max_workgroup_invocations") => {
                    config.max_workgroup_invocations = value.parse().map_err(|_| {
                        err(format!(
                            "invalid codegen.max_workgroup_invocations: {}",
                            value
                        ))
                    })?;
                }
                ("codegen", other) => {
                    return Err(err(format!("unknown key codegen.{}", other)));
                }
                // Other sections belong to other tools.
                _ => {}
            }
        }

        if config.max_workgroup_invocations == 0 {
            return Err(err(
                "codegen.max_workgroup_invocations must be > 0".to_string()
            ));
        }

        Ok(config)
    }
}
