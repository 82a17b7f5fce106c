use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{FocusError, FocusResult};

const EXCLUDED_GLOBS: &[&str] = &[
    // version control
    "**/.git",
    "**/.git/**",
    "**/.hg/**",
    "**/.svn/**",
    // dependencies, caches, build output
    "**/node_modules/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/target/**",
    "**/dist/**",
    "**/build/**",
    "**/.idea/**",
    "**/.vscode/**",
    "**/.cache/**",
    // secrets
    "**/.env",
    "**/.env.*",
    "**/*.pem",
    "**/*.key",
    "**/id_rsa*",
    "**/*credentials*",
    "**/*secret*",
];

const TEXT_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "html", "css", "scss", "json", "md", "txt", "yaml", "yml",
    "toml", "c", "cpp", "h", "hpp", "java", "go", "rs", "rb", "sh", "sql", "kt", "swift", "vue",
    "svelte",
];

/// Decides which touched paths count as user activity.
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    excluded: GlobSet,
}

impl ActivityFilter {
    pub fn new() -> FocusResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in EXCLUDED_GLOBS {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(true)
                .build()
                .map_err(|err| {
                    FocusError::configuration(format!("invalid exclude pattern {pattern}: {err}"))
                })?;
            builder.add(glob);
        }
        let excluded = builder
            .build()
            .map_err(|err| FocusError::configuration(format!("invalid exclude set: {err}")))?;
        Ok(Self { excluded })
    }

    /// `relative` is the path below the watch root.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.excluded.is_match(normalized.as_str())
    }

    pub fn is_text_path(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                TEXT_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// Excluded paths and non-text extensions are both dropped.
    pub fn accepts(&self, relative: &Path) -> bool {
        !self.is_excluded(relative) && Self::is_text_path(relative)
    }
}

/// NUL bytes never appear in the text formats we read.
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}
