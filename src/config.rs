use regex::Regex;

use crate::error::{EmbedError, Result};

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Settings shared by every virtual directory binding.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub zstd_level: i32,
    pub gzip_level: u32,
    /// Request paths matching any of these are never compressed.
    pub bypass_patterns: Vec<Regex>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            zstd_level: DEFAULT_ZSTD_LEVEL,
            gzip_level: DEFAULT_GZIP_LEVEL,
            bypass_patterns: Vec::new(),
        }
    }
}

impl ServeOptions {
    pub fn new(zstd_level: i32, gzip_level: u32) -> Self {
        Self {
            zstd_level,
            gzip_level,
            ..Self::default()
        }
    }

    pub fn with_bypass_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|source| EmbedError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.bypass_patterns.push(regex);
        }
        Ok(self)
    }

    pub fn should_bypass_compression(&self, request_path: &str) -> bool {
        should_bypass_compression(request_path, &self.bypass_patterns)
    }
}

pub fn should_bypass_compression(request_path: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|p| p.is_match(request_path))
}
