//! Task-page layout sources.

use std::path::PathBuf;

use async_trait::async_trait;

use super::PayloadError;

/// Which page skeleton to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Regular study page with substitution markers and content sections.
    Study,
    /// Fixed page for compensation tasks.
    Compensation,
}

impl LayoutKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            LayoutKind::Study => "mturk-layout.html",
            LayoutKind::Compensation => "mturk-layout-compensation.html",
        }
    }
}

/// Supplies page skeletons.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn load(&self, kind: LayoutKind) -> Result<String, PayloadError>;
}

/// Layouts compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledLayouts;

#[async_trait]
impl TemplateSource for BundledLayouts {
    async fn load(&self, kind: LayoutKind) -> Result<String, PayloadError> {
        Ok(match kind {
            LayoutKind::Study => include_str!("../../layouts/mturk-layout.html"),
            LayoutKind::Compensation => include_str!("../../layouts/mturk-layout-compensation.html"),
        }
        .to_string())
    }
}

/// Layouts read from a directory on each load.
#[derive(Debug, Clone)]
pub struct DirectoryLayouts {
    dir: PathBuf,
}

impl DirectoryLayouts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TemplateSource for DirectoryLayouts {
    async fn load(&self, kind: LayoutKind) -> Result<String, PayloadError> {
        let path = self.dir.join(kind.file_name());
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PayloadError::TemplateUnavailable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|e| PayloadError::TemplateUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
