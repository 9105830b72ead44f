//! Resource resolution module
//!
//! Maps a resource path to file bytes under the content root, or to the
//! fixed not-found page. Resolution never fails.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::ContentConfig;
use crate::http::ResourcePath;
use crate::logger::{Logger, Outcome};

/// Payload served whenever a resource cannot be found or read
pub const NOT_FOUND_PAGE: &str = "<html><head></head><body>\n\
<h2>404 error: The page you were looking for cannot be found.</h2>\n\
<h3>Sorry</h3>\n\
</body></html>\n";

/// Content selected for one request, before marker substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub payload: Vec<u8>,
    pub outcome: Outcome,
}

impl Resolved {
    pub fn not_found() -> Self {
        Self {
            payload: NOT_FOUND_PAGE.as_bytes().to_vec(),
            outcome: Outcome::NotFound,
        }
    }

    const fn served(payload: Vec<u8>) -> Self {
        Self {
            payload,
            outcome: Outcome::Served,
        }
    }
}

/// Reads resources relative to a content root
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    root: PathBuf,
    confine_to_root: bool,
}

impl ResourceResolver {
    pub fn new(root: impl Into<PathBuf>, confine_to_root: bool) -> Self {
        Self {
            root: root.into(),
            confine_to_root,
        }
    }

    pub fn from_config(content: &ContentConfig) -> Self {
        Self::new(&content.root, content.confine_to_root)
    }

    /// Resolve a resource path; a missing path counts as not found
    pub async fn resolve(&self, path: Option<&ResourcePath>, log: &dyn Logger) -> Resolved {
        let Some(path) = path else {
            return Resolved::not_found();
        };
        match self.load(path, log).await {
            Some(content) => Resolved::served(content),
            None => Resolved::not_found(),
        }
    }

    async fn load(&self, path: &ResourcePath, log: &dyn Logger) -> Option<Vec<u8>> {
        if path.is_empty() {
            return None;
        }
        let file_path = self.root.join(path.as_str());

        if self.confine_to_root && !self.is_within_root(path, &file_path, log).await {
            return None;
        }

        // File not found is common (404), no need to log above debug
        match fs::read(&file_path).await {
            Ok(content) => Some(content),
            Err(e) => {
                log.debug(&format!(
                    "Failed to read file '{}': {e}",
                    file_path.display()
                ));
                None
            }
        }
    }

    async fn is_within_root(&self, path: &ResourcePath, file_path: &Path, log: &dyn Logger) -> bool {
        let root = match fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                log.warn(&format!(
                    "Content root not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return false;
            }
        };
        let Ok(target) = fs::canonicalize(file_path).await else {
            return false;
        };
        if target.starts_with(&root) {
            true
        } else {
            log.warn(&format!(
                "Path traversal attempt blocked: {path} -> {}",
                target.display()
            ));
            false
        }
    }
}
