/// Directory confinement for file-manager and FTP home paths.
///
/// Requested paths are cleaned lexically, never touching the filesystem, and
/// any `..` that would climb above the root is an escape rather than being
/// clamped at `/`.
use crate::common::error::{PanelError, PanelResult};
use std::path::{Component, Path, PathBuf};

/// Resolve `requested` beneath `root`.
///
/// Empty input and `/` resolve to the root itself.
pub fn confine(root: &Path, requested: &str) -> PanelResult<PathBuf> {
    if requested.contains('\0') {
        return Err(PanelError::PathEscape);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in requested.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PanelError::PathEscape);
                }
            }
            other => segments.push(other),
        }
    }

    let root = clean(root);
    let mut resolved = root.clone();
    for segment in segments {
        resolved.push(segment);
    }

    // Component-wise, so `/var/www-evil` is not under `/var/www`
    if !resolved.starts_with(&root) {
        return Err(PanelError::PathEscape);
    }

    Ok(resolved)
}

/// Lexically normalize an absolute path
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// A fixed confinement root
#[derive(Debug, Clone)]
pub struct PathConfiner {
    root: PathBuf,
}

impl PathConfiner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: clean(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn confine(&self, requested: &str) -> PanelResult<PathBuf> {
        confine(&self.root, requested)
    }

    /// Like [`confine`](Self::confine), but an absolute request already under
    /// the root is first taken relative to it
    pub fn rebase(&self, requested: &str) -> PanelResult<PathBuf> {
        match Path::new(requested).strip_prefix(&self.root) {
            Ok(rest) => self.confine(&rest.to_string_lossy()),
            Err(_) => self.confine(requested),
        }
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }

    /// Root-relative display form, always starting with `/`
    pub fn display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => "/".to_string(),
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => "/".to_string(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Whatever the request, a successful resolution stays under the root
        #[test]
        fn prop_confined_under_root(requested in "[a-z./]{0,40}") {
            if let Ok(path) = confine(Path::new("/srv/root"), &requested) {
                prop_assert!(path.starts_with("/srv/root"));
                prop_assert!(!path.components().any(|c| c == Component::ParentDir));
            }
        }

        /// Leading traversal always escapes
        #[test]
        fn prop_leading_parent_escapes(rest in "[a-z/]{0,20}") {
            let requested = format!("../{}", rest);
            prop_assert!(matches!(confine(Path::new("/srv/root"), &requested), Err(PanelError::PathEscape)));
        }
    }
}
