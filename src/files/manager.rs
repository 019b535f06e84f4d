use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::panel_module::PanelModule;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{PathConfiner, ValidationError};
use chrono::{DateTime, Utc};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::types::{DirectoryListing, FileContent, FileEntry, Uploaded};

pub const MAX_READ_BYTES: u64 = 2 * 1024 * 1024;
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// File operations confined to `paths.files_root`.
///
/// Requested paths are confined lexically first; paths that already exist are
/// additionally resolved through symlinks and must still land under the root.
pub struct FileManager {
    ctx: PanelContext,
    confiner: PathConfiner,
}

impl FileManager {
    pub fn new(ctx: PanelContext) -> Self {
        let confiner = PathConfiner::new(&ctx.config.paths.files_root);
        Self { ctx, confiner }
    }

    pub async fn list(&self, path: &str) -> PanelResult<DirectoryListing> {
        audit_operation(
            &self.ctx.audit,
            "list_files",
            Some(serde_json::json!({"path": path})),
            || async {
                let dir = self.resolve(path).await?;
                let mut entries = tokio::fs::read_dir(&dir)
                    .await
                    .map_err(|e| not_found_or(e, path))?;

                let mut files = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    // entries that vanish mid-listing are skipped
                    let Ok(meta) = entry.metadata().await else {
                        continue;
                    };
                    let full = entry.path();
                    files.push(FileEntry {
                        name: entry.file_name().to_string_lossy().into_owned(),
                        path: self.confiner.display(&full),
                        is_dir: meta.is_dir(),
                        size: meta.len(),
                        permissions: mode_string(meta.is_dir(), meta.permissions().mode()),
                        modified: meta.modified().ok().map(DateTime::<Utc>::from),
                    });
                }
                files.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

                Ok(DirectoryListing {
                    path: self.confiner.display(&dir),
                    files,
                })
            },
        )
        .await
    }

    /// Create a directory and any missing parents; returns its display path
    pub async fn mkdir(&self, path: &str) -> PanelResult<String> {
        audit_operation(
            &self.ctx.audit,
            "make_directory",
            Some(serde_json::json!({"path": path})),
            || async {
                let dir = self.resolve(path).await?;
                tokio::fs::create_dir_all(&dir).await?;
                Ok(self.confiner.display(&dir))
            },
        )
        .await
    }

    /// Remove a file or a whole directory tree; the root itself is refused
    pub async fn delete(&self, path: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_file",
            Some(serde_json::json!({"path": path})),
            || async {
                let target = self.resolve_entry(path).await?;
                if self.confiner.is_root(&target) {
                    return Err(PanelError::forbidden("cannot delete the root directory"));
                }

                let meta = tokio::fs::symlink_metadata(&target)
                    .await
                    .map_err(|e| not_found_or(e, path))?;
                self.ctx.audit.log_dangerous_operation(
                    "delete_file",
                    true,
                    &format!("Deleting {}", self.confiner.display(&target)),
                );
                if meta.is_dir() {
                    tokio::fs::remove_dir_all(&target).await?;
                } else {
                    tokio::fs::remove_file(&target).await?;
                }
                Ok(())
            },
        )
        .await
    }

    pub async fn rename(&self, from: &str, to: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "rename_file",
            Some(serde_json::json!({"from": from, "to": to})),
            || async {
                let src = self.resolve(from).await?;
                let dst = self.resolve(to).await?;
                if self.confiner.is_root(&src) || self.confiner.is_root(&dst) {
                    return Err(PanelError::forbidden("cannot move the root directory"));
                }
                tokio::fs::rename(&src, &dst)
                    .await
                    .map_err(|e| not_found_or(e, from))
            },
        )
        .await
    }

    /// Text content of a file up to [`MAX_READ_BYTES`]
    pub async fn read(&self, path: &str) -> PanelResult<FileContent> {
        audit_operation(
            &self.ctx.audit,
            "read_file",
            Some(serde_json::json!({"path": path})),
            || async {
                let file = self.resolve(path).await?;
                let meta = tokio::fs::metadata(&file)
                    .await
                    .map_err(|e| not_found_or(e, path))?;
                if meta.is_dir() {
                    return Err(ValidationError::InvalidFormat {
                        field: "path".to_string(),
                        expected: "a file".to_string(),
                        got: self.confiner.display(&file),
                    }
                    .into());
                }
                if meta.len() > MAX_READ_BYTES {
                    return Err(PanelError::PayloadTooLarge {
                        max_bytes: MAX_READ_BYTES,
                    });
                }

                let data = tokio::fs::read(&file).await?;
                Ok(FileContent {
                    path: self.confiner.display(&file),
                    content: String::from_utf8_lossy(&data).into_owned(),
                })
            },
        )
        .await
    }

    /// Create or overwrite a file
    pub async fn write(&self, path: &str, content: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "write_file",
            Some(serde_json::json!({"path": path, "bytes": content.len()})),
            || async {
                let file = self.resolve(path).await?;
                if self.confiner.is_root(&file) {
                    return Err(PanelError::forbidden("cannot overwrite the root directory"));
                }
                tokio::fs::write(&file, content.as_bytes()).await?;
                Ok(())
            },
        )
        .await
    }

    /// Store `data` as `dir/<final component of filename>`
    pub async fn upload(&self, dir: &str, filename: &str, data: &[u8]) -> PanelResult<Uploaded> {
        audit_operation(
            &self.ctx.audit,
            "upload_file",
            Some(serde_json::json!({"path": dir, "filename": filename, "bytes": data.len()})),
            || async {
                if data.len() as u64 > MAX_UPLOAD_BYTES {
                    return Err(PanelError::PayloadTooLarge {
                        max_bytes: MAX_UPLOAD_BYTES,
                    });
                }
                let name = upload_name(filename)?;

                let dir = self.resolve(dir).await?;
                let dest = self.resolve(&format!("{}/{}", self.confiner.display(&dir), name)).await?;
                tokio::fs::write(&dest, data).await?;

                Ok(Uploaded {
                    filename: name,
                    path: self.confiner.display(&dest),
                })
            },
        )
        .await
    }

    /// Lexical confinement plus a symlink check on whatever already exists.
    /// Dangling symlinks anywhere on the path are refused.
    async fn resolve(&self, requested: &str) -> PanelResult<PathBuf> {
        let path = self.confiner.confine(requested)?;
        self.check_real(&path).await?;
        Ok(path)
    }

    /// Like [`resolve`](Self::resolve) but the final component is not
    /// followed, so a link can be removed whatever it points at
    async fn resolve_entry(&self, requested: &str) -> PanelResult<PathBuf> {
        let path = self.confiner.confine(requested)?;
        match path.parent() {
            Some(parent) if !self.confiner.is_root(&path) => self.check_real(parent).await?,
            _ => self.check_real(&path).await?,
        }
        Ok(path)
    }

    async fn check_real(&self, path: &Path) -> PanelResult<()> {
        let Ok(real_root) = tokio::fs::canonicalize(self.confiner.root()).await else {
            return Ok(());
        };

        let mut probe = path;
        loop {
            match tokio::fs::canonicalize(probe).await {
                Ok(real) if real.starts_with(&real_root) => return Ok(()),
                Ok(_) => return Err(PanelError::PathEscape),
                Err(_) => {
                    // a dangling link would be followed by the write that creates its target
                    let dangling = tokio::fs::symlink_metadata(probe)
                        .await
                        .is_ok_and(|meta| meta.file_type().is_symlink());
                    if dangling {
                        return Err(PanelError::PathEscape);
                    }
                    match probe.parent() {
                        Some(parent) if parent.starts_with(self.confiner.root()) => probe = parent,
                        _ => return Ok(()),
                    }
                }
            }
        }
    }
}

impl PanelModule for FileManager {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "FileManager"
    }
}

/// Final path component of an uploaded file name
fn upload_name(filename: &str) -> Result<String, ValidationError> {
    let name = Path::new(filename.trim())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ValidationError::Empty {
            field: "filename".to_string(),
        })?;
    Ok(name)
}

fn not_found_or(err: std::io::Error, requested: &str) -> PanelError {
    if err.kind() == std::io::ErrorKind::NotFound {
        PanelError::not_found(format!("path {}", requested))
    } else {
        err.into()
    }
}

/// Render permission bits the way `ls -l` does
fn mode_string(is_dir: bool, mode: u32) -> String {
    let mut out = String::with_capacity(10);
    out.push(if is_dir { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
