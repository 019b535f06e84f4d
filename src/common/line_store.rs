/// Editor for "one record per line" configuration files.
///
/// Every mutation is read whole file, transform in memory, atomic rewrite, and
/// runs under the [`FileLocks`] entry of the target file. A missing file reads
/// as empty.
use crate::common::error::PanelResult;
use crate::common::file_locks::FileLocks;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Which lines of a file count as records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// `#` comments
    Plain,
    /// `#` comments and environment assignments (`MAILTO=`, `PATH=`, `SHELL=`, ...)
    Crontab,
    /// `;` comments and `$` directives
    Zone,
}

impl RecordFilter {
    pub fn is_record(self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match self {
            RecordFilter::Plain => !line.starts_with('#'),
            RecordFilter::Crontab => !line.starts_with('#') && !is_env_assignment(line),
            RecordFilter::Zone => !line.starts_with(';') && !line.starts_with('$'),
        }
    }
}

/// `NAME=value` where NAME precedes any whitespace
fn is_env_assignment(line: &str) -> bool {
    let head = line.split_whitespace().next().unwrap_or("");
    match head.split_once('=') {
        Some((name, _)) => {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// A record line and its 1-based position among records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedLine {
    pub position: usize,
    pub line: String,
}

pub struct LineStore {
    locks: Arc<FileLocks>,
}

impl LineStore {
    pub fn new(locks: Arc<FileLocks>) -> Self {
        Self { locks }
    }

    pub fn locks(&self) -> &Arc<FileLocks> {
        &self.locks
    }

    /// All lines, without terminators
    pub async fn read_lines(&self, path: &Path) -> PanelResult<Vec<String>> {
        Ok(split_lines(&read_or_empty(path).await?))
    }

    /// Record lines with their positions
    pub async fn records(
        &self,
        path: &Path,
        filter: RecordFilter,
    ) -> PanelResult<Vec<PositionedLine>> {
        let lines = self.read_lines(path).await?;
        Ok(positioned(&lines, filter))
    }

    /// Append a line, creating the file world-readable if absent
    pub async fn append(&self, path: &Path, line: &str) -> PanelResult<()> {
        self.append_with_mode(path, line, 0o644).await
    }

    /// Append a line, creating the file owner-only if absent
    pub async fn append_private(&self, path: &Path, line: &str) -> PanelResult<()> {
        self.append_with_mode(path, line, 0o600).await
    }

    async fn append_with_mode(&self, path: &Path, line: &str, mode: u32) -> PanelResult<()> {
        let _guard = self.locks.lock(path).await;

        let existing = read_or_empty(path).await?;
        let mut chunk = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            chunk.push('\n');
        }
        chunk.push_str(line);
        chunk.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .mode(mode)
            .open(path)
            .await?;
        file.write_all(chunk.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Append `line` unless an existing line matches `exists`, in one locked
    /// section. Returns whether the line was added.
    pub async fn append_unless<F>(&self, path: &Path, line: &str, exists: F) -> PanelResult<bool>
    where
        F: Fn(&str) -> bool,
    {
        self.edit(path, |lines| {
            if lines.iter().any(|l| exists(l)) {
                return false;
            }
            lines.push(line.to_string());
            true
        })
        .await
    }

    /// Drop every line the predicate matches; returns how many were removed
    pub async fn remove_matching<F>(&self, path: &Path, predicate: F) -> PanelResult<usize>
    where
        F: Fn(&str) -> bool,
    {
        Ok(self.take_matching(path, predicate).await?.len())
    }

    /// Drop every line the predicate matches and hand them back
    pub async fn take_matching<F>(&self, path: &Path, predicate: F) -> PanelResult<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        self.edit(path, |lines| {
            let (taken, kept): (Vec<String>, Vec<String>) =
                lines.drain(..).partition(|l| predicate(l));
            *lines = kept;
            taken
        })
        .await
    }

    /// Re-append lines previously taken out of `path`
    pub async fn restore(&self, path: &Path, taken: &[String]) -> PanelResult<()> {
        if taken.is_empty() {
            return Ok(());
        }
        self.edit(path, |lines| lines.extend(taken.iter().cloned()))
            .await
    }

    /// Delete the record at `position`; out of range leaves the file untouched
    pub async fn remove_by_position(
        &self,
        path: &Path,
        filter: RecordFilter,
        position: usize,
    ) -> PanelResult<Option<String>> {
        self.edit(path, |lines| {
            index_of_position(lines, filter, position).map(|idx| lines.remove(idx))
        })
        .await
    }

    /// Replace the record at `position`; returns the old line
    pub async fn replace_by_position(
        &self,
        path: &Path,
        filter: RecordFilter,
        position: usize,
        new_line: &str,
    ) -> PanelResult<Option<String>> {
        self.edit(path, |lines| {
            index_of_position(lines, filter, position)
                .map(|idx| std::mem::replace(&mut lines[idx], new_line.to_string()))
        })
        .await
    }

    /// Generic locked read-modify-write over the line vector.
    ///
    /// The file is rewritten only if the closure changed the lines.
    pub async fn edit<F, T>(&self, path: &Path, f: F) -> PanelResult<T>
    where
        F: FnOnce(&mut Vec<String>) -> T,
    {
        let _guard = self.locks.lock(path).await;

        let original = split_lines(&read_or_empty(path).await?);
        let mut lines = original.clone();
        let out = f(&mut lines);
        if lines != original {
            atomic_write(path, &join_lines(&lines), None).await?;
        }
        Ok(out)
    }

    /// Locked read-modify-write over the whole text; `None` means no change
    pub async fn edit_text<F, T>(&self, path: &Path, f: F) -> PanelResult<T>
    where
        F: FnOnce(&str) -> PanelResult<(Option<String>, T)>,
    {
        let _guard = self.locks.lock(path).await;

        let current = tokio::fs::read_to_string(path).await?;
        let (updated, out) = f(&current)?;
        if let Some(text) = updated {
            if text != current {
                atomic_write(path, &text, None).await?;
            }
        }
        Ok(out)
    }

    /// Replace the whole file under its lock
    pub async fn write(&self, path: &Path, content: &str, mode: Option<u32>) -> PanelResult<()> {
        let _guard = self.locks.lock(path).await;
        atomic_write(path, content, mode).await
    }

    /// Remove the file under its lock; absent files are fine
    pub async fn remove_file(&self, path: &Path) -> PanelResult<bool> {
        let _guard = self.locks.lock(path).await;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn positioned(lines: &[String], filter: RecordFilter) -> Vec<PositionedLine> {
    lines
        .iter()
        .filter(|l| filter.is_record(l))
        .enumerate()
        .map(|(i, l)| PositionedLine {
            position: i + 1,
            line: l.clone(),
        })
        .collect()
}

fn index_of_position(lines: &[String], filter: RecordFilter, position: usize) -> Option<usize> {
    if position == 0 {
        return None;
    }
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| filter.is_record(l))
        .nth(position - 1)
        .map(|(idx, _)| idx)
}

fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

async fn read_or_empty(path: &Path) -> PanelResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write a sibling temp file and rename it over `path`.
///
/// Without an explicit mode the target's current permission bits are kept,
/// falling back to 0644 for new files.
pub async fn atomic_write(path: &Path, content: &str, mode: Option<u32>) -> PanelResult<()> {
    let mode = match mode {
        Some(m) => m,
        None => match tokio::fs::metadata(path).await {
            Ok(meta) => meta.permissions().mode() & 0o7777,
            Err(_) => 0o644,
        },
    };

    let tmp = temp_sibling(path);
    let result = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(mode)
            .open(&tmp)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(mode)).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %e, "could not remove temp file");
            }
        }
    }
    Ok(result?)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.vpsctl-tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LineStore {
        LineStore::new(Arc::new(FileLocks::new()))
    }

    #[test]
    fn test_record_filters() {
        assert!(RecordFilter::Plain.is_record("example.com"));
        assert!(!RecordFilter::Plain.is_record("  # comment"));
        assert!(!RecordFilter::Plain.is_record("   "));

        assert!(RecordFilter::Crontab.is_record("*/5 * * * * /bin/true"));
        assert!(!RecordFilter::Crontab.is_record("MAILTO=root"));
        assert!(!RecordFilter::Crontab.is_record("PATH=/usr/bin:/bin"));
        assert!(!RecordFilter::Crontab.is_record("SHELL=/bin/bash"));
        assert!(!RecordFilter::Crontab.is_record("CRON_TZ=UTC"));
        assert!(RecordFilter::Crontab.is_record("0 0 * * * FOO=1 run.sh"));

        assert!(RecordFilter::Zone.is_record("www\t3600\tIN\tA\t1.2.3.4"));
        assert!(!RecordFilter::Zone.is_record("$TTL 3600"));
        assert!(!RecordFilter::Zone.is_record("; A Records"));
    }

    #[tokio::test]
    async fn test_append_then_remove_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list");
        let s = store();

        s.append(&path, "L1").await.unwrap();
        s.append(&path, "L2").await.unwrap();
        let recs = s.records(&path, RecordFilter::Plain).await.unwrap();
        assert_eq!(
            recs,
            vec![
                PositionedLine { position: 1, line: "L1".into() },
                PositionedLine { position: 2, line: "L2".into() },
            ]
        );

        let removed = s
            .remove_by_position(&path, RecordFilter::Plain, 1)
            .await
            .unwrap();
        assert_eq!(removed.as_deref(), Some("L1"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "L2\n");
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list");
        tokio::fs::write(&path, "# header\nL1\nL2").await.unwrap();
        let s = store();

        assert_eq!(s.remove_by_position(&path, RecordFilter::Plain, 3).await.unwrap(), None);
        assert_eq!(s.remove_by_position(&path, RecordFilter::Plain, 0).await.unwrap(), None);
        assert_eq!(
            s.replace_by_position(&path, RecordFilter::Plain, 9, "X").await.unwrap(),
            None
        );
        // byte-for-byte untouched, missing trailing newline included
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "# header\nL1\nL2");
    }

    #[tokio::test]
    async fn test_positions_skip_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crontab");
        tokio::fs::write(&path, "MAILTO=root\n# nightly\n0 0 * * * a\n\n5 * * * * b\n")
            .await
            .unwrap();
        let s = store();

        let old = s
            .replace_by_position(&path, RecordFilter::Crontab, 2, "10 * * * * c")
            .await
            .unwrap();
        assert_eq!(old.as_deref(), Some("5 * * * * b"));
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "MAILTO=root\n# nightly\n0 0 * * * a\n\n10 * * * * c\n"
        );
    }

    #[tokio::test]
    async fn test_remove_matching_and_append_newline_fixup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domains");
        tokio::fs::write(&path, "a.com\nold.com\nb.com").await.unwrap();
        let s = store();

        assert_eq!(s.remove_matching(&path, |l| l == "old.com").await.unwrap(), 1);
        s.append(&path, "c.com").await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "a.com\nb.com\nc.com\n"
        );
        assert_eq!(s.remove_matching(&path, |l| l == "zzz").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rewrite_preserves_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root");
        let s = store();
        s.append_private(&path, "0 0 * * * a").await.unwrap();
        s.append_private(&path, "0 1 * * * b").await.unwrap();
        s.remove_by_position(&path, RecordFilter::Crontab, 1).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(!temp_sibling(&path).exists());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list");
        let s = Arc::new(store());

        let mut handles = Vec::new();
        for i in 0..20 {
            let s = Arc::clone(&s);
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                s.append(&path, &format!("line{}", i)).await.unwrap();
                s.remove_matching(&path, |l| l == "never").await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(s.read_lines(&path).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_append_unless_admits_one_of_many() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps");
        let s = Arc::new(store());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = Arc::clone(&s);
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                s.append_unless(&path, "x@a.com a.com/x/", |l| l.starts_with("x@a.com "))
                    .await
                    .unwrap()
            }));
        }
        let mut added = 0;
        for h in handles {
            if h.await.unwrap() {
                added += 1;
            }
        }
        assert_eq!(added, 1);
        assert_eq!(s.read_lines(&path).await.unwrap(), vec!["x@a.com a.com/x/"]);
    }

    #[tokio::test]
    async fn test_take_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps");
        tokio::fs::write(&path, "a@old.com x\nb@new.com y\nc@old.com z\n")
            .await
            .unwrap();
        let s = store();

        let taken = s.take_matching(&path, |l| l.contains("@old.com")).await.unwrap();
        assert_eq!(taken, vec!["a@old.com x", "c@old.com z"]);
        assert_eq!(s.read_lines(&path).await.unwrap(), vec!["b@new.com y"]);

        s.restore(&path, &taken).await.unwrap();
        assert_eq!(s.read_lines(&path).await.unwrap().len(), 3);
    }
}
