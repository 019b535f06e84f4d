/// Rollback for multi-stage operations.
///
/// Each completed step registers an undo action. When a later step fails the
/// undo actions run newest first. If they all succeed the caller sees the
/// original error; if one fails the caller sees `PartialFailure`.
use crate::common::error::{PanelError, PanelResult};
use crate::common::security::AuditLogger;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type UndoFuture<'a> = Pin<Box<dyn Future<Output = PanelResult<()>> + Send + 'a>>;
type UndoAction<'a> = Box<dyn FnOnce() -> UndoFuture<'a> + Send + 'a>;

pub struct Compensation<'a> {
    operation: String,
    audit: Arc<AuditLogger>,
    completed: Vec<(String, Option<UndoAction<'a>>)>,
}

impl<'a> Compensation<'a> {
    pub fn new(operation: &str, audit: Arc<AuditLogger>) -> Self {
        Self {
            operation: operation.to_string(),
            audit,
            completed: Vec::new(),
        }
    }

    /// Run one step; on failure roll back everything completed so far
    pub async fn run<T, Fut>(&mut self, step: &str, fut: Fut) -> PanelResult<T>
    where
        Fut: Future<Output = PanelResult<T>>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(err) => Err(self.rollback(step, err).await),
        }
    }

    /// Register the undo action of a step that just completed
    pub fn undo_with<F, Fut>(&mut self, step: &str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = PanelResult<()>> + Send + 'a,
    {
        let action: UndoAction<'a> = Box::new(move || Box::pin(undo()));
        self.completed.push((step.to_string(), Some(action)));
    }

    /// Record a step that needs no undo (it is still named in reports)
    pub fn completed(&mut self, step: &str) {
        self.completed.push((step.to_string(), None));
    }

    /// Names of completed steps, oldest first
    pub fn steps(&self) -> Vec<String> {
        self.completed.iter().map(|(s, _)| s.clone()).collect()
    }

    /// Undo completed steps newest first and turn `err` into the final error
    pub async fn rollback(&mut self, failed_step: &str, err: PanelError) -> PanelError {
        let completed = self.steps();
        if completed.is_empty() {
            return err;
        }

        let mut undone = Vec::new();
        while let Some((step, action)) = self.completed.pop() {
            let Some(action) = action else {
                undone.push(step);
                continue;
            };
            if let Err(undo_err) = action().await {
                tracing::error!(
                    operation = %self.operation,
                    step = %step,
                    error = %undo_err,
                    "rollback step failed"
                );
                self.audit
                    .log_compensation(&self.operation, undone, false);
                self.completed.clear();
                return PanelError::PartialFailure {
                    operation: self.operation.clone(),
                    completed,
                    failed_step: failed_step.to_string(),
                    reason: format!("{}; undoing '{}' failed: {}", err, step, undo_err),
                };
            }
            undone.push(step);
        }

        self.audit.log_compensation(&self.operation, undone, true);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn boom(msg: &str) -> PanelError {
        PanelError::ExecutionFailed {
            command: "test".into(),
            stderr: msg.into(),
        }
    }

    #[tokio::test]
    async fn test_success_runs_no_undo() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let mut tx = Compensation::new("op", Arc::new(AuditLogger::new()));

        tx.run("one", async { Ok(()) }).await.unwrap();
        let l = Arc::clone(&log);
        tx.undo_with("one", move || async move {
            l.lock().unwrap().push("undo one".into());
            Ok(())
        });
        let v = tx.run("two", async { Ok(5) }).await.unwrap();

        assert_eq!(v, 5);
        drop(tx);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_undoes_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let mut tx = Compensation::new("op", Arc::new(AuditLogger::new()));

        let l = Arc::clone(&log);
        tx.undo_with("one", move || async move {
            l.lock().unwrap().push("one".into());
            Ok(())
        });
        tx.completed("marker");
        let l = Arc::clone(&log);
        tx.undo_with("two", move || async move {
            l.lock().unwrap().push("two".into());
            Ok(())
        });

        let err = tx
            .run("three", async { Err::<(), _>(boom("disk full")) })
            .await
            .unwrap_err();

        assert!(matches!(err, PanelError::ExecutionFailed { .. }));
        assert_eq!(*log.lock().unwrap(), vec!["two".to_string(), "one".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_undo_reports_partial_failure() {
        let mut tx = Compensation::new("create_mailbox", Arc::new(AuditLogger::new()));
        tx.undo_with("map entry", || async { Err(boom("read-only fs")) });
        tx.undo_with("maildir", || async { Ok(()) });

        match tx.run("credential", async { Err::<(), _>(boom("x")) }).await {
            Err(PanelError::PartialFailure {
                operation,
                completed,
                failed_step,
                reason,
            }) => {
                assert_eq!(operation, "create_mailbox");
                assert_eq!(completed, vec!["map entry".to_string(), "maildir".to_string()]);
                assert_eq!(failed_step, "credential");
                assert!(reason.contains("read-only fs"));
            }
            other => panic!("expected PartialFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_step_failure_passes_error_through() {
        let mut tx = Compensation::new("op", Arc::new(AuditLogger::new()));
        let err = tx
            .run("first", async { Err::<(), _>(boom("nope")) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "command failed: nope");
    }
}
