//! Engine session: lifecycle, readiness, and log capture for one engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use dictum_core::{Error, Result};

use crate::engine::{CodecEngine, EngineSource};

/// Maximum retained log lines; older lines rotate out.
const LOG_CAP: usize = 500;

/// A loaded (or loading) handle to one codec engine.
///
/// The session is created unready; [`load`](EngineSession::load) must
/// succeed before any job runs against it. All engine operations funnel
/// through the session, which serializes them so at most one is in flight
/// at a time. Multiple independent sessions in one process are legal, each
/// with its own log buffer.
pub struct EngineSession {
    engine: Arc<dyn CodecEngine>,
    ready: AtomicBool,
    logs: Arc<Mutex<VecDeque<String>>>,
    // The engine is not safe for concurrent invocation; every operation
    // holds this for its full duration.
    op_lock: tokio::sync::Mutex<()>,
}

impl EngineSession {
    /// Wrap an engine. Log capture starts immediately; the session stays
    /// unready until [`load`](EngineSession::load) succeeds.
    pub fn new(engine: Arc<dyn CodecEngine>) -> Self {
        let logs: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));

        let sink = Arc::clone(&logs);
        engine.on_log(Box::new(move |line| {
            let mut buf = sink.lock().expect("log buffer poisoned");
            if buf.len() == LOG_CAP {
                buf.pop_front();
            }
            buf.push_back(line.to_string());
        }));

        Self {
            engine,
            ready: AtomicBool::new(false),
            logs,
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Initialize the engine. On success the session becomes ready.
    pub async fn load(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        self.engine.load().await?;
        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(source = %self.engine.source(), "engine session ready");
        Ok(())
    }

    /// Whether [`load`](EngineSession::load) has succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Where the underlying engine was loaded from.
    pub fn source(&self) -> EngineSource {
        self.engine.source()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::engine("engine session is not loaded"))
        }
    }

    /// Write a buffer into the named virtual file.
    pub async fn write_file(&self, name: &str, data: Bytes) -> Result<()> {
        self.ensure_ready()?;
        let _guard = self.op_lock.lock().await;
        self.engine.write_file(name, data).await
    }

    /// Execute one codec command line.
    pub async fn exec(&self, args: &[String]) -> Result<()> {
        self.ensure_ready()?;
        let _guard = self.op_lock.lock().await;
        tracing::debug!(argv = %args.join(" "), "engine exec");
        self.engine.exec(args).await
    }

    /// Read the named virtual file.
    pub async fn read_file(&self, name: &str) -> Result<Bytes> {
        self.ensure_ready()?;
        let _guard = self.op_lock.lock().await;
        self.engine.read_file(name).await
    }

    /// Create the named virtual directory.
    pub async fn create_dir(&self, name: &str) -> Result<()> {
        self.ensure_ready()?;
        let _guard = self.op_lock.lock().await;
        self.engine.create_dir(name).await
    }

    /// Delete the named virtual file, surfacing failure to the caller.
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        self.ensure_ready()?;
        let _guard = self.op_lock.lock().await;
        self.engine.delete_file(name).await
    }

    /// Best-effort delete of a virtual file. Failures are logged, never
    /// propagated; safe on cleanup paths where an error must not mask the
    /// primary result.
    pub async fn discard_file(&self, name: &str) {
        if !self.is_ready() {
            return;
        }
        let _guard = self.op_lock.lock().await;
        if let Err(e) = self.engine.delete_file(name).await {
            tracing::warn!("cleanup: failed to delete {name}: {e}");
        }
    }

    /// Best-effort delete of a virtual directory.
    pub async fn discard_dir(&self, name: &str) {
        if !self.is_ready() {
            return;
        }
        let _guard = self.op_lock.lock().await;
        if let Err(e) = self.engine.delete_dir(name).await {
            tracing::warn!("cleanup: failed to delete directory {name}: {e}");
        }
    }

    /// Snapshot of the captured log lines, oldest first.
    pub fn recent_logs(&self) -> Vec<String> {
        self.logs
            .lock()
            .expect("log buffer poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Drop all captured log lines.
    pub fn clear_logs(&self) {
        self.logs.lock().expect("log buffer poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use dictum_core::LoadFailure;

    #[tokio::test]
    async fn ops_refuse_before_load() {
        let engine = Arc::new(MockEngine::new());
        let session = EngineSession::new(Arc::clone(&engine) as Arc<dyn CodecEngine>);

        assert!(!session.is_ready());
        let err = session
            .write_file("in.wav", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not loaded"));
        // The engine itself was never touched.
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn load_marks_ready() {
        let engine = Arc::new(MockEngine::new());
        let session = EngineSession::new(Arc::clone(&engine) as Arc<dyn CodecEngine>);
        session.load().await.unwrap();
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn failed_load_leaves_session_unready() {
        let engine = Arc::new(MockEngine::new().with_load_failure(
            LoadFailure::MissingResources,
            "core resources missing",
        ));
        let session = EngineSession::new(engine as Arc<dyn CodecEngine>);
        let err = session.load().await.unwrap_err();
        assert!(matches!(
            err,
            Error::EngineUnavailable {
                cause: LoadFailure::MissingResources,
                ..
            }
        ));
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn log_lines_are_captured_and_rotated() {
        let engine = Arc::new(MockEngine::new().log_lines_on_exec(vec!["line".into()]));
        let session = EngineSession::new(Arc::clone(&engine) as Arc<dyn CodecEngine>);
        session.load().await.unwrap();

        for _ in 0..(LOG_CAP + 10) {
            session.exec(&["-i".into(), "x".into(), "out.mp3".into()]).await.unwrap();
        }
        assert_eq!(session.recent_logs().len(), LOG_CAP);

        session.clear_logs();
        assert!(session.recent_logs().is_empty());
    }

    #[tokio::test]
    async fn discard_swallows_missing_file() {
        let engine = Arc::new(MockEngine::new());
        let session = EngineSession::new(engine as Arc<dyn CodecEngine>);
        session.load().await.unwrap();
        // Deleting a file that was never written must not error.
        session.discard_file("ghost.wav").await;
    }
}
