//! Job-scoped virtual-file tracking with best-effort sweep.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::session::EngineSession;

static JOB_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Tracks the virtual files and directories one job creates.
///
/// Every name is qualified with a process-unique job id so concurrent or
/// back-to-back jobs on the same session cannot collide. [`sweep`] deletes
/// everything best-effort; deletion failures are logged by the session and
/// never propagate, so a cleanup problem cannot mask the job's real result.
///
/// [`sweep`]: Scratch::sweep
pub struct Scratch {
    prefix: String,
    files: Vec<String>,
    dirs: Vec<String>,
}

impl Scratch {
    /// Start tracking for a job with the given label (used in names only).
    pub fn new(label: &str) -> Self {
        let id = JOB_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            prefix: format!("{label}_{id}"),
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    /// Qualify a name with this job's prefix without tracking it.
    pub fn name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix)
    }

    /// Register a job-local file and return its qualified name.
    pub fn file(&mut self, suffix: &str) -> String {
        let name = self.name(suffix);
        self.files.push(name.clone());
        name
    }

    /// Register a job-local directory and return its qualified name.
    ///
    /// The caller still creates it on the engine; registering only makes
    /// [`sweep`](Scratch::sweep) remove it.
    pub fn dir(&mut self, suffix: &str) -> String {
        let name = self.name(suffix);
        self.dirs.push(name.clone());
        name
    }

    /// Register a file inside a previously registered directory.
    pub fn file_in(&mut self, dir: &str, file: &str) -> String {
        let name = format!("{dir}/{file}");
        self.files.push(name.clone());
        name
    }

    /// Names of all tracked files, in creation order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Stop tracking a file the job already deleted itself.
    pub fn release(&mut self, name: &str) {
        self.files.retain(|f| f != name);
    }

    /// Delete every tracked file, then every tracked directory.
    ///
    /// Runs on success and failure paths alike; never fails.
    pub async fn sweep(&mut self, session: &EngineSession) {
        for file in self.files.drain(..) {
            session.discard_file(&file).await;
        }
        for dir in self.dirs.drain(..) {
            session.discard_dir(&dir).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CodecEngine;
    use crate::mock::MockEngine;
    use bytes::Bytes;
    use std::sync::Arc;

    #[test]
    fn names_are_job_unique() {
        let mut a = Scratch::new("compress");
        let mut b = Scratch::new("compress");
        assert_ne!(a.file("input.wav"), b.file("input.wav"));
    }

    #[test]
    fn file_in_joins_with_slash() {
        let mut scratch = Scratch::new("concat");
        let dir = scratch.dir("tmp");
        let file = scratch.file_in(&dir, "part_0.wav");
        assert_eq!(file, format!("{dir}/part_0.wav"));
    }

    #[tokio::test]
    async fn sweep_removes_everything() {
        let engine = Arc::new(MockEngine::new());
        let session = EngineSession::new(Arc::clone(&engine) as Arc<dyn CodecEngine>);
        session.load().await.unwrap();

        let mut scratch = Scratch::new("job");
        let dir = scratch.dir("tmp");
        session.create_dir(&dir).await.unwrap();
        let a = scratch.file("a.wav");
        let b = scratch.file_in(&dir, "b.wav");
        session.write_file(&a, Bytes::from_static(b"a")).await.unwrap();
        session.write_file(&b, Bytes::from_static(b"b")).await.unwrap();

        scratch.sweep(&session).await;
        assert!(engine.file_names().is_empty());
        assert!(engine.dir_names().is_empty());

        // A second sweep is a no-op, not an error.
        scratch.sweep(&session).await;
    }

    #[tokio::test]
    async fn released_files_are_not_swept() {
        let engine = Arc::new(MockEngine::new());
        let session = EngineSession::new(Arc::clone(&engine) as Arc<dyn CodecEngine>);
        session.load().await.unwrap();

        let mut scratch = Scratch::new("job");
        let a = scratch.file("a.wav");
        session.write_file(&a, Bytes::from_static(b"a")).await.unwrap();
        session.discard_file(&a).await;
        scratch.release(&a);

        scratch.sweep(&session).await;
        // Only the original write and delete reached the engine.
        let deletes = engine
            .calls()
            .iter()
            .filter(|c| c.starts_with("delete:"))
            .count();
        assert_eq!(deletes, 1);
    }
}
