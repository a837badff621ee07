//! Scripted in-memory engine for tests.
//!
//! Records every call, keeps a virtual filesystem as a plain map, and can be
//! scripted to fail loading, fail specific invocations, and emit log lines.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dictum_core::{Error, LoadFailure, Result};

use crate::engine::{CodecEngine, EngineSource, LogHandler};

#[derive(Default)]
struct MockState {
    loaded: bool,
    files: HashMap<String, Bytes>,
    dirs: Vec<String>,
    execs: Vec<Vec<String>>,
    writes: Vec<(String, Bytes)>,
    calls: Vec<String>,
}

/// In-memory [`CodecEngine`] with scripted behavior.
pub struct MockEngine {
    state: Mutex<MockState>,
    handlers: Mutex<Vec<LogHandler>>,
    load_failure: Option<(LoadFailure, String)>,
    exec_failures: Vec<(String, String)>,
    exec_logs: Vec<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            handlers: Mutex::new(Vec::new()),
            load_failure: None,
            exec_failures: Vec::new(),
            exec_logs: Vec::new(),
        }
    }

    /// Script `load` to fail with the given classification.
    pub fn with_load_failure(mut self, cause: LoadFailure, message: impl Into<String>) -> Self {
        self.load_failure = Some((cause, message.into()));
        self
    }

    /// Script any exec whose joined argv contains `needle` to fail.
    pub fn fail_exec_containing(
        mut self,
        needle: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.exec_failures.push((needle.into(), message.into()));
        self
    }

    /// Script log lines emitted on every successful exec.
    pub fn log_lines_on_exec(mut self, lines: Vec<String>) -> Self {
        self.exec_logs = lines;
        self
    }

    // -- Inspection ---------------------------------------------------------

    /// All recorded invocations, in order.
    pub fn execs(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().execs.clone()
    }

    /// Number of engine invocations so far.
    pub fn exec_count(&self) -> usize {
        self.state.lock().unwrap().execs.len()
    }

    /// Every engine call (any operation), in order, as `op:detail` strings.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Total number of engine calls of any kind.
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Names currently present in the virtual filesystem.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().unwrap().files.keys().cloned().collect();
        names.sort();
        names
    }

    /// Directories currently present.
    pub fn dir_names(&self) -> Vec<String> {
        self.state.lock().unwrap().dirs.clone()
    }

    /// Contents of a virtual file, if present.
    pub fn file_contents(&self, name: &str) -> Option<Bytes> {
        self.state.lock().unwrap().files.get(name).cloned()
    }

    /// Every buffer written through [`CodecEngine::write_file`], in order,
    /// surviving later deletion. Useful for asserting on staged content
    /// (e.g. a concat list) after a job has swept its files.
    pub fn writes(&self) -> Vec<(String, Bytes)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// The last buffer written under a name ending in `suffix`.
    pub fn written_ending_with(&self, suffix: &str) -> Option<Bytes> {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .rev()
            .find(|(name, _)| name.ends_with(suffix))
            .map(|(_, data)| data.clone())
    }

    fn emit(&self, line: &str) {
        for handler in self.handlers.lock().unwrap().iter() {
            handler(line);
        }
    }

    /// The output file of an invocation is its final argument, unless the
    /// command writes to the null muxer (`-`).
    fn output_name(args: &[String]) -> Option<&String> {
        match args.last() {
            Some(last) if last != "-" && !last.starts_with('-') => Some(last),
            _ => None,
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodecEngine for MockEngine {
    async fn load(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("load".into());
        if let Some((cause, message)) = &self.load_failure {
            return Err(Error::engine_unavailable(*cause, message.clone()));
        }
        state.loaded = true;
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("write:{name}"));
        if let Some((dir, _)) = name.rsplit_once('/') {
            if !state.dirs.iter().any(|d| d == dir) {
                return Err(Error::engine(format!("no such directory: {dir}")));
            }
        }
        state.writes.push((name.to_string(), data.clone()));
        state.files.insert(name.to_string(), data);
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<()> {
        let joined = args.join(" ");
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("exec:{joined}"));
            state.execs.push(args.to_vec());

            for (needle, message) in &self.exec_failures {
                if joined.contains(needle.as_str()) {
                    return Err(Error::engine(message.clone()));
                }
            }

            if let Some(output) = Self::output_name(args) {
                if let Some((dir, _)) = output.rsplit_once('/') {
                    if !state.dirs.iter().any(|d| d == dir) {
                        return Err(Error::engine(format!("no such directory: {dir}")));
                    }
                }
                state
                    .files
                    .insert(output.clone(), Bytes::from(format!("mock:{joined}")));
            }
        }

        for line in &self.exec_logs {
            self.emit(line);
        }
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("read:{name}"));
        state
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::engine(format!("no such file: {name}")))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{name}"));
        state
            .files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::engine(format!("no such file: {name}")))
    }

    async fn create_dir(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("mkdir:{name}"));
        if !state.dirs.iter().any(|d| d == name) {
            state.dirs.push(name.to_string());
        }
        Ok(())
    }

    async fn delete_dir(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("rmdir:{name}"));
        let prefix = format!("{name}/");
        state.files.retain(|file, _| !file.starts_with(&prefix));
        match state.dirs.iter().position(|d| d == name) {
            Some(i) => {
                state.dirs.remove(i);
                Ok(())
            }
            None => Err(Error::engine(format!("no such directory: {name}"))),
        }
    }

    fn on_log(&self, handler: LogHandler) {
        self.handlers.lock().unwrap().push(handler);
    }

    fn source(&self) -> EngineSource {
        EngineSource {
            name: "mock".into(),
            location: "memory".into(),
        }
    }
}
