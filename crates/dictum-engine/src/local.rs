//! Production engine: the ffmpeg CLI staged in a private scratch directory.

use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dictum_core::config::EngineConfig;
use dictum_core::{Error, LoadFailure, Result};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::engine::{CodecEngine, EngineSource, LogHandler};

/// How many trailing stderr lines to keep for error messages.
const ERROR_TAIL: usize = 12;

/// [`CodecEngine`] implementation driving the `ffmpeg` CLI.
///
/// Virtual file names map onto a private [`TempDir`]; the directory and
/// everything in it disappear when the engine is dropped, so even files a
/// job failed to sweep do not outlive the session. Each invocation runs
/// under a cooperative timeout; expiry kills the process and surfaces as an
/// engine error on that invocation.
pub struct LocalEngine {
    config: EngineConfig,
    root: TempDir,
    resolved: Mutex<Option<PathBuf>>,
    handlers: Mutex<Vec<LogHandler>>,
}

impl LocalEngine {
    /// Create an unloaded engine rooted in a fresh scratch directory.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let root = TempDir::new()?;
        Ok(Self {
            config,
            root,
            resolved: Mutex::new(None),
            handlers: Mutex::new(Vec::new()),
        })
    }

    fn emit(&self, line: &str) {
        for handler in self.handlers.lock().expect("log handlers poisoned").iter() {
            handler(line);
        }
    }

    /// Map a virtual name onto the scratch directory, rejecting names that
    /// would escape it.
    fn resolve_name(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || name.is_empty() {
            return Err(Error::engine(format!("invalid virtual file name: {name:?}")));
        }
        Ok(self.root.path().join(relative))
    }

    fn executable(&self) -> Result<PathBuf> {
        self.resolved
            .lock()
            .expect("resolved path poisoned")
            .clone()
            .ok_or_else(|| Error::engine("engine is not loaded"))
    }

    /// Locate the ffmpeg executable: configured override first, then `PATH`.
    fn locate(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config.ffmpeg_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(Error::engine_unavailable(
                LoadFailure::MissingResources,
                format!("ffmpeg not found at configured path {}", path.display()),
            ));
        }

        which::which("ffmpeg").map_err(|_| {
            Error::engine_unavailable(
                LoadFailure::MissingResources,
                "ffmpeg not found on PATH and engine.ffmpeg_path is not set",
            )
        })
    }
}

#[async_trait]
impl CodecEngine for LocalEngine {
    async fn load(&self) -> Result<()> {
        if self.resolved.lock().expect("resolved path poisoned").is_some() {
            return Ok(());
        }

        let path = self.locate()?;

        // A smoke invocation distinguishes "present but not runnable" from
        // "missing": the binary may exist yet be blocked by permissions or
        // sandbox policy.
        let probe = Command::new(&path).arg("-version").output().await;
        match probe {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                return Err(Error::engine_unavailable(
                    LoadFailure::AccessRestricted,
                    format!(
                        "ffmpeg at {} exited with {} during load",
                        path.display(),
                        output.status
                    ),
                ));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::engine_unavailable(
                    LoadFailure::MissingResources,
                    format!("ffmpeg disappeared from {}", path.display()),
                ));
            }
            Err(e) => {
                return Err(Error::engine_unavailable(
                    LoadFailure::AccessRestricted,
                    format!("ffmpeg at {} could not be executed: {e}", path.display()),
                ));
            }
        }

        tracing::info!("loaded ffmpeg from {}", path.display());
        *self.resolved.lock().expect("resolved path poisoned") = Some(path);
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<()> {
        let path = self.resolve_name(name)?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| Error::engine(format!("failed to write {name}: {e}")))
    }

    async fn exec(&self, args: &[String]) -> Result<()> {
        let ffmpeg = self.executable()?;
        let timeout = std::time::Duration::from_secs(self.config.exec_timeout_secs);

        let mut child = Command::new(&ffmpeg)
            .arg("-y")
            .args(args)
            .current_dir(self.root.path())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| Error::engine(format!("failed to spawn ffmpeg: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::engine("ffmpeg stderr was not captured"))?;

        let run = async {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(ERROR_TAIL);
            while let Ok(Some(line)) = lines.next_line().await {
                self.emit(&line);
                if tail.len() == ERROR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, tail))
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok((status, _))) if status.success() => Ok(()),
            Ok(Ok((status, tail))) => {
                let detail: Vec<String> = tail.into_iter().collect();
                Err(Error::engine(format!(
                    "ffmpeg exited with {status}: {}",
                    detail.join(" | ")
                )))
            }
            Ok(Err(e)) => Err(Error::engine(format!("I/O error waiting for ffmpeg: {e}"))),
            Err(_) => {
                let _ = child.kill().await;
                Err(Error::engine(format!(
                    "ffmpeg timed out after {}s",
                    self.config.exec_timeout_secs
                )))
            }
        }
    }

    async fn read_file(&self, name: &str) -> Result<Bytes> {
        let path = self.resolve_name(name)?;
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| Error::engine(format!("failed to read {name}: {e}")))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.resolve_name(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::engine(format!("failed to delete {name}: {e}")))
    }

    async fn create_dir(&self, name: &str) -> Result<()> {
        let path = self.resolve_name(name)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| Error::engine(format!("failed to create directory {name}: {e}")))
    }

    async fn delete_dir(&self, name: &str) -> Result<()> {
        let path = self.resolve_name(name)?;
        tokio::fs::remove_dir_all(&path)
            .await
            .map_err(|e| Error::engine(format!("failed to delete directory {name}: {e}")))
    }

    fn on_log(&self, handler: LogHandler) {
        self.handlers
            .lock()
            .expect("log handlers poisoned")
            .push(handler);
    }

    fn source(&self) -> EngineSource {
        let location = self
            .resolved
            .lock()
            .expect("resolved path poisoned")
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "PATH".to_string());
        EngineSource {
            name: "ffmpeg".into(),
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> LocalEngine {
        LocalEngine::new(EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn virtual_names_cannot_escape_root() {
        let engine = engine();
        assert!(engine.resolve_name("../etc/passwd").is_err());
        assert!(engine.resolve_name("/etc/passwd").is_err());
        assert!(engine.resolve_name("").is_err());
        assert!(engine.resolve_name("dir/file.wav").is_ok());
    }

    #[tokio::test]
    async fn file_round_trip_without_load() {
        // write/read/delete stage plain files and need no executable.
        let engine = engine();
        engine
            .write_file("in.wav", Bytes::from_static(b"RIFF"))
            .await
            .unwrap();
        let back = engine.read_file("in.wav").await.unwrap();
        assert_eq!(&back[..], b"RIFF");
        engine.delete_file("in.wav").await.unwrap();
        assert!(engine.read_file("in.wav").await.is_err());
    }

    #[tokio::test]
    async fn dir_round_trip() {
        let engine = engine();
        engine.create_dir("scratch").await.unwrap();
        engine
            .write_file("scratch/a.wav", Bytes::from_static(b"x"))
            .await
            .unwrap();
        engine.delete_dir("scratch").await.unwrap();
        assert!(engine.read_file("scratch/a.wav").await.is_err());
    }

    #[tokio::test]
    async fn missing_configured_path_classifies_as_missing_resources() {
        let config = EngineConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ..EngineConfig::default()
        };
        let engine = LocalEngine::new(config).unwrap();
        let err = engine.load().await.unwrap_err();
        assert!(matches!(
            err,
            Error::EngineUnavailable {
                cause: LoadFailure::MissingResources,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn exec_before_load_fails() {
        let engine = engine();
        let err = engine.exec(&["-i".into(), "x".into()]).await.unwrap_err();
        assert!(err.to_string().contains("not loaded"));
    }
}
