//! Media engine adapter.
//!
//! The engine is an opaque, non-reentrant function set. Each call returns one
//! JSON text blob; interpreting it is the translator's job. Implementations
//! are only ever entered from the dispatcher worker, one call at a time.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Raw engine response or the reason no response was produced.
pub type EngineResult = std::result::Result<String, EngineError>;

/// The external media extraction engine.
#[cfg_attr(test, mockall::automock)]
pub trait MediaEngine: Send + Sync {
    /// `get_video_info(url)`.
    fn get_video_info(&self, url: &str) -> EngineResult;

    /// `get_playlist_info(url)`.
    fn get_playlist_info(&self, url: &str) -> EngineResult;

    /// `download_video(url, dir, formatId)`.
    fn download_video(&self, url: &str, output_dir: &Path, format_id: &str) -> EngineResult;

    /// `download_thumbnail(url, id, dir)`.
    fn download_thumbnail(&self, url: &str, video_id: &str, output_dir: &Path) -> EngineResult;

    /// `test()`.
    fn test(&self) -> EngineResult;
}

/// Engine reached by launching a program once per call.
///
/// The command line is `<program> <args...> <function> <positional args...>`
/// and the program's stdout is the response.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    config: EngineConfig,
}

impl ProcessEngine {
    /// Create an engine from its launch settings.
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Launch settings in use.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn call(&self, function: &str, args: &[&OsStr]) -> EngineResult {
        debug!("Engine call: {} ({} args)", function, args.len());

        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args).arg(function).args(args);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| EngineError::Launch {
            program: self.config.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no error output")
                .to_string();
            warn!("Engine {} exited with {}: {}", function, output.status, message);
            return Err(EngineError::Exited {
                status: output.status.to_string(),
                stderr: message,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| EngineError::InvalidOutput)?;
        Ok(stdout.trim().to_string())
    }
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MediaEngine for ProcessEngine {
    fn get_video_info(&self, url: &str) -> EngineResult {
        self.call("get_video_info", &[OsStr::new(url)])
    }

    fn get_playlist_info(&self, url: &str) -> EngineResult {
        self.call("get_playlist_info", &[OsStr::new(url)])
    }

    fn download_video(&self, url: &str, output_dir: &Path, format_id: &str) -> EngineResult {
        self.call(
            "download_video",
            &[OsStr::new(url), output_dir.as_os_str(), OsStr::new(format_id)],
        )
    }

    fn download_thumbnail(&self, url: &str, video_id: &str, output_dir: &Path) -> EngineResult {
        self.call(
            "download_thumbnail",
            &[OsStr::new(url), OsStr::new(video_id), output_dir.as_os_str()],
        )
    }

    fn test(&self) -> EngineResult {
        self.call("test", &[])
    }
}
