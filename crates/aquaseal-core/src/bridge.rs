//! The bridge façade.
//!
//! Every public operation validates its arguments synchronously, then hands a
//! fully-formed [`Operation`] to the dispatcher and returns a [`Pending`]
//! handle. Validation failures never reach the dispatcher or the engine.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::dispatcher::{Dispatcher, Pending};
use crate::engine::{MediaEngine, ProcessEngine};
use crate::error::Result;
use crate::paths::{PathResolver, StoragePurpose};
use crate::payload::{
    DiagnosticOutcome, DownloadOutcome, Payload, PlaylistInfo, ThumbnailOutcome, VideoInfo,
};
use crate::request::{Arguments, Call, Operation};

/// Reply to a host call.
#[derive(Debug)]
pub enum Reply {
    /// Answered without touching the engine.
    Immediate(Value),
    /// Queued on the engine worker.
    Deferred(Pending<Payload>),
}

/// The caller-facing bridge.
#[derive(Debug)]
pub struct Bridge {
    dispatcher: Dispatcher,
    resolver: Arc<PathResolver>,
}

impl Bridge {
    /// Create a bridge over an engine and a path resolver.
    ///
    /// Must be called from within a Tokio runtime; the engine worker is
    /// started here and lives as long as the bridge.
    pub fn new(engine: Arc<dyn MediaEngine>, resolver: PathResolver) -> Self {
        let resolver = Arc::new(resolver);
        let dispatcher = Dispatcher::spawn(engine, Arc::clone(&resolver));
        Self {
            dispatcher,
            resolver,
        }
    }

    /// Create a bridge that launches the configured engine process.
    pub fn from_config(config: &BridgeConfig) -> Self {
        info!(
            "Initializing bridge with engine `{} {}`",
            config.engine.program,
            config.engine.args.join(" ")
        );
        Self::new(
            Arc::new(ProcessEngine::new(config.engine.clone())),
            config.storage.resolver(),
        )
    }

    /// Look up metadata for a video.
    pub fn get_video_info(&self, url: &str) -> Result<Pending<VideoInfo>> {
        Ok(self.dispatcher.submit(Operation::video_info(url)?))
    }

    /// Look up a playlist.
    pub fn get_playlist_info(&self, url: &str) -> Result<Pending<PlaylistInfo>> {
        Ok(self.dispatcher.submit(Operation::playlist_info(url)?))
    }

    /// Download a video into the Downloads directory.
    pub fn download_video(
        &self,
        url: &str,
        format_id: Option<&str>,
    ) -> Result<Pending<DownloadOutcome>> {
        Ok(self
            .dispatcher
            .submit(Operation::download_video(url, format_id)?))
    }

    /// Download a video's thumbnail into the Pictures directory.
    pub fn download_thumbnail(
        &self,
        video_id: &str,
        url: Option<&str>,
    ) -> Result<Pending<ThumbnailOutcome>> {
        Ok(self
            .dispatcher
            .submit(Operation::download_thumbnail(video_id, url)?))
    }

    /// Resolve the Downloads directory. Does not touch the engine.
    pub fn get_download_path(&self) -> Result<PathBuf> {
        self.resolver.resolve(StoragePurpose::Downloads)
    }

    /// Run the engine diagnostic.
    pub fn test_engine(&self) -> Pending<DiagnosticOutcome> {
        self.dispatcher.submit(Operation::TestEngine)
    }

    /// Handle a string-keyed host call.
    ///
    /// Validation errors are returned immediately; engine work is queued.
    pub fn call(&self, method: &str, args: &Arguments) -> Result<Reply> {
        let call = Call::parse(method, args)?;
        debug!("Host call {}", call.kind());
        match call {
            Call::Engine(operation) => Ok(Reply::Deferred(self.dispatcher.submit(operation))),
            Call::DownloadPath => {
                let path = self.get_download_path()?;
                Ok(Reply::Immediate(serde_json::json!({ "path": path })))
            }
        }
    }
}
