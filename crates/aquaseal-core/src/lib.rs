//! AquaSeal Core Library
//!
//! This crate bridges caller requests to an external media extraction engine:
//! - Single-worker dispatch with strict FIFO ordering and fault isolation
//! - Translation of engine JSON responses into typed payloads
//! - Output directory resolution with a fixed fallback chain
//! - Engine launch and storage configuration

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod paths;
pub mod payload;
pub mod request;
pub mod translate;

pub use bridge::{Bridge, Reply};
pub use config::{BridgeConfig, EngineConfig, StorageConfig};
pub use dispatcher::{Dispatcher, Pending, RequestId};
pub use engine::{MediaEngine, ProcessEngine};
pub use error::{EngineError, Error, ErrorKind, Result};
pub use paths::{PathResolver, StoragePurpose, StorageRoots, WritePolicy};
pub use payload::{
    DiagnosticOutcome, DownloadOutcome, Payload, PlaylistInfo, ThumbnailOutcome, VideoInfo,
};
pub use request::{Arguments, Call, Operation, OperationKind};
pub use translate::{OperationOutcome, translate};
