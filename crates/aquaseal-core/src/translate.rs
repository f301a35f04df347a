//! Translation of engine text responses into typed outcomes.
//!
//! The engine answers every call with a JSON object. An `error` field marks a
//! failure; anything else is mapped onto the operation's payload with an
//! explicit default for every field, so callers never see a missing field.
//! Field reads are lenient: `null` counts as absent, floats are truncated and
//! numeric strings are accepted.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::payload::{
    DiagnosticOutcome, DownloadOutcome, FromPayload, Payload, PlaylistInfo, ThumbnailOutcome,
    VideoInfo,
};
use crate::request::OperationKind;

/// Where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSource {
    /// The engine's response carried an `error` field.
    Engine,
    /// The call faulted, or its response could not be understood.
    Runtime,
}

/// A terminal failure for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Message delivered to the caller.
    pub message: String,
    /// Origin of the failure.
    pub source: FailureSource,
}

/// The single terminal outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// The operation completed.
    Success(Payload),
    /// The operation failed.
    Failure(Failure),
}

impl OperationOutcome {
    /// Failure reported by the engine itself; the message is kept verbatim.
    pub fn engine_failure(message: impl Into<String>) -> Self {
        Self::Failure(Failure {
            message: message.into(),
            source: FailureSource::Engine,
        })
    }

    /// Failure caught while running `kind`, prefixed with the operation name.
    pub fn runtime_failure(kind: OperationKind, message: impl std::fmt::Display) -> Self {
        Self::Failure(Failure {
            message: format!("{kind} failed: {message}"),
            source: FailureSource::Runtime,
        })
    }

    /// Whether this outcome is a success.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure message, if this outcome is a failure.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(&f.message),
        }
    }

    /// Convert into the crate's `Result`, extracting the payload type `T`.
    pub fn into_result<T: FromPayload>(self, kind: OperationKind) -> Result<T> {
        let operation = kind.name().to_string();
        match self {
            Self::Success(payload) => {
                T::from_payload(payload).ok_or_else(|| Error::OperationFailed {
                    operation,
                    message: format!("{kind} failed: unexpected payload"),
                })
            }
            Self::Failure(Failure {
                message,
                source: FailureSource::Engine,
            }) => Err(Error::Engine { operation, message }),
            Self::Failure(Failure {
                message,
                source: FailureSource::Runtime,
            }) => Err(Error::OperationFailed { operation, message }),
        }
    }
}

/// Translate the raw engine response for `kind` into an outcome.
///
/// Pure: the same input always yields the same outcome. The diagnostic
/// operation is not parsed; its raw text is the result.
pub fn translate(raw: &str, kind: OperationKind) -> OperationOutcome {
    if kind == OperationKind::TestEngine {
        return OperationOutcome::Success(Payload::Diagnostic(DiagnosticOutcome {
            result: raw.to_string(),
            success: true,
        }));
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            return OperationOutcome::runtime_failure(kind, format!("invalid engine response: {e}"));
        }
    };
    let Value::Object(obj) = value else {
        return OperationOutcome::runtime_failure(
            kind,
            "invalid engine response: expected a JSON object",
        );
    };

    // Presence alone marks a failure, even when the value is `null`.
    match obj.get("error") {
        None => {}
        Some(Value::String(message)) => return OperationOutcome::engine_failure(message.clone()),
        Some(other) => return OperationOutcome::engine_failure(other.to_string()),
    }

    let payload = match kind {
        OperationKind::GetVideoInfo => video_info(&obj).map(Payload::Video),
        OperationKind::GetPlaylistInfo => playlist_info(&obj).map(Payload::Playlist),
        OperationKind::DownloadVideo => Ok(Payload::Download(DownloadOutcome {
            success: opt_bool(&obj, "success", true),
            filename: opt_string(&obj, "filename", ""),
            title: opt_string(&obj, "title", ""),
            duration: opt_u64(&obj, "duration", 0),
        })),
        OperationKind::DownloadThumbnail => Ok(Payload::Thumbnail(ThumbnailOutcome {
            success: true,
            path: opt_string(&obj, "path", ""),
        })),
        OperationKind::GetDownloadPath | OperationKind::TestEngine => {
            Err("not an engine operation".to_string())
        }
    };

    match payload {
        Ok(payload) => OperationOutcome::Success(payload),
        Err(message) => OperationOutcome::runtime_failure(kind, message),
    }
}

fn video_info(obj: &Map<String, Value>) -> std::result::Result<VideoInfo, String> {
    Ok(VideoInfo {
        id: opt_string(obj, "id", ""),
        title: opt_string(obj, "title", "Unknown"),
        channel: opt_string(obj, "channel", "Unknown"),
        duration: opt_u64(obj, "duration", 0),
        thumbnail: opt_string(obj, "thumbnail", ""),
        description: opt_string(obj, "description", ""),
        view_count: opt_u64(obj, "viewCount", 0),
        like_count: opt_u64(obj, "likeCount", 0),
        formats: opt_array(obj, "formats")?,
    })
}

fn playlist_info(obj: &Map<String, Value>) -> std::result::Result<PlaylistInfo, String> {
    Ok(PlaylistInfo {
        id: opt_string(obj, "id", ""),
        title: opt_string(obj, "title", "Playlist"),
        channel: opt_string(obj, "channel", "Unknown"),
        video_count: opt_u64(obj, "videoCount", 0),
        videos: opt_array(obj, "videos")?,
    })
}

fn opt_string(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn opt_u64(obj: &Map<String, Value>, key: &str, default: u64) -> u64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(default),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(default)
        }
        _ => default,
    }
}

fn opt_bool(obj: &Map<String, Value>, key: &str, default: bool) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        _ => default,
    }
}

fn opt_array(
    obj: &Map<String, Value>,
    key: &str,
) -> std::result::Result<Option<Vec<Value>>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(_) => Err(format!("field `{key}` is not an array")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn video(raw: &str) -> VideoInfo {
        translate(raw, OperationKind::GetVideoInfo)
            .into_result(OperationKind::GetVideoInfo)
            .unwrap()
    }

    #[test]
    fn test_video_info_defaults_and_overrides() {
        let info = video(r#"{"title":"X","duration":120}"#);
        assert_eq!(info.title, "X");
        assert_eq!(info.duration, 120);
        assert_eq!(info.channel, "Unknown");
        assert_eq!(info.view_count, 0);
        assert_eq!(info.like_count, 0);
        assert_eq!(info.thumbnail, "");
        assert_eq!(info.description, "");
        assert_eq!(info.id, "");
        assert!(info.formats.is_none());
    }

    #[test]
    fn test_error_field_is_failure_for_every_operation() {
        for kind in [
            OperationKind::GetVideoInfo,
            OperationKind::GetPlaylistInfo,
            OperationKind::DownloadVideo,
            OperationKind::DownloadThumbnail,
        ] {
            let outcome = translate(r#"{"error":"unsupported url"}"#, kind);
            assert_eq!(outcome, OperationOutcome::engine_failure("unsupported url"));
        }
    }

    #[test]
    fn test_malformed_json_is_runtime_failure() {
        let outcome = translate("Traceback (most recent call last):", OperationKind::GetVideoInfo);
        let message = outcome.failure_message().unwrap();
        assert!(message.starts_with("getVideoInfo failed: invalid engine response"));
        assert!(matches!(
            outcome,
            OperationOutcome::Failure(Failure {
                source: FailureSource::Runtime,
                ..
            })
        ));
    }

    #[test]
    fn test_non_object_json_is_failure() {
        let outcome = translate("[1,2,3]", OperationKind::GetPlaylistInfo);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_translate_is_idempotent() {
        let inputs = [
            r#"{"title":"X","duration":120,"formats":[{"formatId":"22"}]}"#,
            r#"{"error":"nope"}"#,
            "not json",
        ];
        for raw in inputs {
            assert_eq!(
                translate(raw, OperationKind::GetVideoInfo),
                translate(raw, OperationKind::GetVideoInfo)
            );
        }
    }

    #[test]
    fn test_formats_passed_through_unchanged() {
        let formats = json!([
            {"formatId": "137", "ext": "mp4", "quality": "1080p", "filesize": 0, "fps": 30},
            {"formatId": "22", "ext": "mp4", "quality": "720p", "extra": {"nested": [1, 2]}}
        ]);
        let raw = json!({"id": "abc", "formats": formats}).to_string();
        let info = video(&raw);
        assert_eq!(Value::Array(info.formats.unwrap()), formats);
    }

    #[test]
    fn test_formats_not_array_is_failure() {
        let outcome = translate(r#"{"formats":"none"}"#, OperationKind::GetVideoInfo);
        assert!(outcome.failure_message().unwrap().contains("formats"));
    }

    #[test]
    fn test_null_and_float_fields() {
        let info = video(
            r#"{"title":null,"duration":212.7,"viewCount":"1500","likeCount":null,
                "description":null}"#,
        );
        assert_eq!(info.title, "Unknown");
        assert_eq!(info.duration, 212);
        assert_eq!(info.view_count, 1500);
        assert_eq!(info.like_count, 0);
        assert_eq!(info.description, "");
    }

    #[test]
    fn test_null_error_field_is_failure() {
        for kind in [
            OperationKind::GetVideoInfo,
            OperationKind::GetPlaylistInfo,
            OperationKind::DownloadVideo,
            OperationKind::DownloadThumbnail,
        ] {
            let outcome = translate(r#"{"error":null,"title":"X"}"#, kind);
            assert_eq!(outcome.failure_message(), Some("null"));
            assert!(matches!(
                outcome.into_result::<Payload>(kind),
                Err(Error::Engine { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let info = video(r#"{"id":"abc","_type":"video","uploader":"someone"}"#);
        assert_eq!(info.id, "abc");
        assert_eq!(info.channel, "Unknown");
    }

    #[test]
    fn test_playlist_defaults() {
        let outcome = translate(
            r#"{"id":"PL1","videos":[{"index":1,"id":"a"}]}"#,
            OperationKind::GetPlaylistInfo,
        );
        let info: PlaylistInfo = outcome.into_result(OperationKind::GetPlaylistInfo).unwrap();
        assert_eq!(info.title, "Playlist");
        assert_eq!(info.channel, "Unknown");
        assert_eq!(info.video_count, 0);
        assert_eq!(info.videos.unwrap().len(), 1);
    }

    #[test]
    fn test_download_defaults() {
        let outcome = translate(r#"{"filename":"/d/x.mp4"}"#, OperationKind::DownloadVideo);
        let download: DownloadOutcome = outcome.into_result(OperationKind::DownloadVideo).unwrap();
        assert!(download.success);
        assert_eq!(download.filename, "/d/x.mp4");
        assert_eq!(download.title, "");
        assert_eq!(download.duration, 0);

        let outcome = translate(r#"{"success":false}"#, OperationKind::DownloadVideo);
        let download: DownloadOutcome = outcome.into_result(OperationKind::DownloadVideo).unwrap();
        assert!(!download.success);
    }

    #[test]
    fn test_thumbnail_success_is_always_true() {
        let outcome = translate(
            r#"{"success":false,"path":"/p/abc_thumbnail.jpg"}"#,
            OperationKind::DownloadThumbnail,
        );
        let thumb: ThumbnailOutcome = outcome
            .into_result(OperationKind::DownloadThumbnail)
            .unwrap();
        assert!(thumb.success);
        assert_eq!(thumb.path, "/p/abc_thumbnail.jpg");
    }

    #[test]
    fn test_diagnostic_keeps_raw_text() {
        let outcome = translate(r#"{"error":"offline"}"#, OperationKind::TestEngine);
        let diag: DiagnosticOutcome = outcome.into_result(OperationKind::TestEngine).unwrap();
        assert_eq!(diag.result, r#"{"error":"offline"}"#);
        assert!(diag.success);
    }

    #[test]
    fn test_into_result_maps_failure_sources() {
        let err = OperationOutcome::engine_failure("private video")
            .into_result::<VideoInfo>(OperationKind::GetVideoInfo)
            .unwrap_err();
        assert!(matches!(err, Error::Engine { .. }));
        assert_eq!(err.to_string(), "private video");

        let err = OperationOutcome::runtime_failure(OperationKind::DownloadVideo, "boom")
            .into_result::<DownloadOutcome>(OperationKind::DownloadVideo)
            .unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
        assert_eq!(err.to_string(), "downloadVideo failed: boom");
    }
}
