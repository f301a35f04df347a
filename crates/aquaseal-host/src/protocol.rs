//! Line-delimited JSON call/response channel.
//!
//! One call per input line, one response per call. Responses carry the
//! caller's `id` back so they can be matched when they arrive out of order.

use aquaseal_core::{Arguments, Bridge, Error, ErrorKind, Payload, Pending, Reply};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A call read from the host.
#[derive(Debug, Clone, Deserialize)]
pub struct HostRequest {
    /// Caller-chosen correlation id, echoed back unchanged.
    #[serde(default)]
    pub id: Value,
    /// Operation name, e.g. `downloadVideo`.
    pub method: String,
    /// Operation arguments.
    #[serde(default)]
    pub args: Arguments,
}

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Error category for programmatic handling.
    pub kind: ErrorKind,
}

impl From<&Error> for ErrorBody {
    fn from(e: &Error) -> Self {
        Self {
            message: e.to_string(),
            kind: e.kind(),
        }
    }
}

/// A response written back to the host.
#[derive(Debug, Clone, Serialize)]
pub struct HostResponse {
    /// Correlation id of the call.
    pub id: Value,
    /// Whether the call succeeded.
    pub ok: bool,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl HostResponse {
    /// A successful response.
    pub const fn success(id: Value, data: Value) -> Self {
        Self {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    pub fn failure(id: Value, err: &Error) -> Self {
        error!("Call {} failed [kind={:?}]: {}", id, err.kind(), err);
        Self {
            id,
            ok: false,
            data: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    fn malformed(message: String) -> Self {
        Self {
            id: Value::Null,
            ok: false,
            data: None,
            error: Some(ErrorBody {
                message,
                kind: ErrorKind::Validation,
            }),
        }
    }

    /// Encode as a single output line, without the trailing newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            let message = Value::String(format!("failed to encode response: {e}"));
            format!(r#"{{"id":null,"ok":false,"error":{{"message":{message},"kind":"runtime"}}}}"#)
        })
    }
}

/// What to do with one input line.
#[derive(Debug)]
pub enum Dispatch {
    /// The response is already known.
    Ready(HostResponse),
    /// The call was queued; await [`complete`] for the response.
    Queued(Value, Pending<Payload>),
}

/// Parse one input line and hand it to the bridge.
///
/// Never blocks on the engine. Returns `None` for blank lines.
pub fn handle_line(bridge: &Bridge, line: &str) -> Option<Dispatch> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: HostRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            error!("Unparseable call: {}", e);
            return Some(Dispatch::Ready(HostResponse::malformed(format!(
                "Invalid request: {e}"
            ))));
        }
    };

    debug!("Call {} -> {}", request.id, request.method);
    let dispatch = match bridge.call(&request.method, &request.args) {
        Ok(Reply::Immediate(data)) => Dispatch::Ready(HostResponse::success(request.id, data)),
        Ok(Reply::Deferred(pending)) => Dispatch::Queued(request.id, pending),
        Err(e) => Dispatch::Ready(HostResponse::failure(request.id, &e)),
    };
    Some(dispatch)
}

/// Wait for a queued call and build its response.
pub async fn complete(id: Value, pending: Pending<Payload>) -> HostResponse {
    match pending.await {
        Ok(payload) => match serde_json::to_value(payload) {
            Ok(data) => HostResponse::success(id, data),
            Err(e) => HostResponse::failure(id, &Error::from(e)),
        },
        Err(e) => HostResponse::failure(id, &e),
    }
}

/// Serve calls from `input` until EOF, writing responses to `output`.
///
/// Queued calls are answered as they complete. At EOF, or when reading
/// fails, every in-flight call is still answered before this returns.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn serve<R, W>(bridge: &Bridge, mut input: R, output: W) -> std::io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<HostResponse>();
    let writer = tokio::spawn(write_responses(rx, output));

    let mut in_flight = JoinSet::new();
    let mut buf = Vec::new();
    let mut read_error = None;
    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read input: {}", e);
                read_error = Some(e);
                break;
            }
        }
        let dispatch = match std::str::from_utf8(&buf) {
            Ok(line) => handle_line(bridge, line),
            Err(e) => {
                error!("Call is not valid UTF-8: {}", e);
                Some(Dispatch::Ready(HostResponse::malformed(format!(
                    "Invalid request: {e}"
                ))))
            }
        };
        match dispatch {
            None => {}
            Some(Dispatch::Ready(response)) => send(&tx, response),
            Some(Dispatch::Queued(id, pending)) => {
                let tx = tx.clone();
                in_flight.spawn(async move { send(&tx, complete(id, pending).await) });
            }
        }
    }

    info!("Input closed; waiting for {} in-flight call(s)", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Response task failed: {}", e);
        }
    }
    drop(tx);

    let output = writer.await.map_err(std::io::Error::other)??;
    match read_error {
        Some(e) => Err(e),
        None => Ok(output),
    }
}

fn send(tx: &mpsc::UnboundedSender<HostResponse>, response: HostResponse) {
    if tx.send(response).is_err() {
        warn!("Response writer is gone; response dropped");
    }
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<HostResponse>,
    mut output: W,
) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        output.write_all(response.to_line().as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use aquaseal_core::engine::EngineResult;
    use aquaseal_core::{MediaEngine, PathResolver, StorageRoots, WritePolicy};
    use tempfile::TempDir;

    use super::*;

    struct EchoEngine;

    impl MediaEngine for EchoEngine {
        fn get_video_info(&self, url: &str) -> EngineResult {
            Ok(serde_json::json!({ "id": url, "title": "Echo", "viewCount": "12" }).to_string())
        }

        fn get_playlist_info(&self, _url: &str) -> EngineResult {
            Ok(r#"{"error":"Playlist is private"}"#.to_string())
        }

        fn download_video(&self, url: &str, output_dir: &Path, format_id: &str) -> EngineResult {
            Ok(serde_json::json!({
                "filename": output_dir.join(format!("{url}-{format_id}.mp4")),
            })
            .to_string())
        }

        fn download_thumbnail(
            &self,
            _url: &str,
            video_id: &str,
            output_dir: &Path,
        ) -> EngineResult {
            Ok(serde_json::json!({ "path": output_dir.join(video_id) }).to_string())
        }

        fn test(&self) -> EngineResult {
            Ok("pong".to_string())
        }
    }

    fn bridge(temp: &TempDir) -> Bridge {
        Bridge::new(
            Arc::new(EchoEngine),
            PathResolver::new(
                StorageRoots {
                    app_private: Some(temp.path().to_path_buf()),
                    ..StorageRoots::default()
                },
                WritePolicy::Writable,
            ),
        )
    }

    async fn respond(bridge: &Bridge, line: &str) -> Value {
        let response = match handle_line(bridge, line).unwrap() {
            Dispatch::Ready(response) => response,
            Dispatch::Queued(id, pending) => complete(id, pending).await,
        };
        serde_json::from_str(&response.to_line()).unwrap()
    }

    #[tokio::test]
    async fn test_video_info_call() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let value = respond(
            &bridge,
            r#"{"id":7,"method":"getVideoInfo","args":{"url":"abc"}}"#,
        )
        .await;
        assert_eq!(value["id"], 7);
        assert_eq!(value["ok"], true);
        assert_eq!(value["data"]["id"], "abc");
        assert_eq!(value["data"]["viewCount"], 12);
        assert_eq!(value["data"]["channel"], "Unknown");
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let value = respond(
            &bridge,
            r#"{"id":"a","method":"downloadVideo","args":{"url":"","formatId":"22"}}"#,
        )
        .await;
        assert_eq!(value["id"], "a");
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["message"], "URL is required");
        assert_eq!(value["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn test_engine_error_response() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let value = respond(
            &bridge,
            r#"{"id":1,"method":"getPlaylistInfo","args":{"url":"PL"}}"#,
        )
        .await;
        assert_eq!(value["error"]["message"], "Playlist is private");
        assert_eq!(value["error"]["kind"], "engine");
    }

    #[tokio::test]
    async fn test_download_path_is_immediate() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let Some(Dispatch::Ready(response)) =
            handle_line(&bridge, r#"{"id":2,"method":"getDownloadPath"}"#)
        else {
            panic!("getDownloadPath must not be queued");
        };
        assert!(response.ok);
        assert_eq!(
            response.data.unwrap()["path"],
            temp.path().to_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_malformed_line_gets_null_id() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let value = respond(&bridge, "{not json").await;
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let value = respond(&bridge, r#"{"id":3,"method":"formatDisk"}"#).await;
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn test_blank_line_ignored() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);
        assert!(handle_line(&bridge, "   ").is_none());
    }

    #[tokio::test]
    async fn test_diagnostic_response() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);

        let value = respond(&bridge, r#"{"id":4,"method":"testPython"}"#).await;
        assert_eq!(value["data"]["result"], "pong");
        assert_eq!(value["data"]["success"], true);
    }

    #[tokio::test]
    async fn test_serve_answers_every_call_before_returning() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);
        let input: &[u8] = b"{\"id\":1,\"method\":\"getVideoInfo\",\"args\":{\"url\":\"x\"}}\n\
\n\
garbage\n\
{\"id\":2,\"method\":\"testPython\"}\n\
{\"id\":3,\"method\":\"downloadVideo\",\"args\":{\"url\":\"clip\",\"formatId\":18}}\n";

        let output = serve(&bridge, input, Vec::new()).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let mut responses: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 4);

        responses.sort_by_key(|r| r["id"].as_u64().unwrap_or(0));
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["data"]["id"], "x");
        assert_eq!(responses[2]["data"]["result"], "pong");
        assert!(
            responses[3]["data"]["filename"]
                .as_str()
                .unwrap()
                .ends_with("clip-18.mp4")
        );
    }

    #[tokio::test]
    async fn test_serve_survives_non_utf8_line() {
        let temp = TempDir::new().unwrap();
        let bridge = bridge(&temp);
        let mut input = br#"{"id":1,"method":"getVideoInfo","args":{"url":"x"}}"#.to_vec();
        input.push(b'\n');
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"{\"id\":2,\"method\":\"testPython\"}");

        let output = serve(&bridge, input.as_slice(), Vec::new()).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let mut responses: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);

        responses.sort_by_key(|r| r["id"].as_u64().unwrap_or(0));
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["kind"], "validation");
        assert_eq!(responses[1]["data"]["id"], "x");
        assert_eq!(responses[2]["data"]["result"], "pong");
    }
}
