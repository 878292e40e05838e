//! mpv-backed media sink
//!
//! Spawns an idle mpv process and drives it over its JSON IPC socket.
//! Requests are sent one at a time; lines without our `request_id`
//! (property changes, log events) are skipped while waiting for a reply.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{MediaSink, SinkError};

/// How long to wait for a reply to a single command
const IPC_TIMEOUT: Duration = Duration::from_secs(5);

/// How often to look for the IPC socket after spawning
const SOCKET_POLL: Duration = Duration::from_millis(100);

/// Attempts before giving up on the IPC socket
const SOCKET_ATTEMPTS: usize = 50;

/// Media sink driving an mpv child process
pub struct MpvSink {
    child: Option<Child>,
    socket_path: Option<PathBuf>,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl MpvSink {
    /// Start `player_path` in idle mode and connect to its IPC socket
    pub async fn spawn(player_path: &str, extra_args: &[String]) -> Result<Self, SinkError> {
        let socket_path =
            std::env::temp_dir().join(format!("cockpit-radio-{}.sock", std::process::id()));
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!(player = player_path, "starting media player");
        let child = Command::new(player_path)
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg("--volume=0")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(SinkError::Spawn)?;

        let stream = connect(&socket_path).await?;
        info!("connected to media player");

        let mut sink = Self::from_stream(stream);
        sink.child = Some(child);
        sink.socket_path = Some(socket_path);
        Ok(sink)
    }

    fn from_stream(stream: UnixStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            child: None,
            socket_path: None,
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        }
    }

    /// Ask the player to quit and wait briefly for it to exit
    pub async fn shutdown(mut self) {
        if let Err(e) = self.command(json!(["quit"])).await {
            debug!(error = %e, "quit command failed");
        }
        if let Some(child) = self.child.as_mut() {
            if tokio::time::timeout(Duration::from_secs(2), child.wait())
                .await
                .is_err()
            {
                warn!("media player did not exit, killing it");
                let _ = child.kill().await;
            }
        }
    }

    /// Send one command and wait for its reply's `data`
    async fn command(&mut self, command: Value) -> Result<Value, SinkError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut line = serde_json::to_string(&json!({
            "command": command,
            "request_id": request_id,
        }))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let mut buf = String::new();
        loop {
            buf.clear();
            let read = tokio::time::timeout(IPC_TIMEOUT, self.reader.read_line(&mut buf))
                .await
                .map_err(|_| SinkError::Timeout)??;
            if read == 0 {
                return Err(SinkError::Closed);
            }

            let reply: Value = match serde_json::from_str(buf.trim_end()) {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(error = %e, "skipping unparsable IPC line");
                    continue;
                }
            };
            if reply.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                continue;
            }

            return match reply.get("error").and_then(Value::as_str) {
                Some("success") => Ok(reply.get("data").cloned().unwrap_or(Value::Null)),
                other => Err(SinkError::Rejected {
                    command: command.to_string(),
                    reason: other.unwrap_or("no status").to_string(),
                }),
            };
        }
    }

    async fn set_property(&mut self, name: &str, value: Value) -> Result<(), SinkError> {
        self.command(json!(["set_property", name, value]))
            .await
            .map(|_| ())
    }

    async fn get_flag(&mut self, name: &str) -> Result<bool, SinkError> {
        let value = self.command(json!(["get_property", name])).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

impl Drop for MpvSink {
    fn drop(&mut self) {
        if let Some(path) = &self.socket_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[async_trait]
impl MediaSink for MpvSink {
    async fn load_media(&mut self, source: &str) -> Result<(), SinkError> {
        self.set_property("pause", json!(true)).await?;
        self.command(json!(["loadfile", source, "replace"])).await?;
        Ok(())
    }

    async fn play(&mut self) -> Result<(), SinkError> {
        self.set_property("pause", json!(false)).await
    }

    async fn pause(&mut self) -> Result<(), SinkError> {
        self.set_property("pause", json!(true)).await
    }

    async fn stop(&mut self) -> Result<(), SinkError> {
        self.command(json!(["stop"])).await.map(|_| ())
    }

    async fn set_volume(&mut self, volume: u8) -> Result<(), SinkError> {
        self.set_property("volume", json!(volume.min(100))).await
    }

    async fn is_playing(&mut self) -> Result<bool, SinkError> {
        let paused = self.get_flag("pause").await?;
        let idle = self.get_flag("idle-active").await?;
        Ok(!paused && !idle)
    }
}

/// Wait for the IPC socket to appear and connect to it
async fn connect(socket_path: &Path) -> Result<UnixStream, SinkError> {
    let mut last_error = None;
    for _ in 0..SOCKET_ATTEMPTS {
        tokio::time::sleep(SOCKET_POLL).await;
        match UnixStream::connect(socket_path).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.map(SinkError::Io).unwrap_or(SinkError::Timeout))
}
