//! A line-oriented JSON gateway.
//!
//! Inbound: one serialized [`Interaction`] per line.
//! Outbound: one `{"action": .., "params": ..}` object per line.
//!
//! ```text
//! > {"id":"1","token":"t","user":{"id":"u","name":"ann","bot":false},"kind":{"type":"chat_command","data":{"name":"ping","options":[]}}}
//! < {"action":"reply","params":{"interaction_id":"1","payload":{"content":"Done","ephemeral":false}}}
//! ```

use async_trait::async_trait;
use cubebot_core::{ApiError, ApiResult, Gateway, Interaction, ModalSpec, ReplyOptions};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Serialize)]
struct Outbound<'a> {
    action: &'a str,
    params: Value,
}

/// Gateway speaking JSON lines over a reader/writer pair, stdin/stdout by default.
pub struct StdioGateway {
    reader: Mutex<Option<Reader>>,
    writer: Mutex<Writer>,
    next_message: AtomicU64,
}

impl Default for StdioGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioGateway {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    /// Uses arbitrary streams instead of the process's stdio.
    pub fn with_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Mutex::new(Some(Box::new(reader))),
            writer: Mutex::new(Box::new(writer)),
            next_message: AtomicU64::new(1),
        }
    }

    async fn emit(&self, action: &str, params: Value) -> ApiResult<()> {
        let mut line = serde_json::to_vec(&Outbound { action, params })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Gateway for StdioGateway {
    async fn reply(&self, interaction: &Interaction, payload: ReplyOptions) -> ApiResult<()> {
        self.emit(
            "reply",
            json!({ "interaction_id": interaction.id, "payload": payload }),
        )
        .await
    }

    async fn defer(&self, interaction: &Interaction, ephemeral: bool) -> ApiResult<()> {
        self.emit(
            "defer",
            json!({ "interaction_id": interaction.id, "ephemeral": ephemeral }),
        )
        .await
    }

    async fn edit_reply(
        &self,
        interaction: &Interaction,
        payload: ReplyOptions,
    ) -> ApiResult<()> {
        self.emit(
            "edit_reply",
            json!({ "interaction_id": interaction.id, "payload": payload }),
        )
        .await
    }

    async fn follow_up(&self, interaction: &Interaction, payload: ReplyOptions) -> ApiResult<()> {
        self.emit(
            "follow_up",
            json!({ "interaction_id": interaction.id, "payload": payload }),
        )
        .await
    }

    async fn delete_reply(&self, interaction: &Interaction) -> ApiResult<()> {
        self.emit("delete_reply", json!({ "interaction_id": interaction.id }))
            .await
    }

    async fn show_modal(&self, interaction: &Interaction, modal: ModalSpec) -> ApiResult<()> {
        self.emit(
            "show_modal",
            json!({ "interaction_id": interaction.id, "modal": modal }),
        )
        .await
    }

    async fn send_message(&self, channel_id: &str, payload: ReplyOptions) -> ApiResult<String> {
        let id = self.next_message.fetch_add(1, Ordering::Relaxed).to_string();
        self.emit(
            "send_message",
            json!({ "channel_id": channel_id, "message_id": id, "payload": payload }),
        )
        .await?;
        Ok(id)
    }

    async fn register_commands(
        &self,
        commands: Vec<Value>,
        guild_id: Option<&str>,
    ) -> ApiResult<usize> {
        let count = commands.len();
        self.emit(
            "register_commands",
            json!({ "guild_id": guild_id, "commands": commands }),
        )
        .await?;
        Ok(count)
    }

    async fn connect(&self, events: mpsc::Sender<Interaction>) -> ApiResult<()> {
        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| ApiError::Other("stdio gateway is already connected".into()))?;
        info!("Reading interactions from input");

        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                debug!("Input closed");
                return Ok(());
            }
            let text = line.trim_ascii();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_slice::<Interaction>(text) {
                Ok(interaction) => {
                    if events.send(interaction).await.is_err() {
                        debug!("Event receiver dropped, disconnecting");
                        return Ok(());
                    }
                }
                Err(e) => warn!(error = %e, "Skipping malformed interaction line"),
            }
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubebot_core::testing::fixtures;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn test_connect_parses_lines_and_skips_garbage() {
        let first = serde_json::to_string(&fixtures::button("1", "vote")).unwrap();
        let second = serde_json::to_string(&fixtures::command("2", "ping", vec![])).unwrap();
        let input = format!("{first}\nnot json\n\n{second}\n");

        let gateway =
            StdioGateway::with_io(std::io::Cursor::new(input.into_bytes()), tokio::io::sink());
        let (tx, mut rx) = mpsc::channel(8);
        gateway.connect(tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id, "1");
        assert_eq!(rx.recv().await.unwrap().id, "2");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_skips_invalid_utf8() {
        let ok = serde_json::to_string(&fixtures::button("1", "vote")).unwrap();
        let mut input = b"\xff\xfe{\"id\": \"\xc3\x28\"}\n".to_vec();
        input.extend_from_slice(ok.as_bytes());
        input.push(b'\n');

        let gateway = StdioGateway::with_io(std::io::Cursor::new(input), tokio::io::sink());
        let (tx, mut rx) = mpsc::channel(8);
        gateway.connect(tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id, "1");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let gateway = StdioGateway::with_io(BufReader::new(&b""[..]), tokio::io::sink());
        let (tx, _rx) = mpsc::channel(1);
        gateway.connect(tx.clone()).await.unwrap();
        assert!(gateway.connect(tx).await.is_err());
    }

    #[tokio::test]
    async fn test_outbound_lines() {
        let (client, mut server) = duplex(4096);
        let gateway = StdioGateway::with_io(BufReader::new(&b""[..]), client);
        let interaction = fixtures::button("7", "vote");

        gateway
            .reply(&interaction, ReplyOptions::from("hi").ephemeral(true))
            .await
            .unwrap();
        let id = gateway
            .send_message("c-1", ReplyOptions::from("posted"))
            .await
            .unwrap();
        assert_eq!(id, "1");
        drop(gateway);

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines[0]["action"], "reply");
        assert_eq!(lines[0]["params"]["interaction_id"], "7");
        assert_eq!(lines[0]["params"]["payload"]["content"], "hi");
        assert_eq!(lines[1]["action"], "send_message");
        assert_eq!(lines[1]["params"]["channel_id"], "c-1");
    }
}
