use anyhow::{Context, Result, bail};
use reqwest::{Client, Response};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::{config::settings::API_KEY_HEADER, core::message::PushEvent};

use super::sse::SseFrameParser;

/// Subscribes to the plugin host push channel.
pub struct PushClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl PushClient {
    pub fn new(client: Client, server_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            url: format!("{}/api/push", server_url.trim_end_matches('/')),
            api_key,
        }
    }

    /// Opens the channel. Once this returns the host has registered the
    /// subscription, so anything it publishes afterwards is delivered.
    pub async fn connect(self) -> Result<PushConnection> {
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request
            .send()
            .await
            .context("failed to open push channel")?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("push channel rejected status={status}");
        }
        info!("push channel connected to {}", self.url);

        Ok(PushConnection { response })
    }
}

/// An open push channel, not yet being read.
pub struct PushConnection {
    response: Response,
}

impl PushConnection {
    /// Forwards decoded events until the stream ends or the receiver is dropped.
    pub fn spawn(self, tx: mpsc::Sender<PushEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.run(tx).await {
                Ok(()) => info!("push channel closed"),
                Err(err) => warn!("push channel failed: {err:#}"),
            }
        })
    }

    async fn run(mut self, tx: mpsc::Sender<PushEvent>) -> Result<()> {
        let mut parser = SseFrameParser::new();
        while let Some(chunk) = self
            .response
            .chunk()
            .await
            .context("failed to read push channel")?
        {
            for payload in parser.push_chunk(&chunk) {
                let event = match serde_json::from_str::<PushEvent>(&payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("skipping undecodable push event: {err}");
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Client;
    use tokio::{sync::mpsc, time::timeout};

    use crate::{
        app_state::AppState,
        core::message::{PluginMessage, PushEvent, StreamCommand},
        panel::dispatcher::{CommandDispatcher, HttpDispatcher},
        web::routes::spawn_test_server,
    };

    use super::PushClient;

    #[tokio::test]
    async fn status_check_sent_after_connect_is_always_delivered() {
        let state = AppState::for_tests("topsecret");
        let base_url = spawn_test_server(state).await;
        let client = Client::new();

        for _ in 0..10 {
            let (tx, mut rx) = mpsc::channel(8);
            let task = PushClient::new(client.clone(), &base_url, Some("topsecret".to_owned()))
                .connect()
                .await
                .expect("push channel should open")
                .spawn(tx);

            HttpDispatcher::new(
                client.clone(),
                &base_url,
                "webcamstreamer",
                Some("topsecret".to_owned()),
            )
            .dispatch(StreamCommand::CheckStream);

            let event = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("status should arrive in time")
                .expect("push channel should stay open");
            assert_eq!(
                event,
                PushEvent::PluginMessage {
                    plugin: "webcamstreamer".to_owned(),
                    data: PluginMessage::status(false),
                }
            );
            task.abort();
        }
    }

    #[tokio::test]
    async fn connect_fails_with_wrong_api_key() {
        let base_url = spawn_test_server(AppState::for_tests("topsecret")).await;

        let result = PushClient::new(Client::new(), &base_url, Some("guess".to_owned()))
            .connect()
            .await;

        let err = result.err().expect("wrong key should be rejected");
        assert!(err.to_string().contains("403"));
    }
}
