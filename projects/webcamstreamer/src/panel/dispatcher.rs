use std::sync::Arc;

use anyhow::{Context, bail};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{config::settings::API_KEY_HEADER, core::message::StreamCommand};

/// One-way command submission. Results arrive over the push channel.
pub trait CommandDispatcher {
    fn dispatch(&self, command: StreamCommand);
}

impl<D: CommandDispatcher + ?Sized> CommandDispatcher for Arc<D> {
    fn dispatch(&self, command: StreamCommand) {
        (**self).dispatch(command);
    }
}

pub struct HttpDispatcher {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpDispatcher {
    pub fn new(
        client: Client,
        server_url: &str,
        plugin_id: &str,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            url: format!("{}/api/plugin/{plugin_id}", server_url.trim_end_matches('/')),
            api_key,
        }
    }
}

impl CommandDispatcher for HttpDispatcher {
    fn dispatch(&self, command: StreamCommand) {
        let mut request = self.client.post(&self.url).json(&command);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        tokio::spawn(async move {
            let result = async {
                let response = request.send().await.context("command request failed")?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    bail!("command rejected status={status} body={body}");
                }
                Ok::<(), anyhow::Error>(())
            }
            .await;

            match result {
                Ok(()) => debug!("dispatched {command:?}"),
                Err(err) => warn!("failed to dispatch {command:?}: {err:#}"),
            }
        });
    }
}
