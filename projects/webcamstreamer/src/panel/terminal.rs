use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use reqwest::Client;
use tokio::{
    io::{AsyncBufReadExt, BufReader, stdin},
    sync::mpsc,
    time::interval,
};
use tracing::{info, warn};

use crate::{
    config::{
        AppConfig,
        settings::{ConfigurationProvider, RemoteSettings},
    },
    core::message::PushEvent,
    notify::{NotificationCenter, NotificationKind},
    push::client::PushClient,
};

use super::{
    configuration::Configuration,
    controller::{self, TAB_ELEMENT_ID},
    dispatcher::{CommandDispatcher, HttpDispatcher},
    registry::{PanelContext, PanelHost, ViewModelRegistry},
};

const HIDDEN_TAB: &str = "#control";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelInput {
    Toggle,
    Show,
    Hide,
    Dismiss(Option<u64>),
    Refresh,
    Quit,
    Help,
}

impl PanelInput {
    fn parse(line: &str) -> Self {
        let line = line.trim().to_ascii_lowercase();
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        match (command, words.next()) {
            ("d" | "dismiss", None) => return Self::Dismiss(None),
            ("d" | "dismiss", Some(id)) => {
                return id.parse().map_or(Self::Help, |id| Self::Dismiss(Some(id)));
            }
            _ => {}
        }

        match line.as_str() {
            "t" | "toggle" => Self::Toggle,
            "show" => Self::Show,
            "hide" => Self::Hide,
            "" | "r" => Self::Refresh,
            "q" | "quit" | "exit" => Self::Quit,
            _ => Self::Help,
        }
    }
}

/// Terminal rendition of the stream tab, driven against a running plugin host.
pub async fn run_panel(config: AppConfig) -> Result<()> {
    let client = Client::new();
    let settings = RemoteSettings::connect(
        client.clone(),
        &config.panel_server_url,
        &config.plugin_id,
        config.api_key.clone(),
    )
    .await?;
    let mut settings_rx = settings.subscribe();

    let dispatcher: Arc<dyn CommandDispatcher> = Arc::new(HttpDispatcher::new(
        client.clone(),
        &config.panel_server_url,
        &config.plugin_id,
        config.api_key.clone(),
    ));
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();

    let mut registry = ViewModelRegistry::new();
    registry.register(controller::descriptor())?;
    let mut host = registry.instantiate(&PanelContext {
        plugin_id: config.plugin_id.clone(),
        dispatcher,
        notifications: notify_tx,
        pending_timeout: config.pending_timeout,
    });
    info!(
        "panel started with {} view model(s) against {}",
        registry.count(),
        config.panel_server_url
    );

    let (push_tx, mut push_rx) = mpsc::channel(32);
    // Subscribed before after_binding sends the initial status check.
    let push_task = PushClient::new(client, &config.panel_server_url, config.api_key.clone())
        .connect()
        .await?
        .spawn(push_tx);

    host.after_binding(&Configuration::from_provider(&settings));
    host.change_tab(TAB_ELEMENT_ID);

    let mut center = NotificationCenter::new();
    let mut lines = BufReader::new(stdin()).lines();
    let mut ticker = interval(Duration::from_secs(1));

    print_help();
    render(&host, &center);

    loop {
        let dirty = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match PanelInput::parse(&line) {
                    PanelInput::Toggle => {
                        if host.activate() == 0 {
                            println!("stream tab is hidden, type 'show' first");
                        }
                    }
                    PanelInput::Show => host.change_tab(TAB_ELEMENT_ID),
                    PanelInput::Hide => host.change_tab(HIDDEN_TAB),
                    PanelInput::Dismiss(None) => center.dismiss_all(),
                    PanelInput::Dismiss(Some(id)) => {
                        if !center.dismiss(id) {
                            println!("no notification #{id}");
                        }
                    }
                    PanelInput::Refresh => {}
                    PanelInput::Quit => break,
                    PanelInput::Help => print_help(),
                }
                true
            }
            event = push_rx.recv() => {
                let Some(event) = event else {
                    println!("lost connection to {}", config.panel_server_url);
                    break;
                };
                match event {
                    PushEvent::PluginMessage { plugin, data } => {
                        host.plugin_message(&plugin, &data);
                        true
                    }
                    PushEvent::SettingsUpdated => {
                        if let Err(err) = settings.refresh().await {
                            warn!("failed to refresh settings: {err:#}");
                        }
                        false
                    }
                }
            }
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                host.settings_updated(&Configuration::from_provider(&settings));
                true
            }
            Some(event) = notify_rx.recv() => {
                center.show(event, Instant::now());
                true
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let before = host.render();
                host.tick(now);
                center.prune(now) > 0 || host.render() != before
            }
        };

        if dirty {
            render(&host, &center);
        }
    }

    push_task.abort();
    info!("panel stopped");
    Ok(())
}

fn print_help() {
    println!("commands: t(oggle) | show | hide | d(ismiss) [id] | q(uit)");
}

fn render(host: &PanelHost, center: &NotificationCenter) {
    for line in host.render() {
        println!("{line}");
    }
    for item in center.visible() {
        let marker = match item.event.kind {
            NotificationKind::Error => "!",
            NotificationKind::Success => "*",
        };
        println!(
            "  {marker} #{} {}: {}",
            item.id, item.event.title, item.event.message
        );
    }
}
