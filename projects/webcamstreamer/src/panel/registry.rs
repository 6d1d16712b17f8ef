use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::info;

use crate::{core::message::PluginMessage, notify::NotificationEvent};

use super::{configuration::Configuration, dispatcher::CommandDispatcher};

/// Dependencies a panel host can inject into view models.
pub const AVAILABLE_DEPENDENCIES: &[&str] = &["dispatcher", "notifications"];

/// Host lifecycle hooks a panel view model reacts to.
pub trait PanelViewModel {
    fn on_after_binding(&mut self, configuration: &Configuration);

    fn on_settings_updated(&mut self, configuration: &Configuration);

    fn on_tab_change(&mut self, next: &str);

    fn on_plugin_message(&mut self, plugin: &str, message: &PluginMessage);

    fn on_tick(&mut self, _now: Instant) {}

    /// Primary action of the bound element.
    fn activate(&mut self);

    fn render(&self) -> String;
}

pub struct PanelContext {
    pub plugin_id: String,
    pub dispatcher: Arc<dyn CommandDispatcher>,
    pub notifications: mpsc::UnboundedSender<NotificationEvent>,
    pub pending_timeout: Option<Duration>,
}

pub struct ViewModelDescriptor {
    pub name: &'static str,
    pub dependencies: &'static [&'static str],
    pub elements: &'static [&'static str],
    pub construct: fn(&PanelContext) -> Box<dyn PanelViewModel>,
}

/// View models registered by the plugin loader at startup.
#[derive(Default)]
pub struct ViewModelRegistry {
    descriptors: Vec<ViewModelDescriptor>,
}

impl ViewModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ViewModelDescriptor) -> Result<()> {
        if self.descriptors.iter().any(|d| d.name == descriptor.name) {
            bail!("view model already registered: {}", descriptor.name);
        }
        if let Some(missing) = descriptor
            .dependencies
            .iter()
            .find(|dep| !AVAILABLE_DEPENDENCIES.contains(dep))
        {
            bail!(
                "view model {} requires unknown dependency {missing}",
                descriptor.name
            );
        }

        info!("registered view model {}", descriptor.name);
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn instantiate(&self, context: &PanelContext) -> PanelHost {
        let bound = self
            .descriptors
            .iter()
            .map(|descriptor| BoundViewModel {
                name: descriptor.name,
                elements: descriptor.elements,
                view_model: (descriptor.construct)(context),
            })
            .collect();
        PanelHost {
            bound,
            active_tab: None,
        }
    }
}

struct BoundViewModel {
    name: &'static str,
    elements: &'static [&'static str],
    view_model: Box<dyn PanelViewModel>,
}

/// Live view models and the currently visible tab.
pub struct PanelHost {
    bound: Vec<BoundViewModel>,
    active_tab: Option<String>,
}

impl PanelHost {
    pub fn after_binding(&mut self, configuration: &Configuration) {
        for entry in &mut self.bound {
            entry.view_model.on_after_binding(configuration);
        }
    }

    pub fn settings_updated(&mut self, configuration: &Configuration) {
        for entry in &mut self.bound {
            entry.view_model.on_settings_updated(configuration);
        }
    }

    pub fn change_tab(&mut self, next: &str) {
        self.active_tab = Some(next.to_owned());
        for entry in &mut self.bound {
            entry.view_model.on_tab_change(next);
        }
    }

    pub fn plugin_message(&mut self, plugin: &str, message: &PluginMessage) {
        for entry in &mut self.bound {
            entry.view_model.on_plugin_message(plugin, message);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        for entry in &mut self.bound {
            entry.view_model.on_tick(now);
        }
    }

    /// Activates every view model bound to the visible tab. Returns how many.
    pub fn activate(&mut self) -> usize {
        let Some(active) = self.active_tab.as_deref() else {
            return 0;
        };
        let mut activated = 0;
        for entry in &mut self.bound {
            if entry.elements.iter().any(|element| *element == active) {
                entry.view_model.activate();
                activated += 1;
            }
        }
        activated
    }

    pub fn render(&self) -> Vec<String> {
        self.bound
            .iter()
            .map(|entry| format!("{}: {}", entry.name, entry.view_model.render()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::{
        core::message::{PluginMessage, StreamCommand},
        panel::{
            configuration::Configuration,
            controller::{self, TAB_ELEMENT_ID},
            dispatcher::CommandDispatcher,
        },
    };

    use super::{
        AVAILABLE_DEPENDENCIES, PanelContext, PanelViewModel, ViewModelDescriptor,
        ViewModelRegistry,
    };

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: std::sync::Mutex<Vec<StreamCommand>>,
    }

    impl CommandDispatcher for RecordingDispatcher {
        fn dispatch(&self, command: StreamCommand) {
            self.sent
                .lock()
                .expect("dispatcher mutex poisoned")
                .push(command);
        }
    }

    struct Inert;

    impl PanelViewModel for Inert {
        fn on_after_binding(&mut self, _configuration: &Configuration) {}
        fn on_settings_updated(&mut self, _configuration: &Configuration) {}
        fn on_tab_change(&mut self, _next: &str) {}
        fn on_plugin_message(&mut self, _plugin: &str, _message: &PluginMessage) {}
        fn activate(&mut self) {}
        fn render(&self) -> String {
            String::new()
        }
    }

    fn inert(_context: &PanelContext) -> Box<dyn PanelViewModel> {
        Box::new(Inert)
    }

    fn context(dispatcher: Arc<RecordingDispatcher>) -> PanelContext {
        let (tx, _rx) = mpsc::unbounded_channel();
        PanelContext {
            plugin_id: "webcamstreamer".to_owned(),
            dispatcher,
            notifications: tx,
            pending_timeout: None,
        }
    }

    #[test]
    fn rejects_unknown_dependencies_and_duplicates() {
        let mut registry = ViewModelRegistry::new();
        let err = registry
            .register(ViewModelDescriptor {
                name: "broken",
                dependencies: &["printerStateViewModel"],
                elements: &[],
                construct: inert,
            })
            .expect_err("unknown dependency should be rejected");
        assert!(err.to_string().contains("printerStateViewModel"));

        registry
            .register(controller::descriptor())
            .expect("first registration should succeed");
        assert!(registry.register(controller::descriptor()).is_err());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn settings_arrive_through_hooks_not_injection() {
        let mut registry = ViewModelRegistry::new();
        assert!(
            registry
                .register(ViewModelDescriptor {
                    name: "needs-settings",
                    dependencies: &["settings"],
                    elements: &[],
                    construct: inert,
                })
                .is_err()
        );

        let descriptor = controller::descriptor();
        assert!(
            descriptor
                .dependencies
                .iter()
                .all(|dep| AVAILABLE_DEPENDENCIES.contains(dep))
        );
    }

    #[test]
    fn activation_only_reaches_view_models_on_visible_tab() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let mut registry = ViewModelRegistry::new();
        registry
            .register(controller::descriptor())
            .expect("registration should succeed");
        let mut host = registry.instantiate(&context(dispatcher.clone()));

        host.after_binding(&Configuration::default());
        assert_eq!(host.activate(), 0);

        host.change_tab("#temp");
        assert_eq!(host.activate(), 0);

        host.change_tab(TAB_ELEMENT_ID);
        assert_eq!(host.activate(), 1);

        let sent = dispatcher.sent.lock().expect("dispatcher mutex poisoned");
        assert_eq!(
            *sent,
            vec![StreamCommand::CheckStream, StreamCommand::StartStream]
        );
    }

    #[test]
    fn plugin_messages_reach_every_view_model() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let mut registry = ViewModelRegistry::new();
        registry
            .register(controller::descriptor())
            .expect("registration should succeed");
        let mut host = registry.instantiate(&context(dispatcher));

        host.plugin_message("webcamstreamer", &PluginMessage::status(true));

        let rendered = host.render();
        assert_eq!(rendered.len(), 1);
        assert!(rendered[0].starts_with("webcamstreamer: "));
        assert!(rendered[0].contains("icon-stop"));
    }
}
