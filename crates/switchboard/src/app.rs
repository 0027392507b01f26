//! The assembled application.
//!
//! [`App`] owns every registry and is immutable once built. Share it as
//! `Arc<App>` and feed it events from the gateway; each event is handled
//! independently, usually on its own task via [`App::spawn`].

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use switchboard_dispatch::{
    ApplicationCommand, AutocompleteRouter, CommandRegistry, CommandTreeNode, DispatchOutcome,
    Dispatcher, Event, MessagePayload, OptionMap, RegistrationSink,
};

use crate::builder::AppBuilder;
use crate::component::ComponentRouter;
use crate::config::Config;
use crate::text::{TextCommandParser, TextParse};

/// What the app did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A handler was resolved, or resolution failed, through the dispatch pipeline.
    Dispatched(DispatchOutcome),
    /// Suggestions were sent.
    Suggested(usize),
    /// Suggestions could not be delivered.
    SuggestFailed(String),
    /// A text command was recognised but its arguments did not parse.
    InvalidText(String),
    /// Nothing handles this event.
    Ignored,
}

/// Result of the startup registration upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Registration is disabled by configuration.
    Skipped,
    /// Names of the registered top-level commands.
    Registered(Vec<String>),
    Failed(String),
}

pub struct App {
    config: Config,
    dispatcher: Dispatcher,
    autocomplete: AutocompleteRouter,
    components: ComponentRouter,
    text: TextCommandParser,
    tree: Vec<CommandTreeNode>,
    payload: Vec<ApplicationCommand>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub(crate) fn new(
        config: Config,
        dispatcher: Dispatcher,
        autocomplete: AutocompleteRouter,
        components: ComponentRouter,
        text: TextCommandParser,
        tree: Vec<CommandTreeNode>,
        payload: Vec<ApplicationCommand>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            autocomplete,
            components,
            text,
            tree,
            payload,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The slash-command forest.
    pub fn tree(&self) -> &[CommandTreeNode] {
        &self.tree
    }

    /// The registration payload built from [`App::tree`].
    pub fn payload(&self) -> &[ApplicationCommand] {
        &self.payload
    }

    /// Handles one event to completion.
    pub async fn handle(&self, event: Event) -> EventOutcome {
        match &event {
            Event::SlashCommand(slash) => {
                EventOutcome::Dispatched(self.dispatcher.dispatch_slash(Arc::clone(slash)).await)
            }
            Event::Autocomplete(request) => match self.autocomplete.respond(request).await {
                Ok(count) => EventOutcome::Suggested(count),
                Err(e) => {
                    error!(command = %request.command_name, error = %e, "Could not send suggestions");
                    EventOutcome::SuggestFailed(e.to_string())
                }
            },
            Event::Component(component) => match self.components.route(component) {
                Some(record) => EventOutcome::Dispatched(
                    self.dispatcher
                        .invoke(event.clone(), record, OptionMap::new())
                        .await,
                ),
                None => EventOutcome::Ignored,
            },
            Event::Message(message) => {
                if message.context.user.bot {
                    return EventOutcome::Ignored;
                }
                self.handle_text(&event, &message.content).await
            }
        }
    }

    async fn handle_text(&self, event: &Event, content: &str) -> EventOutcome {
        match self.text.parse(self.registry(), content) {
            TextParse::Ignored => EventOutcome::Ignored,
            TextParse::Invoke { record, options } => {
                debug!(command = %record.name(), "Routing text command");
                EventOutcome::Dispatched(self.dispatcher.invoke(event.clone(), record, options).await)
            }
            TextParse::Invalid { record, message } => {
                debug!(command = %record.name(), error = %message, "Invalid text command arguments");
                if let Err(e) = event.reply(MessagePayload::text(message.clone())).await {
                    warn!(error = %e, "Could not send usage reply");
                }
                EventOutcome::InvalidText(message)
            }
        }
    }

    /// Handles `event` on its own task.
    pub fn spawn(self: &Arc<Self>, event: Event) -> JoinHandle<EventOutcome> {
        let app = Arc::clone(self);
        tokio::spawn(async move { app.handle(event).await })
    }

    /// Replaces the platform's command set with this app's slash commands.
    ///
    /// Failures are logged and reported; the app keeps serving events either way.
    pub async fn register_commands(&self, sink: &dyn RegistrationSink) -> RegistrationOutcome {
        if !self.config.register_commands {
            warn!("Command registration is disabled; the platform keeps its current commands");
            return RegistrationOutcome::Skipped;
        }

        info!(commands = self.payload.len(), "Registering application commands");
        match sink.bulk_overwrite(self.payload.clone()).await {
            Ok(names) => {
                for name in &names {
                    info!(command = %name, "Registered command");
                }
                RegistrationOutcome::Registered(names)
            }
            Err(e) => {
                error!(error = %e, "Could not register application commands");
                RegistrationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Runs [`App::register_commands`] on its own task.
    pub fn spawn_registration(
        self: &Arc<Self>,
        sink: Arc<dyn RegistrationSink>,
    ) -> JoinHandle<RegistrationOutcome> {
        let app = Arc::clone(self);
        tokio::spawn(async move { app.register_commands(sink.as_ref()).await })
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("commands", &self.registry().len())
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}
