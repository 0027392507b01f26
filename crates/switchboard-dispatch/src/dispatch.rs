//! The dispatch pipeline.
//!
//! ```text
//! slash event
//!   → resolve full name, flatten leaf options
//!   → registry lookup                ← miss: "Could not resolve command"
//!   → requirement chain              ← failure message, ephemeral
//!   → parameter binding              ← malformed option or failed fetch
//!   → handler                        ← error: generic failure message
//!   → result transform               ← no rule: generic failure message
//! ```
//!
//! Every failure before the response is answered with one ephemeral reply
//! and logged. Failures delivering the response are only logged; there is
//! no retry.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::binder::bind;
use crate::descriptor::InvocationKind;
use crate::event::{Event, SlashCommandEvent};
use crate::handler::{CommandContext, Extensions, Output};
use crate::model::MessagePayload;
use crate::registry::{CommandRegistry, HandlerRecord};
use crate::requirement::RequirementPool;
use crate::router::{flatten_options, resolve_command_name, OptionMap};
use crate::transform::{TransformError, TransformRegistry};

/// User-facing texts for runtime failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// `{name}` is replaced with the routed command name.
    pub unresolved_command: String,
    pub invocation_failed: String,
    pub no_response: String,
    pub bind_failed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            unresolved_command: "Could not resolve command '{name}'.".to_string(),
            invocation_failed: "An error occurred invoking this command!".to_string(),
            no_response: "Could not produce a response for this command.".to_string(),
            bind_failed: "Could not read the options of this command.".to_string(),
        }
    }
}

impl Messages {
    pub fn unresolved(&self, name: &str) -> String {
        self.unresolved_command.replace("{name}", name)
    }
}

/// What happened to one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Responded,
    Unresolved(String),
    Blocked(String),
    BindFailed(String),
    HandlerFailed(String),
    NoTransform,
    ResponseFailed(String),
}

impl DispatchOutcome {
    pub fn is_responded(&self) -> bool {
        matches!(self, DispatchOutcome::Responded)
    }
}

/// Runs the dispatch pipeline over immutable, shared registries.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    requirements: RequirementPool,
    transforms: TransformRegistry,
    messages: Messages,
    app_state: Arc<Extensions>,
}

impl Dispatcher {
    pub fn new(
        registry: CommandRegistry,
        requirements: RequirementPool,
        transforms: TransformRegistry,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            requirements,
            transforms,
            messages: Messages::default(),
            app_state: Arc::new(Extensions::new()),
        }
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_app_state(mut self, app_state: Arc<Extensions>) -> Self {
        self.app_state = app_state;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Routes and runs a slash-command event.
    pub async fn dispatch_slash(&self, event: Arc<SlashCommandEvent>) -> DispatchOutcome {
        let (name, leaf) = resolve_command_name(&event.command_name, &event.options);
        let options = flatten_options(leaf);
        let record = self.registry.lookup(&name, InvocationKind::Slash).cloned();
        let event = Event::SlashCommand(event);

        let Some(record) = record else {
            warn!(command = %name, "Could not resolve slash command");
            self.reply_failure(&event, self.messages.unresolved(&name))
                .await;
            return DispatchOutcome::Unresolved(name);
        };
        debug!(command = %name, options = options.len(), "Routing slash command");
        self.invoke(event, record, options).await
    }

    /// Runs an already-resolved handler for `event`.
    pub async fn invoke(
        &self,
        event: Event,
        record: Arc<HandlerRecord>,
        options: OptionMap,
    ) -> DispatchOutcome {
        let name = record.name();

        if let Err(failure) = self.requirements.verify(&event, &record.requirements).await {
            debug!(command = %name, reason = %failure.message, "Requirement not met");
            self.reply_failure(&event, failure.message.clone()).await;
            return DispatchOutcome::Blocked(failure.message);
        }

        let args = match bind(&record.params, &event, &options).await {
            Ok(args) => args,
            Err(e) => {
                error!(command = %name, error = %e, "Could not bind command options");
                self.reply_failure(&event, self.messages.bind_failed.clone())
                    .await;
                return DispatchOutcome::BindFailed(e.to_string());
            }
        };

        let ctx = CommandContext::new(record.full_name.clone(), Arc::clone(&self.app_state));
        let output = match record.handler.handle(ctx, args).await {
            Ok(output) => output,
            Err(e) => {
                error!(command = %name, error = %format!("{:#}", e), "Command handler failed");
                self.reply_failure(&event, self.messages.invocation_failed.clone())
                    .await;
                return DispatchOutcome::HandlerFailed(e.to_string());
            }
        };

        self.respond(output, &event, &name).await
    }

    /// Maps a handler result to a response through the transform registry.
    pub async fn respond(&self, output: Output, event: &Event, name: &str) -> DispatchOutcome {
        let result_type = output.result_type();
        let Some(effect) = self.transforms.resolve(output, event) else {
            error!(
                command = %name,
                result = %result_type,
                event = %event.event_type(),
                "No transform rule accepts the command result"
            );
            self.reply_failure(event, self.messages.no_response.clone())
                .await;
            return DispatchOutcome::NoTransform;
        };

        match effect.await {
            Ok(()) => {
                debug!(command = %name, "Responded");
                DispatchOutcome::Responded
            }
            Err(TransformError::Platform(e)) => {
                error!(command = %name, error = %e, "Could not deliver response");
                DispatchOutcome::ResponseFailed(e.to_string())
            }
            Err(e) => {
                error!(command = %name, error = %e, "Invalid command response");
                self.reply_failure(event, self.messages.no_response.clone())
                    .await;
                DispatchOutcome::ResponseFailed(e.to_string())
            }
        }
    }

    async fn reply_failure(&self, event: &Event, message: String) {
        if let Err(e) = event.reply(MessagePayload::text(message).ephemeral()).await {
            warn!(error = %e, "Could not send failure reply");
        }
    }
}
