//! In-memory platform doubles for tests.
//!
//! [`RecordingSink`] captures every response and suggestion list,
//! [`StaticResolver`] serves entities from fixed maps and
//! [`RecordingRegistrar`] captures uploads. The `*_event` helpers build
//! events from a default guild context.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::binder::Arguments;
use crate::descriptor::CommandDescriptor;
use crate::event::{
    AutocompleteEvent, ComponentEvent, ComponentKind, Event, InteractionContext, MessageEvent,
    PlatformHandle, SlashCommandEvent,
};
use crate::handler::CommandContext;
use crate::model::{
    Channel, ChannelKind, InteractionOption, MessagePayload, OptionChoice, Role, Snowflake, User,
};
use crate::platform::{
    EntityResolver, PlatformError, RegistrationSink, ResponseKind, ResponseSink,
};
use crate::registration::ApplicationCommand;
use crate::registry::HandlerRecord;
use crate::schema::compile;

pub const GUILD_ID: Snowflake = Snowflake(1000);

/// Records responses instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    responses: Mutex<Vec<(ResponseKind, MessagePayload)>>,
    suggestions: Mutex<Vec<Vec<OptionChoice>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every call fails with [`PlatformError::Transport`].
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn responses(&self) -> Vec<(ResponseKind, MessagePayload)> {
        self.responses.lock().clone()
    }

    /// Text content of every recorded response.
    pub fn texts(&self) -> Vec<String> {
        self.responses
            .lock()
            .iter()
            .filter_map(|(_, p)| p.content.clone())
            .collect()
    }

    pub fn suggestions(&self) -> Vec<Vec<OptionChoice>> {
        self.suggestions.lock().clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn respond(
        &self,
        kind: ResponseKind,
        payload: MessagePayload,
    ) -> Result<(), PlatformError> {
        if self.fail {
            return Err(PlatformError::Transport("sink closed".into()));
        }
        self.responses.lock().push((kind, payload));
        Ok(())
    }

    async fn suggest(&self, choices: Vec<OptionChoice>) -> Result<(), PlatformError> {
        if self.fail {
            return Err(PlatformError::Transport("sink closed".into()));
        }
        self.suggestions.lock().push(choices);
        Ok(())
    }
}

/// Serves entities from fixed maps.
#[derive(Debug, Default)]
pub struct StaticResolver {
    users: HashMap<Snowflake, User>,
    channels: HashMap<Snowflake, Channel>,
    roles: HashMap<Snowflake, Role>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel.id, channel);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role.id, role);
        self
    }
}

#[async_trait]
impl EntityResolver for StaticResolver {
    async fn user(&self, id: Snowflake) -> Result<User, PlatformError> {
        self.users
            .get(&id)
            .cloned()
            .ok_or(PlatformError::NotFound { kind: "user", id })
    }

    async fn channel(&self, id: Snowflake) -> Result<Channel, PlatformError> {
        self.channels
            .get(&id)
            .cloned()
            .ok_or(PlatformError::NotFound { kind: "channel", id })
    }

    async fn role(
        &self,
        _guild_id: Option<Snowflake>,
        id: Snowflake,
    ) -> Result<Role, PlatformError> {
        self.roles
            .get(&id)
            .cloned()
            .ok_or(PlatformError::NotFound { kind: "role", id })
    }
}

/// Records uploads, optionally rejecting them.
#[derive(Debug, Default)]
pub struct RecordingRegistrar {
    uploads: Mutex<Vec<Vec<ApplicationCommand>>>,
    reject: Option<String>,
}

impl RecordingRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            reject: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<Vec<ApplicationCommand>> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl RegistrationSink for RecordingRegistrar {
    async fn bulk_overwrite(
        &self,
        commands: Vec<ApplicationCommand>,
    ) -> Result<Vec<String>, PlatformError> {
        let names = commands.iter().map(|c| c.name.clone()).collect();
        self.uploads.lock().push(commands);
        match &self.reject {
            Some(reason) => Err(PlatformError::Rejected(reason.clone())),
            None => Ok(names),
        }
    }
}

/// The invoking user of events built by this module.
pub fn user() -> User {
    User::new(42u64, "tester")
}

pub fn guild_context() -> InteractionContext {
    InteractionContext::new(
        user(),
        Some(GUILD_ID),
        Channel::new(2000u64, ChannelKind::GuildText),
    )
}

pub fn dm_context() -> InteractionContext {
    InteractionContext::new(user(), None, Channel::new(3000u64, ChannelKind::DirectMessage))
}

pub fn handle(sink: Arc<dyn ResponseSink>, resolver: Arc<dyn EntityResolver>) -> PlatformHandle {
    PlatformHandle::new(sink, resolver)
}

pub fn slash_event(
    name: &str,
    options: Vec<InteractionOption>,
    sink: Arc<RecordingSink>,
) -> Event {
    slash_event_with(name, options, sink, Arc::new(StaticResolver::new()))
}

pub fn slash_event_with(
    name: &str,
    options: Vec<InteractionOption>,
    sink: Arc<RecordingSink>,
    resolver: Arc<StaticResolver>,
) -> Event {
    SlashCommandEvent::new(guild_context(), name, options, handle(sink, resolver)).into()
}

pub fn dm_slash_event(
    name: &str,
    options: Vec<InteractionOption>,
    sink: Arc<RecordingSink>,
) -> Event {
    let platform = handle(sink, Arc::new(StaticResolver::new()));
    SlashCommandEvent::new(dm_context(), name, options, platform).into()
}

pub fn component_event(kind: ComponentKind, custom_id: &str, sink: Arc<RecordingSink>) -> Event {
    let platform = handle(sink, Arc::new(StaticResolver::new()));
    ComponentEvent::new(guild_context(), kind, custom_id, platform).into()
}

pub fn autocomplete_event(
    name: &str,
    options: Vec<InteractionOption>,
    sink: Arc<RecordingSink>,
) -> AutocompleteEvent {
    let platform = handle(sink, Arc::new(StaticResolver::new()));
    AutocompleteEvent::new(guild_context(), name, options, platform)
}

pub fn message_event(content: &str, sink: Arc<RecordingSink>) -> Event {
    let platform = handle(sink, Arc::new(StaticResolver::new()));
    MessageEvent::new(guild_context(), content, platform).into()
}

/// Compiles a descriptor that is expected to be valid, attaching a handler
/// answering `"ok"` when none was set.
///
/// # Panics
///
/// Panics if the descriptor does not compile.
pub fn compile_ok(descriptor: CommandDescriptor) -> Arc<HandlerRecord> {
    let descriptor = if descriptor.handler.is_some() {
        descriptor
    } else {
        descriptor.handler_fn(|_ctx: CommandContext, _args: Arguments| async move {
            Ok::<_, anyhow::Error>("ok")
        })
    };
    match compile(&descriptor) {
        Ok(compiled) => compiled.record,
        Err(errors) => panic!("descriptor '{}' failed to compile: {:?}", descriptor.name, errors),
    }
}

/// A slash record named `name`, described by its name, with no parameters.
pub fn record(name: &str) -> Arc<HandlerRecord> {
    let description = if name.trim().is_empty() { "unnamed" } else { name.trim() };
    compile_ok(CommandDescriptor::slash(name, description))
}
