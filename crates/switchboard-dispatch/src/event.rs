//! Inbound platform events and the event-type lattice.
//!
//! Every event carries an [`InteractionContext`] (who, where) and a
//! [`PlatformHandle`] for answering it. Events are shared as `Arc`s inside
//! the [`Event`] enum so they can be handed to handlers, requirement
//! executors and result transformers without copying.
//!
//! [`EventType`] is the closed classification used by transform rules and
//! requirement checks:
//!
//! ```text
//! Any
//!  ├─ Interaction
//!  │   ├─ SlashCommand
//!  │   └─ Component
//!  │       ├─ Button
//!  │       ├─ SelectMenu
//!  │       └─ ModalSubmit
//!  ├─ Autocomplete
//!  └─ Message
//! ```
//!
//! `Interaction` only covers events that accept a message response, which is
//! why autocomplete sits directly under `Any`.

use std::fmt;
use std::sync::Arc;

use crate::model::{ChannelKind, InteractionOption, MessagePayload, Snowflake, User, Channel};
use crate::platform::{EntityResolver, PlatformError, ResponseKind, ResponseSink};

/// Who triggered an event and where.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionContext {
    pub user: User,
    pub guild_id: Option<Snowflake>,
    pub channel: Channel,
}

impl InteractionContext {
    pub fn new(user: User, guild_id: Option<Snowflake>, channel: Channel) -> Self {
        Self {
            user,
            guild_id,
            channel,
        }
    }

    pub fn in_guild(&self) -> bool {
        self.guild_id.is_some()
    }

    pub fn in_direct_message(&self) -> bool {
        matches!(self.channel.kind, ChannelKind::DirectMessage)
    }
}

/// The response sink and entity resolver bound to one event.
#[derive(Clone)]
pub struct PlatformHandle {
    pub sink: Arc<dyn ResponseSink>,
    pub resolver: Arc<dyn EntityResolver>,
}

impl PlatformHandle {
    pub fn new(sink: Arc<dyn ResponseSink>, resolver: Arc<dyn EntityResolver>) -> Self {
        Self { sink, resolver }
    }
}

impl fmt::Debug for PlatformHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformHandle").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct SlashCommandEvent {
    pub context: InteractionContext,
    /// Top-level command name as delivered by the platform.
    pub command_name: String,
    pub options: Vec<InteractionOption>,
    pub platform: PlatformHandle,
}

impl SlashCommandEvent {
    pub fn new(
        context: InteractionContext,
        command_name: impl Into<String>,
        options: Vec<InteractionOption>,
        platform: PlatformHandle,
    ) -> Self {
        Self {
            context,
            command_name: command_name.into(),
            options,
            platform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Button,
    SelectMenu,
    ModalSubmit,
}

impl ComponentKind {
    pub fn event_type(self) -> EventType {
        match self {
            ComponentKind::Button => EventType::Button,
            ComponentKind::SelectMenu => EventType::SelectMenu,
            ComponentKind::ModalSubmit => EventType::ModalSubmit,
        }
    }
}

/// A button press, select-menu choice or modal submission.
#[derive(Debug, Clone)]
pub struct ComponentEvent {
    pub context: InteractionContext,
    pub kind: ComponentKind,
    pub custom_id: String,
    /// Selected values for select menus, submitted field values for modals.
    pub values: Vec<String>,
    pub platform: PlatformHandle,
}

impl ComponentEvent {
    pub fn new(
        context: InteractionContext,
        kind: ComponentKind,
        custom_id: impl Into<String>,
        platform: PlatformHandle,
    ) -> Self {
        Self {
            context,
            kind,
            custom_id: custom_id.into(),
            values: Vec::new(),
            platform,
        }
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }
}

/// A request for suggestions while the user types an option value.
#[derive(Debug, Clone)]
pub struct AutocompleteEvent {
    pub context: InteractionContext,
    pub command_name: String,
    pub options: Vec<InteractionOption>,
    pub platform: PlatformHandle,
}

impl AutocompleteEvent {
    pub fn new(
        context: InteractionContext,
        command_name: impl Into<String>,
        options: Vec<InteractionOption>,
        platform: PlatformHandle,
    ) -> Self {
        Self {
            context,
            command_name: command_name.into(),
            options,
            platform,
        }
    }
}

/// A plain channel message, the input of text commands.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub context: InteractionContext,
    pub content: String,
    pub platform: PlatformHandle,
}

impl MessageEvent {
    pub fn new(
        context: InteractionContext,
        content: impl Into<String>,
        platform: PlatformHandle,
    ) -> Self {
        Self {
            context,
            content: content.into(),
            platform,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    SlashCommand(Arc<SlashCommandEvent>),
    Component(Arc<ComponentEvent>),
    Autocomplete(Arc<AutocompleteEvent>),
    Message(Arc<MessageEvent>),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::SlashCommand(_) => EventType::SlashCommand,
            Event::Component(e) => e.kind.event_type(),
            Event::Autocomplete(_) => EventType::Autocomplete,
            Event::Message(_) => EventType::Message,
        }
    }

    pub fn context(&self) -> &InteractionContext {
        match self {
            Event::SlashCommand(e) => &e.context,
            Event::Component(e) => &e.context,
            Event::Autocomplete(e) => &e.context,
            Event::Message(e) => &e.context,
        }
    }

    pub fn user(&self) -> &User {
        &self.context().user
    }

    pub fn platform(&self) -> &PlatformHandle {
        match self {
            Event::SlashCommand(e) => &e.platform,
            Event::Component(e) => &e.platform,
            Event::Autocomplete(e) => &e.platform,
            Event::Message(e) => &e.platform,
        }
    }

    pub async fn respond(
        &self,
        kind: ResponseKind,
        payload: MessagePayload,
    ) -> Result<(), PlatformError> {
        self.platform().sink.respond(kind, payload).await
    }

    pub async fn reply(&self, payload: MessagePayload) -> Result<(), PlatformError> {
        self.respond(ResponseKind::Reply, payload).await
    }
}

impl From<SlashCommandEvent> for Event {
    fn from(e: SlashCommandEvent) -> Self {
        Event::SlashCommand(Arc::new(e))
    }
}

impl From<ComponentEvent> for Event {
    fn from(e: ComponentEvent) -> Self {
        Event::Component(Arc::new(e))
    }
}

impl From<AutocompleteEvent> for Event {
    fn from(e: AutocompleteEvent) -> Self {
        Event::Autocomplete(Arc::new(e))
    }
}

impl From<MessageEvent> for Event {
    fn from(e: MessageEvent) -> Self {
        Event::Message(Arc::new(e))
    }
}

/// Closed classification of events, ordered by assignability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Any,
    Interaction,
    SlashCommand,
    Component,
    Button,
    SelectMenu,
    ModalSubmit,
    Autocomplete,
    Message,
}

impl EventType {
    pub fn parent(self) -> Option<EventType> {
        match self {
            EventType::Any => None,
            EventType::Interaction | EventType::Autocomplete | EventType::Message => {
                Some(EventType::Any)
            }
            EventType::SlashCommand | EventType::Component => Some(EventType::Interaction),
            EventType::Button | EventType::SelectMenu | EventType::ModalSubmit => {
                Some(EventType::Component)
            }
        }
    }

    /// True when an event of type `other` is also of type `self`.
    pub fn is_assignable_from(self, other: EventType) -> bool {
        let mut current = Some(other);
        while let Some(t) = current {
            if t == self {
                return true;
            }
            current = t.parent();
        }
        false
    }

    /// True when some concrete event would be of both types.
    pub fn overlaps(self, other: EventType) -> bool {
        self.is_assignable_from(other) || other.is_assignable_from(self)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Any => "any",
            EventType::Interaction => "interaction",
            EventType::SlashCommand => "slash-command",
            EventType::Component => "component",
            EventType::Button => "button",
            EventType::SelectMenu => "select-menu",
            EventType::ModalSubmit => "modal-submit",
            EventType::Autocomplete => "autocomplete",
            EventType::Message => "message",
        };
        f.write_str(name)
    }
}
