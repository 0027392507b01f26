//! Seams to the chat platform.
//!
//! The dispatch core never talks to a gateway directly. Responses, entity
//! lookups and command uploads go through these traits so the core can be
//! driven by any client library, or by the recording doubles in
//! [`crate::testing`].

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Channel, MessagePayload, OptionChoice, Role, Snowflake, User};
use crate::registration::ApplicationCommand;

/// How a payload is delivered for the event it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Answer the event with a new message.
    Reply,
    /// Edit the message the event originated from. Only valid for
    /// component events.
    Update,
}

/// Errors surfaced by platform calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform rejected the request: {0}")]
    Rejected(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Snowflake },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Delivers responses for a single event.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn respond(&self, kind: ResponseKind, payload: MessagePayload)
        -> Result<(), PlatformError>;

    /// Answers an autocomplete event with suggestions.
    async fn suggest(&self, choices: Vec<OptionChoice>) -> Result<(), PlatformError>;
}

/// Fetches full entities for ids carried in option values.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    async fn user(&self, id: Snowflake) -> Result<User, PlatformError>;

    async fn channel(&self, id: Snowflake) -> Result<Channel, PlatformError>;

    async fn role(&self, guild_id: Option<Snowflake>, id: Snowflake)
        -> Result<Role, PlatformError>;
}

/// Uploads the global command set.
#[async_trait]
pub trait RegistrationSink: Send + Sync {
    /// Replaces every global command with `commands`, returning the names the
    /// platform acknowledged.
    async fn bulk_overwrite(
        &self,
        commands: Vec<ApplicationCommand>,
    ) -> Result<Vec<String>, PlatformError>;
}
