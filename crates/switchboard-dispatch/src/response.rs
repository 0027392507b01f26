//! Explicit response values.
//!
//! Handlers that need more control than "reply with this text" return an
//! [`EventResponse`]: create, reply or edit, with plaintext or embed content,
//! optionally ephemeral and with UI components attached.

use std::fmt;

use crate::event::Event;
use crate::model::{Embed, MessagePayload};
use crate::platform::ResponseKind;
use crate::transform::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    Create,
    Edit,
    Reply,
}

impl fmt::Display for ResponseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseAction::Create => write!(f, "create"),
            ResponseAction::Edit => write!(f, "edit"),
            ResponseAction::Reply => write!(f, "reply"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseContent {
    Plaintext(String),
    Embed(Embed),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventResponse {
    action: ResponseAction,
    content: ResponseContent,
    ephemeral: bool,
    components: Vec<serde_json::Value>,
}

impl EventResponse {
    pub fn new(action: ResponseAction, content: ResponseContent) -> Self {
        Self {
            action,
            content,
            ephemeral: false,
            components: Vec::new(),
        }
    }

    pub fn create_plaintext(text: impl Into<String>) -> Self {
        Self::new(ResponseAction::Create, ResponseContent::Plaintext(text.into()))
    }

    pub fn reply_plaintext(text: impl Into<String>) -> Self {
        Self::new(ResponseAction::Reply, ResponseContent::Plaintext(text.into()))
    }

    pub fn edit_plaintext(text: impl Into<String>) -> Self {
        Self::new(ResponseAction::Edit, ResponseContent::Plaintext(text.into()))
    }

    pub fn create_embed(embed: Embed) -> Self {
        Self::new(ResponseAction::Create, ResponseContent::Embed(embed))
    }

    pub fn reply_embed(embed: Embed) -> Self {
        Self::new(ResponseAction::Reply, ResponseContent::Embed(embed))
    }

    pub fn edit_embed(embed: Embed) -> Self {
        Self::new(ResponseAction::Edit, ResponseContent::Embed(embed))
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn components(mut self, components: Vec<serde_json::Value>) -> Self {
        self.components = components;
        self
    }

    pub fn action(&self) -> ResponseAction {
        self.action
    }

    pub fn content(&self) -> &ResponseContent {
        &self.content
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn into_payload(self) -> MessagePayload {
        let payload = match self.content {
            ResponseContent::Plaintext(text) => MessagePayload::text(text),
            ResponseContent::Embed(embed) => MessagePayload::embed(embed),
        };
        MessagePayload {
            ephemeral: self.ephemeral,
            components: self.components,
            ..payload
        }
    }

    /// Maps the action onto the delivery mode `event` supports.
    ///
    /// Component events may edit their originating message. Command and
    /// message events can only be answered with a new message.
    pub fn delivery_for(&self, event: &Event) -> Result<ResponseKind, TransformError> {
        match (event, self.action) {
            (Event::Component(_), ResponseAction::Edit) => Ok(ResponseKind::Update),
            (Event::Autocomplete(_), action) => Err(TransformError::InvalidAction {
                action,
                event: event.event_type(),
            }),
            (_, ResponseAction::Edit) => Err(TransformError::InvalidAction {
                action: ResponseAction::Edit,
                event: event.event_type(),
            }),
            (_, ResponseAction::Create | ResponseAction::Reply) => Ok(ResponseKind::Reply),
        }
    }

    /// Sends this response for `event`.
    pub async fn respond(self, event: &Event) -> Result<(), TransformError> {
        let kind = self.delivery_for(event)?;
        event.respond(kind, self.into_payload()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ComponentKind;
    use crate::testing::{self, RecordingSink};
    use std::sync::Arc;

    #[test]
    fn test_into_payload_carries_flags() {
        let payload = EventResponse::reply_plaintext("hi")
            .ephemeral()
            .components(vec![serde_json::json!({"type": 1})])
            .into_payload();
        assert_eq!(payload.content.as_deref(), Some("hi"));
        assert!(payload.ephemeral);
        assert_eq!(payload.components.len(), 1);
    }

    #[test]
    fn test_edit_rejected_for_slash_command() {
        let sink = Arc::new(RecordingSink::new());
        let event = testing::slash_event("ping", vec![], sink);
        let err = EventResponse::edit_plaintext("x")
            .delivery_for(&event)
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::InvalidAction {
                action: ResponseAction::Edit,
                ..
            }
        ));
    }

    #[test]
    fn test_edit_updates_component_message() {
        let sink = Arc::new(RecordingSink::new());
        let event = testing::component_event(ComponentKind::Button, "btn", sink);
        assert_eq!(
            EventResponse::edit_plaintext("x").delivery_for(&event).unwrap(),
            ResponseKind::Update
        );
        assert_eq!(
            EventResponse::create_plaintext("x").delivery_for(&event).unwrap(),
            ResponseKind::Reply
        );
    }

    #[tokio::test]
    async fn test_respond_sends_payload() {
        let sink = Arc::new(RecordingSink::new());
        let event = testing::slash_event("ping", vec![], sink.clone());
        EventResponse::reply_embed(Embed::new().title("T"))
            .respond(&event)
            .await
            .unwrap();
        let sent = sink.responses();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ResponseKind::Reply);
        assert_eq!(sent[0].1.embeds[0].title.as_deref(), Some("T"));
    }
}
