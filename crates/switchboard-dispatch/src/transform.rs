//! Result transformation.
//!
//! Dispatch does not know how a handler's result becomes a platform
//! response. It asks the [`TransformRegistry`] for the first rule that
//! accepts the result type and event type, and hands both over. No two
//! rules may claim the same result type for overlapping event types; this
//! is checked when rules are added.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::event::{Event, EventType};
use crate::handler::{Output, ResultType};
use crate::model::MessagePayload;
use crate::platform::PlatformError;
use crate::response::ResponseAction;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform rules '{first}' and '{second}' both claim {result_type} results for {event_type} events")]
    Overlap {
        first: String,
        second: String,
        result_type: ResultType,
        event_type: EventType,
    },

    #[error("{action} responses are not valid for {event} events")]
    InvalidAction {
        action: ResponseAction,
        event: EventType,
    },

    #[error("rule '{rule}' cannot handle {found} results")]
    Unexpected { rule: String, found: ResultType },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub type TransformFuture = BoxFuture<'static, Result<(), TransformError>>;

/// The transform function signature.
pub type TransformFn = Arc<dyn Fn(Output, Event) -> TransformFuture + Send + Sync>;

/// Creates a transform function from an async closure.
pub fn from_fn<F, Fut>(f: F) -> TransformFn
where
    F: Fn(Output, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TransformError>> + Send + 'static,
{
    Arc::new(move |output, event| Box::pin(f(output, event)))
}

/// Maps results of some types, for some event types, to a response.
#[derive(Clone)]
pub struct TransformRule {
    pub name: String,
    pub result_types: Vec<ResultType>,
    pub event_types: Vec<EventType>,
    transform: TransformFn,
}

impl TransformRule {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        result_types: impl IntoIterator<Item = ResultType>,
        event_types: impl IntoIterator<Item = EventType>,
        f: F,
    ) -> Self
    where
        F: Fn(Output, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TransformError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            result_types: result_types.into_iter().collect(),
            event_types: event_types.into_iter().collect(),
            transform: from_fn(f),
        }
    }

    pub fn accepts(&self, result_type: ResultType, event_type: EventType) -> bool {
        self.result_types.contains(&result_type)
            && self
                .event_types
                .iter()
                .any(|t| t.is_assignable_from(event_type))
    }

    /// The first `(result type, event type)` pair both rules would claim.
    pub fn conflict_with(&self, other: &TransformRule) -> Option<(ResultType, EventType)> {
        let result_type = self
            .result_types
            .iter()
            .find(|r| other.result_types.contains(r))?;
        self.event_types
            .iter()
            .find(|mine| other.event_types.iter().any(|theirs| mine.overlaps(*theirs)))
            .map(|event_type| (*result_type, *event_type))
    }

    pub fn apply(&self, output: Output, event: Event) -> TransformFuture {
        (self.transform)(output, event)
    }
}

impl fmt::Debug for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRule")
            .field("name", &self.name)
            .field("result_types", &self.result_types)
            .field("event_types", &self.event_types)
            .finish_non_exhaustive()
    }
}

/// Ordered set of non-overlapping transform rules.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    rules: Vec<TransformRule>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in rules:
    ///
    /// | Result | Events | Effect |
    /// |--------|--------|--------|
    /// | text | interactions, messages | reply with the text |
    /// | embed | interactions, messages | reply with the embed |
    /// | response | interactions, messages | send as described |
    /// | silent | any | nothing |
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for rule in builtin_rules() {
            registry.rules.push(rule);
        }
        registry
    }

    /// Adds a rule, rejecting it if it overlaps an existing one.
    pub fn add(&mut self, rule: TransformRule) -> Result<(), TransformError> {
        if let Some((existing, (result_type, event_type))) = self
            .rules
            .iter()
            .find_map(|r| r.conflict_with(&rule).map(|c| (r, c)))
        {
            return Err(TransformError::Overlap {
                first: existing.name.clone(),
                second: rule.name,
                result_type,
                event_type,
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    pub fn find(&self, result_type: ResultType, event_type: EventType) -> Option<&TransformRule> {
        self.rules
            .iter()
            .find(|r| r.accepts(result_type, event_type))
    }

    /// Returns the response effect for `output`, or `None` when no rule
    /// accepts it.
    pub fn resolve(&self, output: Output, event: &Event) -> Option<TransformFuture> {
        self.find(output.result_type(), event.event_type())
            .map(|rule| rule.apply(output, event.clone()))
    }
}

fn builtin_rules() -> Vec<TransformRule> {
    let responding = [EventType::Interaction, EventType::Message];
    vec![
        TransformRule::new("text", [ResultType::Text], responding, |output, event| async move {
            match output {
                Output::Text(text) => event
                    .reply(MessagePayload::text(text))
                    .await
                    .map_err(TransformError::from),
                other => Err(unexpected("text", &other)),
            }
        }),
        TransformRule::new("embed", [ResultType::Embed], responding, |output, event| async move {
            match output {
                Output::Embed(embed) => event
                    .reply(MessagePayload::embed(embed))
                    .await
                    .map_err(TransformError::from),
                other => Err(unexpected("embed", &other)),
            }
        }),
        TransformRule::new(
            "response",
            [ResultType::Response],
            responding,
            |output, event| async move {
                match output {
                    Output::Response(response) => response.respond(&event).await,
                    other => Err(unexpected("response", &other)),
                }
            },
        ),
        TransformRule::new("silent", [ResultType::Silent], [EventType::Any], |_, _| async {
            Ok(())
        }),
    ]
}

fn unexpected(rule: &str, output: &Output) -> TransformError {
    TransformError::Unexpected {
        rule: rule.to_string(),
        found: output.result_type(),
    }
}
