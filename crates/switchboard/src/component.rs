//! Component interaction routing.
//!
//! Handlers are bound to a component kind and a custom-id pattern. The
//! pattern must match the whole custom id. Component handlers take no
//! command options; their parameters are injections only, and an injected
//! event must be [`Event`](switchboard_dispatch::Event) or
//! `Arc<ComponentEvent>`.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

use switchboard_dispatch::{
    compile_params, Arguments, CommandContext, ComponentEvent, ComponentKind, FnHandler, Handler,
    HandlerRecord, IntoHandlerResult, Param, ParamContext, Requirement, RequirementDescriptor,
    SchemaError,
};

use crate::setup::SetupError;

/// A component handler declaration.
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    /// Regular expression matched against the full custom id.
    pub pattern: String,
    pub params: Vec<Param>,
    pub requirements: Vec<RequirementDescriptor>,
    pub handler: Option<Arc<dyn Handler>>,
}

impl ComponentDescriptor {
    pub fn new(kind: ComponentKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            params: Vec::new(),
            requirements: Vec::new(),
            handler: None,
        }
    }

    pub fn button(pattern: impl Into<String>) -> Self {
        Self::new(ComponentKind::Button, pattern)
    }

    pub fn select_menu(pattern: impl Into<String>) -> Self {
        Self::new(ComponentKind::SelectMenu, pattern)
    }

    pub fn modal(pattern: impl Into<String>) -> Self {
        Self::new(ComponentKind::ModalSubmit, pattern)
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn requirement<M: Requirement>(mut self) -> Self {
        self.requirements.push(RequirementDescriptor::of::<M>());
        self
    }

    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn handler_fn<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.handler(FnHandler::new(f))
    }

    fn label(&self) -> String {
        format!("{:?} '{}'", self.kind, self.pattern)
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("kind", &self.kind)
            .field("pattern", &self.pattern)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct ComponentRoute {
    kind: ComponentKind,
    pattern: Regex,
    record: Arc<HandlerRecord>,
}

/// Routes component events to the single handler whose pattern matches.
#[derive(Debug, Default)]
pub struct ComponentRouter {
    routes: Vec<ComponentRoute>,
}

impl ComponentRouter {
    /// Compiles every descriptor, collecting all declaration errors.
    pub fn build(descriptors: &[ComponentDescriptor]) -> Result<Self, SetupError> {
        let mut routes = Vec::with_capacity(descriptors.len());
        let mut schema_errors = Vec::new();

        for descriptor in descriptors {
            let label = descriptor.label();
            let pattern = Regex::new(&format!("^(?:{})$", descriptor.pattern)).map_err(|e| {
                SetupError::Component(format!("invalid custom-id pattern for {}: {}", label, e))
            })?;

            let params = match compile_params(&label, &descriptor.params, ParamContext::Component)
            {
                Ok(params) => params,
                Err(mut errors) => {
                    schema_errors.append(&mut errors);
                    continue;
                }
            };
            let Some(handler) = descriptor.handler.clone() else {
                schema_errors.push(SchemaError::MissingHandler { command: label });
                continue;
            };

            routes.push(ComponentRoute {
                kind: descriptor.kind,
                pattern,
                record: Arc::new(HandlerRecord {
                    full_name: vec![label],
                    description: String::new(),
                    kinds: BTreeSet::new(),
                    handler,
                    params,
                    requirements: descriptor.requirements.clone(),
                }),
            });
        }

        if !schema_errors.is_empty() {
            return Err(SetupError::Schema(schema_errors));
        }
        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The handler for `event`, or `None` when no pattern or more than one
    /// pattern matches.
    pub fn route(&self, event: &ComponentEvent) -> Option<Arc<HandlerRecord>> {
        let mut candidates = self
            .routes
            .iter()
            .filter(|route| route.kind == event.kind && route.pattern.is_match(&event.custom_id));

        let Some(first) = candidates.next() else {
            error!(kind = ?event.kind, custom_id = %event.custom_id, "No component handler matches");
            return None;
        };
        let others: Vec<String> = candidates.map(|route| route.record.name()).collect();
        if !others.is_empty() {
            error!(
                kind = ?event.kind,
                custom_id = %event.custom_id,
                first = %first.record.name(),
                others = ?others,
                "Ambiguous component handlers"
            );
            return None;
        }
        debug!(custom_id = %event.custom_id, handler = %first.record.name(), "Routing component");
        Some(Arc::clone(&first.record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_dispatch::testing::{self, RecordingSink};
    use switchboard_dispatch::{Binding, Event, Injection};

    fn ok() -> impl Fn(CommandContext, Arguments) -> std::future::Ready<anyhow::Result<&'static str>>
           + Send
           + Sync
           + 'static {
        |_ctx: CommandContext, _args: Arguments| std::future::ready(Ok("ok"))
    }

    fn component(kind: ComponentKind, id: &str) -> Arc<ComponentEvent> {
        match testing::component_event(kind, id, Arc::new(RecordingSink::new())) {
            Event::Component(e) => e,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_full_match_required() {
        let router =
            ComponentRouter::build(&[ComponentDescriptor::button("vote-[0-9]+").handler_fn(ok())])
                .unwrap();
        assert!(router.route(&component(ComponentKind::Button, "vote-12")).is_some());
        assert!(router.route(&component(ComponentKind::Button, "vote-12x")).is_none());
        assert!(router.route(&component(ComponentKind::Button, "xvote-12")).is_none());
    }

    #[test]
    fn test_kind_must_match() {
        let router =
            ComponentRouter::build(&[ComponentDescriptor::button("menu").handler_fn(ok())]).unwrap();
        assert!(router.route(&component(ComponentKind::SelectMenu, "menu")).is_none());
    }

    #[test]
    fn test_ambiguous_match_routes_nowhere() {
        let router = ComponentRouter::build(&[
            ComponentDescriptor::button("page-.*").handler_fn(ok()),
            ComponentDescriptor::button("page-[0-9]").handler_fn(ok()),
        ])
        .unwrap();
        assert!(router.route(&component(ComponentKind::Button, "page-1")).is_none());
        assert!(router.route(&component(ComponentKind::Button, "page-next")).is_some());
    }

    #[test]
    fn test_invalid_pattern_is_setup_error() {
        let err = ComponentRouter::build(&[ComponentDescriptor::button("(").handler_fn(ok())])
            .unwrap_err();
        assert!(matches!(err, SetupError::Component(_)));
    }

    #[test]
    fn test_options_rejected_on_components() {
        let err = ComponentRouter::build(&[ComponentDescriptor::button("x")
            .param(Param::option::<i64>("n", "Number"))
            .handler_fn(ok())])
        .unwrap_err();
        match err {
            SetupError::Schema(errors) => {
                assert!(matches!(errors[0], SchemaError::OptionNotAllowed { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_slash_event_injection_rejected() {
        let err = ComponentRouter::build(&[ComponentDescriptor::button("x")
            .param(Param::event_as::<Arc<switchboard_dispatch::SlashCommandEvent>>("e"))
            .handler_fn(ok())])
        .unwrap_err();
        assert!(matches!(err, SetupError::Schema(_)));
    }

    #[test]
    fn test_missing_handler_reported() {
        let err = ComponentRouter::build(&[ComponentDescriptor::modal("form")]).unwrap_err();
        assert!(err.to_string().contains("has no handler"));
    }

    #[test]
    fn test_component_event_injection() {
        let router = ComponentRouter::build(&[ComponentDescriptor::select_menu("pick")
            .param(Param::event_as::<Arc<ComponentEvent>>("event"))
            .handler_fn(ok())])
        .unwrap();
        let record = router
            .route(&component(ComponentKind::SelectMenu, "pick"))
            .unwrap();
        assert!(matches!(
            record.params[0].binding,
            Binding::Injection(Injection::Event)
        ));
    }
}
