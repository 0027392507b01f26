//! AppBuilder for constructing App instances.
//!
//! The builder collects declarations and plug-ins, then validates them all
//! at once in [`AppBuilder::build`]. Every build-time failure is fatal: an
//! app with an invalid command never starts.
//!
//! # App State
//!
//! App-level state (database pools, API clients) can be injected with
//! `.app_state()` and read in handlers through `ctx.app_state`:
//!
//! ```rust
//! use switchboard::{App, Arguments, CommandContext, CommandDescriptor};
//!
//! struct Greeting(&'static str);
//!
//! let app = App::builder()
//!     .app_state(Greeting("Hello"))
//!     .command(
//!         CommandDescriptor::slash("hello", "Says hello").handler_fn(
//!             |ctx: CommandContext, _args: Arguments| async move {
//!                 let greeting = ctx.app_state.get_required::<Greeting>()?;
//!                 Ok::<_, anyhow::Error>(greeting.0.to_string())
//!             },
//!         ),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(app.payload().len(), 1);
//! ```

use std::sync::Arc;
use tracing::{error, info, warn};

use switchboard_dispatch::{
    build_payload, build_tree, compile, AutocompleteProvider, AutocompleteRouter,
    CommandDescriptor, CommandRegistry, Dispatcher, Extensions, InvocationKind,
    RequirementExecutor, RequirementPool, TransformRegistry, TransformRule,
};

use crate::app::App;
use crate::component::{ComponentDescriptor, ComponentRouter};
use crate::config::Config;
use crate::setup::SetupError;
use crate::text::TextCommandParser;

/// Builder for constructing an [`App`].
pub struct AppBuilder {
    config: Config,
    commands: Vec<CommandDescriptor>,
    components: Vec<ComponentDescriptor>,
    requirements: RequirementPool,
    autocomplete: AutocompleteRouter,
    transform_rules: Vec<TransformRule>,
    builtin_transforms: bool,
    /// Only the builder holds this until `build`.
    app_state: Extensions,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    /// Creates a builder with the default configuration, the built-in
    /// requirement executors and the built-in transform rules.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            commands: Vec::new(),
            components: Vec::new(),
            requirements: RequirementPool::with_builtins(),
            autocomplete: AutocompleteRouter::new(),
            transform_rules: Vec::new(),
            builtin_transforms: true,
            app_state: Extensions::new(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn command(mut self, descriptor: CommandDescriptor) -> Self {
        self.commands.push(descriptor);
        self
    }

    pub fn commands(mut self, descriptors: impl IntoIterator<Item = CommandDescriptor>) -> Self {
        self.commands.extend(descriptors);
        self
    }

    pub fn component(mut self, descriptor: ComponentDescriptor) -> Self {
        self.components.push(descriptor);
        self
    }

    /// Registers the executor for a requirement marker.
    pub fn requirement_executor<E: RequirementExecutor>(mut self, executor: E) -> Self {
        self.requirements.register(executor);
        self
    }

    pub fn autocomplete_provider<P: AutocompleteProvider>(mut self, provider: P) -> Self {
        self.autocomplete.register_provider(provider);
        self
    }

    /// Adds a result transform rule. Overlaps are reported by `build`.
    pub fn transform_rule(mut self, rule: TransformRule) -> Self {
        self.transform_rules.push(rule);
        self
    }

    /// Starts from an empty transform registry instead of the built-in rules.
    pub fn without_builtin_transforms(mut self) -> Self {
        self.builtin_transforms = false;
        self
    }

    /// Adds app-level state, replacing any previous value of the same type.
    pub fn app_state<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.app_state.insert(value);
        self
    }

    /// Validates every declaration and assembles the app.
    pub fn build(self) -> Result<App, SetupError> {
        let mut records = Vec::with_capacity(self.commands.len());
        let mut bindings = Vec::new();
        let mut schema_errors = Vec::new();
        for descriptor in &self.commands {
            match compile(descriptor) {
                Ok(compiled) => {
                    records.push(compiled.record);
                    bindings.extend(compiled.autocomplete);
                }
                Err(errors) => {
                    for err in &errors {
                        error!(command = %descriptor.name, error = %err, "Invalid command declaration");
                    }
                    schema_errors.extend(errors);
                }
            }
        }
        if !schema_errors.is_empty() {
            return Err(SetupError::Schema(schema_errors));
        }

        let mut registry = CommandRegistry::new();
        registry.register(records)?;

        let tree = build_tree(&registry.list_by_kind(InvocationKind::Slash))?;
        let payload = build_payload(&tree);

        let mut transforms = if self.builtin_transforms {
            TransformRegistry::with_builtins()
        } else {
            TransformRegistry::new()
        };
        for rule in self.transform_rules {
            transforms.add(rule)?;
        }

        let mut autocomplete = self.autocomplete;
        for binding in bindings {
            autocomplete.bind(binding);
        }
        for missing in autocomplete.unresolved_bindings() {
            warn!(
                command = %missing.command,
                option = %missing.option,
                provider = missing.provider.name,
                "Autocomplete provider not registered"
            );
        }

        for record in registry.iter() {
            for requirement in &record.requirements {
                if !self.requirements.contains(&requirement.executor) {
                    warn!(
                        command = %record.name(),
                        requirement = requirement.marker,
                        "Requirement executor not registered; the check will be skipped"
                    );
                }
            }
        }

        let components = ComponentRouter::build(&self.components)?;
        let text = TextCommandParser::new(self.config.text_prefix.clone());

        let dispatcher = Dispatcher::new(registry, self.requirements, transforms)
            .with_messages(self.config.messages.clone())
            .with_app_state(Arc::new(self.app_state));

        info!(
            commands = dispatcher.registry().len(),
            top_level = payload.len(),
            components = components.len(),
            "Built command app"
        );

        Ok(App::new(
            self.config,
            dispatcher,
            autocomplete,
            components,
            text,
            tree,
            payload,
        ))
    }
}
