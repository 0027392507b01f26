//! Autocomplete routing.
//!
//! Options declared with an autocomplete provider are bound at startup by
//! `(command name, option name)`. When the user types into such an option,
//! the router resolves the command the same way slash commands are routed,
//! finds the focused option and asks its provider for suggestions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::event::AutocompleteEvent;
use crate::handler::TypeKey;
use crate::model::{InteractionOption, OptionChoice};
use crate::platform::PlatformError;
use crate::router::{focused_option, resolve_command_name};

/// Most suggestions the platform accepts in one response.
pub const MAX_SUGGESTIONS: usize = 25;

/// Supplies suggestions for an option while the user types.
#[async_trait]
pub trait AutocompleteProvider: Send + Sync + 'static {
    async fn suggest(
        &self,
        event: &AutocompleteEvent,
        focused: &InteractionOption,
    ) -> Vec<OptionChoice>;
}

/// An option bound to its provider type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutocompleteBinding {
    /// Canonical command name.
    pub command: String,
    /// Lowercased option name.
    pub option: String,
    pub provider: TypeKey,
}

#[derive(Clone, Default)]
pub struct AutocompleteRouter {
    bindings: HashMap<(String, String), TypeKey>,
    providers: HashMap<TypeKey, Arc<dyn AutocompleteProvider>>,
}

impl AutocompleteRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, binding: AutocompleteBinding) {
        self.bindings
            .insert((binding.command, binding.option), binding.provider);
    }

    /// Registers a provider instance, replacing any previous one of the same
    /// type.
    pub fn register_provider<P: AutocompleteProvider>(&mut self, provider: P) {
        self.providers
            .insert(TypeKey::of::<P>(), Arc::new(provider));
    }

    pub fn with_provider<P: AutocompleteProvider>(mut self, provider: P) -> Self {
        self.register_provider(provider);
        self
    }

    pub fn binding(&self, command: &str, option: &str) -> Option<TypeKey> {
        self.bindings
            .get(&(command.to_string(), option.to_string()))
            .copied()
    }

    /// Bindings whose provider type was never registered.
    pub fn unresolved_bindings(&self) -> Vec<AutocompleteBinding> {
        self.bindings
            .iter()
            .filter(|(_, provider)| !self.providers.contains_key(provider))
            .map(|((command, option), provider)| AutocompleteBinding {
                command: command.clone(),
                option: option.clone(),
                provider: *provider,
            })
            .collect()
    }

    /// Computes suggestions for `event`, at most [`MAX_SUGGESTIONS`].
    ///
    /// Returns an empty list when no focused option or binding exists.
    pub async fn suggestions(&self, event: &AutocompleteEvent) -> Vec<OptionChoice> {
        let (command, leaf) = resolve_command_name(&event.command_name, &event.options);
        let Some(focused) = focused_option(leaf) else {
            warn!(command = %command, "Autocomplete event without a focused option");
            return Vec::new();
        };
        let option = focused.name.to_lowercase();
        let Some(key) = self.binding(&command, &option) else {
            warn!(command = %command, option = %option, "No autocomplete provider bound");
            return Vec::new();
        };
        let Some(provider) = self.providers.get(&key) else {
            warn!(
                command = %command,
                option = %option,
                provider = key.name,
                "Autocomplete provider not registered"
            );
            return Vec::new();
        };

        let mut suggestions = provider.suggest(event, focused).await;
        if suggestions.len() > MAX_SUGGESTIONS {
            debug!(
                command = %command,
                count = suggestions.len(),
                "Truncating autocomplete suggestions"
            );
            suggestions.truncate(MAX_SUGGESTIONS);
        }
        suggestions
    }

    /// Computes suggestions and sends them, returning how many were sent.
    pub async fn respond(&self, event: &AutocompleteEvent) -> Result<usize, PlatformError> {
        let suggestions = self.suggestions(event).await;
        let count = suggestions.len();
        event.platform.sink.suggest(suggestions).await?;
        Ok(count)
    }
}

impl fmt::Debug for AutocompleteRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutocompleteRouter")
            .field("bindings", &self.bindings.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}
