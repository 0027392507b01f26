//! Requirement chain.
//!
//! Requirements guard a command before its arguments are bound. A command
//! lists requirement markers; each marker names the executor type that
//! checks it. Executors are registered once in a [`RequirementPool`] and run
//! in declaration order, stopping at the first failure, whose message is
//! shown to the user.
//!
//! ```text
//! routed event
//!   → requirement executors ← (guild-only, DM-only, custom checks)
//!   → parameter binding
//!   → handler
//!   → result transform
//! ```
//!
//! A marker whose executor was never registered is skipped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::event::Event;
use crate::handler::TypeKey;

/// A failed requirement check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("requirement not met: {message}")]
pub struct RequirementFailure {
    /// Message shown to the user, ephemerally.
    pub message: String,
}

impl RequirementFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Checks one requirement against an event.
#[async_trait]
pub trait RequirementExecutor: Send + Sync + 'static {
    async fn verify(&self, event: &Event) -> Result<(), RequirementFailure>;
}

/// A requirement marker, naming the executor that checks it.
///
/// ```rust
/// use switchboard_dispatch::{Event, Requirement, RequirementExecutor, RequirementFailure};
///
/// struct Staff;
/// struct StaffCheck { ids: Vec<u64> }
///
/// impl Requirement for Staff {
///     type Executor = StaffCheck;
/// }
///
/// #[async_trait::async_trait]
/// impl RequirementExecutor for StaffCheck {
///     async fn verify(&self, event: &Event) -> Result<(), RequirementFailure> {
///         if self.ids.contains(&event.user().id.get()) {
///             Ok(())
///         } else {
///             Err(RequirementFailure::new("Staff only."))
///         }
///     }
/// }
/// ```
pub trait Requirement: 'static {
    type Executor: RequirementExecutor;
}

/// A requirement as recorded on a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementDescriptor {
    pub marker: &'static str,
    pub executor: TypeKey,
}

impl RequirementDescriptor {
    pub fn of<M: Requirement>() -> Self {
        Self {
            marker: std::any::type_name::<M>(),
            executor: TypeKey::of::<M::Executor>(),
        }
    }
}

/// Registered executors, keyed by executor type.
#[derive(Clone, Default)]
pub struct RequirementPool {
    executors: HashMap<TypeKey, Arc<dyn RequirementExecutor>>,
}

impl RequirementPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool holding the built-in guild-only and DM-only executors.
    pub fn with_builtins() -> Self {
        Self::new()
            .with(GuildRequirement)
            .with(DirectMessageRequirement)
    }

    /// Registers an executor, replacing any previous one of the same type.
    pub fn register<E: RequirementExecutor>(&mut self, executor: E) {
        self.executors.insert(TypeKey::of::<E>(), Arc::new(executor));
    }

    pub fn with<E: RequirementExecutor>(mut self, executor: E) -> Self {
        self.register(executor);
        self
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.executors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Runs the executors for `requirements` in order.
    pub async fn verify(
        &self,
        event: &Event,
        requirements: &[RequirementDescriptor],
    ) -> Result<(), RequirementFailure> {
        for requirement in requirements {
            let Some(executor) = self.executors.get(&requirement.executor) else {
                debug!(
                    requirement = requirement.marker,
                    executor = requirement.executor.name,
                    "No executor registered, skipping requirement"
                );
                continue;
            };
            executor.verify(event).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for RequirementPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.executors.keys().map(|k| k.name).collect();
        f.debug_struct("RequirementPool")
            .field("executors", &names)
            .finish()
    }
}

/// Restricts a command to guild channels.
pub struct GuildOnly;

impl Requirement for GuildOnly {
    type Executor = GuildRequirement;
}

pub struct GuildRequirement;

#[async_trait]
impl RequirementExecutor for GuildRequirement {
    async fn verify(&self, event: &Event) -> Result<(), RequirementFailure> {
        if event.context().in_guild() {
            Ok(())
        } else {
            Err(RequirementFailure::new("This command only works in a server!"))
        }
    }
}

/// Restricts a command to direct messages.
pub struct DirectMessageOnly;

impl Requirement for DirectMessageOnly {
    type Executor = DirectMessageRequirement;
}

pub struct DirectMessageRequirement;

#[async_trait]
impl RequirementExecutor for DirectMessageRequirement {
    async fn verify(&self, event: &Event) -> Result<(), RequirementFailure> {
        if event.context().in_direct_message() {
            Ok(())
        } else {
            Err(RequirementFailure::new("This command only works in DMs!"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, RecordingSink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted;
    struct CountingExecutor(Arc<AtomicUsize>);

    impl Requirement for Counted {
        type Executor = CountingExecutor;
    }

    #[async_trait]
    impl RequirementExecutor for CountingExecutor {
        async fn verify(&self, _event: &Event) -> Result<(), RequirementFailure> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_guild_only() {
        let pool = RequirementPool::with_builtins();
        let reqs = [RequirementDescriptor::of::<GuildOnly>()];

        let guild = testing::slash_event("x", vec![], RecordingSink::new().into());
        assert!(pool.verify(&guild, &reqs).await.is_ok());

        let dm = testing::dm_slash_event("x", vec![], RecordingSink::new().into());
        let failure = pool.verify(&dm, &reqs).await.unwrap_err();
        assert_eq!(failure.message, "This command only works in a server!");
    }

    #[tokio::test]
    async fn test_dm_only() {
        let pool = RequirementPool::with_builtins();
        let reqs = [RequirementDescriptor::of::<DirectMessageOnly>()];
        let guild = testing::slash_event("x", vec![], RecordingSink::new().into());
        let failure = pool.verify(&guild, &reqs).await.unwrap_err();
        assert_eq!(failure.message, "This command only works in DMs!");
    }

    #[tokio::test]
    async fn test_first_failure_stops_chain() {
        let count = Arc::new(AtomicUsize::new(0));
        let pool = RequirementPool::with_builtins().with(CountingExecutor(count.clone()));
        let reqs = [
            RequirementDescriptor::of::<Counted>(),
            RequirementDescriptor::of::<DirectMessageOnly>(),
            RequirementDescriptor::of::<Counted>(),
        ];
        let guild = testing::slash_event("x", vec![], RecordingSink::new().into());
        assert!(pool.verify(&guild, &reqs).await.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_executor_skipped() {
        let pool = RequirementPool::new();
        let reqs = [RequirementDescriptor::of::<GuildOnly>()];
        let dm = testing::dm_slash_event("x", vec![], RecordingSink::new().into());
        assert!(pool.verify(&dm, &reqs).await.is_ok());
    }
}
