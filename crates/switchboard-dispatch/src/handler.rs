//! Command handler types.
//!
//! A handler is the business logic behind a command. It receives a
//! [`CommandContext`] and the bound [`Arguments`] and produces an [`Output`].
//! Turning that output into a platform response is the job of the result
//! transformers in [`crate::transform`], so handlers can be tested by
//! inspecting what they return.
//!
//! # State
//!
//! Long-lived resources (database pools, API clients, configuration) are
//! registered once on the application builder and reach every handler through
//! [`CommandContext::app_state`]:
//!
//! ```rust,ignore
//! App::builder()
//!     .app_state(Database::connect().await?)
//!     .command(CommandDescriptor::slash("stats", "Show stats").handler_fn(
//!         |ctx, _args| async move {
//!             let db = ctx.app_state.get_required::<Database>()?;
//!             Ok::<_, anyhow::Error>(db.summary().await?)
//!         },
//!     ))
//!     .build()?;
//! ```

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::binder::Arguments;
use crate::model::Embed;
use crate::response::EventResponse;

/// Identity of a Rust type, used to key executors, providers and custom
/// result types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-safe container for shared application state.
///
/// Cloning yields an empty container, since boxed values cannot be cloned
/// generically. Share state across clones by storing it behind an `Arc`.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Like [`get`](Self::get), but missing state is an error.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "App state missing: type {} not registered",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

impl Clone for Extensions {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Context passed to command handlers.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Segments of the resolved command name (e.g. `["basic", "add"]`).
    pub command_path: Vec<String>,

    /// Application state shared by every invocation.
    pub app_state: Arc<Extensions>,
}

impl CommandContext {
    pub fn new(command_path: Vec<String>, app_state: Arc<Extensions>) -> Self {
        Self {
            command_path,
            app_state,
        }
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self {
            command_path: Vec::new(),
            app_state: Arc::new(Extensions::new()),
        }
    }
}

/// A handler result whose type is only known to the application.
///
/// Custom results need a matching transform rule keyed by their type.
pub struct CustomOutput {
    key: TypeKey,
    value: Box<dyn Any + Send + Sync>,
}

impl CustomOutput {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            value: Box::new(value),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Takes the value out, handing `self` back on a type mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let key = self.key;
        self.value
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|value| Self { key, value })
    }
}

impl fmt::Debug for CustomOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomOutput").field(&self.key.name).finish()
    }
}

/// What a handler produces.
#[derive(Debug)]
pub enum Output {
    /// Plain text, replied to the invoking event.
    Text(String),
    Embed(Embed),
    /// An explicit response with action and flags.
    Response(EventResponse),
    /// The handler already responded, or nothing should be sent.
    Silent,
    Custom(CustomOutput),
}

impl Output {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Output::Custom(CustomOutput::new(value))
    }

    pub fn result_type(&self) -> ResultType {
        match self {
            Output::Text(_) => ResultType::Text,
            Output::Embed(_) => ResultType::Embed,
            Output::Response(_) => ResultType::Response,
            Output::Silent => ResultType::Silent,
            Output::Custom(c) => ResultType::Custom(c.key()),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Output::Text(_))
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Output::Silent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Output::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// The runtime category of a handler result, matched by transform rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Text,
    Embed,
    Response,
    Silent,
    Custom(TypeKey),
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultType::Text => write!(f, "text"),
            ResultType::Embed => write!(f, "embed"),
            ResultType::Response => write!(f, "response"),
            ResultType::Silent => write!(f, "silent"),
            ResultType::Custom(key) => write!(f, "{}", key),
        }
    }
}

/// Values a handler can return directly.
pub trait IntoOutput {
    fn into_output(self) -> Output;
}

impl IntoOutput for Output {
    fn into_output(self) -> Output {
        self
    }
}

impl IntoOutput for String {
    fn into_output(self) -> Output {
        Output::Text(self)
    }
}

impl IntoOutput for &'static str {
    fn into_output(self) -> Output {
        Output::Text(self.to_string())
    }
}

impl IntoOutput for Embed {
    fn into_output(self) -> Output {
        Output::Embed(self)
    }
}

impl IntoOutput for EventResponse {
    fn into_output(self) -> Output {
        Output::Response(self)
    }
}

impl IntoOutput for () {
    fn into_output(self) -> Output {
        Output::Silent
    }
}

/// The result type for command handlers.
pub type HandlerResult = Result<Output, anyhow::Error>;

/// Types that can be converted into a [`HandlerResult`].
///
/// `Result<T, E>` converts for any `T: IntoOutput`, so handlers can return
/// `anyhow::Result<String>` as well as the explicit [`HandlerResult`].
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoOutput,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map(IntoOutput::into_output).map_err(Into::into)
    }
}

/// Trait for command handlers.
///
/// Handlers are shared across concurrent invocations and must be
/// `Send + Sync`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: CommandContext, args: Arguments) -> HandlerResult;
}

/// A handler wrapping an async closure.
///
/// ```rust
/// use switchboard_dispatch::{Arguments, CommandContext, FnHandler};
///
/// let handler = FnHandler::new(|_ctx: CommandContext, args: Arguments| async move {
///     let name: Option<String> = args.get("name")?;
///     Ok::<_, anyhow::Error>(format!("Hello, {}!", name.unwrap_or_default()))
/// });
/// # let _ = handler;
/// ```
pub struct FnHandler<F, Fut, R> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, R)>,
}

impl<F, Fut, R> FnHandler<F, Fut, R>
where
    F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, R> Handler for FnHandler<F, Fut, R>
where
    F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    async fn handle(&self, ctx: CommandContext, args: Arguments) -> HandlerResult {
        (self.f)(ctx, args).await.into_handler_result()
    }
}
