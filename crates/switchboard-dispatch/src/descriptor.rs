//! Command declarations.
//!
//! A [`CommandDescriptor`] is what an application hands to the framework: a
//! name, a description, the parameters its handler takes and the markers
//! attached to each one. Descriptors are validated and compiled into handler
//! records by [`crate::schema`].
//!
//! ```rust
//! use switchboard_dispatch::{Arguments, CommandContext, CommandDescriptor, Param};
//!
//! let add = CommandDescriptor::slash("basic add", "Adds two numbers")
//!     .param(Param::option::<i64>("x", "First number"))
//!     .param(Param::option::<i64>("y", "Second number"))
//!     .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
//!         let x: i64 = args.get("x")?;
//!         let y: i64 = args.get("y")?;
//!         Ok::<_, anyhow::Error>((x + y).to_string())
//!     });
//! # let _ = add;
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::autocomplete::AutocompleteProvider;
use crate::binder::Arguments;
use crate::event::{ComponentEvent, Event, MessageEvent, SlashCommandEvent};
use crate::handler::{CommandContext, FnHandler, Handler, IntoHandlerResult, TypeKey};
use crate::model::{Channel, OptionChoice, OptionKind, Role, Snowflake, User};
use crate::requirement::{Requirement, RequirementDescriptor};

/// How a command can be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InvocationKind {
    Slash,
    Text,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationKind::Slash => write!(f, "slash"),
            InvocationKind::Text => write!(f, "text"),
        }
    }
}

/// The declared Rust type of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    I32,
    I64,
    F32,
    F64,
    Bool,
    String,
    User,
    Channel,
    Role,
    Snowflake,
    Event,
    SlashCommandEvent,
    ComponentEvent,
    MessageEvent,
    /// Anything else, carried by type name for error reporting.
    Other(&'static str),
}

impl ParamType {
    /// Primitive types cannot represent an absent value.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            ParamType::I32 | ParamType::I64 | ParamType::F32 | ParamType::F64 | ParamType::Bool
        )
    }

    /// The platform option type for parameters usable as command options.
    pub fn option_kind(self) -> Option<OptionKind> {
        match self {
            ParamType::I32 | ParamType::I64 => Some(OptionKind::Integer),
            ParamType::F32 | ParamType::F64 => Some(OptionKind::Number),
            ParamType::Bool => Some(OptionKind::Boolean),
            ParamType::String => Some(OptionKind::String),
            ParamType::User => Some(OptionKind::User),
            ParamType::Channel => Some(OptionKind::Channel),
            ParamType::Role => Some(OptionKind::Role),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamType::I32 => "i32",
            ParamType::I64 => "i64",
            ParamType::F32 => "f32",
            ParamType::F64 => "f64",
            ParamType::Bool => "bool",
            ParamType::String => "String",
            ParamType::User => "User",
            ParamType::Channel => "Channel",
            ParamType::Role => "Role",
            ParamType::Snowflake => "Snowflake",
            ParamType::Event => "Event",
            ParamType::SlashCommandEvent => "SlashCommandEvent",
            ParamType::ComponentEvent => "ComponentEvent",
            ParamType::MessageEvent => "MessageEvent",
            ParamType::Other(name) => name,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter's type plus whether it is wrapped in `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamShape {
    pub ty: ParamType,
    pub optional: bool,
}

impl ParamShape {
    pub const fn required(ty: ParamType) -> Self {
        Self {
            ty,
            optional: false,
        }
    }

    pub const fn optional(ty: ParamType) -> Self {
        Self { ty, optional: true }
    }

    pub fn of<T: ParamValue>() -> Self {
        T::shape()
    }
}

impl fmt::Display for ParamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "Option<{}>", self.ty)
        } else {
            write!(f, "{}", self.ty)
        }
    }
}

/// Rust types that can appear as handler parameters.
pub trait ParamValue {
    fn shape() -> ParamShape;
}

macro_rules! impl_param_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                fn shape() -> ParamShape {
                    ParamShape::required(ParamType::$variant)
                }
            }
        )*
    };
}

impl_param_value!(
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
    User => User,
    Channel => Channel,
    Role => Role,
    Snowflake => Snowflake,
    Event => Event,
    Arc<SlashCommandEvent> => SlashCommandEvent,
    Arc<ComponentEvent> => ComponentEvent,
    Arc<MessageEvent> => MessageEvent,
);

impl<T: ParamValue> ParamValue for Option<T> {
    fn shape() -> ParamShape {
        ParamShape {
            optional: true,
            ..T::shape()
        }
    }
}

/// Fallback values for an absent option.
///
/// The field matching the parameter's type is used; the others are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub number: f64,
    pub string: String,
    pub boolean: bool,
}

impl Default for DefaultValue {
    fn default() -> Self {
        Self {
            number: 0.0,
            string: String::new(),
            boolean: false,
        }
    }
}

impl DefaultValue {
    pub fn number(number: f64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    pub fn string(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            ..Self::default()
        }
    }

    pub fn boolean(boolean: bool) -> Self {
        Self {
            boolean,
            ..Self::default()
        }
    }
}

/// Attributes of a command-option marker.
///
/// Bounds hold sentinel values until set; only non-sentinel bounds are
/// published to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionAttrs {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub choices: Vec<OptionChoice>,
    pub min_value: f64,
    pub max_value: f64,
    pub min_length: u32,
    pub max_length: u32,
    pub autocomplete: Option<TypeKey>,
}

impl OptionAttrs {
    pub const MIN_VALUE_UNSET: f64 = f64::MIN;
    pub const MAX_VALUE_UNSET: f64 = f64::MAX;
    pub const MIN_LENGTH_UNSET: u32 = 0;
    pub const MAX_LENGTH_UNSET: u32 = u32::MAX;

    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            choices: Vec::new(),
            min_value: Self::MIN_VALUE_UNSET,
            max_value: Self::MAX_VALUE_UNSET,
            min_length: Self::MIN_LENGTH_UNSET,
            max_length: Self::MAX_LENGTH_UNSET,
            autocomplete: None,
        }
    }
}

/// A marker attached to a handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// Inject the triggering event.
    Event,
    /// Inject the invoking user.
    User,
    /// Inject the invoking user's id.
    UserId,
    /// Bind a command option.
    Option(OptionAttrs),
}

impl Marker {
    pub fn name(&self) -> &'static str {
        match self {
            Marker::Event => "event",
            Marker::User => "user",
            Marker::UserId => "user-id",
            Marker::Option(_) => "option",
        }
    }
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub shape: ParamShape,
    pub markers: Vec<Marker>,
    pub default: Option<DefaultValue>,
}

impl Param {
    /// A parameter with no markers. It binds to absent unless markers are
    /// added with [`marker`](Self::marker).
    pub fn with_shape(name: impl Into<String>, shape: ParamShape) -> Self {
        Self {
            name: name.into(),
            shape,
            markers: Vec::new(),
            default: None,
        }
    }

    /// A command option whose shape follows the Rust type `T`.
    pub fn option<T: ParamValue>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let attrs = OptionAttrs::new(name.clone(), description);
        Self::with_shape(name, T::shape()).marker(Marker::Option(attrs))
    }

    /// Injects the triggering event as an [`Event`].
    pub fn event(name: impl Into<String>) -> Self {
        Self::event_as::<Event>(name)
    }

    /// Injects the triggering event as a specific event type, such as
    /// `Arc<SlashCommandEvent>`.
    pub fn event_as<T: ParamValue>(name: impl Into<String>) -> Self {
        Self::with_shape(name, T::shape()).marker(Marker::Event)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::with_shape(name, ParamShape::required(ParamType::User)).marker(Marker::User)
    }

    pub fn user_id(name: impl Into<String>) -> Self {
        Self::with_shape(name, ParamShape::required(ParamType::Snowflake)).marker(Marker::UserId)
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    // The option setters below only touch the first option marker; they
    // have no effect on injection parameters.

    pub fn required(self, required: bool) -> Self {
        self.with_option(|o| o.required = required)
    }

    pub fn choice(self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let choice = OptionChoice::new(name, value);
        self.with_option(|o| o.choices.push(choice))
    }

    pub fn min_value(self, min: f64) -> Self {
        self.with_option(|o| o.min_value = min)
    }

    pub fn max_value(self, max: f64) -> Self {
        self.with_option(|o| o.max_value = max)
    }

    pub fn min_length(self, min: u32) -> Self {
        self.with_option(|o| o.min_length = min)
    }

    pub fn max_length(self, max: u32) -> Self {
        self.with_option(|o| o.max_length = max)
    }

    /// Routes autocomplete requests for this option to provider `P`.
    pub fn autocomplete<P: AutocompleteProvider>(self) -> Self {
        self.with_option(|o| o.autocomplete = Some(TypeKey::of::<P>()))
    }

    fn with_option(mut self, f: impl FnOnce(&mut OptionAttrs)) -> Self {
        if let Some(attrs) = self.markers.iter_mut().find_map(|m| match m {
            Marker::Option(attrs) => Some(attrs),
            _ => None,
        }) {
            f(attrs);
        }
        self
    }
}

/// A command declaration.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub kinds: BTreeSet<InvocationKind>,
    pub params: Vec<Param>,
    pub requirements: Vec<RequirementDescriptor>,
    pub handler: Option<Arc<dyn Handler>>,
}

impl CommandDescriptor {
    /// A descriptor with no invocation kinds set, which compiles as slash-only.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kinds: BTreeSet::new(),
            params: Vec::new(),
            requirements: Vec::new(),
            handler: None,
        }
    }

    pub fn slash(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description).kind(InvocationKind::Slash)
    }

    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description).kind(InvocationKind::Text)
    }

    pub fn kind(mut self, kind: InvocationKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = InvocationKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Guards the command with requirement `M`. Requirements run in the
    /// order they are added.
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

    /// Declared kinds, defaulting to slash when none were given.
    pub fn invocation_kinds(&self) -> BTreeSet<InvocationKind> {
        if self.kinds.is_empty() {
            BTreeSet::from([InvocationKind::Slash])
        } else {
            self.kinds.clone()
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .field("params", &self.params)
            .field("requirements", &self.requirements)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
