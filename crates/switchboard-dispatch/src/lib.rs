//! Command schema compilation, routing and dispatch for chat-platform bots.
//!
//! `switchboard-dispatch` is the platform-agnostic core of a slash-command
//! framework. Applications declare commands as [`CommandDescriptor`]s; the
//! core compiles them into handler records, arranges them into the
//! platform's three-level command tree, and at runtime routes each event to
//! its handler:
//!
//! ```text
//! startup:  descriptors → schema compiler → registry + command tree → payload
//! runtime:  event → router → registry → requirements → binder → handler → transform
//! ```
//!
//! The core performs no I/O. Responses, entity lookups and registration
//! uploads go through the [`ResponseSink`], [`EntityResolver`] and
//! [`RegistrationSink`] traits.
//!
//! # Usage
//!
//! ```rust
//! use switchboard_dispatch::{
//!     schema, Arguments, CommandContext, CommandDescriptor, CommandRegistry, Dispatcher,
//!     Param, RequirementPool, TransformRegistry,
//! };
//!
//! let add = CommandDescriptor::slash("basic add", "Adds two numbers")
//!     .param(Param::option::<i64>("x", "First"))
//!     .param(Param::option::<i64>("y", "Second"))
//!     .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
//!         Ok::<_, anyhow::Error>((args.get::<i64>("x")? + args.get::<i64>("y")?).to_string())
//!     });
//!
//! let compiled = schema::compile(&add).expect("valid declaration");
//! let mut registry = CommandRegistry::new();
//! registry.register([compiled.record]).expect("unique names");
//!
//! let dispatcher = Dispatcher::new(
//!     registry,
//!     RequirementPool::with_builtins(),
//!     TransformRegistry::with_builtins(),
//! );
//! # let _ = dispatcher;
//! ```
//!
//! The `switchboard` crate wraps this into an application builder with
//! configuration, component and text-command routing.

pub mod autocomplete;
pub mod binder;
pub mod descriptor;
pub mod dispatch;
pub mod event;
pub mod handler;
pub mod model;
pub mod path;
pub mod platform;
pub mod registration;
pub mod registry;
pub mod requirement;
pub mod response;
pub mod router;
pub mod schema;
pub mod testing;
pub mod transform;
pub mod tree;

pub use autocomplete::{AutocompleteBinding, AutocompleteProvider, AutocompleteRouter, MAX_SUGGESTIONS};
pub use binder::{bind, ArgumentError, Arguments, BindError, BoundValue, FromBound};
pub use descriptor::{
    CommandDescriptor, DefaultValue, InvocationKind, Marker, OptionAttrs, Param, ParamShape,
    ParamType, ParamValue,
};
pub use dispatch::{DispatchOutcome, Dispatcher, Messages};
pub use event::{
    AutocompleteEvent, ComponentEvent, ComponentKind, Event, EventType, InteractionContext,
    MessageEvent, PlatformHandle, SlashCommandEvent,
};
pub use handler::{
    CommandContext, CustomOutput, Extensions, FnHandler, Handler, HandlerResult,
    IntoHandlerResult, IntoOutput, Output, ResultType, TypeKey,
};
pub use model::{
    Channel, ChannelKind, Embed, EmbedField, InteractionOption, MessagePayload, OptionChoice,
    OptionKind, Role, Snowflake, User,
};
pub use path::{normalize, path_to_string, string_to_path};
pub use platform::{EntityResolver, PlatformError, RegistrationSink, ResponseKind, ResponseSink};
pub use registration::{build_payload, ApplicationCommand, ApplicationCommandOption};
pub use registry::{CommandRegistry, HandlerRecord, RegistryError};
pub use requirement::{
    DirectMessageOnly, DirectMessageRequirement, GuildOnly, GuildRequirement, Requirement,
    RequirementDescriptor, RequirementExecutor, RequirementFailure, RequirementPool,
};
pub use response::{EventResponse, ResponseAction, ResponseContent};
pub use router::{flatten_options, focused_option, resolve_command_name, OptionMap};
pub use schema::{
    compile, compile_params, Binding, CompiledCommand, CompiledOption, Injection, ParamContext,
    ParameterSpec, SchemaError,
};
pub use transform::{TransformError, TransformFn, TransformRegistry, TransformRule};
pub use tree::{build_tree, CommandTreeNode, TreeError, MAX_DEPTH};
