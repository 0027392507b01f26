//! # Switchboard - command framework for chat-platform bots
//!
//! Switchboard turns declared handlers into a validated slash-command tree,
//! uploads it to the platform, and routes every incoming interaction to the
//! right handler:
//!
//! - Slash commands with up to three name parts (`/basic add`, `/parent group child`)
//! - Typed options, injected events and users, defaults and requirements
//! - Autocomplete providers, capped at 25 suggestions
//! - Button, select-menu and modal handlers matched by custom-id pattern
//! - Prefix text commands (`!ping`) parsed with clap
//!
//! The dispatch core lives in [`switchboard_dispatch`] and is re-exported here.
//! This crate adds the [`App`] and [`AppBuilder`], [`Config`], the
//! [`component`] router and [`text`] commands.
//!
//! ## Quick Start
//!
//! ```rust
//! use switchboard::{App, Arguments, CommandContext, CommandDescriptor, Param};
//!
//! let app = App::builder()
//!     .command(
//!         CommandDescriptor::slash("basic add", "Adds two numbers")
//!             .param(Param::option::<i64>("x", "First number"))
//!             .param(Param::option::<i64>("y", "Second number"))
//!             .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
//!                 let sum = args.get::<i64>("x")? + args.get::<i64>("y")?;
//!                 Ok::<_, anyhow::Error>(sum.to_string())
//!             }),
//!     )
//!     .build()
//!     .expect("valid commands");
//!
//! assert_eq!(app.payload()[0].name, "basic");
//! ```
//!
//! Events are then handed to [`App::handle`], or to [`App::spawn`] to run
//! each one on its own tokio task.

pub mod app;
pub mod builder;
pub mod component;
pub mod config;
pub mod setup;
pub mod text;

pub use app::{App, EventOutcome, RegistrationOutcome};
pub use builder::AppBuilder;
pub use component::{ComponentDescriptor, ComponentRouter};
pub use config::Config;
pub use setup::SetupError;
pub use text::{TextCommandParser, TextParse};

pub use switchboard_dispatch::*;
