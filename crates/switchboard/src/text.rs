//! Text (prefix) commands.
//!
//! A message is a text command when its content starts with the configured
//! prefix. The rest is split shell-style; the longest run of one to three
//! leading words naming a registered text command selects it, and the
//! remaining words are parsed against a `clap::Command` built from the
//! command's options:
//!
//! ```text
//! !basic add 2 3        → "basic add" with x = 2, y = 3
//! !greet "Ada Lovelace" → "greet" with name = "Ada Lovelace"
//! !kick <@42>           → "kick" with user = 42
//! ```
//!
//! Options become positional arguments in declaration order. A trailing
//! string option takes the rest of the line.

use clap::builder::{BoolishValueParser, PossibleValuesParser};
use clap::{value_parser, Arg, ArgAction, ArgMatches, ColorChoice, Command};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use switchboard_dispatch::{
    flatten_options, CommandRegistry, CompiledOption, HandlerRecord, InteractionOption,
    InvocationKind, OptionKind, OptionMap, Snowflake, MAX_DEPTH,
};

/// The result of reading one message.
#[derive(Debug)]
pub enum TextParse {
    /// Not a text command; the message is left alone.
    Ignored,
    /// A command and its parsed options.
    Invoke {
        record: Arc<HandlerRecord>,
        options: OptionMap,
    },
    /// A known command whose arguments did not parse.
    Invalid {
        record: Arc<HandlerRecord>,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct TextCommandParser {
    prefix: String,
}

impl TextCommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn parse(&self, registry: &CommandRegistry, content: &str) -> TextParse {
        let Some(rest) = content.strip_prefix(&self.prefix) else {
            return TextParse::Ignored;
        };

        let words = match shell_words::split(rest) {
            Ok(words) => words,
            Err(e) => {
                let words: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                return match longest_match(registry, &words) {
                    Some((record, _)) => TextParse::Invalid {
                        record,
                        message: format!("error: {}", e),
                    },
                    None => TextParse::Ignored,
                };
            }
        };

        let Some((record, consumed)) = longest_match(registry, &words) else {
            debug!(content = %content, "No text command matches");
            return TextParse::Ignored;
        };

        match parse_arguments(&record, &words[consumed..]) {
            Ok(options) => TextParse::Invoke { record, options },
            Err(message) => TextParse::Invalid { record, message },
        }
    }
}

fn longest_match(registry: &CommandRegistry, words: &[String]) -> Option<(Arc<HandlerRecord>, usize)> {
    (1..=words.len().min(MAX_DEPTH)).rev().find_map(|n| {
        registry
            .lookup(&words[..n].join(" "), InvocationKind::Text)
            .map(|record| (Arc::clone(record), n))
    })
}

/// Builds the argument parser for a text command.
pub fn command_for(record: &HandlerRecord) -> Command {
    let options: Vec<&CompiledOption> = record.options().collect();
    let mut command = Command::new(record.name())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .allow_negative_numbers(true)
        .color(ColorChoice::Never);
    if !record.description.is_empty() {
        command = command.about(record.description.clone());
    }

    let mut optional_seen = false;
    for (index, opt) in options.iter().enumerate() {
        let trailing = index + 1 == options.len() && opt.kind == OptionKind::String;
        // clap rejects a required positional after an optional one; those
        // are checked after parsing instead.
        let required = opt.required && !optional_seen;
        optional_seen |= !opt.required;
        command = command.arg(argument(opt, index + 1, required, trailing));
    }
    command
}

fn argument(opt: &CompiledOption, index: usize, required: bool, trailing: bool) -> Arg {
    let arg = Arg::new(opt.name.clone())
        .index(index)
        .required(required)
        .help(opt.description.clone());

    let arg = match opt.kind {
        OptionKind::Integer => {
            let min = opt.min_value.map_or(i64::MIN, |v| v.ceil() as i64);
            let max = opt.max_value.map_or(i64::MAX, |v| v.floor() as i64);
            arg.value_parser(value_parser!(i64).range(min..=max))
        }
        OptionKind::Number => arg.value_parser(value_parser!(f64)),
        OptionKind::Boolean => arg.value_parser(BoolishValueParser::new()),
        OptionKind::User | OptionKind::Channel | OptionKind::Role | OptionKind::Mentionable => {
            arg.value_parser(parse_reference)
        }
        OptionKind::String if !opt.choices.is_empty() => {
            let values: Vec<String> = opt
                .choices
                .iter()
                .filter_map(|c| c.value.as_str().map(str::to_string))
                .collect();
            arg.value_parser(PossibleValuesParser::new(values))
        }
        _ => arg.value_parser(value_parser!(String)),
    };

    if trailing {
        arg.num_args(1..).action(ArgAction::Append)
    } else {
        arg
    }
}

fn parse_reference(input: &str) -> Result<Snowflake, String> {
    Snowflake::parse_mention(input).ok_or_else(|| format!("'{}' is not a mention or id", input))
}

/// Parses the words after the command name into an option map.
pub fn parse_arguments(record: &HandlerRecord, words: &[String]) -> Result<OptionMap, String> {
    let matches = command_for(record)
        .try_get_matches_from(words)
        .map_err(|e| e.to_string().trim_end().to_string())?;

    let mut provided = Vec::new();
    for opt in record.options() {
        match option_value(opt, &matches) {
            Some(value) => provided.push(InteractionOption::value(opt.name.clone(), opt.kind, value)),
            None if opt.required => {
                return Err(format!(
                    "error: the required argument '<{}>' was not provided",
                    opt.name
                ))
            }
            None => {}
        }
    }
    Ok(flatten_options(&provided))
}

fn option_value(opt: &CompiledOption, matches: &ArgMatches) -> Option<Value> {
    let name = opt.name.as_str();
    match opt.kind {
        OptionKind::Integer => matches.get_one::<i64>(name).map(|v| Value::from(*v)),
        OptionKind::Number => matches.get_one::<f64>(name).map(|v| Value::from(*v)),
        OptionKind::Boolean => matches.get_one::<bool>(name).map(|v| Value::from(*v)),
        OptionKind::User | OptionKind::Channel | OptionKind::Role | OptionKind::Mentionable => {
            matches.get_one::<Snowflake>(name).map(|id| Value::from(id.to_string()))
        }
        _ => matches
            .get_many::<String>(name)
            .map(|parts| Value::from(parts.cloned().collect::<Vec<_>>().join(" "))),
    }
}
