//! Option schema compilation.
//!
//! Turns a [`CommandDescriptor`] into a [`HandlerRecord`]: each parameter is
//! classified as an injection, a command option or unbound, its markers and
//! type are checked, and option attributes are normalised. All problems in a
//! descriptor are collected rather than stopping at the first one, so an
//! application sees every declaration error at startup.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::autocomplete::AutocompleteBinding;
use crate::descriptor::{
    CommandDescriptor, DefaultValue, InvocationKind, Marker, OptionAttrs, Param, ParamShape,
    ParamType,
};
use crate::handler::TypeKey;
use crate::model::{OptionChoice, OptionKind};
use crate::path::{path_to_string, string_to_path};
use crate::registration::ApplicationCommandOption;
use crate::registry::HandlerRecord;
use crate::tree::MAX_DEPTH;

/// A declaration error found while compiling a descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("command '{command}' has no handler")]
    MissingHandler { command: String },

    #[error("command '{command}' has too many parts! Maximum {max}.", max = MAX_DEPTH)]
    TooDeep { command: String, depth: usize },

    #[error("slash command '{command}' needs a description")]
    EmptyDescription { command: String },

    #[error("parameter '{param}' of '{command}' has too many annotations ({markers})")]
    TooManyMarkers {
        command: String,
        param: String,
        markers: String,
    },

    #[error("parameter '{param}' of '{command}' has an invalid option type {ty}")]
    UnsupportedType {
        command: String,
        param: String,
        ty: String,
    },

    #[error(
        "parameter '{param}' of '{command}' cannot have a primitive type with a default value ({ty})"
    )]
    DefaultOnPrimitive {
        command: String,
        param: String,
        ty: String,
    },

    #[error("parameter '{param}' of '{command}' is optional but {ty} cannot be absent; use Option<{ty}> or a default")]
    AbsentNotRepresentable {
        command: String,
        param: String,
        ty: String,
    },

    #[error("{injection} parameter '{param}' of '{command}' must be {expected}, found {found}")]
    InjectionType {
        command: String,
        param: String,
        injection: &'static str,
        expected: String,
        found: String,
    },

    #[error("default {value} of option '{param}' on '{command}' is outside its allowed range")]
    DefaultOutOfRange {
        command: String,
        param: String,
        value: f64,
    },

    #[error("option '{param}' of '{command}' cannot offer both autocomplete and fixed choices")]
    AutocompleteWithChoices { command: String, param: String },

    #[error("option '{option}' is declared twice on '{command}'")]
    DuplicateOption { command: String, option: String },

    #[error("parameter '{param}' of '{command}' cannot be a command option here")]
    OptionNotAllowed { command: String, param: String },
}

/// How a parameter receives its value at invocation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Injection(Injection),
    CommandOption(CompiledOption),
    /// No recognised marker; always binds to absent.
    Unbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    Event,
    User,
    UserId,
}

/// A normalised command option.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOption {
    /// Lowercased option name, the key used when binding.
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub choices: Vec<OptionChoice>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub autocomplete: Option<TypeKey>,
}

impl CompiledOption {
    pub fn to_registration(&self) -> ApplicationCommandOption {
        ApplicationCommandOption {
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            required: Some(self.required),
            choices: self.choices.clone(),
            options: Vec::new(),
            min_value: self.min_value,
            max_value: self.max_value,
            min_length: self.min_length,
            max_length: self.max_length,
            autocomplete: self.autocomplete.map(|_| true),
        }
    }
}

/// A compiled parameter, one per declared parameter, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub shape: ParamShape,
    pub binding: Binding,
}

impl ParameterSpec {
    pub fn option(&self) -> Option<&CompiledOption> {
        match &self.binding {
            Binding::CommandOption(opt) => Some(opt),
            _ => None,
        }
    }
}

/// The result of compiling one descriptor.
#[derive(Debug, Clone)]
pub struct CompiledCommand {
    pub record: Arc<HandlerRecord>,
    pub autocomplete: Vec<AutocompleteBinding>,
}

/// Where compiled parameters will be used; decides which event types may
/// be injected and whether options are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamContext<'a> {
    Command(&'a [InvocationKind]),
    Component,
}

impl ParamContext<'_> {
    fn accepts_event_type(&self, ty: ParamType) -> bool {
        match self {
            ParamContext::Command(kinds) => kinds.iter().all(|kind| match kind {
                InvocationKind::Slash => {
                    matches!(ty, ParamType::Event | ParamType::SlashCommandEvent)
                }
                InvocationKind::Text => matches!(ty, ParamType::Event | ParamType::MessageEvent),
            }),
            ParamContext::Component => {
                matches!(ty, ParamType::Event | ParamType::ComponentEvent)
            }
        }
    }

    fn event_type_names(&self) -> String {
        let mut names = vec![ParamType::Event.name()];
        match self {
            ParamContext::Command(kinds) => {
                if kinds == &[InvocationKind::Slash] {
                    names.push(ParamType::SlashCommandEvent.name());
                } else if kinds == &[InvocationKind::Text] {
                    names.push(ParamType::MessageEvent.name());
                }
            }
            ParamContext::Component => names.push(ParamType::ComponentEvent.name()),
        }
        names.join(" or ")
    }
}

/// Compiles a command descriptor.
pub fn compile(descriptor: &CommandDescriptor) -> Result<CompiledCommand, Vec<SchemaError>> {
    let full_name = string_to_path(&descriptor.name);
    let command = path_to_string(&full_name);
    let kinds = descriptor.invocation_kinds();
    let kind_list: Vec<InvocationKind> = kinds.iter().copied().collect();
    let mut errors = Vec::new();

    if full_name.len() > MAX_DEPTH {
        errors.push(SchemaError::TooDeep {
            command: command.clone(),
            depth: full_name.len(),
        });
    }

    if kinds.contains(&InvocationKind::Slash) && descriptor.description.trim().is_empty() {
        errors.push(SchemaError::EmptyDescription {
            command: command.clone(),
        });
    }

    let params = match compile_params(&command, &descriptor.params, ParamContext::Command(&kind_list))
    {
        Ok(params) => params,
        Err(mut param_errors) => {
            errors.append(&mut param_errors);
            Vec::new()
        }
    };

    let Some(handler) = descriptor.handler.clone() else {
        errors.push(SchemaError::MissingHandler { command });
        return Err(errors);
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let autocomplete = params
        .iter()
        .filter_map(ParameterSpec::option)
        .filter_map(|opt| {
            opt.autocomplete.map(|provider| AutocompleteBinding {
                command: command.clone(),
                option: opt.name.clone(),
                provider,
            })
        })
        .collect();

    let record = HandlerRecord {
        full_name,
        description: descriptor.description.clone(),
        kinds,
        handler,
        params,
        requirements: descriptor.requirements.clone(),
    };

    Ok(CompiledCommand {
        record: Arc::new(record),
        autocomplete,
    })
}

/// Compiles the parameter list of a command or component handler.
pub fn compile_params(
    command: &str,
    params: &[Param],
    context: ParamContext<'_>,
) -> Result<Vec<ParameterSpec>, Vec<SchemaError>> {
    let mut errors = Vec::new();
    let mut specs = Vec::with_capacity(params.len());
    let mut option_names = HashSet::new();

    for param in params {
        match compile_param(command, param, context) {
            Ok(spec) => {
                if let Binding::CommandOption(opt) = &spec.binding {
                    if !option_names.insert(opt.name.clone()) {
                        errors.push(SchemaError::DuplicateOption {
                            command: command.to_string(),
                            option: opt.name.clone(),
                        });
                    }
                }
                specs.push(spec);
            }
            Err(mut param_errors) => errors.append(&mut param_errors),
        }
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(errors)
    }
}

fn compile_param(
    command: &str,
    param: &Param,
    context: ParamContext<'_>,
) -> Result<ParameterSpec, Vec<SchemaError>> {
    if param.markers.len() > 1 {
        let markers = param
            .markers
            .iter()
            .map(Marker::name)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(vec![SchemaError::TooManyMarkers {
            command: command.to_string(),
            param: param.name.clone(),
            markers,
        }]);
    }

    let shape = param.shape;
    let injection_error = |injection: &'static str, expected: String| SchemaError::InjectionType {
        command: command.to_string(),
        param: param.name.clone(),
        injection,
        expected,
        found: shape.to_string(),
    };

    let binding = match param.markers.first() {
        None => Binding::Unbound,
        Some(Marker::Event) => {
            if !context.accepts_event_type(shape.ty) {
                return Err(vec![injection_error("event", context.event_type_names())]);
            }
            Binding::Injection(Injection::Event)
        }
        Some(Marker::User) => {
            if shape.ty != ParamType::User {
                return Err(vec![injection_error("user", ParamType::User.to_string())]);
            }
            Binding::Injection(Injection::User)
        }
        Some(Marker::UserId) => {
            if !matches!(shape.ty, ParamType::Snowflake | ParamType::I64) {
                return Err(vec![injection_error("user-id", "Snowflake or i64".to_string())]);
            }
            Binding::Injection(Injection::UserId)
        }
        Some(Marker::Option(attrs)) => {
            if context == ParamContext::Component {
                return Err(vec![SchemaError::OptionNotAllowed {
                    command: command.to_string(),
                    param: param.name.clone(),
                }]);
            }
            Binding::CommandOption(compile_option(command, param, attrs)?)
        }
    };

    Ok(ParameterSpec {
        name: param.name.clone(),
        shape,
        binding,
    })
}

fn compile_option(
    command: &str,
    param: &Param,
    attrs: &OptionAttrs,
) -> Result<CompiledOption, Vec<SchemaError>> {
    let shape = param.shape;
    let mut errors = Vec::new();

    let kind = shape.ty.option_kind();
    if kind.is_none() {
        errors.push(SchemaError::UnsupportedType {
            command: command.to_string(),
            param: param.name.clone(),
            ty: shape.to_string(),
        });
    }

    if param.default.is_some() && !shape.optional && shape.ty.is_primitive() {
        errors.push(SchemaError::DefaultOnPrimitive {
            command: command.to_string(),
            param: param.name.clone(),
            ty: shape.ty.to_string(),
        });
    }

    if !attrs.required && param.default.is_none() && !shape.optional {
        errors.push(SchemaError::AbsentNotRepresentable {
            command: command.to_string(),
            param: param.name.clone(),
            ty: shape.ty.to_string(),
        });
    }

    if attrs.autocomplete.is_some() && !attrs.choices.is_empty() {
        errors.push(SchemaError::AutocompleteWithChoices {
            command: command.to_string(),
            param: param.name.clone(),
        });
    }

    let (min_value, max_value) = value_bounds(shape.ty, attrs);
    let numeric = matches!(
        shape.ty,
        ParamType::I32 | ParamType::I64 | ParamType::F32 | ParamType::F64
    );
    if let Some(default) = param.default.as_ref().filter(|_| numeric) {
        let below = min_value.is_some_and(|min| default.number < min);
        let above = max_value.is_some_and(|max| default.number > max);
        if below || above {
            errors.push(SchemaError::DefaultOutOfRange {
                command: command.to_string(),
                param: param.name.clone(),
                value: default.number,
            });
        }
    }

    let Some(kind) = kind.filter(|_| errors.is_empty()) else {
        return Err(errors);
    };

    Ok(CompiledOption {
        name: attrs.name.to_lowercase(),
        description: attrs.description.clone(),
        kind,
        required: attrs.required,
        default: param.default.clone(),
        choices: attrs.choices.clone(),
        min_value,
        max_value,
        min_length: Some(attrs.min_length).filter(|v| *v != OptionAttrs::MIN_LENGTH_UNSET),
        max_length: Some(attrs.max_length).filter(|v| *v != OptionAttrs::MAX_LENGTH_UNSET),
        autocomplete: attrs.autocomplete,
    })
}

/// Declared bounds, with `i32` options limited to the range they can hold.
fn value_bounds(ty: ParamType, attrs: &OptionAttrs) -> (Option<f64>, Option<f64>) {
    let min = Some(attrs.min_value).filter(|v| *v != OptionAttrs::MIN_VALUE_UNSET);
    let max = Some(attrs.max_value).filter(|v| *v != OptionAttrs::MAX_VALUE_UNSET);
    if ty != ParamType::I32 {
        return (min, max);
    }
    let floor = f64::from(i32::MIN);
    let ceiling = f64::from(i32::MAX);
    (
        Some(min.map_or(floor, |v| v.max(floor))),
        Some(max.map_or(ceiling, |v| v.min(ceiling))),
    )
}
