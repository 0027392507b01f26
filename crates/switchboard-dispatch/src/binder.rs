//! Parameter binding.
//!
//! Produces one [`BoundValue`] per compiled parameter, in declaration order:
//! injections come from the event, options from the flattened option map,
//! and absent options fall back to their declared default coerced to the
//! parameter's type. User, channel and role options carry ids and are
//! resolved through the event's [`EntityResolver`](crate::platform::EntityResolver).

use std::sync::Arc;
use thiserror::Error;

use crate::descriptor::{DefaultValue, ParamType};
use crate::event::{ComponentEvent, Event, MessageEvent, SlashCommandEvent};
use crate::model::{Channel, InteractionOption, OptionKind, Role, Snowflake, User};
use crate::platform::PlatformError;
use crate::router::OptionMap;
use crate::schema::{Binding, CompiledOption, Injection, ParameterSpec};

/// A value bound to one handler parameter.
#[derive(Debug, Clone)]
pub enum BoundValue {
    Absent,
    Integer(i64),
    Number(f64),
    Boolean(bool),
    String(String),
    User(User),
    Channel(Channel),
    Role(Role),
    UserId(Snowflake),
    Event(Event),
}

impl BoundValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            BoundValue::Absent => "absent",
            BoundValue::Integer(_) => "integer",
            BoundValue::Number(_) => "number",
            BoundValue::Boolean(_) => "boolean",
            BoundValue::String(_) => "string",
            BoundValue::User(_) => "user",
            BoundValue::Channel(_) => "channel",
            BoundValue::Role(_) => "role",
            BoundValue::UserId(_) => "user id",
            BoundValue::Event(_) => "event",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, BoundValue::Absent)
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("option '{option}' should be {expected} but was {found}")]
    Malformed {
        option: String,
        expected: OptionKind,
        found: serde_json::Value,
    },

    #[error("could not fetch {kind} for option '{option}'")]
    Fetch {
        option: String,
        kind: OptionKind,
        #[source]
        source: PlatformError,
    },
}

/// Errors reading a bound argument inside a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("no parameter named '{0}'")]
    Unknown(String),

    #[error("no parameter at position {0}")]
    OutOfRange(usize),

    #[error("parameter '{0}' is absent")]
    Missing(String),

    #[error("parameter '{name}' is {found}, expected {expected}")]
    Mismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Conversion from a bound value into a handler argument type.
pub trait FromBound: Sized {
    const EXPECTED: &'static str;

    fn from_bound(value: &BoundValue) -> Option<Self>;
}

macro_rules! impl_from_bound {
    ($ty:ty, $expected:literal, |$v:ident| $body:expr) => {
        impl FromBound for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_bound($v: &BoundValue) -> Option<Self> {
                $body
            }
        }
    };
}

impl_from_bound!(i64, "integer", |v| match v {
    BoundValue::Integer(n) => Some(*n),
    BoundValue::UserId(id) => i64::try_from(id.get()).ok(),
    _ => None,
});
impl_from_bound!(i32, "integer", |v| match v {
    BoundValue::Integer(n) => i32::try_from(*n).ok(),
    _ => None,
});
impl_from_bound!(f64, "number", |v| match v {
    BoundValue::Number(n) => Some(*n),
    BoundValue::Integer(n) => Some(*n as f64),
    _ => None,
});
impl_from_bound!(f32, "number", |v| match v {
    BoundValue::Number(n) => Some(*n as f32),
    BoundValue::Integer(n) => Some(*n as f32),
    _ => None,
});
impl_from_bound!(bool, "boolean", |v| match v {
    BoundValue::Boolean(b) => Some(*b),
    _ => None,
});
impl_from_bound!(String, "string", |v| match v {
    BoundValue::String(s) => Some(s.clone()),
    _ => None,
});
impl_from_bound!(User, "user", |v| match v {
    BoundValue::User(u) => Some(u.clone()),
    _ => None,
});
impl_from_bound!(Channel, "channel", |v| match v {
    BoundValue::Channel(c) => Some(c.clone()),
    _ => None,
});
impl_from_bound!(Role, "role", |v| match v {
    BoundValue::Role(r) => Some(r.clone()),
    _ => None,
});
impl_from_bound!(Snowflake, "user id", |v| match v {
    BoundValue::UserId(id) => Some(*id),
    BoundValue::User(u) => Some(u.id),
    _ => None,
});
impl_from_bound!(Event, "event", |v| match v {
    BoundValue::Event(e) => Some(e.clone()),
    _ => None,
});
impl_from_bound!(Arc<SlashCommandEvent>, "slash command event", |v| match v {
    BoundValue::Event(Event::SlashCommand(e)) => Some(Arc::clone(e)),
    _ => None,
});
impl_from_bound!(Arc<ComponentEvent>, "component event", |v| match v {
    BoundValue::Event(Event::Component(e)) => Some(Arc::clone(e)),
    _ => None,
});
impl_from_bound!(Arc<MessageEvent>, "message event", |v| match v {
    BoundValue::Event(Event::Message(e)) => Some(Arc::clone(e)),
    _ => None,
});

impl<T: FromBound> FromBound for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_bound(value: &BoundValue) -> Option<Self> {
        match value {
            BoundValue::Absent => Some(None),
            other => T::from_bound(other).map(Some),
        }
    }
}

/// Bound handler arguments, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(String, BoundValue)>,
}

impl Arguments {
    pub fn new(values: Vec<(String, BoundValue)>) -> Self {
        Self { values }
    }

    /// Reads the parameter declared as `name`.
    ///
    /// Absent values read as `None` through `Option<T>` and as
    /// [`ArgumentError::Missing`] otherwise.
    pub fn get<T: FromBound>(&self, name: &str) -> Result<T, ArgumentError> {
        let (_, value) = self
            .values
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| ArgumentError::Unknown(name.to_string()))?;
        convert(name, value)
    }

    /// Reads the parameter at declaration position `index`.
    pub fn at<T: FromBound>(&self, index: usize) -> Result<T, ArgumentError> {
        let (name, value) = self
            .values
            .get(index)
            .ok_or(ArgumentError::OutOfRange(index))?;
        convert(name, value)
    }

    pub fn value(&self, name: &str) -> Option<&BoundValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn convert<T: FromBound>(name: &str, value: &BoundValue) -> Result<T, ArgumentError> {
    T::from_bound(value).ok_or_else(|| {
        if value.is_absent() {
            ArgumentError::Missing(name.to_string())
        } else {
            ArgumentError::Mismatch {
                name: name.to_string(),
                expected: T::EXPECTED,
                found: value.kind_name(),
            }
        }
    })
}

/// Binds every parameter of a handler for `event`.
pub async fn bind(
    params: &[ParameterSpec],
    event: &Event,
    options: &OptionMap,
) -> Result<Arguments, BindError> {
    let mut values = Vec::with_capacity(params.len());
    for param in params {
        let value = match &param.binding {
            Binding::Injection(Injection::Event) => BoundValue::Event(event.clone()),
            Binding::Injection(Injection::User) => BoundValue::User(event.user().clone()),
            Binding::Injection(Injection::UserId) => BoundValue::UserId(event.user().id),
            Binding::CommandOption(opt) => {
                match options.get(&opt.name).filter(|o| o.value.is_some()) {
                    Some(provided) => extract(opt, provided, event).await?,
                    None => default_value(param.shape.ty, opt.default.as_ref()),
                }
            }
            Binding::Unbound => BoundValue::Absent,
        };
        values.push((param.name.clone(), value));
    }
    Ok(Arguments::new(values))
}

/// Coerces a declared default to the parameter's type.
pub fn default_value(ty: ParamType, default: Option<&DefaultValue>) -> BoundValue {
    let Some(default) = default else {
        return BoundValue::Absent;
    };
    match ty {
        ParamType::F32 | ParamType::F64 => BoundValue::Number(default.number),
        ParamType::I32 | ParamType::I64 => BoundValue::Integer(default.number as i64),
        ParamType::String => BoundValue::String(default.string.clone()),
        ParamType::Bool => BoundValue::Boolean(default.boolean),
        _ => BoundValue::Absent,
    }
}

async fn extract(
    opt: &CompiledOption,
    provided: &InteractionOption,
    event: &Event,
) -> Result<BoundValue, BindError> {
    let raw = provided.value.clone().unwrap_or(serde_json::Value::Null);
    let malformed = || BindError::Malformed {
        option: opt.name.clone(),
        expected: opt.kind,
        found: raw.clone(),
    };
    let fetch_failed = |source| BindError::Fetch {
        option: opt.name.clone(),
        kind: opt.kind,
        source,
    };
    let resolver = &event.platform().resolver;

    let value = match opt.kind {
        OptionKind::Boolean => BoundValue::Boolean(raw.as_bool().ok_or_else(malformed)?),
        OptionKind::Integer => BoundValue::Integer(
            raw.as_i64()
                .or_else(|| raw.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(malformed)?,
        ),
        OptionKind::Number => BoundValue::Number(raw.as_f64().ok_or_else(malformed)?),
        OptionKind::String => BoundValue::String(raw.as_str().ok_or_else(malformed)?.to_string()),
        OptionKind::User => {
            let id = Snowflake::from_json(&raw).ok_or_else(malformed)?;
            BoundValue::User(resolver.user(id).await.map_err(fetch_failed)?)
        }
        OptionKind::Channel => {
            let id = Snowflake::from_json(&raw).ok_or_else(malformed)?;
            BoundValue::Channel(resolver.channel(id).await.map_err(fetch_failed)?)
        }
        OptionKind::Role => {
            let id = Snowflake::from_json(&raw).ok_or_else(malformed)?;
            let guild = event.context().guild_id;
            BoundValue::Role(resolver.role(guild, id).await.map_err(fetch_failed)?)
        }
        _ => return Err(malformed()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CommandDescriptor, Marker, Param, ParamShape};
    use crate::router::flatten_options;
    use crate::testing::{self, RecordingSink, StaticResolver};

    fn params(desc: CommandDescriptor) -> Vec<ParameterSpec> {
        testing::compile_ok(desc).params.clone()
    }

    #[tokio::test]
    async fn test_binds_options_and_injections() {
        let specs = params(
            CommandDescriptor::slash("add", "Add")
                .param(Param::event("event"))
                .param(Param::option::<i64>("x", "x"))
                .param(Param::user_id("me"))
                .param(Param::option::<i64>("y", "y")),
        );
        let options = vec![
            InteractionOption::value("y", OptionKind::Integer, 14),
            InteractionOption::value("X", OptionKind::Integer, 5),
        ];
        let event = testing::slash_event("add", options.clone(), RecordingSink::new().into());
        let args = bind(&specs, &event, &flatten_options(&options)).await.unwrap();

        assert_eq!(args.len(), 4);
        assert!(matches!(args.value("event"), Some(BoundValue::Event(_))));
        assert_eq!(args.get::<i64>("x").unwrap(), 5);
        assert_eq!(args.at::<i64>(3).unwrap(), 14);
        assert_eq!(args.get::<Snowflake>("me").unwrap(), testing::user().id);
    }

    #[tokio::test]
    async fn test_user_id_binds_as_i64() {
        let specs = params(CommandDescriptor::slash("me", "Me").param(
            Param::with_shape("id", ParamShape::required(ParamType::I64)).marker(Marker::UserId),
        ));
        let event = testing::slash_event("me", vec![], RecordingSink::new().into());
        let args = bind(&specs, &event, &OptionMap::new()).await.unwrap();
        assert_eq!(
            args.get::<i64>("id").unwrap(),
            testing::user().id.get() as i64
        );
    }

    #[tokio::test]
    async fn test_unmarked_param_binds_absent() {
        let specs = params(
            CommandDescriptor::slash("x", "X")
                .param(Param::with_shape("n", ParamShape::optional(ParamType::I64)))
                .param(Param::with_shape("s", ParamShape::required(ParamType::String))),
        );
        let event = testing::slash_event("x", vec![], RecordingSink::new().into());
        let args = bind(&specs, &event, &OptionMap::new()).await.unwrap();
        assert!(args.value("n").unwrap().is_absent());
        assert!(args.value("s").unwrap().is_absent());
        assert_eq!(args.get::<Option<i64>>("n").unwrap(), None);
    }

    #[tokio::test]
    async fn test_absent_options_use_defaults() {
        let specs = params(
            CommandDescriptor::slash("greet", "Greet")
                .param(
                    Param::option::<String>("name", "n")
                        .required(false)
                        .default(DefaultValue::string("Bob")),
                )
                .param(
                    Param::option::<Option<f64>>("scale", "s")
                        .required(false)
                        .default(DefaultValue::number(1.5)),
                )
                .param(Param::option::<Option<String>>("nick", "n").required(false)),
        );
        let event = testing::slash_event("greet", vec![], RecordingSink::new().into());
        let args = bind(&specs, &event, &OptionMap::new()).await.unwrap();

        assert_eq!(args.get::<String>("name").unwrap(), "Bob");
        assert_eq!(args.get::<Option<f64>>("scale").unwrap(), Some(1.5));
        assert_eq!(args.get::<Option<String>>("nick").unwrap(), None);
        assert_eq!(
            args.get::<String>("nick").unwrap_err(),
            ArgumentError::Missing("nick".into())
        );
    }

    #[test]
    fn test_default_coercion_by_type() {
        let dv = DefaultValue {
            number: 7.9,
            string: "s".into(),
            boolean: true,
        };
        assert!(matches!(default_value(ParamType::I32, Some(&dv)), BoundValue::Integer(7)));
        assert!(matches!(default_value(ParamType::F64, Some(&dv)), BoundValue::Number(n) if n == 7.9));
        assert!(matches!(default_value(ParamType::Bool, Some(&dv)), BoundValue::Boolean(true)));
        assert!(default_value(ParamType::User, Some(&dv)).is_absent());
        assert!(default_value(ParamType::String, None).is_absent());
    }

    #[tokio::test]
    async fn test_user_option_resolved() {
        let specs = params(
            CommandDescriptor::slash("hug", "Hug").param(Param::option::<User>("target", "who")),
        );
        let alice = User::new(77u64, "alice");
        let resolver = StaticResolver::new().with_user(alice.clone());
        let options = vec![InteractionOption::value("target", OptionKind::User, "77")];
        let event = testing::slash_event_with(
            "hug",
            options.clone(),
            RecordingSink::new().into(),
            resolver.into(),
        );
        let args = bind(&specs, &event, &flatten_options(&options)).await.unwrap();
        assert_eq!(args.get::<User>("target").unwrap(), alice);
    }

    #[tokio::test]
    async fn test_missing_entity_fails() {
        let specs = params(
            CommandDescriptor::slash("hug", "Hug").param(Param::option::<User>("target", "who")),
        );
        let options = vec![InteractionOption::value("target", OptionKind::User, "78")];
        let event = testing::slash_event("hug", options.clone(), RecordingSink::new().into());
        let err = bind(&specs, &event, &flatten_options(&options))
            .await
            .unwrap_err();
        assert!(matches!(err, BindError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_malformed_value_fails() {
        let specs =
            params(CommandDescriptor::slash("n", "N").param(Param::option::<i64>("x", "x")));
        let options = vec![InteractionOption::value("x", OptionKind::Integer, "five")];
        let event = testing::slash_event("n", options.clone(), RecordingSink::new().into());
        let err = bind(&specs, &event, &flatten_options(&options))
            .await
            .unwrap_err();
        assert!(matches!(err, BindError::Malformed { .. }));
    }

    #[test]
    fn test_argument_errors() {
        let args = Arguments::new(vec![("x".into(), BoundValue::String("a".into()))]);
        assert_eq!(
            args.get::<i64>("y").unwrap_err(),
            ArgumentError::Unknown("y".into())
        );
        assert_eq!(args.at::<i64>(4).unwrap_err(), ArgumentError::OutOfRange(4));
        assert_eq!(
            args.get::<i64>("x").unwrap_err(),
            ArgumentError::Mismatch {
                name: "x".into(),
                expected: "integer",
                found: "string"
            }
        );
    }
}
