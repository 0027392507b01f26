use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use switchboard::testing::{self, RecordingSink, StaticResolver};
use switchboard::{
    App, Arguments, BoundValue, CommandContext, CommandDescriptor, DefaultValue, DispatchOutcome,
    Embed, Event, EventOutcome, EventResponse, GuildOnly, InteractionOption, Marker, OptionKind,
    Param, ParamShape, ParamType, Requirement, RequirementExecutor, RequirementFailure, ResponseKind, SchemaError, SetupError,
    User,
};

struct Blocked;
struct BlockingExecutor;

impl Requirement for Blocked {
    type Executor = BlockingExecutor;
}

#[async_trait]
impl RequirementExecutor for BlockingExecutor {
    async fn verify(&self, _event: &Event) -> Result<(), RequirementFailure> {
        Err(RequirementFailure::new("blocked"))
    }
}

fn basic_app() -> App {
    App::builder()
        .command(
            CommandDescriptor::slash("basic add", "Adds two numbers")
                .param(Param::option::<i64>("x", "First"))
                .param(Param::option::<i64>("y", "Second"))
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    let sum = args.get::<i64>("x")? + args.get::<i64>("y")?;
                    Ok::<_, anyhow::Error>(sum.to_string())
                }),
        )
        .command(
            CommandDescriptor::slash("basic optional", "Echoes an optional value")
                .param(Param::option::<Option<i64>>("value", "Anything").required(false))
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    Ok::<_, anyhow::Error>(match args.get::<Option<i64>>("value")? {
                        Some(v) => v.to_string(),
                        None => "No value".to_string(),
                    })
                }),
        )
        .command(
            CommandDescriptor::slash("greet", "Greets someone")
                .param(
                    Param::option::<String>("name", "Who")
                        .required(false)
                        .default(DefaultValue::string("Bob")),
                )
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    Ok::<_, anyhow::Error>(format!("Hello, {}", args.get::<String>("name")?))
                }),
        )
        .command(
            CommandDescriptor::slash("parent group child", "Deeply nested")
                .handler_fn(|ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>(ctx.command_path.join("/"))
                }),
        )
        .command(
            CommandDescriptor::slash("whois", "Looks up a user")
                .param(Param::option::<User>("target", "Who"))
                .param(Param::user("caller"))
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    let target: User = args.get("target")?;
                    let caller: User = args.get("caller")?;
                    Ok::<_, anyhow::Error>(format!("{} asked about {}", caller.name, target.name))
                }),
        )
        .command(
            CommandDescriptor::slash("card", "Shows an embed").handler_fn(
                |_ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>(Embed::new().title("Card"))
                },
            ),
        )
        .build()
        .unwrap()
}

fn sub(name: &str, options: Vec<InteractionOption>) -> Vec<InteractionOption> {
    vec![InteractionOption::sub_command(name, options)]
}

async fn run(app: &App, name: &str, options: Vec<InteractionOption>) -> (EventOutcome, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let outcome = app
        .handle(testing::slash_event(name, options, sink.clone()))
        .await;
    (outcome, sink)
}

#[tokio::test]
async fn test_nested_command_adds_options() {
    let app = basic_app();
    let options = sub(
        "add",
        vec![
            InteractionOption::value("x", OptionKind::Integer, 5),
            InteractionOption::value("y", OptionKind::Integer, 14),
        ],
    );
    let (outcome, sink) = run(&app, "basic", options).await;
    assert_eq!(outcome, EventOutcome::Dispatched(DispatchOutcome::Responded));
    assert_eq!(sink.texts(), vec!["19"]);
    assert_eq!(sink.responses()[0].0, ResponseKind::Reply);
}

#[tokio::test]
async fn test_option_names_are_case_insensitive() {
    let app = basic_app();
    let options = sub(
        "ADD",
        vec![
            InteractionOption::value("X", OptionKind::Integer, 1),
            InteractionOption::value("y", OptionKind::Integer, 2),
        ],
    );
    let (_, sink) = run(&app, "Basic", options).await;
    assert_eq!(sink.texts(), vec!["3"]);
}

#[tokio::test]
async fn test_missing_optional_value() {
    let app = basic_app();
    let (_, sink) = run(&app, "basic", sub("optional", vec![])).await;
    assert_eq!(sink.texts(), vec!["No value"]);

    let (_, sink) = run(
        &app,
        "basic",
        sub(
            "optional",
            vec![InteractionOption::value("value", OptionKind::Integer, 7)],
        ),
    )
    .await;
    assert_eq!(sink.texts(), vec!["7"]);
}

#[tokio::test]
async fn test_default_value_used_when_absent() {
    let app = basic_app();
    let (_, sink) = run(&app, "greet", vec![]).await;
    assert_eq!(sink.texts(), vec!["Hello, Bob"]);

    let (_, sink) = run(
        &app,
        "greet",
        vec![InteractionOption::value("name", OptionKind::String, "Ada")],
    )
    .await;
    assert_eq!(sink.texts(), vec!["Hello, Ada"]);
}

#[tokio::test]
async fn test_three_part_name_resolves() {
    let app = basic_app();
    let options = vec![InteractionOption::group("group", sub("child", vec![]))];
    let (_, sink) = run(&app, "parent", options).await;
    assert_eq!(sink.texts(), vec!["parent/group/child"]);
}

#[tokio::test]
async fn test_unknown_command_gets_ephemeral_reply() {
    let app = basic_app();
    let (outcome, sink) = run(&app, "nope", vec![]).await;
    assert_eq!(
        outcome,
        EventOutcome::Dispatched(DispatchOutcome::Unresolved("nope".into()))
    );
    let responses = sink.responses();
    assert_eq!(responses.len(), 1);
    assert!(responses[0].1.ephemeral);
    assert_eq!(
        responses[0].1.content.as_deref(),
        Some("Could not resolve command 'nope'.")
    );
}

#[tokio::test]
async fn test_user_option_fetched_from_resolver() {
    let app = basic_app();
    let sink = Arc::new(RecordingSink::new());
    let resolver = Arc::new(StaticResolver::new().with_user(User::new(7u64, "alice")));
    let event = testing::slash_event_with(
        "whois",
        vec![InteractionOption::value("target", OptionKind::User, "7")],
        sink.clone(),
        resolver,
    );
    app.handle(event).await;
    assert_eq!(sink.texts(), vec!["tester asked about alice"]);
}

#[tokio::test]
async fn test_failed_fetch_reports_bind_failure() {
    let app = basic_app();
    let (outcome, sink) = run(
        &app,
        "whois",
        vec![InteractionOption::value("target", OptionKind::User, "7")],
    )
    .await;
    assert!(matches!(
        outcome,
        EventOutcome::Dispatched(DispatchOutcome::BindFailed(_))
    ));
    assert_eq!(
        sink.texts(),
        vec!["Could not read the options of this command."]
    );
}

#[tokio::test]
async fn test_embed_result_is_sent() {
    let app = basic_app();
    let (_, sink) = run(&app, "card", vec![]).await;
    let responses = sink.responses();
    assert_eq!(responses[0].1.embeds[0].title.as_deref(), Some("Card"));
}

#[test]
fn test_primitive_with_default_fails_build() {
    let err = App::builder()
        .command(
            CommandDescriptor::slash("count", "Counts")
                .param(
                    Param::option::<i64>("n", "How many")
                        .required(false)
                        .default(DefaultValue::number(3.0)),
                )
                .handler_fn(|_ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>(())
                }),
        )
        .build()
        .unwrap_err();
    match err {
        SetupError::Schema(errors) => assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::DefaultOnPrimitive { .. }))),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_requirement_blocks_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = App::builder()
        .command(
            CommandDescriptor::slash("ban", "Bans someone")
                .requirement::<GuildOnly>()
                .handler_fn(move |_ctx: CommandContext, _args: Arguments| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>("banned")
                    }
                }),
        )
        .build()
        .unwrap();

    let sink = Arc::new(RecordingSink::new());
    let outcome = app
        .handle(testing::dm_slash_event("ban", vec![], sink.clone()))
        .await;
    assert_eq!(
        outcome,
        EventOutcome::Dispatched(DispatchOutcome::Blocked(
            "This command only works in a server!".into()
        ))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(sink.responses()[0].1.ephemeral);

    let (_, sink) = run(&app, "ban", vec![]).await;
    assert_eq!(sink.texts(), vec!["banned"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handler_error_gets_generic_reply() {
    let app = App::builder()
        .command(
            CommandDescriptor::slash("boom", "Fails").handler_fn(
                |_ctx: CommandContext, _args: Arguments| async move {
                    Err::<String, _>(anyhow::anyhow!("database unavailable"))
                },
            ),
        )
        .build()
        .unwrap();
    let (outcome, sink) = run(&app, "boom", vec![]).await;
    assert!(matches!(
        outcome,
        EventOutcome::Dispatched(DispatchOutcome::HandlerFailed(_))
    ));
    assert_eq!(sink.texts(), vec!["An error occurred invoking this command!"]);
}

#[tokio::test]
async fn test_edit_response_invalid_for_slash_commands() {
    let app = App::builder()
        .command(
            CommandDescriptor::slash("edit", "Edits").handler_fn(
                |_ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>(EventResponse::edit_plaintext("changed"))
                },
            ),
        )
        .build()
        .unwrap();
    let (outcome, sink) = run(&app, "edit", vec![]).await;
    assert!(matches!(
        outcome,
        EventOutcome::Dispatched(DispatchOutcome::ResponseFailed(_))
    ));
    assert_eq!(
        sink.texts(),
        vec!["Could not produce a response for this command."]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_events_run_independently() {
    let app = Arc::new(basic_app());
    let sinks: Vec<Arc<RecordingSink>> = (0..8).map(|_| Arc::new(RecordingSink::new())).collect();
    let handles: Vec<_> = sinks
        .iter()
        .enumerate()
        .map(|(i, sink)| {
            let options = sub(
                "add",
                vec![
                    InteractionOption::value("x", OptionKind::Integer, i as i64),
                    InteractionOption::value("y", OptionKind::Integer, 1),
                ],
            );
            app.spawn(testing::slash_event("basic", options, sink.clone()))
        })
        .collect();
    for handle in handles {
        assert!(matches!(
            handle.await.unwrap(),
            EventOutcome::Dispatched(DispatchOutcome::Responded)
        ));
    }
    for (i, sink) in sinks.iter().enumerate() {
        assert_eq!(sink.texts(), vec![(i + 1).to_string()]);
    }
}

#[tokio::test]
async fn test_custom_requirement_message_reaches_user() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = App::builder()
        .requirement_executor(BlockingExecutor)
        .command(
            CommandDescriptor::slash("parent child", "Guarded")
                .requirement::<Blocked>()
                .handler_fn(move |_ctx: CommandContext, _args: Arguments| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>("ran")
                    }
                }),
        )
        .build()
        .unwrap();

    let (outcome, sink) = run(&app, "parent", sub("child", vec![])).await;
    assert_eq!(
        outcome,
        EventOutcome::Dispatched(DispatchOutcome::Blocked("blocked".into()))
    );
    assert_eq!(sink.texts(), vec!["blocked"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unregistered_executor_is_skipped() {
    let app = App::builder()
        .command(
            CommandDescriptor::slash("open", "Unguarded in practice")
                .requirement::<Blocked>()
                .handler_fn(|_ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>("ran")
                }),
        )
        .build()
        .unwrap();
    let (_, sink) = run(&app, "open", vec![]).await;
    assert_eq!(sink.texts(), vec!["ran"]);
}

#[tokio::test]
async fn test_user_id_injected_as_i64() {
    let app = App::builder()
        .command(
            CommandDescriptor::slash("whoami", "Shows your id")
                .param(
                    Param::with_shape("id", ParamShape::required(ParamType::I64))
                        .marker(Marker::UserId),
                )
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    Ok::<_, anyhow::Error>(args.get::<i64>("id")?.to_string())
                }),
        )
        .build()
        .unwrap();
    let (outcome, sink) = run(&app, "whoami", vec![]).await;
    assert_eq!(outcome, EventOutcome::Dispatched(DispatchOutcome::Responded));
    assert_eq!(sink.texts(), vec![testing::user().id.to_string()]);
}

#[tokio::test]
async fn test_unmarked_param_is_absent() {
    let app = App::builder()
        .command(
            CommandDescriptor::slash("plain", "Has an unmarked parameter")
                .param(Param::with_shape("extra", ParamShape::optional(ParamType::String)))
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    let absent = args.value("extra").is_some_and(BoundValue::is_absent);
                    let extra = args.get::<Option<String>>("extra")?;
                    Ok::<_, anyhow::Error>(format!("absent={absent} value={extra:?}"))
                }),
        )
        .build()
        .unwrap();
    let (outcome, sink) = run(
        &app,
        "plain",
        vec![InteractionOption::value("extra", OptionKind::String, "ignored")],
    )
    .await;
    assert_eq!(outcome, EventOutcome::Dispatched(DispatchOutcome::Responded));
    assert_eq!(sink.texts(), vec!["absent=true value=None"]);
}
