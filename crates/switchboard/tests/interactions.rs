use async_trait::async_trait;
use std::sync::Arc;

use switchboard::testing::{self, RecordingSink};
use switchboard::{
    App, Arguments, AutocompleteEvent, CommandContext, CommandDescriptor, ComponentDescriptor,
    ComponentEvent, ComponentKind, DispatchOutcome, Event, EventOutcome, EventResponse,
    InteractionOption, InvocationKind, OptionChoice, OptionKind, Param, ResponseKind,
    MAX_SUGGESTIONS,
};

struct Colors;

#[async_trait]
impl switchboard::AutocompleteProvider for Colors {
    async fn suggest(
        &self,
        _event: &AutocompleteEvent,
        focused: &InteractionOption,
    ) -> Vec<OptionChoice> {
        let typed = focused
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        ["red", "green", "blue"]
            .into_iter()
            .filter(|c| c.starts_with(&typed))
            .map(|c| OptionChoice::new(c, c))
            .collect()
    }
}

struct Numbers;

#[async_trait]
impl switchboard::AutocompleteProvider for Numbers {
    async fn suggest(&self, _: &AutocompleteEvent, _: &InteractionOption) -> Vec<OptionChoice> {
        (0..100).map(|n| OptionChoice::new(n.to_string(), n)).collect()
    }
}

fn app() -> App {
    App::builder()
        .command(
            CommandDescriptor::slash("paint", "Paints")
                .param(Param::option::<String>("color", "Color").autocomplete::<Colors>())
                .param(Param::option::<i64>("count", "Count").autocomplete::<Numbers>())
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    Ok::<_, anyhow::Error>(args.get::<String>("color")?)
                }),
        )
        .command(
            CommandDescriptor::slash("orphan", "No provider")
                .param(Param::option::<String>("q", "Query").autocomplete::<Unregistered>())
                .handler_fn(|_ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>(())
                }),
        )
        .command(
            CommandDescriptor::new("ping", "Ping")
                .kinds([InvocationKind::Slash, InvocationKind::Text])
                .handler_fn(|_ctx: CommandContext, _args: Arguments| async move {
                    Ok::<_, anyhow::Error>("pong")
                }),
        )
        .command(
            CommandDescriptor::text("basic add", "Adds")
                .param(Param::option::<i64>("x", "First"))
                .param(Param::option::<i64>("y", "Second"))
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    Ok::<_, anyhow::Error>((args.get::<i64>("x")? + args.get::<i64>("y")?).to_string())
                }),
        )
        .autocomplete_provider(Colors)
        .autocomplete_provider(Numbers)
        .component(
            ComponentDescriptor::button("vote-(yes|no)")
                .param(Param::event_as::<Arc<ComponentEvent>>("event"))
                .handler_fn(|_ctx: CommandContext, args: Arguments| async move {
                    let event: Arc<ComponentEvent> = args.get("event")?;
                    Ok::<_, anyhow::Error>(EventResponse::edit_plaintext(format!(
                        "Voted {}",
                        event.custom_id.trim_start_matches("vote-")
                    )))
                }),
        )
        .component(
            ComponentDescriptor::button("page-.*").handler_fn(
                |_ctx: CommandContext, _args: Arguments| async move { Ok::<_, anyhow::Error>("any page") },
            ),
        )
        .component(
            ComponentDescriptor::button("page-[0-9]+").handler_fn(
                |_ctx: CommandContext, _args: Arguments| async move { Ok::<_, anyhow::Error>("numbered page") },
            ),
        )
        .build()
        .unwrap()
}

struct Unregistered;

#[async_trait]
impl switchboard::AutocompleteProvider for Unregistered {
    async fn suggest(&self, _: &AutocompleteEvent, _: &InteractionOption) -> Vec<OptionChoice> {
        vec![OptionChoice::new("never", "never")]
    }
}

fn autocomplete(name: &str, options: Vec<InteractionOption>, sink: &Arc<RecordingSink>) -> Event {
    Event::Autocomplete(Arc::new(testing::autocomplete_event(
        name,
        options,
        sink.clone(),
    )))
}

#[tokio::test]
async fn test_autocomplete_filters_by_typed_prefix() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let options = vec![InteractionOption::value("color", OptionKind::String, "g").focused()];
    let outcome = app.handle(autocomplete("paint", options, &sink)).await;
    assert_eq!(outcome, EventOutcome::Suggested(1));
    assert_eq!(sink.suggestions(), vec![vec![OptionChoice::new("green", "green")]]);
}

#[tokio::test]
async fn test_autocomplete_capped() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let options = vec![
        InteractionOption::value("color", OptionKind::String, "r"),
        InteractionOption::value("count", OptionKind::Integer, 1).focused(),
    ];
    let outcome = app.handle(autocomplete("paint", options, &sink)).await;
    assert_eq!(outcome, EventOutcome::Suggested(MAX_SUGGESTIONS));
    assert_eq!(sink.suggestions()[0].len(), 25);
}

#[tokio::test]
async fn test_autocomplete_without_provider_sends_empty_list() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let options = vec![InteractionOption::value("q", OptionKind::String, "x").focused()];
    let outcome = app.handle(autocomplete("orphan", options, &sink)).await;
    assert_eq!(outcome, EventOutcome::Suggested(0));
    assert_eq!(sink.suggestions(), vec![Vec::<OptionChoice>::new()]);
}

#[tokio::test]
async fn test_autocomplete_delivery_failure() {
    let app = app();
    let sink = Arc::new(RecordingSink::failing());
    let options = vec![InteractionOption::value("color", OptionKind::String, "").focused()];
    let outcome = app.handle(autocomplete("paint", options, &sink)).await;
    assert!(matches!(outcome, EventOutcome::SuggestFailed(_)));
}

#[tokio::test]
async fn test_button_edits_message() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let event = testing::component_event(ComponentKind::Button, "vote-yes", sink.clone());
    let outcome = app.handle(event).await;
    assert_eq!(outcome, EventOutcome::Dispatched(DispatchOutcome::Responded));
    let responses = sink.responses();
    assert_eq!(responses[0].0, ResponseKind::Update);
    assert_eq!(responses[0].1.content.as_deref(), Some("Voted yes"));
}

#[tokio::test]
async fn test_unmatched_component_ignored() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let event = testing::component_event(ComponentKind::Button, "vote-maybe", sink.clone());
    assert_eq!(app.handle(event).await, EventOutcome::Ignored);
    assert!(sink.responses().is_empty());
}

#[tokio::test]
async fn test_ambiguous_component_ignored() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let event = testing::component_event(ComponentKind::Button, "page-3", sink.clone());
    assert_eq!(app.handle(event).await, EventOutcome::Ignored);
    assert!(sink.responses().is_empty());

    let event = testing::component_event(ComponentKind::Button, "page-last", sink.clone());
    app.handle(event).await;
    assert_eq!(sink.texts(), vec!["any page"]);
}

#[tokio::test]
async fn test_text_command() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let outcome = app.handle(testing::message_event("!ping", sink.clone())).await;
    assert_eq!(outcome, EventOutcome::Dispatched(DispatchOutcome::Responded));
    assert_eq!(sink.texts(), vec!["pong"]);
    assert_eq!(sink.responses()[0].0, ResponseKind::Reply);
}

#[tokio::test]
async fn test_text_command_with_arguments() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    app.handle(testing::message_event("!basic add 2 3", sink.clone()))
        .await;
    assert_eq!(sink.texts(), vec!["5"]);
}

#[tokio::test]
async fn test_text_parse_error_replies_with_usage() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let outcome = app
        .handle(testing::message_event("!basic add two 3", sink.clone()))
        .await;
    assert!(matches!(outcome, EventOutcome::InvalidText(_)));
    let texts = sink.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("invalid value 'two'"), "{}", texts[0]);
}

#[tokio::test]
async fn test_plain_messages_ignored() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    for content in ["hello", "!unknown", "ping"] {
        let outcome = app.handle(testing::message_event(content, sink.clone())).await;
        assert_eq!(outcome, EventOutcome::Ignored);
    }
    assert!(sink.responses().is_empty());
}

#[tokio::test]
async fn test_slash_only_command_not_invocable_as_text() {
    let app = app();
    let sink = Arc::new(RecordingSink::new());
    let outcome = app.handle(testing::message_event("!paint red 1", sink.clone())).await;
    assert_eq!(outcome, EventOutcome::Ignored);
}
