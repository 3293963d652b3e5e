use meguri::{
    App, BoxError, ErrorKind, HookResult, Invocation, Lifecycle, Target, shared,
    testing::{CountingHandler, RecordingHook},
};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

mod common;
use common::{OrderHook, RecordingAction, RecordingSender, group_message, private_message};

fn app_with_sender() -> (App, RecordingSender) {
    let sender = RecordingSender::default();
    let app = App::builder().sender(sender.clone()).build();
    (app, sender)
}

fn bound(app: &App, mut meta: meguri::Meta) -> Arc<meguri::Meta> {
    meta.set_path(meta.canonical_path());
    if let Some(sender) = app.sender() {
        meta.bind_sender(sender);
    }
    Arc::new(meta)
}

#[tokio::test]
async fn run_command_respects_wildcard_scope() {
    let (app, sender) = app_with_sender();
    let counter = CountingHandler::new();
    app.groups().command("x").unwrap().action(counter.clone());

    let meta = bound(&app, group_message(1, 5, "irrelevant"));
    app.root()
        .run_command("x", meta, vec![], Map::new(), "")
        .await
        .unwrap();

    assert_eq!(counter.count(), 1);
    assert!(sender.messages().is_empty());
}

#[tokio::test]
async fn run_command_outside_scope_replies_not_found() {
    let (app, sender) = app_with_sender();
    let counter = CountingHandler::new();
    app.users().command("x").unwrap().action(counter.clone());

    let meta = bound(&app, group_message(1, 5, "irrelevant"));
    let result = app
        .root()
        .run_command("x", meta, vec![], Map::new(), "")
        .await;

    assert!(result.is_ok());
    assert_eq!(counter.count(), 0);
    assert_eq!(
        sender.messages(),
        vec![(Target::Group(1), "command \"x\" not found".to_string())]
    );
}

#[tokio::test]
async fn run_command_builds_the_invocation() {
    let (app, _) = app_with_sender();
    let action = RecordingAction::default();
    app.root().command("greet <name>").unwrap().action(action.clone());

    let mut options = Map::new();
    options.insert("loud".into(), Value::Bool(true));
    let meta = bound(&app, private_message(2, "irrelevant"));
    app.root()
        .run_command("Greet", meta, vec!["ann".into()], options, "tail")
        .await
        .unwrap();

    let call = action.calls().remove(0);
    assert_eq!(call.command.name(), "greet");
    assert_eq!(call.args, vec!["ann"]);
    assert_eq!(call.options.get("loud"), Some(&Value::Bool(true)));
    assert_eq!(call.rest, "tail");
    assert!(call.unknown.is_empty());
    assert_eq!(call.meta.user_id, Some(2));
}

#[test]
fn dotted_child_is_reused() {
    let app = App::default();
    let root = app.root();
    let a = root.command("a").unwrap();
    let ab = root.command("a.b").unwrap();

    assert_eq!(ab.name(), "a.b");
    assert_eq!(ab.parent(), Some(a.clone()));
    assert_eq!(a.children(), vec![ab.clone()]);

    let again = root.command("a.b").unwrap();
    assert_eq!(again, ab);
    assert_eq!(a.children().len(), 1);
}

#[test]
fn same_name_from_unrelated_context_is_a_violation() {
    let app = App::default();
    app.group(1).command("x").unwrap();
    let err = app.user(2).command("x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextViolation);
}

#[test]
fn conflicting_parent_is_a_structural_conflict() {
    let app = App::default();
    app.root().command("a/c").unwrap();
    let err = app.root().command("b/c").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralConflict);
}

#[test]
fn get_command_uses_context_path_by_default() {
    let app = App::default();
    app.group(1).command_with("roll [sides]", "roll a die").unwrap();

    let found = app.group(1).get_command("roll 20", None).unwrap();
    assert_eq!(found.description().as_deref(), Some("roll a die"));
    assert_eq!(found.usage(), "roll [sides]");
    assert_eq!(found.context_path(), "/group/1/");
    assert!(app.group(2).get_command("roll", None).is_none());
    assert!(app.root().get_command("roll", None).is_none());
}

#[tokio::test]
async fn prefixed_message_triggers_command() {
    let (app, _) = app_with_sender();
    let action = RecordingAction::default();
    app.groups()
        .command("echo <text>")
        .unwrap()
        .option("-u, --upper", "shout")
        .action(action.clone());

    let summary = app
        .receive(group_message(4, 8, "/echo -u \"hello there\" --times=2"))
        .await;

    assert_eq!(summary.failures, 0);
    let call = action.calls().remove(0);
    assert_eq!(call.args, vec!["hello there"]);
    assert_eq!(call.options.get("upper"), Some(&Value::Bool(true)));
    assert_eq!(call.options.get("times"), Some(&Value::from(2)));
    assert_eq!(call.unknown, vec!["times"]);
}

#[tokio::test]
async fn unknown_command_in_message_is_ignored() {
    let (app, sender) = app_with_sender();
    let summary = app.receive(group_message(4, 8, "/missing arg")).await;
    assert_eq!(summary.failures, 0);
    assert!(sender.messages().is_empty());
}

#[tokio::test]
async fn stopping_middleware_skips_the_trigger() {
    let (app, _) = app_with_sender();
    let counter = CountingHandler::new();
    app.root().command("ping").unwrap().action(counter.clone());

    let order = Arc::new(Mutex::new(Vec::new()));
    app.group(4).middleware(shared(OrderHook {
        id: 1,
        order: order.clone(),
        result: HookResult::Stop,
    }));

    app.receive(group_message(4, 8, "/ping")).await;
    assert_eq!(counter.count(), 0);
    assert_eq!(*order.lock().unwrap(), vec![1]);

    app.receive(group_message(5, 8, "/ping")).await;
    assert_eq!(counter.count(), 1);
}

#[tokio::test]
async fn failing_action_is_counted_not_propagated() {
    let (app, _) = app_with_sender();
    app.root()
        .command("boom")
        .unwrap()
        .action(|_inv: Invocation| async { Err::<(), BoxError>("exploded".into()) });

    let summary = app.receive(private_message(1, "/boom")).await;
    assert_eq!(summary.failures, 1);
}

#[tokio::test]
async fn execution_is_announced_on_the_receiver() {
    let (app, _) = app_with_sender();
    let lifecycle = RecordingHook::<Lifecycle>::new();
    app.receiver().on("command", shared(lifecycle.clone()));
    app.root().command("ping").unwrap();

    app.receive(private_message(1, "/ping")).await;

    assert_eq!(
        lifecycle.events(),
        vec![Lifecycle::Command {
            name: "ping".into(),
            path: "/user/1/message/friend/".into(),
        }]
    );
}

#[tokio::test]
async fn invocation_can_reply() {
    let (app, sender) = app_with_sender();
    app.root()
        .command("echo <text>")
        .unwrap()
        .action(|inv: Invocation| async move {
            inv.send(&inv.args.join(" ")).await.map_err(BoxError::from)
        });

    app.receive(group_message(9, 1, "/echo a b")).await;
    assert_eq!(
        sender.messages(),
        vec![(Target::Group(9), "a b".to_string())]
    );
}

#[tokio::test]
async fn transport_path_without_trailing_slash_is_in_scope() {
    let (app, sender) = app_with_sender();
    let counter = CountingHandler::new();
    app.scope("/group/1/message")
        .command("x")
        .unwrap()
        .action(counter.clone());

    let mut meta = group_message(1, 5, "irrelevant").with_path("/group/1/message");
    if let Some(shared_sender) = app.sender() {
        meta.bind_sender(shared_sender);
    }
    app.root()
        .run_command("x", Arc::new(meta), vec![], Map::new(), "")
        .await
        .unwrap();

    assert_eq!(counter.count(), 1);
    assert!(sender.messages().is_empty());
}

#[tokio::test]
async fn not_found_without_sender_still_succeeds() {
    let app = App::default();
    let meta = Arc::new(group_message(1, 5, "irrelevant").with_path("/group/1/message"));
    let result = app
        .root()
        .run_command("nope", meta, vec![], Map::new(), "")
        .await;
    assert!(result.is_ok());
}
