use meguri::{
    App, Context, HookResult, Lifecycle, MeguriError, Plugin, SharedHook, hooks::LoggingHook,
    shared, testing::{CountingHandler, RecordingHook},
};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

mod common;
use common::{OrderHook, group_message, private_message};

fn order_hook(id: usize, order: &Arc<Mutex<Vec<usize>>>, result: HookResult) -> OrderHook {
    OrderHook {
        id,
        order: order.clone(),
        result,
    }
}

// ============================================================================
// Middleware
// ============================================================================

#[tokio::test]
async fn premiddleware_runs_first() {
    let app = App::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    app.root().middleware(shared(order_hook(1, &order, HookResult::Next)));
    app.root().middleware(shared(order_hook(2, &order, HookResult::Next)));
    app.root().premiddleware(shared(order_hook(0, &order, HookResult::Next)));

    app.receive(private_message(3, "hello")).await;
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn stop_ends_the_chain() {
    let app = App::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    app.root().middleware(shared(order_hook(1, &order, HookResult::Stop)));
    app.root().middleware(shared(order_hook(2, &order, HookResult::Next)));

    let summary = app.receive(private_message(3, "hello")).await;
    assert_eq!(summary.failures, 0);
    assert_eq!(*order.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn scoped_middleware_only_sees_its_subtree() {
    let app = App::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    app.groups().middleware(shared(order_hook(1, &order, HookResult::Next)));

    app.receive(private_message(3, "hello")).await;
    assert!(order.lock().unwrap().is_empty());

    app.receive(group_message(8, 3, "hello")).await;
    assert_eq!(*order.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn middleware_skips_non_message_events() {
    let app = App::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    app.root().middleware(shared(order_hook(1, &order, HookResult::Next)));

    app.receive(common::heartbeat()).await;
    assert!(order.lock().unwrap().is_empty());
}

#[tokio::test]
async fn logging_hook_passes_messages_through() {
    let app = App::default();
    let counter = CountingHandler::new();
    app.root().command("ping").unwrap().action(counter.clone());
    app.root().premiddleware(shared(LoggingHook::named("inbound")));

    app.receive(private_message(3, "/ping")).await;
    assert_eq!(counter.count(), 1);
}

#[test]
fn remove_middleware_without_match_is_false() {
    let app = App::default();
    let hook: SharedHook<_> = shared(LoggingHook::new());
    assert!(!app.root().remove_middleware(&hook));

    app.group(1).middleware(hook.clone());
    assert!(!app.root().remove_middleware(&hook));
    assert!(!app.group(1).remove_middleware(&shared(LoggingHook::new())));
    assert_eq!(app.middleware_count(), 1);
}

#[tokio::test]
async fn removing_at_one_path_keeps_the_other() {
    let app = App::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    let hook: SharedHook<_> = shared(order_hook(1, &order, HookResult::Next));
    app.group(1).middleware(hook.clone());
    app.group(2).middleware(hook.clone());

    assert!(app.group(1).remove_middleware(&hook));
    assert!(!app.group(1).remove_middleware(&hook));
    assert_eq!(app.middleware_count(), 1);

    app.receive(group_message(1, 3, "hello")).await;
    assert!(order.lock().unwrap().is_empty());
    app.receive(group_message(2, 3, "hello")).await;
    assert_eq!(*order.lock().unwrap(), vec![1]);
}

// ============================================================================
// Plugins
// ============================================================================

struct Greeter;

impl Plugin for Greeter {
    fn name(&self) -> Option<&str> {
        Some("greeter")
    }

    async fn apply(&self, ctx: Context, options: Value) -> Result<(), MeguriError> {
        ctx.set("greeting", options["greeting"].clone());
        ctx.command_with("greet [name]", "say hello")?;
        Ok(())
    }
}

#[tokio::test]
async fn disabled_plugin_is_skipped() {
    let app = App::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin = {
        let calls = calls.clone();
        move |_ctx: Context, _options: Value| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<(), MeguriError>(())
            }
        }
    };

    let ctx = app.group(1);
    let returned = ctx.plugin(plugin, Value::Bool(false)).await.unwrap();
    assert!(returned.same_node(&ctx));
    assert!(!returned.is_derived());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn plugin_receives_a_derived_context() {
    let app = App::default();
    let seen = Arc::new(Mutex::new(None));
    let plugin = {
        let seen = seen.clone();
        move |ctx: Context, options: Value| {
            let seen = seen.clone();
            async move {
                assert!(ctx.is_derived());
                ctx.set("mode", options);
                *seen.lock().unwrap() = Some(ctx.path().to_string());
                Ok::<(), MeguriError>(())
            }
        }
    };

    let ctx = app.group(1);
    ctx.set("mode", Value::from("plain"));
    ctx.plugin(plugin, Value::from("fancy")).await.unwrap();

    assert_eq!(seen.lock().unwrap().as_deref(), Some("/group/1/"));
    assert_eq!(ctx.get("mode"), Some(Value::from("plain")));
}

#[tokio::test]
async fn named_plugin_is_announced() {
    let app = App::default();
    let lifecycle = RecordingHook::<Lifecycle>::new();
    app.receiver().on("plugin", shared(lifecycle.clone()));

    let ctx = app.users();
    ctx.plugin(Greeter, json!({ "greeting": "hi" })).await.unwrap();

    assert_eq!(
        lifecycle.events(),
        vec![Lifecycle::Plugin {
            name: "greeter".into()
        }]
    );
    // Option writes stayed on the derived handle; registrations did not.
    assert_eq!(ctx.get("greeting"), None);
    let greet = ctx.get_command("greet", None).unwrap();
    assert_eq!(greet.context_path(), "/user/*/");
}

#[tokio::test]
async fn plugin_errors_propagate() {
    let app = App::default();
    let lifecycle = RecordingHook::<Lifecycle>::new();
    app.receiver().on("plugin", shared(lifecycle.clone()));

    let broken = |ctx: Context, _options: Value| async move {
        ctx.command("")?;
        Ok::<(), MeguriError>(())
    };
    let err = app.root().plugin(broken, Value::Null).await.unwrap_err();
    assert!(matches!(err, MeguriError::EmptyDeclaration));
    assert_eq!(lifecycle.count(), 0);
}
