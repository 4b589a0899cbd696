//! Lifecycle notifications of reactive actions called through a full store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use thunk_dispatch::prelude::*;
use thunk_dispatch::testing::{DispatchLog, RecordingMiddleware};
use tokio::sync::oneshot;

fn build(model: Model) -> (Arc<Store>, DispatchLog) {
    let recorder = RecordingMiddleware::new();
    let log = recorder.log();
    let store = Store::builder(model).middleware(recorder).build();
    (store, log)
}

fn audit(key: &str, definition: ReactiveAction) -> Model {
    Model::new().model(
        "audit",
        Model::new().state("entries", json!(0)).thunk_on(key, definition),
    )
}

#[test]
fn test_identifiers_follow_path() {
    let model = Model::new().model(
        "shop",
        Model::new().model(
            "cart",
            Model::new().thunk_on("onCheckout", ReactiveAction::sync(|_, _, _| Ok(json!(null)))),
        ),
    );
    let (store, _) = build(model);

    let creator = store.action_creator("@thunkOn.shop.cart.onCheckout").unwrap();
    assert_eq!(creator.action_type(), "@thunkOn.shop.cart.onCheckout");
    assert_eq!(creator.start_type(), Some("@thunkOn.shop.cart.onCheckout(start)"));
    assert_eq!(creator.success_type(), Some("@thunkOn.shop.cart.onCheckout(success)"));
    assert_eq!(creator.fail_type(), Some("@thunkOn.shop.cart.onCheckout(fail)"));

    let path: Vec<String> = ["shop", "cart", "onCheckout"].iter().map(|s| s.to_string()).collect();
    let by_path = store.listener_action_creator(&path).unwrap();
    assert_eq!(by_path.action_type(), creator.action_type());
    assert!(store.listener_action_creator(&path[..2]).is_none());
}

#[test]
fn test_sync_success() {
    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::sync(|_, payload, _| Ok(json!({"seen": payload["n"]}))),
    ));
    let payload = json!({"n": 7});

    let result = store
        .action_creator("@thunkOn.audit.onEvent")
        .unwrap()
        .call(payload.clone())
        .unwrap();

    let expected = json!({"seen": 7});
    assert_eq!(result.ready(), Some(expected.clone()));
    assert_eq!(
        log.notifications(),
        vec![
            Notification::new("@thunkOn.audit.onEvent(start)", payload.clone()),
            Notification::with_result("@thunkOn.audit.onEvent(success)", payload.clone(), expected.clone()),
            Notification::with_result("@thunkOn.audit.onEvent", payload, expected),
        ]
    );
    assert_eq!(log.invocations(), vec!["@thunkOn.audit.onEvent"]);
}

#[test]
fn test_sync_failure_reraises_same_error() {
    let error = ThunkError::source(std::io::Error::other("disk full"));
    let raised = error.clone();
    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::sync(move |_, _, _| Err(raised.clone())),
    ));

    let returned = store
        .action_creator("@thunkOn.audit.onEvent")
        .unwrap()
        .call(json!("p"))
        .unwrap_err();

    assert_eq!(returned, error);
    assert_eq!(
        log.notifications(),
        vec![
            Notification::new("@thunkOn.audit.onEvent(start)", json!("p")),
            Notification::with_error("@thunkOn.audit.onEvent(fail)", json!("p"), error.clone()),
            Notification::with_error("@thunkOn.audit.onEvent", json!("p"), error),
        ]
    );
}

#[tokio::test]
async fn test_pending_success() {
    let (tx, rx) = oneshot::channel::<Value>();
    let rx = Arc::new(Mutex::new(Some(rx)));
    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::future(move |_, _, _| {
            let rx = rx.lock().unwrap().take();
            async move {
                let rx = rx.ok_or_else(|| ThunkError::msg("called twice"))?;
                rx.await.map_err(ThunkError::source)
            }
        }),
    ));

    let pending = store
        .action_creator("@thunkOn.audit.onEvent")
        .unwrap()
        .call(json!(1))
        .unwrap();

    assert!(pending.is_pending());
    assert_eq!(log.types(), vec!["@thunkOn.audit.onEvent(start)"]);

    tx.send(json!("done")).unwrap();
    let result = pending.settle().await.unwrap();

    assert_eq!(result, json!("done"));
    assert_eq!(
        log.notifications()[1..],
        [
            Notification::with_result("@thunkOn.audit.onEvent(success)", json!(1), json!("done")),
            Notification::with_result("@thunkOn.audit.onEvent", json!(1), json!("done")),
        ]
    );
}

#[tokio::test]
async fn test_pending_rejection() {
    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::future(|_, _, _| async {
            tokio::task::yield_now().await;
            Err::<Value, _>(ThunkError::value(json!({"code": 503})))
        }),
    ));

    let pending = store
        .action_creator("@thunkOn.audit.onEvent")
        .unwrap()
        .call(json!(null))
        .unwrap();
    assert_not_dispatched!(log.notifications(), "*(fail)");

    let error = pending.settle().await.unwrap_err();

    assert_eq!(error, ThunkError::value(json!({"code": 503})));
    assert_eq!(
        log.types(),
        vec![
            "@thunkOn.audit.onEvent(start)",
            "@thunkOn.audit.onEvent(fail)",
            "@thunkOn.audit.onEvent",
        ]
    );
    let failed = find_dispatched!(log.notifications(), "*(fail)").cloned().unwrap();
    assert_eq!(failed.error, Some(error));
}

#[test]
fn test_resolved_targets_are_copied() {
    let targets = ["@action.todos.add", "@action.todos.remove"];
    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::sync(|_, mut payload, _| {
            if let Some(targets) = payload["resolvedTargets"].as_array_mut() {
                targets.push(json!("mutated"));
            }
            Ok(payload["resolvedTargets"].clone())
        })
        .targets(targets),
    ));
    let creator = store.action_creator("@thunkOn.audit.onEvent").unwrap();

    creator.call(json!({"id": 1})).unwrap();
    creator.call(json!({"id": 2})).unwrap();

    let successes: Vec<_> = log
        .notifications()
        .into_iter()
        .filter(|n| n.action_type == "@thunkOn.audit.onEvent(success)")
        .collect();
    for success in &successes {
        assert_eq!(success.payload["resolvedTargets"], json!(targets));
        assert_eq!(
            success.result,
            Some(json!(["@action.todos.add", "@action.todos.remove", "mutated"]))
        );
    }
    assert_eq!(successes.len(), 2);
    let definitions = store.listener_definitions();
    assert_eq!(definitions[0].definition.resolved_targets().unwrap(), targets);
}

#[test]
fn test_non_object_payload_with_targets_fails() {
    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::sync(|_, payload, _| Ok(payload)).targets(["@action.x"]),
    ));

    let error = store
        .action_creator("@thunkOn.audit.onEvent")
        .unwrap()
        .call(json!(42))
        .unwrap_err();

    assert_eq!(error, ThunkError::PayloadNotObject("number"));
    assert_eq!(
        log.types(),
        vec![
            "@thunkOn.audit.onEvent(start)",
            "@thunkOn.audit.onEvent(fail)",
            "@thunkOn.audit.onEvent",
        ]
    );
    assert_not_dispatched!(log.notifications(), "*(success)");
}

#[tokio::test]
async fn test_overlapping_calls_stay_separate() {
    let senders = Arc::new(Mutex::new(HashMap::new()));
    let receivers = Arc::new(Mutex::new(HashMap::new()));
    for id in [1, 2] {
        let (tx, rx) = oneshot::channel::<Value>();
        senders.lock().unwrap().insert(id, tx);
        receivers.lock().unwrap().insert(id, rx);
    }

    let (store, log) = build(audit(
        "onEvent",
        ReactiveAction::future(move |_, payload, _| {
            let id = payload["id"].as_i64().unwrap_or_default();
            let rx = receivers.lock().unwrap().remove(&id);
            async move {
                let rx = rx.ok_or_else(|| ThunkError::msg("unknown call"))?;
                rx.await.map_err(ThunkError::source)
            }
        }),
    ));
    let creator = store.action_creator("@thunkOn.audit.onEvent").unwrap();

    let first = creator.call(json!({"id": 1})).unwrap();
    let second = creator.call(json!({"id": 2})).unwrap();

    // settle the second call before the first
    senders.lock().unwrap().remove(&2).unwrap().send(json!("b")).unwrap();
    assert_eq!(second.settle().await.unwrap(), json!("b"));
    senders.lock().unwrap().remove(&1).unwrap().send(json!("a")).unwrap();
    assert_eq!(first.settle().await.unwrap(), json!("a"));

    let summary: Vec<(String, Value, Option<Value>)> = log
        .notifications()
        .into_iter()
        .map(|n| (n.action_type, n.payload["id"].clone(), n.result))
        .collect();
    let start = "@thunkOn.audit.onEvent(start)".to_string();
    let success = "@thunkOn.audit.onEvent(success)".to_string();
    let combined = "@thunkOn.audit.onEvent".to_string();
    assert_eq!(
        summary,
        vec![
            (start.clone(), json!(1), None),
            (start, json!(2), None),
            (success.clone(), json!(2), Some(json!("b"))),
            (combined.clone(), json!(2), Some(json!("b"))),
            (success, json!(1), Some(json!("a"))),
            (combined, json!(1), Some(json!("a"))),
        ]
    );
}

#[test]
fn test_registration_appends() {
    let noop = || ReactiveAction::sync(|_, _, _| Ok(Value::Null));
    let model = Model::new()
        .thunk_on("onA", noop())
        .model(
            "one",
            Model::new()
                .thunk_on("onB", noop())
                .model("two", Model::new().thunk_on("onC", noop()).thunk_on("onD", noop())),
        )
        .model("three", Model::new().thunk_on("onE", noop()));
    let (store, _) = build(model);

    let definitions = store.listener_definitions();
    let types: Vec<_> = definitions.iter().map(|d| d.action_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "@thunkOn.onA",
            "@thunkOn.one.onB",
            "@thunkOn.one.two.onC",
            "@thunkOn.one.two.onD",
            "@thunkOn.three.onE",
        ]
    );
    for definition in &definitions {
        assert!(store.action_creator(&definition.action_type).is_some());
    }
    assert_eq!(store.listener_action_creators().creators().len(), 5);
}

#[test]
fn test_helpers_see_live_state() {
    let model = Model::new()
        .model(
            "counter",
            Model::new().state("value", json!(0)).action("bump", |counter, _| {
                let value = counter["value"].as_i64().unwrap_or(0);
                counter["value"] = json!(value + 1);
                true
            }),
        )
        .model(
            "audit",
            Model::new().state("entries", json!(3)).thunk_on(
                "onBump",
                ReactiveAction::sync(|_, _, helpers| {
                    let before = helpers.get_store_state()["counter"]["value"].clone();
                    helpers.dispatch(Notification::new("@action.counter.bump", Value::Null));
                    let after = helpers.get_store_state()["counter"]["value"].clone();
                    Ok(json!({
                        "before": before,
                        "after": after,
                        "local": helpers.get_state(),
                        "path": helpers.meta().path,
                    }))
                }),
            ),
        );
    let (store, log) = build(model);

    let result = store
        .action_creator("@thunkOn.audit.onBump")
        .unwrap()
        .call(Value::Null)
        .unwrap()
        .ready()
        .unwrap();

    assert_eq!(result["before"], json!(0));
    assert_eq!(result["after"], json!(1));
    assert_eq!(result["local"], json!({"entries": 3}));
    assert_eq!(result["path"], json!(["audit", "onBump"]));
    assert_eq!(
        log.types(),
        vec![
            "@thunkOn.audit.onBump(start)",
            "@action.counter.bump",
            "@thunkOn.audit.onBump(success)",
            "@thunkOn.audit.onBump",
        ]
    );
}

#[test]
fn test_handler_gets_sibling_actions() {
    let model = Model::new().model(
        "todos",
        Model::new()
            .state("items", json!([]))
            .action("add", |todos, payload| match todos["items"].as_array_mut() {
                Some(items) => {
                    items.push(payload.clone());
                    true
                }
                None => false,
            })
            .thunk_on(
                "addTwice",
                ReactiveAction::sync(|actions, payload, _| {
                    let add = actions
                        .creator(&["add".to_string()])
                        .cloned()
                        .ok_or_else(|| ThunkError::msg("no add action"))?;
                    add.call(payload.clone())?;
                    add.call(payload)?;
                    Ok(Value::Null)
                }),
            ),
    );
    let (store, _) = build(model);

    store
        .action_creator("@thunkOn.todos.addTwice")
        .unwrap()
        .call(json!("x"))
        .unwrap();

    assert_eq!(store.state()["todos"]["items"], json!(["x", "x"]));
}

#[test]
fn test_dropped_store_is_an_error() {
    let (store, log) = build(audit("onEvent", ReactiveAction::sync(|_, _, _| Ok(Value::Null))));
    let creator = store.action_creator("@thunkOn.audit.onEvent").unwrap();

    drop(store);

    assert_eq!(creator.call(Value::Null).unwrap_err(), ThunkError::StoreDropped);
    assert!(log.notifications().is_empty());
}
