//! Fires reactive actions when one of their target actions is dispatched

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::action::{Notification, ThunkReturn};
use crate::error::ThunkResult;
use crate::registry::ActionCreator;
use crate::store::References;

/// Call every reactive action that listens to `notification`'s type.
///
/// Each one receives the notification itself as payload. Pending results are
/// driven on the ambient tokio runtime.
pub(crate) fn notify(references: &References, notification: &Notification) {
    let listeners = listeners_for(references, &notification.action_type);
    if listeners.is_empty() {
        return;
    }

    let target = notification.to_value();
    for creator in listeners {
        tracing::trace!(
            listener = %creator.action_type(),
            target = %notification.action_type,
            "firing listener"
        );
        match creator.call(target.clone()) {
            Ok(ThunkReturn::Ready(_)) => {}
            Ok(ThunkReturn::Pending(future)) => spawn_pending(&creator, future),
            Err(error) => tracing::debug!(
                listener = %creator.action_type(),
                error = %error,
                "listener failed"
            ),
        }
    }
}

fn listeners_for(references: &References, action_type: &str) -> Vec<ActionCreator> {
    let plugins_state = references.plugins_state();
    let listener = &plugins_state.listener;
    listener
        .listener_definitions
        .iter()
        .filter(|registered| registered.definition.listens_to(action_type))
        .filter_map(|registered| {
            listener
                .listener_action_creators
                .creator(&registered.path)
                .cloned()
        })
        .collect()
}

fn spawn_pending(creator: &ActionCreator, future: BoxFuture<'static, ThunkResult<Value>>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let listener = creator.action_type().to_string();
            handle.spawn(async move {
                if let Err(error) = future.await {
                    tracing::debug!(listener = %listener, error = %error, "listener failed");
                }
            });
        }
        Err(_) => tracing::warn!(
            listener = %creator.action_type(),
            "no tokio runtime, pending listener dropped"
        ),
    }
}
