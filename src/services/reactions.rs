use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::slack::{Reaction, SlackMessage};
use crate::services::api::SlackApi;

/// Local copy of `message` with `name` applied by the current operator.
///
/// An existing reaction gains one count and is marked as ours; a new one is
/// appended with count 1. Every other reaction is left as it was.
pub fn apply_reaction(message: &SlackMessage, name: &str) -> SlackMessage {
    let mut updated = message.clone();
    match updated.reactions.iter_mut().find(|r| r.name == name) {
        Some(existing) => {
            existing.count += 1;
            existing.me = true;
        }
        None => updated.reactions.push(Reaction {
            name: name.to_string(),
            count: 1,
            me: true,
        }),
    }
    updated
}

/// Send the reaction to the backend without waiting on it. The local copy
/// is not rolled back on failure; the failure is only logged.
pub fn confirm<A: SlackApi + 'static>(api: Arc<A>, ts: String, name: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match api.react(&ts, &name).await {
            Ok(()) => tracing::debug!(ts = %ts, reaction = %name, "Reaction recorded"),
            Err(e) => tracing::warn!(ts = %ts, reaction = %name, error = %e, "Failed to record reaction"),
        }
    })
}
