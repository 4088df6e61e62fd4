use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::models::slack::SlackMessage;
use crate::services::api::{ApiError, SlackApi};
use crate::services::reactions;

/// Local view of the invoices channel: the message list, one open thread,
/// and a cache of thread replies already fetched.
pub struct MessageFeed<A: SlackApi> {
    api: Arc<A>,
    messages: Vec<SlackMessage>,
    threads: HashMap<String, Vec<SlackMessage>>,
    selected: Option<String>,
}

impl<A: SlackApi + 'static> MessageFeed<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            messages: Vec::new(),
            threads: HashMap::new(),
            selected: None,
        }
    }

    /// Replace the message list with the channel's current contents.
    pub async fn load(&mut self) -> Result<&[SlackMessage], ApiError> {
        self.messages = self.api.channel_messages().await?;
        tracing::info!(count = self.messages.len(), "Loaded channel messages");
        Ok(&self.messages)
    }

    pub fn messages(&self) -> &[SlackMessage] {
        &self.messages
    }

    /// Select a thread, fetching its replies unless cached.
    pub async fn open_thread(&mut self, thread_ts: &str) -> Result<&[SlackMessage], ApiError> {
        if !self.threads.contains_key(thread_ts) {
            let replies = self.api.thread_replies(thread_ts).await?;
            tracing::debug!(thread_ts, replies = replies.len(), "Fetched thread replies");
            self.threads.insert(thread_ts.to_string(), replies);
        }
        self.selected = Some(thread_ts.to_string());
        Ok(self.selected_thread().unwrap_or_default())
    }

    pub fn selected_thread(&self) -> Option<&[SlackMessage]> {
        let ts = self.selected.as_ref()?;
        self.threads.get(ts).map(Vec::as_slice)
    }

    pub fn close_thread(&mut self) {
        self.selected = None;
    }

    /// Echo a reaction on the message with `ts`, in the channel list and in
    /// any cached thread, then confirm it in the background.
    ///
    /// Returns the updated channel copy (or thread copy if the message is
    /// only in a thread), or `None` when no local message has that `ts`.
    pub fn react(&mut self, ts: &str, name: &str) -> Option<(SlackMessage, JoinHandle<()>)> {
        let mut updated = None;
        let lists = std::iter::once(&mut self.messages).chain(self.threads.values_mut());
        for list in lists {
            for message in list.iter_mut().filter(|m| m.ts == ts) {
                *message = reactions::apply_reaction(message, name);
                if updated.is_none() {
                    updated = Some(message.clone());
                }
            }
        }

        let updated = updated?;
        let confirmation = reactions::confirm(self.api.clone(), ts.to_string(), name.to_string());
        Some((updated, confirmation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::ScriptedApi;

    fn msg(ts: &str, reply_count: u32) -> SlackMessage {
        SlackMessage {
            ts: ts.into(),
            text: format!("message {ts}"),
            reply_count,
            ..Default::default()
        }
    }

    fn api() -> Arc<ScriptedApi> {
        let api = ScriptedApi::default();
        *api.messages.lock().unwrap() = vec![msg("1.0", 1), msg("2.0", 0)];
        api.threads
            .lock()
            .unwrap()
            .insert("1.0".into(), vec![msg("1.0", 1), msg("1.5", 0)]);
        Arc::new(api)
    }

    #[tokio::test]
    async fn test_thread_replies_are_cached() {
        let api = api();
        let mut feed = MessageFeed::new(api.clone());
        feed.load().await.unwrap();
        assert_eq!(feed.messages().len(), 2);

        assert_eq!(feed.open_thread("1.0").await.unwrap().len(), 2);
        feed.close_thread();
        assert!(feed.selected_thread().is_none());

        assert_eq!(feed.open_thread("1.0").await.unwrap().len(), 2);
        assert_eq!(ScriptedApi::count(&api.thread_calls), 1);
    }

    #[tokio::test]
    async fn test_react_updates_list_and_thread() {
        let api = api();
        let mut feed = MessageFeed::new(api.clone());
        feed.load().await.unwrap();
        feed.open_thread("1.0").await.unwrap();

        let (updated, confirmation) = feed.react("1.0", "eyes").unwrap();
        confirmation.await.unwrap();

        assert_eq!(updated.reactions[0].count, 1);
        assert_eq!(feed.messages()[0].reactions.len(), 1);
        assert_eq!(feed.selected_thread().unwrap()[0].reactions.len(), 1);
        assert!(feed.messages()[1].reactions.is_empty());
        assert_eq!(api.reactions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_react_on_unknown_message() {
        let api = api();
        let mut feed = MessageFeed::new(api.clone());
        feed.load().await.unwrap();

        assert!(feed.react("9.9", "eyes").is_none());
        assert!(api.reactions.lock().unwrap().is_empty());
    }
}
