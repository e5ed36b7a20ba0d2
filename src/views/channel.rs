use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::api::{CannonApi, ChannelMessage, ChannelMessages};
use crate::forms::validate_message;
use crate::runtime::{Poller, SubmitGuard};
use crate::utils::{CannonError, CannonResult};

#[derive(Debug, Default)]
struct ChannelState {
    name: String,
    is_admin_only: bool,
    messages: Vec<ChannelMessage>,
    /// Bumped by every local post
    revision: u64,
}

impl ChannelState {
    /// Drops pages fetched before the latest local post
    fn apply(&mut self, fetched_at: u64, page: ChannelMessages) {
        if fetched_at != self.revision {
            debug!("channel page predates a local post; discarded");
            return;
        }
        self.name = page.channel_name;
        self.is_admin_only = page.is_admin_only;
        self.messages = page.messages;
    }
}

/// One forum channel, kept fresh by polling while open
pub struct ChannelView {
    api: Arc<dyn CannonApi>,
    channel_id: String,
    viewer_is_admin: bool,
    interval: Duration,
    state: Arc<Mutex<ChannelState>>,
    poller: Option<Poller>,
    posting: SubmitGuard,
}

impl ChannelView {
    pub fn new(
        api: Arc<dyn CannonApi>,
        channel_id: impl Into<String>,
        viewer_is_admin: bool,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            channel_id: channel_id.into(),
            viewer_is_admin,
            interval,
            state: Arc::new(Mutex::new(ChannelState::default())),
            poller: None,
            posting: SubmitGuard::new("Posting message"),
        }
    }

    /// Fetch the channel once without polling
    pub async fn load(&self) -> CannonResult<()> {
        let fetched_at = self.state.lock().revision;
        let page = self.api.get_channel_messages(&self.channel_id).await?;
        self.state.lock().apply(fetched_at, page);
        Ok(())
    }

    /// Load the channel and start polling for new messages
    pub async fn open(&mut self) -> CannonResult<()> {
        self.load().await?;

        let api = self.api.clone();
        let channel_id = self.channel_id.clone();
        let state = self.state.clone();

        self.close();
        self.poller = Some(Poller::spawn(
            self.interval,
            {
                let state = state.clone();
                move || {
                    let api = api.clone();
                    let channel_id = channel_id.clone();
                    let fetched_at = state.lock().revision;
                    async move {
                        let page = api.get_channel_messages(&channel_id).await?;
                        Ok((fetched_at, page))
                    }
                }
            },
            move |(fetched_at, page): (u64, ChannelMessages)| state.lock().apply(fetched_at, page),
        ));
        debug!("polling channel {} every {:?}", self.channel_id, self.interval);
        Ok(())
    }

    /// Stop polling; the buffer keeps its last contents
    pub fn close(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.cancel();
            debug!("stopped polling channel {}", self.channel_id);
        }
    }

    pub fn is_open(&self) -> bool {
        self.poller.as_ref().is_some_and(Poller::is_active)
    }

    /// Admin-only channels accept posts from admins only
    pub fn can_post(&self) -> bool {
        !self.state.lock().is_admin_only || self.viewer_is_admin
    }

    pub async fn post(&self, text: &str) -> CannonResult<ChannelMessage> {
        let text = validate_message(text)?;
        if !self.can_post() {
            return Err(CannonError::Authorization(
                "Only admins can post in this channel".to_string(),
            ));
        }
        let _in_flight = self.posting.try_begin()?;

        let posted = self
            .api
            .send_channel_message(&self.channel_id, text)
            .await?;

        let mut state = self.state.lock();
        state.revision += 1;
        if !state.messages.iter().any(|m| m.id == posted.message.id) {
            state.messages.push(posted.message.clone());
        }
        Ok(posted.message)
    }

    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.state.lock().messages.clone()
    }
}

impl Drop for ChannelView {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockCannonApi, PostedMessage};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message(id: &str, content: &str) -> ChannelMessage {
        ChannelMessage {
            id: id.to_string(),
            channel_id: "ch1".to_string(),
            user_id: "u2".to_string(),
            user_email: "kai@example.com".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            is_admin: false,
        }
    }

    fn page(admin_only: bool, messages: Vec<ChannelMessage>) -> ChannelMessages {
        ChannelMessages {
            messages,
            channel_name: "announcements".to_string(),
            is_admin_only: admin_only,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_polls_and_close_stops() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut api = MockCannonApi::new();
        {
            let calls = calls.clone();
            api.expect_get_channel_messages()
                .withf(|id| id == "ch1")
                .returning(move |_| {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let messages = (0..=n).map(|i| message(&format!("m{}", i), "hi")).collect();
                    Ok(page(false, messages))
                });
        }

        let mut view = ChannelView::new(Arc::new(api), "ch1", false, Duration::from_secs(5));
        view.open().await.unwrap();
        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.name(), "announcements");
        assert!(view.is_open());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(view.messages().len(), 3);

        view.close();
        assert!(!view.is_open());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(view.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_admin_only_channel_rejects_members() {
        let mut api = MockCannonApi::new();
        api.expect_get_channel_messages()
            .returning(|_| Ok(page(true, vec![])));
        api.expect_send_channel_message().never();

        let mut view = ChannelView::new(Arc::new(api), "ch1", false, Duration::from_secs(5));
        view.open().await.unwrap();

        assert!(!view.can_post());
        assert!(view.post("hello").await.unwrap_err().is_authorization());
    }

    #[tokio::test]
    async fn test_admin_posts_are_appended() {
        let mut api = MockCannonApi::new();
        api.expect_get_channel_messages()
            .returning(|_| Ok(page(true, vec![message("m0", "welcome")])));
        api.expect_send_channel_message()
            .withf(|id, text| id == "ch1" && text == "Live at 8pm")
            .times(1)
            .returning(|_, _| {
                Ok(PostedMessage {
                    message: message("m1", "Live at 8pm"),
                })
            });

        let mut view = ChannelView::new(Arc::new(api), "ch1", true, Duration::from_secs(5));
        view.open().await.unwrap();
        assert!(view.can_post());

        let posted = view.post(" Live at 8pm ").await.unwrap();
        assert_eq!(posted.id, "m1");
        let ids: Vec<String> = view.messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m0", "m1"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_post_survives_page_fetched_before_it() {
        let (entered_tx, mut entered) = tokio::sync::mpsc::unbounded_channel();
        let (release, held) = std::sync::mpsc::channel::<()>();
        let mut calls = 0;

        let mut api = MockCannonApi::new();
        api.expect_get_channel_messages().returning(move |_| {
            calls += 1;
            if calls > 1 {
                let _ = entered_tx.send(());
                let _ = held.recv();
            }
            Ok(page(false, vec![message("m0", "welcome")]))
        });
        api.expect_send_channel_message()
            .times(1)
            .returning(|_, _| {
                Ok(PostedMessage {
                    message: message("m1", "hello"),
                })
            });

        let mut view = ChannelView::new(Arc::new(api), "ch1", false, Duration::from_millis(10));
        view.open().await.unwrap();

        // First poll is in flight with a page that predates the post
        entered.recv().await.unwrap();
        view.post("hello").await.unwrap();
        release.send(()).unwrap();

        // The next poll only starts after the previous page reached the sink
        entered.recv().await.unwrap();
        let ids: Vec<String> = view.messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m0", "m1"]);

        view.close();
        drop(release);
    }

    #[test]
    fn test_page_fetched_after_post_replaces_buffer() {
        let mut state = ChannelState::default();
        state.apply(0, page(false, vec![message("m0", "welcome")]));
        state.messages.push(message("m1", "hello"));
        state.revision += 1;

        state.apply(0, page(false, vec![message("m0", "welcome")]));
        assert_eq!(state.messages.len(), 2);

        state.apply(1, page(false, vec![message("m0", "welcome"), message("m1", "hello"), message("m2", "hi")]));
        let ids: Vec<String> = state.messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2"]);
    }
}
