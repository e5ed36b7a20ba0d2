use std::sync::Arc;

use crate::api::{CannonApi, HttpApiClient};
use crate::app::Config;
use crate::gate::GateRouter;
use crate::session::{CredentialStore, SessionProvider};
use crate::utils::CannonResult;
use crate::views::{ChannelView, ChatView};

/// Everything a running client needs, built once from configuration
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Remote API shared by the provider and the views
    pub api: Arc<dyn CannonApi>,
    /// Session owner
    pub session: SessionProvider,
}

impl AppState {
    /// Wire up the HTTP client, credential store and session provider
    pub fn new(config: Config) -> CannonResult<Self> {
        let api: Arc<dyn CannonApi> = Arc::new(HttpApiClient::new(&config.api)?);
        let store = CredentialStore::from_config(&config.session)?;
        Ok(Self::with_parts(config, api, store))
    }

    /// Assemble from explicit parts
    pub fn with_parts(config: Config, api: Arc<dyn CannonApi>, store: CredentialStore) -> Self {
        let session = SessionProvider::new(api.clone(), store, &config);
        Self {
            config,
            api,
            session,
        }
    }

    pub fn router(&self) -> GateRouter {
        self.session.router()
    }

    pub fn chat_view(&self) -> ChatView {
        ChatView::new(self.api.clone())
    }

    pub fn channel_view(&self, channel_id: &str, viewer_is_admin: bool) -> ChannelView {
        ChannelView::new(
            self.api.clone(),
            channel_id,
            viewer_is_admin,
            self.config.polling.channel_interval(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockCannonApi;
    use crate::gate::AccessState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_parts_share_one_session() {
        let dir = TempDir::new().unwrap();
        let mut api = MockCannonApi::new();
        api.expect_set_token().returning(|_| ());

        let state = AppState::with_parts(
            Config::default(),
            Arc::new(api),
            CredentialStore::new(dir.path().join("session.toml")),
        );
        let router = state.router();
        assert_eq!(router.state(), AccessState::Loading);

        state.session.restore().await.unwrap();
        assert_eq!(router.state(), AccessState::Unauthenticated);
    }
}
