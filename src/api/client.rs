use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::CannonApi;
use super::types::{
    AnalyzeResponse, AuthResponse, ChannelMessages, ChatHistory, ChatReply, CheckoutRequest,
    CheckoutSession, CourseEnrollment, CourseList, CourseProgress, Credentials, ErrorBody,
    EventList, ForumList, LatestScan, Leaderboard, LiveEventList, MyRank, OnboardingRequest,
    PostedMessage, ScanHistory, ScanImage, ScanImages, ScanUpload, SubscriptionStatus,
    TaskCompletion, TaskProgress, User,
};
use crate::app::ApiConfig;
use crate::constants::SCAN_ANALYSIS_TIMEOUT_SECS;
use crate::utils::{CannonError, CannonResult};

/// reqwest-backed implementation of [`CannonApi`]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpApiClient {
    /// Create a client for the configured API
    pub fn new(config: &ApiConfig) -> CannonResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CannonError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, url);

        if let Some(token) = self.token.read().as_deref() {
            request = request.bearer_auth(token);
        }

        request
    }

    /// Send a request and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> CannonResult<T> {
        let response = Self::checked(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(CannonError::from)
    }

    /// Send a request whose body we don't need
    async fn send_empty(&self, request: RequestBuilder) -> CannonResult<()> {
        Self::checked(request).await.map(|_| ())
    }

    async fn checked(request: RequestBuilder) -> CannonResult<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            warn!("request failed before a response arrived: {}", e);
            CannonError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message())
            .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()));

        debug!("API responded {}: {:?}", status, detail);
        Err(CannonError::from_status(status, detail))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> CannonResult<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> CannonResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    fn image_part(image: &ScanImage) -> CannonResult<multipart::Part> {
        multipart::Part::bytes(image.data.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| CannonError::Validation(format!("Invalid image type: {}", e)))
    }
}

#[async_trait]
impl CannonApi for HttpApiClient {
    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    async fn login(&self, email: &str, password: &str) -> CannonResult<AuthResponse> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/auth/login", &credentials).await
    }

    async fn signup(&self, email: &str, password: &str) -> CannonResult<AuthResponse> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/auth/signup", &credentials).await
    }

    async fn current_user(&self) -> CannonResult<User> {
        self.get("/auth/me").await
    }

    async fn save_onboarding(&self, request: &OnboardingRequest) -> CannonResult<()> {
        self.send_empty(self.request(Method::POST, "/users/onboarding").json(request))
            .await
    }

    async fn upload_scan_images(&self, images: &ScanImages) -> CannonResult<ScanUpload> {
        let form = multipart::Form::new()
            .part("front", Self::image_part(&images.front)?)
            .part("left", Self::image_part(&images.left)?)
            .part("right", Self::image_part(&images.right)?);

        self.send(self.request(Method::POST, "/scans/upload").multipart(form))
            .await
    }

    async fn analyze_scan(&self, scan_id: &str) -> CannonResult<AnalyzeResponse> {
        let request = self
            .request(Method::POST, &format!("/scans/{}/analyze", scan_id))
            .timeout(Duration::from_secs(SCAN_ANALYSIS_TIMEOUT_SECS));
        self.send(request).await
    }

    async fn get_latest_scan(&self) -> CannonResult<LatestScan> {
        self.get("/scans/latest").await
    }

    async fn get_scan_history(&self, limit: u32) -> CannonResult<ScanHistory> {
        let request = self
            .request(Method::GET, "/scans/history")
            .query(&[("limit", limit)]);
        self.send(request).await
    }

    async fn get_courses(&self) -> CannonResult<CourseList> {
        self.get("/courses").await
    }

    async fn get_course_progress(&self) -> CannonResult<CourseProgress> {
        self.get("/courses/progress/current").await
    }

    async fn start_course(&self, course_id: &str) -> CannonResult<CourseEnrollment> {
        self.send(self.request(Method::POST, &format!("/courses/{}/start", course_id)))
            .await
    }

    async fn complete_task(
        &self,
        course_id: &str,
        completion: &TaskCompletion,
    ) -> CannonResult<TaskProgress> {
        let request = self
            .request(Method::PUT, &format!("/courses/{}/complete-task", course_id))
            .json(completion);
        self.send(request).await
    }

    async fn get_events(&self) -> CannonResult<EventList> {
        self.get("/events").await
    }

    async fn get_live_events(&self) -> CannonResult<LiveEventList> {
        self.get("/events/live").await
    }

    async fn get_chat_history(&self) -> CannonResult<ChatHistory> {
        self.get("/chat/history").await
    }

    async fn send_chat_message(&self, text: &str) -> CannonResult<ChatReply> {
        self.post("/chat/send", &serde_json::json!({ "message": text }))
            .await
    }

    async fn get_forums(&self) -> CannonResult<ForumList> {
        self.get("/forums").await
    }

    async fn get_channel_messages(&self, channel_id: &str) -> CannonResult<ChannelMessages> {
        self.get(&format!("/forums/{}/messages", channel_id)).await
    }

    async fn send_channel_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> CannonResult<PostedMessage> {
        self.post(
            &format!("/forums/{}/messages", channel_id),
            &serde_json::json!({ "content": text }),
        )
        .await
    }

    async fn get_leaderboard(&self) -> CannonResult<Leaderboard> {
        self.get("/leaderboard").await
    }

    async fn get_my_rank(&self) -> CannonResult<MyRank> {
        self.get("/leaderboard/me").await
    }

    async fn create_checkout_session(
        &self,
        return_url: &str,
        cancel_url: &str,
    ) -> CannonResult<CheckoutSession> {
        let request = CheckoutRequest {
            success_url: return_url.to_string(),
            cancel_url: cancel_url.to_string(),
        };
        self.post("/payments/create-checkout", &request).await
    }

    async fn test_activate_subscription(&self) -> CannonResult<SubscriptionStatus> {
        self.send(self.request(Method::POST, "/payments/test-activate"))
            .await
    }
}
