use async_trait::async_trait;

use super::types::{
    AnalyzeResponse, AuthResponse, ChannelMessages, ChatHistory, ChatReply, CheckoutSession,
    CourseEnrollment, CourseList, CourseProgress, EventList, ForumList, Leaderboard,
    LatestScan, LiveEventList, MyRank, OnboardingRequest, PostedMessage, ScanHistory,
    ScanImages, ScanUpload, SubscriptionStatus, TaskCompletion, TaskProgress, User,
};
use crate::utils::CannonResult;

/// Operations the remote Cannon API offers to the app
///
/// Everything session-scoped uses the bearer token installed with
/// [`CannonApi::set_token`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CannonApi: Send + Sync {
    /// Install or clear the bearer token used by subsequent calls
    fn set_token(&self, token: Option<String>);

    // Auth
    async fn login(&self, email: &str, password: &str) -> CannonResult<AuthResponse>;
    async fn signup(&self, email: &str, password: &str) -> CannonResult<AuthResponse>;
    /// Fetch the signed-in user; used for session restore and refresh
    async fn current_user(&self) -> CannonResult<User>;

    // Onboarding
    async fn save_onboarding(&self, request: &OnboardingRequest) -> CannonResult<()>;

    // Scans
    async fn upload_scan_images(&self, images: &ScanImages) -> CannonResult<ScanUpload>;
    async fn analyze_scan(&self, scan_id: &str) -> CannonResult<AnalyzeResponse>;
    async fn get_latest_scan(&self) -> CannonResult<LatestScan>;
    async fn get_scan_history(&self, limit: u32) -> CannonResult<ScanHistory>;

    // Courses
    async fn get_courses(&self) -> CannonResult<CourseList>;
    async fn get_course_progress(&self) -> CannonResult<CourseProgress>;
    async fn start_course(&self, course_id: &str) -> CannonResult<CourseEnrollment>;
    async fn complete_task(
        &self,
        course_id: &str,
        completion: &TaskCompletion,
    ) -> CannonResult<TaskProgress>;

    // Events
    async fn get_events(&self) -> CannonResult<EventList>;
    async fn get_live_events(&self) -> CannonResult<LiveEventList>;

    // Chat
    async fn get_chat_history(&self) -> CannonResult<ChatHistory>;
    async fn send_chat_message(&self, text: &str) -> CannonResult<ChatReply>;

    // Forums
    async fn get_forums(&self) -> CannonResult<ForumList>;
    async fn get_channel_messages(&self, channel_id: &str) -> CannonResult<ChannelMessages>;
    async fn send_channel_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> CannonResult<PostedMessage>;

    // Leaderboard
    async fn get_leaderboard(&self) -> CannonResult<Leaderboard>;
    async fn get_my_rank(&self) -> CannonResult<MyRank>;

    // Payments
    async fn create_checkout_session(
        &self,
        return_url: &str,
        cancel_url: &str,
    ) -> CannonResult<CheckoutSession>;
    /// Development-only bypass that activates a subscription without checkout
    async fn test_activate_subscription(&self) -> CannonResult<SubscriptionStatus>;
}
