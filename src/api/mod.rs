// Gateway module for the remote API - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod traits;
mod types;

// Public re-exports - the ONLY way to access API functionality
pub use client::HttpApiClient;
pub use traits::CannonApi;
#[cfg(test)]
pub use traits::MockCannonApi;
pub use types::{
    AnalyzeResponse, AuthResponse, ChannelMessage, ChannelMessages, ChatHistory, ChatMessage,
    ChatReply, ChatRole, CheckoutSession, Course, CourseEnrollment, CourseList, CourseProgress,
    CourseProgressEntry, CourseStage, CourseTask, Event, EventList, Forum, ForumList, LatestScan,
    Leaderboard, LeaderboardEntry, LiveEvent, LiveEventList, MyRank, OnboardingInfo,
    OnboardingRequest, PostedMessage, ScanHistory, ScanImage, ScanImages, ScanSummary,
    ScanUpload, SubscriptionStatus, TaskCompletion, TaskProgress, User,
};
