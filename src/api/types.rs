use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ===== Auth =====

/// Account as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub first_scan_completed: bool,
    #[serde(default)]
    pub onboarding: Option<OnboardingInfo>,
}

impl User {
    pub fn onboarding_completed(&self) -> bool {
        self.onboarding.as_ref().is_some_and(|o| o.completed)
    }
}

/// Onboarding answers stored on the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingInfo {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Token plus the user it was issued for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// ===== Onboarding =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub goals: Vec<String>,
    pub experience_level: String,
}

// ===== Scans =====

/// One captured photo ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ScanImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ScanImage {
    pub fn jpeg(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "image/jpeg".to_string(),
            data: data.into(),
        }
    }
}

/// The three photos a face scan needs
#[derive(Debug, Clone, PartialEq)]
pub struct ScanImages {
    pub front: ScanImage,
    pub left: ScanImage,
    pub right: ScanImage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanUpload {
    pub scan_id: String,
    #[serde(default)]
    pub images: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub message: String,
    pub scan_id: String,
}

/// Most recent scan; unpaid users only get a locked summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestScan {
    pub id: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: HashMap<String, String>,
    #[serde(default)]
    pub is_unlocked: bool,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
}

impl LatestScan {
    /// Overall score, whether the analysis is full or locked
    pub fn overall_score(&self) -> Option<f64> {
        let analysis = self.analysis.as_ref()?;
        analysis
            .get("overall_score")
            .and_then(|v| v.as_f64())
            .or_else(|| {
                analysis
                    .get("metrics")
                    .and_then(|m| m.get("overall_score"))
                    .and_then(|v| v.as_f64())
            })
    }

    pub fn is_locked(&self) -> bool {
        self.analysis
            .as_ref()
            .and_then(|a| a.get("locked"))
            .and_then(|v| v.as_bool())
            .unwrap_or(!self.is_unlocked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub id: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub overall_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanHistory {
    #[serde(default)]
    pub scans: Vec<ScanSummary>,
}

// ===== Courses =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseTask {
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStage {
    pub stage_number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<CourseTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub estimated_weeks: u32,
    #[serde(default)]
    pub stages: Vec<CourseStage>,
}

impl Course {
    pub fn total_tasks(&self) -> usize {
        self.stages.iter().map(|s| s.tasks.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseList {
    #[serde(default)]
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgressEntry {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    #[serde(default)]
    pub progress: Vec<CourseProgressEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub message: String,
    pub progress_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub task_id: String,
    pub stage_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub progress_percentage: f64,
}

// ===== Events =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub tiktok_link: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_live: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub id: String,
    pub title: String,
    pub tiktok_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveEventList {
    #[serde(default)]
    pub events: Vec<LiveEvent>,
}

// ===== Chat =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

// ===== Forums =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_admin_only: bool,
    #[serde(default)]
    pub message_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForumList {
    #[serde(default)]
    pub forums: Vec<Forum>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    pub content: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Messages of one channel, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessages {
    #[serde(default)]
    pub messages: Vec<ChannelMessage>,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub is_admin_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedMessage {
    pub message: ChannelMessage,
}

// ===== Leaderboard =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub level: f64,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub improvement_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub total_users: u64,
}

/// Caller's own standing; `rank` is absent until a scan has been analyzed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MyRank {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub streak_days: Option<u32>,
    #[serde(default)]
    pub improvement_percentage: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

// ===== Payments =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub is_active: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

// ===== Timestamps =====

/// The API writes naive UTC timestamps (no offset); accept those and RFC 3339
mod timestamp {
    use super::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ===== Errors =====

/// FastAPI-style error body
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Flatten `detail`, which is a string for raised errors and a list for validation errors
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .map(str::to_string)
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scan_with(analysis: serde_json::Value, unlocked: bool) -> LatestScan {
        serde_json::from_value(json!({
            "id": "s1",
            "created_at": "2025-01-01T00:00:00Z",
            "images": {},
            "is_unlocked": unlocked,
            "analysis": analysis,
        }))
        .unwrap()
    }

    #[test]
    fn test_locked_analysis_exposes_only_overall_score() {
        let scan = scan_with(json!({"overall_score": 6.5, "locked": true}), false);
        assert_eq!(scan.overall_score(), Some(6.5));
        assert!(scan.is_locked());
    }

    #[test]
    fn test_full_analysis_reads_nested_score() {
        let scan = scan_with(json!({"metrics": {"overall_score": 7.25}}), true);
        assert_eq!(scan.overall_score(), Some(7.25));
        assert!(!scan.is_locked());
    }

    #[test]
    fn test_user_without_onboarding_block() {
        let user: User =
            serde_json::from_value(json!({"id": "u1", "email": "a@b.co"})).unwrap();
        assert!(!user.onboarding_completed());
        assert!(!user.is_paid);
    }

    #[test]
    fn test_my_rank_before_first_scan() {
        let rank: MyRank = serde_json::from_value(
            json!({"rank": null, "total_users": 12, "message": "Complete a scan to join"}),
        )
        .unwrap();
        assert_eq!(rank.rank, None);
        assert_eq!(rank.total_users, 12);
    }

    #[test]
    fn test_naive_timestamps_are_read_as_utc() {
        let page: ChannelMessages = serde_json::from_str(
            r#"{"messages":[{"id":"m1","channel_id":"ch1","user_id":"u2","content":"hi",
                "created_at":"2025-03-01T10:00:00.123456"}],
                "channel_name":"general","is_admin_only":false}"#,
        )
        .unwrap();
        let created = page.messages[0].created_at;
        assert_eq!(created.to_rfc3339(), "2025-03-01T10:00:00.123456+00:00");

        let scan: LatestScan = serde_json::from_value(json!({
            "id": "s1",
            "created_at": "2025-03-01T10:00:00.123456",
            "analysis": {"overall_score": 6.0, "locked": true},
        }))
        .unwrap();
        assert_eq!(scan.created_at, created);

        let history: ScanHistory = serde_json::from_value(json!({
            "scans": [{"id": "s1", "created_at": "2025-03-01T10:00:00", "overall_score": 7.0}]
        }))
        .unwrap();
        assert_eq!(history.scans[0].created_at.to_rfc3339(), "2025-03-01T10:00:00+00:00");

        let events: EventList = serde_json::from_value(json!({
            "events": [{"id": "e1", "title": "Q&A", "tiktok_link": "https://tiktok.com/@cannon",
                        "scheduled_at": "2025-03-02T18:30:00"}]
        }))
        .unwrap();
        assert_eq!(events.events[0].scheduled_at.to_rfc3339(), "2025-03-02T18:30:00+00:00");

        let status: SubscriptionStatus = serde_json::from_value(json!({
            "is_active": true,
            "current_period_end": "2025-04-01T00:00:00"
        }))
        .unwrap();
        assert!(status.current_period_end.is_some());
    }

    #[test]
    fn test_offset_timestamps_still_parse() {
        let parsed = timestamp::parse("2025-03-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T10:00:00+00:00");
        assert!(timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn test_error_body_flattens_validation_list() {
        let body: ErrorBody = serde_json::from_value(json!({
            "detail": [{"msg": "field required"}, {"msg": "value is not a valid email"}]
        }))
        .unwrap();
        assert_eq!(
            body.message().as_deref(),
            Some("field required; value is not a valid email")
        );
    }

    #[test]
    fn test_course_total_tasks() {
        let course: Course = serde_json::from_value(json!({
            "id": "c1",
            "title": "Jawline",
            "category": "jawline",
            "stages": [
                {"stage_number": 1, "title": "Basics", "tasks": [
                    {"task_id": "t1", "title": "Chew"},
                    {"task_id": "t2", "title": "Mew"}
                ]},
                {"stage_number": 2, "title": "More", "tasks": [
                    {"task_id": "t3", "title": "Posture"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(course.total_tasks(), 3);
    }
}
