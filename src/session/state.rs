use serde::{Deserialize, Serialize};

use crate::api::User;

/// Snapshot of the signed-in user's progress through the app
///
/// This is the only input the access gate looks at. Every field except
/// `is_loading` is derived from the backend's user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Stored credentials are still being checked against the API
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub onboarding_completed: bool,
    pub first_scan_completed: bool,
    pub is_paid: bool,
}

impl Session {
    /// The state before stored credentials have been checked
    pub const fn restoring() -> Self {
        Self {
            is_loading: true,
            is_authenticated: false,
            onboarding_completed: false,
            first_scan_completed: false,
            is_paid: false,
        }
    }

    /// No user; every progress flag is discarded
    pub const fn signed_out() -> Self {
        Self {
            is_loading: false,
            is_authenticated: false,
            onboarding_completed: false,
            first_scan_completed: false,
            is_paid: false,
        }
    }

    /// Derive the session for a user the API just returned
    pub fn from_user(user: &User) -> Self {
        Self {
            is_loading: false,
            is_authenticated: true,
            onboarding_completed: user.onboarding_completed(),
            first_scan_completed: user.first_scan_completed,
            is_paid: user.is_paid,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::restoring()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OnboardingInfo;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_user_copies_progress() {
        let user = User {
            id: "u1".to_string(),
            email: "sam@example.com".to_string(),
            is_paid: false,
            is_admin: false,
            first_scan_completed: true,
            onboarding: Some(OnboardingInfo {
                completed: true,
                goals: vec!["skin".to_string()],
                experience_level: Some("beginner".to_string()),
            }),
        };

        assert_eq!(
            Session::from_user(&user),
            Session {
                is_loading: false,
                is_authenticated: true,
                onboarding_completed: true,
                first_scan_completed: true,
                is_paid: false,
            }
        );
    }

    #[test]
    fn test_default_is_restoring() {
        assert!(Session::default().is_loading);
        assert!(!Session::signed_out().is_loading);
        assert!(!Session::signed_out().is_authenticated);
    }
}
