use super::errors::CannonError;

/// User actions that can surface a failure notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Signup,
    Onboarding,
    Scan,
    Checkout,
    TestActivation,
    SendMessage,
    Load,
}

impl Action {
    fn title(&self) -> &'static str {
        match self {
            Self::Login => "Login Failed",
            Self::Signup => "Signup Failed",
            _ => "Error",
        }
    }

    fn fallback(&self) -> &'static str {
        match self {
            Self::Login => "Invalid credentials",
            Self::Signup => "Could not create account",
            Self::Onboarding => "Could not save onboarding data",
            Self::Scan => "Failed to analyze photos",
            Self::Checkout => "Could not start checkout",
            Self::TestActivation => "Could not activate subscription",
            Self::SendMessage => "Could not send message",
            Self::Load => "Could not load data",
        }
    }
}

/// A dismissable message shown to the user after a failed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    /// Build the notice for a failed action
    ///
    /// Validation problems are reported verbatim. Server-provided detail is shown
    /// for auth flows; everything else falls back to the action's generic text.
    pub fn for_failure(action: Action, err: &CannonError) -> Self {
        let message = match err {
            CannonError::Validation(msg) => {
                return Self {
                    title: "Error".to_string(),
                    message: msg.clone(),
                }
            }
            CannonError::Busy(_) => err.detail(),
            CannonError::Authorization(msg) | CannonError::Server { message: msg, .. }
                if matches!(action, Action::Login | Action::Signup) =>
            {
                msg.clone()
            }
            _ => action.fallback().to_string(),
        };

        Self {
            title: action.title().to_string(),
            message,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_shows_server_detail() {
        let err = CannonError::Authorization("Incorrect email or password".into());
        let notice = Notice::for_failure(Action::Login, &err);
        assert_eq!(notice.title, "Login Failed");
        assert_eq!(notice.message, "Incorrect email or password");
    }

    #[test]
    fn test_network_failure_uses_fallback() {
        let err = CannonError::Network("connection refused".into());
        assert_eq!(
            Notice::for_failure(Action::Signup, &err).message,
            "Could not create account"
        );
        assert_eq!(
            Notice::for_failure(Action::Checkout, &err).message,
            "Could not start checkout"
        );
    }

    #[test]
    fn test_validation_is_verbatim() {
        let err = CannonError::Validation("Passwords do not match".into());
        let notice = Notice::for_failure(Action::Signup, &err);
        assert_eq!(notice.title, "Error");
        assert_eq!(notice.message, "Passwords do not match");
    }
}
