/// Form validation module - Gateway

mod auth;
mod onboarding;

pub use auth::{validate_message, LoginForm, SignupForm};
pub use onboarding::OnboardingForm;
