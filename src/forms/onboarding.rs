use crate::api::OnboardingRequest;
use crate::constants::{EXPERIENCE_LEVELS, ONBOARDING_GOALS};
use crate::utils::{CannonError, CannonResult};

/// Goals and experience picked on the onboarding screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
    goals: Vec<String>,
    experience_level: Option<String>,
}

impl OnboardingForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a goal, or deselect it if already selected
    pub fn toggle_goal(&mut self, goal: &str) -> CannonResult<()> {
        if !ONBOARDING_GOALS.contains(&goal) {
            return Err(CannonError::Validation(format!(
                "Unknown goal '{}' (expected one of: {})",
                goal,
                ONBOARDING_GOALS.join(", ")
            )));
        }

        if let Some(pos) = self.goals.iter().position(|g| g == goal) {
            self.goals.remove(pos);
        } else {
            self.goals.push(goal.to_string());
        }
        Ok(())
    }

    pub fn set_experience(&mut self, level: &str) -> CannonResult<()> {
        if !EXPERIENCE_LEVELS.contains(&level) {
            return Err(CannonError::Validation(format!(
                "Unknown experience level '{}' (expected one of: {})",
                level,
                EXPERIENCE_LEVELS.join(", ")
            )));
        }
        self.experience_level = Some(level.to_string());
        Ok(())
    }

    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    /// Build the request body, refusing an incomplete form
    pub fn to_request(&self) -> CannonResult<OnboardingRequest> {
        if self.goals.is_empty() {
            return Err(CannonError::Validation(
                "Please select at least one goal".to_string(),
            ));
        }

        let experience_level = self.experience_level.clone().ok_or_else(|| {
            CannonError::Validation("Please select your experience level".to_string())
        })?;

        Ok(OnboardingRequest {
            goals: self.goals.clone(),
            experience_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_complete_form() {
        let mut form = OnboardingForm::new();
        form.toggle_goal("jawline").unwrap();
        form.toggle_goal("skin").unwrap();
        form.set_experience("beginner").unwrap();

        let request = form.to_request().unwrap();
        assert_eq!(request.goals, vec!["jawline", "skin"]);
        assert_eq!(request.experience_level, "beginner");
    }

    #[test]
    fn test_toggle_deselects() {
        let mut form = OnboardingForm::new();
        form.toggle_goal("hair").unwrap();
        form.toggle_goal("hair").unwrap();
        assert!(form.goals().is_empty());
    }

    #[test]
    fn test_incomplete_form_is_rejected() {
        let mut form = OnboardingForm::new();
        form.set_experience("advanced").unwrap();
        assert!(matches!(form.to_request(), Err(CannonError::Validation(_))));

        let mut form = OnboardingForm::new();
        form.toggle_goal("posture").unwrap();
        assert!(matches!(form.to_request(), Err(CannonError::Validation(_))));
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        let mut form = OnboardingForm::new();
        assert!(form.toggle_goal("biceps").is_err());
        assert!(form.set_experience("expert").is_err());
        assert!(form.goals().is_empty());
    }
}
