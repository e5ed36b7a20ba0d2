use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Navigation targets a screen stack can be built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    Login,
    Signup,
    Onboarding,
    FeaturesIntro,
    FaceScan,
    BlurredResult,
    Payment,
    /// The tabbed main app (see [`MainTab`])
    MainApp,
}

impl Screen {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Signup => "Signup",
            Self::Onboarding => "Onboarding",
            Self::FeaturesIntro => "Features Intro",
            Self::FaceScan => "Face Scan",
            Self::BlurredResult => "Blurred Result",
            Self::Payment => "Payment",
            Self::MainApp => "Main App",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Bottom tabs inside [`Screen::MainApp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MainTab {
    Home,
    Chat,
    /// Not a page of its own; opens the face scan for a rescan
    Scan,
    Forums,
    Rank,
}

impl MainTab {
    pub const ALL: [MainTab; 5] = [
        MainTab::Home,
        MainTab::Chat,
        MainTab::Scan,
        MainTab::Forums,
        MainTab::Rank,
    ];

    /// Tab bar label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Chat => "Cannon",
            Self::Scan => "Scan",
            Self::Forums => "Forums",
            Self::Rank => "Rank",
        }
    }

    /// Screen that has to be reachable for this tab to open
    pub fn target(&self) -> Screen {
        match self {
            Self::Scan => Screen::FaceScan,
            _ => Screen::MainApp,
        }
    }
}

/// The active access state, one variant per allowed-target set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessState {
    /// Session is being restored (or restore failed); nothing is navigable
    Loading,
    Unauthenticated,
    Onboarding,
    FirstScan,
    Paywalled,
    FullAccess,
}

impl AccessState {
    /// Evaluate a session. Checks run in priority order and the first match wins.
    pub fn evaluate(session: &Session) -> Self {
        if session.is_loading {
            Self::Loading
        } else if !session.is_authenticated {
            Self::Unauthenticated
        } else if !session.onboarding_completed {
            Self::Onboarding
        } else if !session.first_scan_completed {
            Self::FirstScan
        } else if !session.is_paid {
            Self::Paywalled
        } else {
            Self::FullAccess
        }
    }

    /// Allowed navigation targets; the first entry is the stack root
    pub fn allowed_targets(&self) -> &'static [Screen] {
        match self {
            Self::Loading => &[],
            Self::Unauthenticated => &[Screen::Login, Screen::Signup],
            Self::Onboarding => &[Screen::Onboarding, Screen::FeaturesIntro],
            Self::FirstScan => &[Screen::FaceScan, Screen::BlurredResult, Screen::Payment],
            Self::Paywalled => &[Screen::BlurredResult, Screen::Payment],
            Self::FullAccess => &[Screen::MainApp, Screen::FaceScan],
        }
    }

    pub fn allows(&self, screen: Screen) -> bool {
        self.allowed_targets().contains(&screen)
    }

    /// Root of the rebuilt screen stack
    pub fn root(&self) -> Option<Screen> {
        self.allowed_targets().first().copied()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Unauthenticated => "Signed out",
            Self::Onboarding => "Onboarding",
            Self::FirstScan => "First scan",
            Self::Paywalled => "Paywalled",
            Self::FullAccess => "Full access",
        }
    }
}

impl std::fmt::Display for AccessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
