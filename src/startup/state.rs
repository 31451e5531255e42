//! Startup states and their allowed transitions.

use serde::Serialize;
use std::fmt;

/// Position of a session in the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupState {
    #[default]
    Idle,
    ConfigLoading,
    StylesLoading,
    ModulesLoading,
    AwaitingDeferralSignal,
    Typesetting,
    Ready,
}

impl StartupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartupState::Idle => "idle",
            StartupState::ConfigLoading => "config_loading",
            StartupState::StylesLoading => "styles_loading",
            StartupState::ModulesLoading => "modules_loading",
            StartupState::AwaitingDeferralSignal => "awaiting_deferral_signal",
            StartupState::Typesetting => "typesetting",
            StartupState::Ready => "ready",
        }
    }

    /// States reachable in one step.
    ///
    /// `Idle` is reachable from the cancellable states through abort.
    pub fn exits(&self) -> &'static [StartupState] {
        use StartupState::*;
        match self {
            Idle => &[ConfigLoading],
            ConfigLoading => &[StylesLoading, Idle],
            StylesLoading => &[ModulesLoading, Idle],
            ModulesLoading => &[AwaitingDeferralSignal, Typesetting, Ready],
            AwaitingDeferralSignal => &[Typesetting, Ready],
            Typesetting => &[Ready],
            Ready => &[],
        }
    }

    pub fn is_valid_transition(&self, to: StartupState) -> bool {
        self.exits().contains(&to)
    }

    /// Terminal for the startup sequence.
    pub fn is_terminal(&self) -> bool {
        self.exits().is_empty()
    }

    /// Whether a session in this state may still be aborted; no module side
    /// effects have been applied yet.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, StartupState::ConfigLoading | StartupState::StylesLoading)
    }
}

impl fmt::Display for StartupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
