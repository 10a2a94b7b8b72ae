//! Interactive terminal vs CI detection

use std::io::IsTerminal;

/// Variables whose presence marks a CI run
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Forces plain line output even on a terminal (e.g. under a log collector)
const PLAIN_VAR: &str = "TILAWAH_PLAIN";

/// Decides between cliclack output and plain lines
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    auto_yes: bool,
}

impl UiContext {
    /// Detect from the attached terminals and the process environment
    pub fn detect() -> Self {
        let terminals = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        Self {
            interactive: terminals && !plain_requested(|name| std::env::var_os(name).is_some()),
            auto_yes: false,
        }
    }

    /// Plain output, prompts fall back to their defaults
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    /// Approve every prompt (`--yes`)
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Spinners, bars and colors
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

fn plain_requested(is_set: impl Fn(&str) -> bool) -> bool {
    is_set(PLAIN_VAR) || CI_VARS.iter().any(|name| is_set(name))
}
