//! Gate outcomes and where their redirects point.

use serde::Serialize;

use crate::config::GateSettings;

/// The result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Continue to the page.
    Allow,
    /// Send the caller to sign in, then back to `return_to`.
    RedirectToLogin { return_to: String },
    RedirectToPaywall,
    /// Send the caller to the authenticated landing page.
    RedirectToLanding,
}

impl Outcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, Outcome::Allow)
    }

    /// Metric / log label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::RedirectToLogin { .. } => "login",
            Outcome::RedirectToPaywall => "paywall",
            Outcome::RedirectToLanding => "landing",
        }
    }

    /// `Location` value for redirect outcomes, `None` for [`Outcome::Allow`].
    pub fn location(&self, paths: &GatePaths) -> Option<String> {
        match self {
            Outcome::Allow => None,
            Outcome::RedirectToLogin { return_to } => {
                let encoded: String = url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
                Some(format!("{}?{}={}", paths.login, paths.return_param, encoded))
            }
            Outcome::RedirectToPaywall => Some(paths.paywall.clone()),
            Outcome::RedirectToLanding => Some(paths.landing.clone()),
        }
    }
}

/// Redirect targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatePaths {
    pub login: String,
    pub landing: String,
    pub paywall: String,
    /// Query parameter carrying the original path on login redirects.
    pub return_param: String,
}

impl GatePaths {
    pub fn from_settings(settings: &GateSettings) -> Self {
        Self {
            login: settings.login_path.clone(),
            landing: settings.landing_path.clone(),
            paywall: settings.paywall_path.clone(),
            return_param: settings.return_param.clone(),
        }
    }
}

impl Default for GatePaths {
    fn default() -> Self {
        Self::from_settings(&GateSettings::default())
    }
}
