//! Endpoint categories and service tiers.

use serde::{Deserialize, Serialize};

/// Sensitivity class of a protected endpoint.
///
/// Each category selects one entry of the policy table. The set is closed so a
/// misspelled category fails to compile (or fails config parsing) instead of
/// silently running unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointCategory {
    Login,
    Signup,
    PasswordReset,
    SocialAuth,
    Public,
    User,
    Sensitive,
    Admin,
}

impl EndpointCategory {
    /// Every category, in table order.
    pub const ALL: [EndpointCategory; 8] = [
        EndpointCategory::Login,
        EndpointCategory::Signup,
        EndpointCategory::PasswordReset,
        EndpointCategory::SocialAuth,
        EndpointCategory::Public,
        EndpointCategory::User,
        EndpointCategory::Sensitive,
        EndpointCategory::Admin,
    ];

    /// Name used in logs, metrics and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::Login => "login",
            EndpointCategory::Signup => "signup",
            EndpointCategory::PasswordReset => "password-reset",
            EndpointCategory::SocialAuth => "social-auth",
            EndpointCategory::Public => "public",
            EndpointCategory::User => "user",
            EndpointCategory::Sensitive => "sensitive",
            EndpointCategory::Admin => "admin",
        }
    }

    /// Category actually enforced for a caller of the given tier.
    ///
    /// Administrators hitting `user` endpoints are measured against the admin
    /// quota; every other combination is left as is.
    pub fn effective_for(self, tier: Tier) -> EndpointCategory {
        match (tier, self) {
            (Tier::Admin, EndpointCategory::User) => EndpointCategory::Admin,
            (_, category) => category,
        }
    }
}

impl std::fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Privilege class of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Anonymous,
    User,
    Admin,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Anonymous => "anonymous",
            Tier::User => "user",
            Tier::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
