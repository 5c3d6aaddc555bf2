//! External Reference
//!
//! The opaque string an initiator attaches to a checkout so the return
//! path can tell which tenant paid.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Placeholder emitted when an id was missing at checkout time
pub const UNKNOWN_ID: &str = "unknown";

/// Plan family carried in the reference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    #[default]
    Pro,
}

impl PlanType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }
}

/// Structured reference payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalReference {
    pub user_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub plan_type: PlanType,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default)]
    pub trial_days: u32,
}

impl ExternalReference {
    /// Missing ids are encoded as [`UNKNOWN_ID`]
    pub fn new(user_id: Option<&str>, tenant_id: Option<&str>, plan_type: PlanType) -> Self {
        let or_unknown = |v: Option<&str>| {
            v.filter(|s| !s.is_empty()).unwrap_or(UNKNOWN_ID).to_string()
        };
        Self {
            user_id: or_unknown(user_id),
            tenant_id: or_unknown(tenant_id),
            plan_type,
            is_trial: false,
            trial_days: 0,
        }
    }

    #[must_use]
    pub const fn with_trial(mut self, days: u32) -> Self {
        self.is_trial = true;
        self.trial_days = days;
        self
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
