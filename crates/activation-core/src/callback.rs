//! Callback Context Parser
//!
//! Normalizes the two return transports into one [`CallbackContext`]:
//!
//! ```text
//! https://app/?status=approved&external_reference=..   (web redirect)
//! campus://onboarding?status=approved                    (native deep link)
//! ```
//!
//! Parsing never fails loudly. An unparsable URL is logged and treated as
//! "no context".

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ActivationConfig;

/// Query keys owned by the callback contract
pub const CALLBACK_PARAMS: [&str; 3] = ["status", "payment_id", "external_reference"];

/// Payment outcome reported by the external surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Approved,
    Failure,
    Rejected,
    Pending,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Failure => "failure",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
        }
    }

    /// Parse a wire value; unknown values yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "failure" => Some(Self::Failure),
            "rejected" => Some(Self::Rejected),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// Which transport delivered the callback. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Web,
    DeepLink,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Web => "web",
            Self::DeepLink => "deep_link",
        })
    }
}

/// Normalized return signal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
    pub status: Option<PaymentStatus>,
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
    pub transport: Transport,
}

impl CallbackContext {
    pub fn is_approved(&self) -> bool {
        self.status == Some(PaymentStatus::Approved)
    }

    /// Payment explicitly declined
    pub fn is_failed(&self) -> bool {
        matches!(self.status, Some(PaymentStatus::Failure | PaymentStatus::Rejected))
    }

    /// Web adapter over a raw query string (with or without the leading `?`)
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()), Transport::Web)
    }

    /// Web adapter over the full page location
    pub fn from_location(href: &str) -> Option<Self> {
        match Url::parse(href) {
            Ok(url) => Self::from_pairs(url.query_pairs(), Transport::Web),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparsable page location");
                None
            }
        }
    }

    /// Native adapter over a custom-scheme deep link.
    ///
    /// Only links of our scheme whose host (or first path segment) names
    /// the onboarding flow produce a context. `approved` is kept, every
    /// other status collapses to `failure`.
    pub fn from_deep_link(link: &str, config: &ActivationConfig) -> Option<Self> {
        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, transport = %Transport::DeepLink, "Ignoring malformed deep link");
                return None;
            }
        };

        if !url.scheme().eq_ignore_ascii_case(&config.deep_link_scheme) {
            tracing::debug!(scheme = url.scheme(), "Deep link for another scheme");
            return None;
        }

        let destination = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .or_else(|| {
                url.path()
                    .trim_start_matches('/')
                    .split('/')
                    .next()
                    .map(str::to_string)
            })
            .unwrap_or_default();

        if !destination.eq_ignore_ascii_case(&config.onboarding_host) {
            tracing::debug!(destination = %destination, "Deep link does not target onboarding");
            return None;
        }

        let mut context = Self::from_pairs(url.query_pairs(), Transport::DeepLink).unwrap_or(Self {
            status: None,
            payment_id: None,
            external_reference: None,
            transport: Transport::DeepLink,
        });
        if !context.is_approved() {
            context.status = Some(PaymentStatus::Failure);
        }
        Some(context)
    }

    /// In-app route a deep link maps to, carrying the same parameters
    pub fn internal_route(&self, root: &str) -> String {
        let status = if self.is_approved() {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Failure
        };

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("status", status.as_str());
        if let Some(ref id) = self.payment_id {
            query.append_pair("payment_id", id);
        }
        if let Some(ref reference) = self.external_reference {
            query.append_pair("external_reference", reference);
        }
        format!("{root}?{}", query.finish())
    }

    fn from_pairs<'a, I>(pairs: I, transport: Transport) -> Option<Self>
    where
        I: Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    {
        let mut status = None;
        let mut saw_status = false;
        let mut payment_id = None;
        let mut external_reference = None;

        for (key, value) in pairs {
            let value = value.trim();
            match key.as_ref() {
                "status" => {
                    saw_status = true;
                    status = PaymentStatus::parse(value);
                }
                "payment_id" if !value.is_empty() => payment_id = Some(value.to_string()),
                "external_reference" if !value.is_empty() => {
                    external_reference = Some(value.to_string());
                }
                _ => {}
            }
        }

        saw_status.then_some(Self {
            status,
            payment_id,
            external_reference,
            transport,
        })
    }
}

/// Remove the callback parameters from a URL, keeping everything else.
///
/// Returns the path + remaining query + fragment, suitable for
/// `history.replaceState`. `None` if `href` does not parse.
pub fn strip_callback_params(href: &str) -> Option<String> {
    let mut url = Url::parse(href).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !CALLBACK_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let mut relative = url.path().to_string();
    if let Some(query) = url.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    Some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_query_with_reference() {
        let ctx = CallbackContext::from_query(
            "?status=approved&payment_id=123&external_reference=%7B%22tenantId%22%3A%22T1%22%7D",
        )
        .unwrap();
        assert!(ctx.is_approved());
        assert_eq!(ctx.payment_id.as_deref(), Some("123"));
        assert_eq!(ctx.external_reference.as_deref(), Some(r#"{"tenantId":"T1"}"#));
        assert_eq!(ctx.transport, Transport::Web);
    }

    #[test]
    fn test_web_without_status_is_no_context() {
        assert!(CallbackContext::from_query("external_reference=abc").is_none());
        assert!(CallbackContext::from_query("").is_none());
        assert!(CallbackContext::from_location("https://app.test/grades?tab=2").is_none());
    }

    #[test]
    fn test_web_unknown_status_is_absent() {
        let ctx = CallbackContext::from_query("status=weird").unwrap();
        assert_eq!(ctx.status, None);
        assert!(!ctx.is_approved());
    }

    #[test]
    fn test_failed_statuses() {
        let rejected = CallbackContext::from_query("status=rejected").unwrap();
        assert!(rejected.is_failed());
        let pending = CallbackContext::from_query("status=pending").unwrap();
        assert!(!pending.is_failed());
        assert!(!pending.is_approved());
    }

    #[test]
    fn test_deep_link_approved() {
        let config = ActivationConfig::default();
        let ctx = CallbackContext::from_deep_link("campus://onboarding?status=approved&payment_id=9", &config)
            .unwrap();
        assert!(ctx.is_approved());
        assert_eq!(ctx.transport, Transport::DeepLink);
        assert_eq!(ctx.internal_route("/"), "/?status=approved&payment_id=9");
    }

    #[test]
    fn test_deep_link_non_approved_collapses_to_failure() {
        let config = ActivationConfig::default();
        for link in [
            "campus://onboarding?status=pending",
            "campus://onboarding?status=rejected",
            "campus://onboarding",
        ] {
            let ctx = CallbackContext::from_deep_link(link, &config).unwrap();
            assert_eq!(ctx.status, Some(PaymentStatus::Failure), "{link}");
            assert_eq!(ctx.internal_route("/"), "/?status=failure");
        }
    }

    #[test]
    fn test_deep_link_path_form() {
        let config = ActivationConfig::default();
        let ctx = CallbackContext::from_deep_link("campus:///onboarding?status=approved", &config).unwrap();
        assert!(ctx.is_approved());
    }

    #[test]
    fn test_deep_link_other_destination_or_scheme() {
        let config = ActivationConfig::default();
        assert!(CallbackContext::from_deep_link("campus://grades?status=approved", &config).is_none());
        assert!(CallbackContext::from_deep_link("other://onboarding?status=approved", &config).is_none());
    }

    #[test]
    fn test_malformed_links_do_not_panic() {
        let config = ActivationConfig::default();
        assert!(CallbackContext::from_deep_link("::::not a url", &config).is_none());
        assert!(CallbackContext::from_deep_link("", &config).is_none());
        assert!(CallbackContext::from_location("%%%").is_none());
    }

    #[test]
    fn test_strip_callback_params_keeps_others() {
        let stripped = strip_callback_params(
            "https://app.test/?status=approved&impersonate=u1&external_reference=x#top",
        )
        .unwrap();
        assert_eq!(stripped, "/?impersonate=u1#top");

        let stripped = strip_callback_params("https://app.test/?status=approved&payment_id=1").unwrap();
        assert_eq!(stripped, "/");
    }
}
