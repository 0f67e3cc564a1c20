use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Display fields shown in the dashboard header for the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    /// Expiry as a unix timestamp, when the token carries one
    pub expires_at: Option<i64>,
}

impl SessionIdentity {
    pub fn anonymous() -> Self {
        Self {
            name: "Anonymous".to_string(),
            email: None,
            picture: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.email.is_none() && self.name == "Anonymous"
    }

    /// Decode the identity from a JWT bearer token.
    ///
    /// The signature is not checked (the API does that); this only reads the
    /// payload for display. Any malformed token yields the anonymous identity.
    #[must_use]
    pub fn decode(token: &str) -> Self {
        match decode_claims(token) {
            Some(claims) => claims.into_identity(),
            None => {
                tracing::warn!("could not decode session token payload, showing anonymous identity");
                Self::anonymous()
            }
        }
    }

    /// `true` when the token carried an expiry that is before `now` (unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    sub: Option<serde_json::Value>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

impl Claims {
    fn into_identity(self) -> SessionIdentity {
        let sub = self.sub.and_then(|s| match s {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let name = self
            .name
            .or(self.username)
            .or(sub)
            .or_else(|| self.email.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());

        SessionIdentity {
            name,
            email: self.email,
            picture: self.picture,
            expires_at: self.exp,
        }
    }
}

fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.trim().split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}
