//! Caller identity handed to the core by the authentication layer.
//!
//! The portal does not authenticate anyone itself. Upstream middleware resolves the session and
//! forwards the result as two headers, which are trusted as-is.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerRole {
    Admin,
    Agent,
    User,
    Anonymous,
}

impl CallerRole {
    pub const fn label(self) -> &'static str {
        match self {
            CallerRole::Admin => "admin",
            CallerRole::Agent => "agent",
            CallerRole::User => "user",
            CallerRole::Anonymous => "anonymous",
        }
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "agent" => Self::Agent,
            "user" => Self::User,
            _ => Self::Anonymous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub role: CallerRole,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: CallerRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(String::new(), CallerRole::Anonymous)
    }

    /// Build the caller from forwarded headers. A role without an id is treated as anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(CALLER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let role = headers
            .get(CALLER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(CallerRole::parse)
            .unwrap_or(CallerRole::Anonymous);

        match id {
            Some(id) if role != CallerRole::Anonymous => Self::new(id, role),
            _ => Self::anonymous(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == CallerRole::Admin
    }

    /// Admins and agents work the back office queue.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, CallerRole::Admin | CallerRole::Agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CALLER_ID_HEADER, HeaderValue::from_static("2"));
        headers.insert(CALLER_ROLE_HEADER, HeaderValue::from_static("Agent"));

        let caller = Caller::from_headers(&headers);
        assert_eq!(caller, Caller::new("2", CallerRole::Agent));
        assert!(caller.is_staff());
        assert!(!caller.is_admin());
    }

    #[test]
    fn role_without_id_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(CALLER_ROLE_HEADER, HeaderValue::from_static("admin"));

        assert_eq!(Caller::from_headers(&headers), Caller::anonymous());
    }
}
