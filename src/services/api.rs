use anyhow::{anyhow, Context, Result};
use serde_json::Value as JsonValue;

use crate::model::{FormResponse, FormSchema, Identity};

/// Exact message the service returns when the roll number is already
/// registered. The caller must treat this as a successful login.
pub const USER_EXISTS_MESSAGE: &str = "User already exists. Fetch /get-form to get form json";

pub fn is_already_registered(message: &str) -> bool {
    message == USER_EXISTS_MESSAGE
}

#[derive(Debug, Clone)]
pub struct RegisterReply {
    pub success: bool,
    pub message: String,
}

/// Blocking client for the form service. Only ever called from loader
/// threads, never from the event loop.
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    /// `POST /create-user`. A non-2xx answer is still a `RegisterReply`
    /// (the service reports duplicates that way); only transport or parse
    /// failures become errors.
    pub fn register_or_login(&self, identity: &Identity) -> Result<RegisterReply> {
        let url = format!("{}/create-user", self.base_url);
        let client = reqwest::blocking::Client::new();
        let resp = client
            .post(&url)
            .json(identity)
            .send()
            .with_context(|| format!("posting to {url}"))?;
        let status = resp.status();
        let body: JsonValue = resp.json().unwrap_or(JsonValue::Null);
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        if status.is_success() {
            Ok(RegisterReply {
                success: true,
                message: if message.is_empty() {
                    "User registered successfully".to_string()
                } else {
                    message
                },
            })
        } else {
            Ok(RegisterReply {
                success: false,
                message: if message.is_empty() {
                    format!("Registration failed ({status})")
                } else {
                    message
                },
            })
        }
    }

    /// `GET /get-form?rollNumber=…`, unwrapped from its envelope and
    /// sanity-checked before it reaches the engine.
    pub fn fetch_form_schema(&self, roll_number: &str) -> Result<FormSchema> {
        let url = format!("{}/get-form", self.base_url);
        let client = reqwest::blocking::Client::new();
        let resp = client
            .get(&url)
            .query(&[("rollNumber", roll_number)])
            .send()
            .with_context(|| format!("fetching {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body: JsonValue = resp.json().unwrap_or(JsonValue::Null);
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Failed to fetch form structure");
            return Err(anyhow!("{message} ({status})"));
        }
        let reply: FormResponse = resp.json().with_context(|| "parsing form response")?;
        crate::model::validate_form_schema(&reply.form).map_err(|e| anyhow!(e))?;
        Ok(reply.form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_must_match_exactly() {
        assert!(is_already_registered(
            "User already exists. Fetch /get-form to get form json"
        ));
        assert!(!is_already_registered("User already exists."));
        assert!(!is_already_registered(""));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }
}
