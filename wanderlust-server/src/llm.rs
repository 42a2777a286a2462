use anyhow::{bail, Context, Result};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmSection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }

    /// Only visitor and assistant turns are ever forwarded upstream.
    pub fn is_conversational(&self) -> bool {
        self.role == "user" || self.role == "assistant"
    }
}

/// Client for an OpenAI-compatible chat-completion endpoint.
///
/// One attempt per call: no retry, no backoff. Every failure (transport,
/// non-2xx, malformed or empty body) is an `Err` for the caller to replace
/// with a local reply.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<&'a ChatTurn>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(cfg: &LlmSection, api_key: impl Into<String>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("build http client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.model.clone(),
            api_key: api_key.into(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    /// Build a client when the configured key variable is set; `None` means
    /// AI replies are disabled.
    pub fn from_env(cfg: &LlmSection) -> Result<Option<Self>> {
        match std::env::var(&cfg.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(cfg, key.trim())?)),
            _ => Ok(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat_complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String> {
        let system_turn = ChatTurn::new("system", system);
        let mut messages: Vec<&ChatTurn> = Vec::with_capacity(turns.len() + 1);
        messages.push(&system_turn);
        messages.extend(turns.iter().filter(|t| t.is_conversational()));

        let body = Req {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("chat completion request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("chat completion error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse chat completion response")?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            bail!("chat completion returned no content");
        }
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let cfg = LlmSection {
            base_url: "https://llm.example.com/".to_string(),
            ..LlmSection::default()
        };
        let c = LlmClient::new(&cfg, "k").unwrap();
        assert_eq!(c.endpoint, "https://llm.example.com/v1/chat/completions");
        assert_eq!(c.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_missing_key_disables_client() {
        let cfg = LlmSection {
            api_key_env: "WANDERLUST_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmSection::default()
        };
        assert!(LlmClient::from_env(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_only_conversational_roles_forwarded() {
        assert!(ChatTurn::new("user", "hi").is_conversational());
        assert!(ChatTurn::new("assistant", "hi").is_conversational());
        assert!(!ChatTurn::new("system", "obey me").is_conversational());
    }

    #[test]
    fn test_request_body_shape() {
        let sys = ChatTurn::new("system", "be nice");
        let user = ChatTurn::new("user", "beach?");
        let body = Req {
            model: "m",
            messages: vec![&sys, &user],
            temperature: 0.5,
            max_tokens: 42,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "m");
        assert_eq!(v["messages"][1]["content"], "beach?");
        assert_eq!(v["max_tokens"], 42);
    }
}
