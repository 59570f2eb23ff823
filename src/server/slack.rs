//! Slack Events API plumbing: request signing and `chat.postMessage`.

use anyhow::Context;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_API_BASE: &str = "https://slack.com/api";
const SIGNATURE_VERSION: &str = "v0";
/// Requests older (or newer) than this are treated as replays.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

/// Outer payload of a Slack Events API request.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel: String,
}

/// Checks `X-Slack-Signature` against `v0:{timestamp}:{body}`.
pub fn verify_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> bool {
    let Ok(sent_at) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now - sent_at).abs() > MAX_CLOCK_SKEW_SECS {
        return false;
    }
    let Some(hex_digest) = signature
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
    else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(signing_secret.as_bytes()) else {
        return false;
    };
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Removes the leading `<@BOT>` mention from an `app_mention` text.
pub fn strip_mention(text: &str) -> String {
    text.split(' ').skip(1).collect::<Vec<_>>().join(" ")
}

#[derive(Clone)]
pub struct SlackClient {
    bot_token: String,
    api_base: String,
    client: Client,
}

impl SlackClient {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    pub async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&json!({ "channel": channel, "text": text }))
            .send()
            .await
            .context("chat.postMessage request failed")?;

        let body: Value = response
            .json()
            .await
            .context("invalid chat.postMessage response")?;
        if !body["ok"].as_bool().unwrap_or(false) {
            anyhow::bail!(
                "chat.postMessage rejected: {}",
                body["error"].as_str().unwrap_or("unknown error")
            );
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes()).unwrap();
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}
