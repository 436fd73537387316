//! # Alert Module
//!
//! Sends server-error alerts to a DingTalk group robot.
//!
//! ## Message Flow
//!
//! ```text
//! request fails with 500
//!          ↓
//! AlertOnServerError middleware builds an Alert
//!          ↓
//! Alerter::send() (spawned, never blocks the response)
//!          ↓
//! POST {webhook}&timestamp=..&sign=..   (markdown message)
//! ```
//!
//! ## Signing
//!
//! Robots configured with a secret require
//! `sign = urlencode(base64(hmac_sha256(secret, "{timestamp}\n{secret}")))`
//! appended to the webhook URL together with the millisecond timestamp.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::utils::{format_datetime, truncate_string};

type HmacSha256 = Hmac<Sha256>;

/// Longest JSON body rendered into an alert.
const MAX_BODY_CHARS: usize = 2000;

/// Errors that can occur while delivering an alert.
#[derive(Error, Debug)]
pub enum AlertError {
    /// The webhook URL cannot be parsed
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    /// Signing the request failed
    #[error("Failed to sign webhook request: {0}")]
    Signing(String),

    /// The HTTP request failed
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The webhook answered with a non-success status
    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// DingTalk accepted the request but rejected the message
    #[error("DingTalk rejected the message ({errcode}): {errmsg}")]
    Rejected { errcode: i64, errmsg: String },
}

/// Everything reported about one failed request.
#[derive(Debug, Clone)]
pub struct Alert {
    pub url: String,
    pub method: String,
    /// Query string pairs.
    pub args: Vec<(String, String)>,
    /// JSON body, when the request carried one.
    pub json: Option<Value>,
    /// Debug representation of the error.
    pub error: String,
    pub traceback: Vec<String>,
    pub namespace: String,
    pub hostname: String,
    pub occurred_at: DateTime<Utc>,
}

/// Reply body of the DingTalk robot API.
#[derive(Debug, Deserialize)]
struct RobotReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// DingTalk robot client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct Alerter {
    client: reqwest::Client,
    webhook_url: Option<String>,
    secret: Option<String>,
    namespace: String,
    hostname: String,
}

impl Alerter {
    /// Create the client from configuration. No webhook means alerts are
    /// only logged.
    pub fn new(config: &AppConfig) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.alert_timeout_secs))
            .connect_timeout(Duration::from_secs(config.alert_timeout_secs))
            .build()?;

        if let Some(url) = &config.dingtalk_webhook_url {
            Url::parse(url).map_err(|e| AlertError::InvalidUrl(e.to_string()))?;
        }

        Ok(Self {
            client,
            webhook_url: config.dingtalk_webhook_url.clone(),
            secret: config.dingtalk_secret.clone(),
            namespace: config.namespace.clone(),
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Render an alert as a DingTalk markdown message.
    pub fn render(alert: &Alert) -> Value {
        let title = format!("[{}] 500 {} {}", alert.namespace, alert.method, alert.url);

        let args = if alert.args.is_empty() {
            "{}".to_string()
        } else {
            alert
                .args
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&")
        };

        let body = match &alert.json {
            Some(value) => truncate_string(&value.to_string(), MAX_BODY_CHARS),
            None => "null".to_string(),
        };

        let mut text = format!(
            "### {}\n\n\
             - **Host**: {}\n\
             - **Time**: {}\n\
             - **Args**: {}\n\
             - **Json**: {}\n\
             - **Error**: {}\n",
            title,
            alert.hostname,
            format_datetime(alert.occurred_at),
            args,
            body,
            alert.error,
        );

        if !alert.traceback.is_empty() {
            text.push_str("\n**Traceback**:\n\n");
            for line in &alert.traceback {
                text.push_str("> ");
                text.push_str(line);
                text.push_str("\n\n");
            }
        }

        json!({
            "msgtype": "markdown",
            "markdown": {
                "title": title,
                "text": text,
            }
        })
    }

    /// Webhook URL with signature parameters appended when a secret is set.
    pub fn signed_url(&self, timestamp_ms: i64) -> Result<Option<Url>, AlertError> {
        let Some(webhook) = &self.webhook_url else {
            return Ok(None);
        };

        let mut url = Url::parse(webhook).map_err(|e| AlertError::InvalidUrl(e.to_string()))?;

        if let Some(secret) = &self.secret {
            let sign = sign(secret, timestamp_ms)?;
            url.query_pairs_mut()
                .append_pair("timestamp", &timestamp_ms.to_string())
                .append_pair("sign", &sign);
        }

        Ok(Some(url))
    }

    /// Deliver an alert. Without a webhook the alert is only logged.
    pub async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let Some(url) = self.signed_url(Utc::now().timestamp_millis())? else {
            warn!("Alert not sent (no webhook configured): {} {}", alert.method, alert.url);
            return Ok(());
        };

        let message = Self::render(alert);
        debug!("Sending alert for {} {}", alert.method, alert.url);

        let response = self.client.post(url).json(&message).send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AlertError::Status {
                status: status.as_u16(),
                body: truncate_string(&text, 200),
            });
        }

        if let Ok(reply) = serde_json::from_str::<RobotReply>(&text) {
            if reply.errcode != 0 {
                return Err(AlertError::Rejected {
                    errcode: reply.errcode,
                    errmsg: reply.errmsg,
                });
            }
        }

        info!("Alert delivered for {} {}", alert.method, alert.url);
        Ok(())
    }
}

/// DingTalk signature: base64 of HMAC-SHA256 over `"{timestamp}\n{secret}"`.
///
/// URL encoding is left to the query serializer.
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String, AlertError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AlertError::Signing(e.to_string()))?;
    mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_alert() -> Alert {
        Alert {
            url: "http://localhost:8080/echo/fail?code=500".to_string(),
            method: "GET".to_string(),
            args: vec![("code".to_string(), "500".to_string())],
            json: Some(json!({"q": "rust"})),
            error: "Server { code: 500, message: \"boom\" }".to_string(),
            traceback: vec!["boom".to_string()],
            namespace: "TESTING".to_string(),
            hostname: "web-1".to_string(),
            occurred_at: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    fn alerter(webhook: Option<&str>, secret: Option<&str>) -> Alerter {
        let mut config = AppConfig::for_tests();
        config.dingtalk_webhook_url = webhook.map(str::to_string);
        config.dingtalk_secret = secret.map(str::to_string);
        Alerter::new(&config).unwrap()
    }

    #[test]
    fn test_render_markdown() {
        let message = Alerter::render(&sample_alert());

        assert_eq!(message["msgtype"], "markdown");
        assert_eq!(
            message["markdown"]["title"],
            "[TESTING] 500 GET http://localhost:8080/echo/fail?code=500"
        );

        let text = message["markdown"]["text"].as_str().unwrap();
        assert!(text.contains("**Host**: web-1"));
        assert!(text.contains("**Time**: 2024-01-15 12:00:00"));
        assert!(text.contains("**Args**: code=500"));
        assert!(text.contains("**Json**: {\"q\":\"rust\"}"));
        assert!(text.contains("> boom"));
    }

    #[test]
    fn test_sign_is_deterministic_base64() {
        let first = sign("SECabc", 1_700_000_000_000).unwrap();
        let second = sign("SECabc", 1_700_000_000_000).unwrap();
        let other = sign("SECabc", 1_700_000_000_001).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        // 32-byte digest → 44 base64 characters
        assert_eq!(first.len(), 44);
    }

    #[test]
    fn test_signed_url_appends_timestamp_and_sign() {
        let alerter = alerter(
            Some("https://oapi.dingtalk.com/robot/send?access_token=abc"),
            Some("SECabc"),
        );

        let url = alerter.signed_url(1_700_000_000_000).unwrap().unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs[0], ("access_token".to_string(), "abc".to_string()));
        assert_eq!(pairs[1], ("timestamp".to_string(), "1700000000000".to_string()));
        assert_eq!(pairs[2].0, "sign");
        assert_eq!(pairs[2].1, sign("SECabc", 1_700_000_000_000).unwrap());
    }

    #[test]
    fn test_unsigned_url_left_untouched() {
        let alerter = alerter(Some("https://oapi.dingtalk.com/robot/send?access_token=abc"), None);
        let url = alerter.signed_url(1).unwrap().unwrap();

        assert_eq!(url.as_str(), "https://oapi.dingtalk.com/robot/send?access_token=abc");
    }

    #[test]
    fn test_invalid_webhook_rejected() {
        let mut config = AppConfig::for_tests();
        config.dingtalk_webhook_url = Some("not a url".to_string());

        assert!(matches!(Alerter::new(&config), Err(AlertError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_disabled_alerter_only_logs() {
        let alerter = alerter(None, None);

        assert!(!alerter.is_enabled());
        assert!(alerter.send(&sample_alert()).await.is_ok());
    }
}
