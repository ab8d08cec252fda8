//! Fire-and-forget "this match changed" signal.
//!
//! Subscribers inside the process receive events over a broadcast channel.
//! When `REVALIDATE_URL` is set, the same event is POSTed there with an
//! HMAC-SHA256 signature of the body in `x-revalidate-signature`.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::RevalidateConfig;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-revalidate-signature";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidationEvent {
    pub paths: Vec<String>,
    pub tags: Vec<String>,
}

impl RevalidationEvent {
    pub fn for_match(match_id: Uuid) -> Self {
        Self {
            paths: vec![format!("/matches/{match_id}"), "/matches".to_string()],
            tags: vec![format!("match:{match_id}")],
        }
    }
}

#[derive(Clone)]
struct Webhook {
    client: reqwest::Client,
    url: String,
    secret: String,
}

#[derive(Clone)]
pub struct Revalidator {
    tx: broadcast::Sender<RevalidationEvent>,
    webhook: Option<Webhook>,
}

impl Revalidator {
    pub fn new(config: &RevalidateConfig) -> Self {
        let (tx, _) = broadcast::channel(256);
        let webhook = config.url.as_ref().map(|url| Webhook {
            client: reqwest::Client::new(),
            url: url.clone(),
            secret: config.secret.clone(),
        });
        Self { tx, webhook }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RevalidationEvent> {
        self.tx.subscribe()
    }

    pub fn notify_match(&self, match_id: Uuid) {
        self.notify(RevalidationEvent::for_match(match_id));
    }

    pub fn notify(&self, event: RevalidationEvent) {
        // No receivers is not an error.
        let _ = self.tx.send(event.clone());

        let Some(webhook) = self.webhook.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = webhook.post(&event).await {
                tracing::warn!("Revalidation webhook failed: {e}");
            }
        });
    }
}

impl Webhook {
    async fn post(&self, event: &RevalidationEvent) -> Result<(), String> {
        let body = serde_json::to_vec(event).map_err(|e| e.to_string())?;
        let signature = sign(&self.secret, &body).ok_or("HMAC key error")?;

        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("status {}", resp.status()));
        }
        Ok(())
    }
}

/// Hex-encoded HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_vector() {
        // RFC 4231 test case 2.
        let sig = sign("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn signature_depends_on_secret() {
        let body = br#"{"paths":[],"tags":[]}"#;
        assert_ne!(sign("a", body), sign("b", body));
    }

    #[test]
    fn event_names_match_paths_and_tag() {
        let id = Uuid::nil();
        let event = RevalidationEvent::for_match(id);
        assert!(event.paths.contains(&format!("/matches/{id}")));
        assert_eq!(event.tags, vec![format!("match:{id}")]);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let revalidator = Revalidator::new(&RevalidateConfig::default());
        let mut rx = revalidator.subscribe();
        let id = Uuid::new_v4();
        revalidator.notify_match(id);
        assert_eq!(rx.recv().await.unwrap(), RevalidationEvent::for_match(id));
    }
}
