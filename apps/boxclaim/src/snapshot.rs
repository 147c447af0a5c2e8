//! Full-state snapshot download.

use std::time::Duration;

use async_trait::async_trait;
use boxclaim_proto::InitialState;
use reqwest::Client;
use tracing::debug;

use crate::bitset::BitSet;
use crate::error::{ClaimError, ClaimResult};

const ERROR_BODY_LIMIT: usize = 256;

/// Source of fresh remote state. Implementations do not retry; the worker
/// loop owns backoff.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch(&self) -> ClaimResult<BitSet>;
}

#[derive(Clone)]
pub struct HttpStateFetcher {
    http: Client,
    url: String,
}

impl HttpStateFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ClaimResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClaimError::Network(err.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl StateSource for HttpStateFetcher {
    async fn fetch(&self) -> ClaimResult<BitSet> {
        let res = self.http.get(&self.url).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ClaimError::Network(format!(
                "unexpected status: {status} body={}",
                excerpt(&body)
            )));
        }
        let body = res.bytes().await?;
        let snapshot = decode_snapshot(&body)?;
        debug!(
            url = %self.url,
            count = snapshot.len(),
            set = snapshot.count_set(),
            "fetched snapshot"
        );
        Ok(snapshot)
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

/// Parses a snapshot body into a bitset.
pub fn decode_snapshot(body: &[u8]) -> ClaimResult<BitSet> {
    let state = InitialState::from_json(body)?;
    let bytes = state.decode_bits()?;
    BitSet::from_bytes(bytes, state.count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_bytes_and_bit_order() {
        let bytes = vec![0b1000_0001, 0b0100_0000, 0xff];
        let body = serde_json::to_vec(&InitialState::from_bytes(&bytes, 24)).unwrap();
        let bits = decode_snapshot(&body).expect("decodes");
        assert_eq!(bits.len(), 24);
        let set: Vec<usize> = (0..24).filter(|&i| bits.get(i).unwrap()).collect();
        assert_eq!(set, vec![0, 7, 9, 16, 17, 18, 19, 20, 21, 22, 23]);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(
            decode_snapshot(b"{\"full_state\": 12}"),
            Err(ClaimError::Decode(_))
        ));
        assert!(matches!(
            decode_snapshot(br#"{"full_state":"%%%","count":8}"#),
            Err(ClaimError::Decode(_))
        ));
    }

    #[test]
    fn count_larger_than_payload_is_a_decode_error() {
        let body = serde_json::to_vec(&InitialState::from_bytes(&[0u8; 1], 9)).unwrap();
        assert!(matches!(decode_snapshot(&body), Err(ClaimError::Decode(_))));
    }

    #[tokio::test]
    async fn error_status_is_a_network_error_with_short_body() {
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::Router;

        let app = Router::new().route(
            "/api/initial-state",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(10_000)) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let fetcher = HttpStateFetcher::new(
            format!("http://{addr}/api/initial-state"),
            Duration::from_secs(5),
        )
        .unwrap();
        match fetcher.fetch().await {
            Err(ClaimError::Network(message)) => {
                assert!(message.contains("500"), "{message}");
                assert!(message.len() < 400, "body not capped: {} bytes", message.len());
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(excerpt(&body).chars().count(), ERROR_BODY_LIMIT);
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let fetcher =
            HttpStateFetcher::new("http://127.0.0.1:1/api/initial-state", Duration::from_secs(2))
                .unwrap();
        assert!(matches!(
            fetcher.fetch().await,
            Err(ClaimError::Network(_))
        ));
    }
}
