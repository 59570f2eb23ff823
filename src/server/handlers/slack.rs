use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::FALLBACK_ANSWER;
use crate::server::slack::{strip_mention, verify_signature, SlackEnvelope, SlackEvent};
use crate::state::{AppState, SlackIntegration};

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";
const RETRY_HEADER: &str = "x-slack-retry-num";

/// Slack Events API callback.
///
/// Mentions are acknowledged immediately and answered from a spawned task,
/// since Slack retries any callback that takes longer than three seconds.
pub async fn slack_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Some(slack) = state.slack.clone() else {
        return Err(ApiError::ServiceUnavailable);
    };

    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let now = chrono::Utc::now().timestamp();
    if !verify_signature(&slack.signing_secret, timestamp, &body, signature, now) {
        tracing::warn!("Rejected Slack request with invalid signature");
        return Err(ApiError::Unauthorized);
    }

    if headers.contains_key(RETRY_HEADER) {
        tracing::debug!(
            "Ignoring Slack retry #{}",
            header_str(&headers, RETRY_HEADER)
        );
        return Ok(StatusCode::OK.into_response());
    }

    let envelope: SlackEnvelope = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("invalid event payload: {}", err)))?;

    match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        SlackEnvelope::EventCallback { event } if event.kind == "app_mention" => {
            spawn_answer(state, slack, event);
            Ok(StatusCode::OK.into_response())
        }
        _ => Ok(StatusCode::OK.into_response()),
    }
}

fn spawn_answer(state: Arc<AppState>, slack: SlackIntegration, event: SlackEvent) {
    let question = strip_mention(&event.text);
    tokio::spawn(async move {
        let answer = match state.pipeline.answer(&question).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => FALLBACK_ANSWER.to_string(),
            Err(err) => {
                tracing::error!("Failed to answer {:?}: {}", question, err);
                FALLBACK_ANSWER.to_string()
            }
        };

        if let Err(err) = slack.client.post_message(&event.channel, &answer).await {
            tracing::error!("Error responding to message in {}: {:#}", event.channel, err);
        }
    });
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::routing::post;
    use axum::Router;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;
    use crate::core::config::defaults::default_config;
    use crate::core::config::parse_app_config;
    use crate::llm::testing::StaticProvider;
    use crate::rag::{Chunk, EmbeddingStore, RagPipeline};
    use crate::server::router::router;
    use crate::server::slack::{sign, SlackClient};
    use crate::tokenizer::WordTokenizer;

    const SECRET: &str = "signing-secret";

    struct Harness {
        base_url: String,
        posted: mpsc::UnboundedReceiver<Value>,
        client: reqwest::Client,
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn fake_slack_api() -> (String, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new()
            .route(
                "/api/chat.postMessage",
                post(
                    |State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                        let _ = tx.send(body);
                        Json(json!({ "ok": true }))
                    },
                ),
            )
            .with_state(tx);
        (format!("{}/api", serve(app).await), rx)
    }

    async fn harness(provider: StaticProvider, slack_enabled: bool) -> Harness {
        let mut value = default_config();
        value["pipeline"]["vector_dimension"] = json!(2);
        let config = parse_app_config(&value).unwrap();

        let store = EmbeddingStore::from_parts(
            vec![Chunk::new("ABS", "Anti-lock braking system", &WordTokenizer).unwrap()],
            vec![vec![1.0, 0.0]],
            2,
        )
        .unwrap();
        let pipeline = RagPipeline::new(
            config.pipeline,
            config.completion.clone(),
            Arc::new(WordTokenizer),
            Arc::new(provider),
            Arc::new(store),
        )
        .unwrap();

        let (api_base, posted) = fake_slack_api().await;
        let slack = slack_enabled.then(|| SlackIntegration {
            client: SlackClient::new("xoxb-test".to_string()).with_api_base(&api_base),
            signing_secret: SECRET.to_string(),
        });

        let state = Arc::new(AppState {
            config,
            pipeline,
            slack,
        });

        Harness {
            base_url: serve(router(state)).await,
            posted,
            client: reqwest::Client::new(),
        }
    }

    impl Harness {
        async fn send(&self, body: &Value, extra: &[(&str, &str)]) -> reqwest::Response {
            let body = body.to_string();
            let timestamp = chrono::Utc::now().timestamp().to_string();
            let mut request = self
                .client
                .post(format!("{}/slack/events", self.base_url))
                .header(TIMESTAMP_HEADER, &timestamp)
                .header(SIGNATURE_HEADER, sign(SECRET, &timestamp, body.as_bytes()))
                .header("content-type", "application/json")
                .body(body);
            for (name, value) in extra {
                request = request.header(*name, *value);
            }
            request.send().await.unwrap()
        }

        async fn next_post(&mut self) -> Value {
            tokio::time::timeout(Duration::from_secs(5), self.posted.recv())
                .await
                .expect("message posted in time")
                .expect("channel open")
        }
    }

    fn mention(text: &str) -> Value {
        json!({
            "type": "event_callback",
            "event": { "type": "app_mention", "text": text, "channel": "C0123", "user": "U1" }
        })
    }

    #[tokio::test]
    async fn answers_url_verification_challenge() {
        let harness = harness(StaticProvider::new(2), true).await;

        let res = harness
            .send(&json!({ "type": "url_verification", "challenge": "3eZbrw1aB" }), &[])
            .await;

        assert_eq!(res.status(), reqwest::StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["challenge"], "3eZbrw1aB");
    }

    #[tokio::test]
    async fn posts_answer_to_mention_channel() {
        let provider = StaticProvider::new(2)
            .with_vector("what is ABS?", vec![1.0, 0.0])
            .with_completion(" ABS stands for anti-lock braking system.");
        let mut harness = harness(provider, true).await;

        let res = harness.send(&mention("<@U0BOT> what is ABS?"), &[]).await;
        assert_eq!(res.status(), reqwest::StatusCode::OK);

        let posted = harness.next_post().await;
        assert_eq!(posted["channel"], "C0123");
        assert_eq!(posted["text"], "ABS stands for anti-lock braking system.");
    }

    #[tokio::test]
    async fn posts_fallback_when_answer_fails() {
        let provider = StaticProvider::new(2).failing_completion("quota exceeded");
        let mut harness = harness(provider, true).await;

        harness.send(&mention("<@U0BOT> what is ABS?"), &[]).await;

        let posted = harness.next_post().await;
        assert_eq!(posted["text"], FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn rejects_bad_signature() {
        let harness = harness(StaticProvider::new(2), true).await;
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let res = harness
            .client
            .post(format!("{}/slack/events", harness.base_url))
            .header(TIMESTAMP_HEADER, &timestamp)
            .header(SIGNATURE_HEADER, "v0=deadbeef")
            .body(mention("<@U0BOT> hi").to_string())
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn acknowledges_retries_without_answering() {
        let mut harness = harness(StaticProvider::new(2), true).await;

        let res = harness
            .send(&mention("<@U0BOT> what is ABS?"), &[(RETRY_HEADER, "1")])
            .await;

        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert!(
            tokio::time::timeout(Duration::from_millis(200), harness.posted.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn disabled_without_slack_credentials() {
        let harness = harness(StaticProvider::new(2), false).await;

        let res = harness.send(&mention("<@U0BOT> hi"), &[]).await;
        assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let health: Value = harness
            .client
            .get(format!("{}/health", harness.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["records"], 1);
        assert_eq!(health["dimension"], 2);
        assert_eq!(health["slack_enabled"], false);
    }
}
