use crate::builder::StateUpdate;

#[derive(Debug, thiserror::Error)]
pub enum WledError {
    /// The effect name is not in the firmware's table.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    #[error("wled request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Pushes assembled state packets to a controller's `/json/state` endpoint.
pub struct WledClient {
    http: reqwest::Client,
    base: String,
}

impl WledClient {
    /// `address` is `host` or `host:port` of the controller.
    pub fn new(address: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("http://{address}"),
        }
    }

    pub async fn send_state(&self, state: &StateUpdate) -> Result<(), WledError> {
        let url = format!("{}/json/state", self.base);
        tracing::debug!(url = %url, "pushing wled state");
        self.http
            .post(&url)
            .json(state)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn set_power(&self, on: bool) -> Result<(), WledError> {
        self.send_state(&StateUpdate::new().power(on)).await
    }

    /// Device-wide brightness on the 0–100 scale.
    pub async fn set_brightness(&self, percent: f64) -> Result<(), WledError> {
        self.send_state(&StateUpdate::new().brightness(percent)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn fake_controller() -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/json/state",
                post(|State(received): State<Received>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(body);
                    Json(json!({"success": true}))
                }),
            )
            .with_state(Arc::clone(&received));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (address, received)
    }

    #[tokio::test]
    async fn send_state_posts_the_packet() {
        let (address, received) = fake_controller().await;
        let client = WledClient::new(&address);

        client
            .send_state(&StateUpdate::new().power(true).brightness(100.0))
            .await
            .unwrap();

        let packets = received.lock().unwrap();
        assert_eq!(*packets, vec![json!({"on": true, "bri": 255})]);
    }

    #[tokio::test]
    async fn convenience_setters_build_minimal_packets() {
        let (address, received) = fake_controller().await;
        let client = WledClient::new(&address);

        client.set_power(false).await.unwrap();
        client.set_brightness(50.0).await.unwrap();

        let packets = received.lock().unwrap();
        assert_eq!(packets[0], json!({"on": false}));
        assert_eq!(packets[1], json!({"bri": 128}));
    }

    #[tokio::test]
    async fn unreachable_controller_reports_http_error() {
        let client = WledClient::new("127.0.0.1:1");
        let err = client.set_power(true).await.unwrap_err();
        assert!(matches!(err, WledError::Http(_)));
    }
}
