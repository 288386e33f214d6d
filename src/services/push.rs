use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::core::external::Notifier;
use crate::models::AgentProfile;

/// Errors that can occur delivering a push notification
#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Push gateway returned error: {0}")]
    GatewayError(String),

    #[error("Agent has no push token registered")]
    NoToken,
}

/// Push delivery client
///
/// One `notify` entry point; the platform branch (Expo vs FCM) is an
/// internal routing detail decided by which token the agent's profile
/// carries. Delivery is fire-and-forget: failures are logged and swallowed.
pub struct PushClient {
    client: Client,
    expo_url: String,
    fcm_url: String,
    fcm_server_key: Option<String>,
}

impl PushClient {
    pub fn new(expo_url: String, fcm_url: String, fcm_server_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            expo_url,
            fcm_url,
            fcm_server_key,
        }
    }

    /// Deliver to whichever platform the profile's token belongs to
    pub async fn send(
        &self,
        profile: &AgentProfile,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<(), PushError> {
        if let Some(token) = &profile.expo_push_token {
            return self.send_expo(token, title, body, data).await;
        }
        if let Some(token) = &profile.fcm_token {
            return self.send_fcm(token, title, body, data).await;
        }
        Err(PushError::NoToken)
    }

    async fn send_expo(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<(), PushError> {
        let messages = serde_json::json!([{
            "to": token,
            "sound": "default",
            "title": title,
            "body": body,
            "data": data,
            "priority": "high",
        }]);

        let response = self.client.post(&self.expo_url).json(&messages).send().await?;

        if !response.status().is_success() {
            return Err(PushError::GatewayError(format!(
                "Expo push failed: {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn send_fcm(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<(), PushError> {
        let key = self
            .fcm_server_key
            .as_deref()
            .ok_or_else(|| PushError::GatewayError("FCM server key not configured".into()))?;

        let payload = serde_json::json!({
            "to": token,
            "priority": "high",
            "notification": { "title": title, "body": body, "sound": "default" },
            "data": data,
        });

        let response = self
            .client
            .post(&self.fcm_url)
            .header("Authorization", format!("key={}", key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PushError::GatewayError(format!(
                "FCM push failed: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for PushClient {
    async fn notify(
        &self,
        profile: &AgentProfile,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) {
        match self.send(profile, title, body, data).await {
            Ok(()) => tracing::debug!("Push delivered to agent {}", profile.agent_id),
            Err(PushError::NoToken) => {
                tracing::debug!("Agent {} has no push token; skipping push", profile.agent_id)
            }
            Err(e) => tracing::warn!("Push to agent {} failed: {}", profile.agent_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(expo: Option<&str>, fcm: Option<&str>) -> AgentProfile {
        AgentProfile {
            agent_id: "a1".to_string(),
            name: "Ada".to_string(),
            email: None,
            phone: None,
            agency_name: None,
            license_id: None,
            verified: true,
            expo_push_token: expo.map(|t| t.to_string()),
            fcm_token: fcm.map(|t| t.to_string()),
        }
    }

    #[tokio::test]
    async fn test_expo_token_routes_to_expo() {
        let mut server = mockito::Server::new_async().await;
        let expo = server
            .mock("POST", "/expo/send")
            .with_status(200)
            .with_body(r#"{"data":[{"status":"ok"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = PushClient::new(
            format!("{}/expo/send", server.url()),
            format!("{}/fcm/send", server.url()),
            Some("secret".to_string()),
        );

        let result = client
            .send(
                &profile(Some("ExponentPushToken[abc]"), None),
                "New client request",
                "New Hotel request nearby",
                serde_json::json!({"requestId": "r1"}),
            )
            .await;

        assert!(result.is_ok());
        expo.assert_async().await;
    }

    #[tokio::test]
    async fn test_fcm_token_routes_to_fcm() {
        let mut server = mockito::Server::new_async().await;
        let fcm = server
            .mock("POST", "/fcm/send")
            .match_header("authorization", "key=secret")
            .with_status(200)
            .with_body(r#"{"success":1}"#)
            .expect(1)
            .create_async()
            .await;

        let client = PushClient::new(
            format!("{}/expo/send", server.url()),
            format!("{}/fcm/send", server.url()),
            Some("secret".to_string()),
        );

        let result = client
            .send(
                &profile(None, Some("fcm-token-xyz")),
                "New client request",
                "New Hotel request nearby",
                serde_json::json!({"requestId": "r1"}),
            )
            .await;

        assert!(result.is_ok());
        fcm.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_token_is_reported() {
        let client = PushClient::new(
            "http://localhost:9/expo".to_string(),
            "http://localhost:9/fcm".to_string(),
            None,
        );

        let result = client
            .send(
                &profile(None, None),
                "title",
                "body",
                serde_json::json!({}),
            )
            .await;
        assert!(matches!(result, Err(PushError::NoToken)));
    }

    #[tokio::test]
    async fn test_gateway_error_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/expo/send")
            .with_status(429)
            .create_async()
            .await;

        let client = PushClient::new(
            format!("{}/expo/send", server.url()),
            format!("{}/fcm/send", server.url()),
            None,
        );

        let result = client
            .send(
                &profile(Some("ExponentPushToken[abc]"), None),
                "title",
                "body",
                serde_json::json!({}),
            )
            .await;
        assert!(matches!(result, Err(PushError::GatewayError(_))));
    }
}
