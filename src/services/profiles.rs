use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::external::{AgentDirectory, CollaboratorError};
use crate::models::{AgentProfile, MatchRequest};

/// Errors that can occur when talking to the profile document store
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Collection IDs in the document store
#[derive(Debug, Clone)]
pub struct ProfileCollections {
    pub agents: String,
    pub listings: String,
    pub matches: String,
}

/// Document-store API client
///
/// Handles all communication with the durable profile backend:
/// - Fetching agent profiles (with a short-lived cache in front)
/// - Capability lookups against the rental listings collection
/// - Recording accepted matches
pub struct ProfileClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: ProfileCollections,
    profile_cache: moka::future::Cache<String, AgentProfile>,
}

impl ProfileClient {
    /// Create a new client
    ///
    /// `cache_ttl_secs` bounds how stale a cached profile may get; the
    /// cache only serves reads that decorate match responses, so a short
    /// TTL is plenty.
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: ProfileCollections,
        cache_capacity: u64,
        cache_ttl_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let profile_cache = moka::future::CacheBuilder::new(cache_capacity)
            .time_to_live(Duration::from_secs(cache_ttl_secs))
            .build();

        Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
            profile_cache,
        }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    async fn query_documents(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Value, ProfileError> {
        let queries_json = serde_json::to_string(queries)
            .map_err(|e| ProfileError::InvalidResponse(e.to_string()))?;
        let encoded = urlencoding::encode(&queries_json);
        let url = format!("{}?query={}", self.documents_url(collection), encoded);

        tracing::debug!("Querying document store: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Query against {} failed: {}",
                collection,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Fetch an agent's durable profile
    pub async fn get_agent_profile(&self, agent_id: &str) -> Result<AgentProfile, ProfileError> {
        if let Some(profile) = self.profile_cache.get(agent_id).await {
            tracing::trace!("Profile cache hit: {}", agent_id);
            return Ok(profile);
        }

        let queries = vec![format!("equal(\"agentId\", \"{}\")", agent_id)];
        let json = self
            .query_documents(&self.collections.agents, &queries)
            .await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| ProfileError::InvalidResponse("Missing documents array".into()))?;

        let doc = documents.first().ok_or_else(|| {
            ProfileError::NotFound(format!("Profile not found for agent {}", agent_id))
        })?;

        let data = doc.get("data").unwrap_or(doc);
        let profile: AgentProfile = serde_json::from_value(data.clone())
            .map_err(|e| ProfileError::InvalidResponse(format!("Failed to parse profile: {}", e)))?;

        self.profile_cache
            .insert(agent_id.to_string(), profile.clone())
            .await;

        Ok(profile)
    }

    /// Whether the agent has at least one active listing in the category
    pub async fn agent_serves_category(
        &self,
        agent_id: &str,
        category: &str,
    ) -> Result<bool, ProfileError> {
        let queries = vec![
            format!("equal(\"agentId\", \"{}\")", agent_id),
            format!("equal(\"category\", \"{}\")", category),
            "limit(1)".to_string(),
        ];
        let json = self
            .query_documents(&self.collections.listings, &queries)
            .await?;

        let total = json.get("total").and_then(|t| t.as_u64());
        if let Some(total) = total {
            return Ok(total > 0);
        }

        // Fall back to the documents array when the backend omits `total`
        let count = json
            .get("documents")
            .and_then(|d| d.as_array())
            .map(|d| d.len())
            .ok_or_else(|| ProfileError::InvalidResponse("Missing documents array".into()))?;

        Ok(count > 0)
    }

    /// Write an accepted match document
    pub async fn create_match_record(&self, request: &MatchRequest) -> Result<(), ProfileError> {
        let url = self.documents_url(&self.collections.matches);

        let payload = serde_json::json!({
            "$id": uuid::Uuid::new_v4().to_string(),
            "requestId": request.request_id,
            "clientId": request.client_id,
            "agentId": request.assigned_agent_id,
            "category": request.category,
            "lat": request.location.lat,
            "lng": request.location.lng,
            "status": "active",
            "matchedAt": request.matched_at,
        });

        let response = self
            .client
            .post(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProfileError::ApiError(format!(
                "Failed to record match: {}",
                response.status()
            )));
        }

        tracing::debug!("Recorded match for request {}", request.request_id);
        Ok(())
    }
}

#[async_trait]
impl AgentDirectory for ProfileClient {
    async fn has_capability(
        &self,
        agent_id: &str,
        category: &str,
    ) -> Result<bool, CollaboratorError> {
        self.agent_serves_category(agent_id, category)
            .await
            .map_err(|e| CollaboratorError(e.to_string()))
    }

    async fn agent_profile(
        &self,
        agent_id: &str,
    ) -> Result<Option<AgentProfile>, CollaboratorError> {
        match self.get_agent_profile(agent_id).await {
            Ok(profile) => Ok(Some(profile)),
            Err(ProfileError::NotFound(_)) => Ok(None),
            Err(e) => Err(CollaboratorError(e.to_string())),
        }
    }

    async fn record_match(&self, request: &MatchRequest) -> Result<(), CollaboratorError> {
        self.create_match_record(request)
            .await
            .map_err(|e| CollaboratorError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(base_url: String) -> ProfileClient {
        ProfileClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            ProfileCollections {
                agents: "agents".to_string(),
                listings: "listings".to_string(),
                matches: "matches".to_string(),
            },
            100,
            60,
        )
    }

    #[tokio::test]
    async fn test_get_agent_profile_parses_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                Matcher::Regex(r"^/databases/test_db/collections/agents/documents.*".to_string()),
            )
            .with_status(200)
            .with_body(
                r#"{"total":1,"documents":[{"data":{
                    "agentId":"a1","name":"Ada","phone":"+2348000000000",
                    "agencyName":"Lagos Lettings","verified":true
                }}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = client(server.url());
        let profile = client.get_agent_profile("a1").await.unwrap();
        assert_eq!(profile.name, "Ada");
        assert!(profile.verified);

        // Second read is served from cache
        let cached = client.get_agent_profile("a1").await.unwrap();
        assert_eq!(cached.agent_id, "a1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                Matcher::Regex(r"^/databases/test_db/collections/agents/documents.*".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"total":0,"documents":[]}"#)
            .create_async()
            .await;

        let client = client(server.url());
        let result = client.get_agent_profile("ghost").await;
        assert!(matches!(result, Err(ProfileError::NotFound(_))));

        // At the directory seam that becomes an absent profile, not an error
        let via_trait = client.agent_profile("ghost").await.unwrap();
        assert!(via_trait.is_none());
    }

    #[tokio::test]
    async fn test_capability_from_listing_total() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                Matcher::Regex(r"^/databases/test_db/collections/listings/documents.*".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"total":2,"documents":[{"data":{}}]}"#)
            .create_async()
            .await;

        let client = client(server.url());
        assert!(client.agent_serves_category("a1", "Hotel").await.unwrap());
    }

    #[tokio::test]
    async fn test_no_listings_means_no_capability() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                Matcher::Regex(r"^/databases/test_db/collections/listings/documents.*".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"total":0,"documents":[]}"#)
            .create_async()
            .await;

        let client = client(server.url());
        assert!(!client.agent_serves_category("a1", "Hotel").await.unwrap());
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                Matcher::Regex(r"^/databases/.*".to_string()),
            )
            .with_status(500)
            .create_async()
            .await;

        let client = client(server.url());
        let result = client.agent_serves_category("a1", "Hotel").await;
        assert!(matches!(result, Err(ProfileError::ApiError(_))));

        // The trait carries it as a collaborator failure for the engine to
        // degrade on
        assert!(client.has_capability("a1", "Hotel").await.is_err());
    }
}
