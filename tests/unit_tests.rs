// Unit tests for agent dispatch

use agent_dispatch::core::{
    eta_minutes, haversine_distance, pick_winner, score_candidate, DispatchError,
    DEFAULT_AVG_SPEED_KMH,
};
use agent_dispatch::models::{AgentPresence, DispatchWeights, GeoPoint, RequestStatus};
use agent_dispatch::store::{PresenceRegistry, RequestStore};
use chrono::Utc;
use std::time::Duration;

fn presence_at(agent_id: &str, lat: f64, lng: f64, load: u32, rating: f64) -> AgentPresence {
    AgentPresence {
        agent_id: agent_id.to_string(),
        location: GeoPoint::new(lat, lng),
        load,
        rating,
        online_since: Utc::now(),
        last_heartbeat: Utc::now(),
    }
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(6.5244, 3.3792, 6.5244, 3.3792);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_ikeja_to_lekki() {
    // Ikeja to Lekki across Lagos is roughly 20-30 km
    let distance = haversine_distance(6.6018, 3.3515, 6.4478, 3.4723);
    assert!(distance > 15.0 && distance < 35.0, "got {}", distance);
}

#[test]
fn test_haversine_symmetry() {
    let a = haversine_distance(6.5, 3.3, 6.6, 3.5);
    let b = haversine_distance(6.6, 3.5, 6.5, 3.3);
    assert!((a - b).abs() < 1e-9);
}

#[test]
fn test_eta_scales_with_distance() {
    // 40 km/h means 10 km takes 15 minutes
    let eta = eta_minutes(10.0, DEFAULT_AVG_SPEED_KMH);
    assert!((eta - 15.0).abs() < 1e-9);

    let doubled = eta_minutes(20.0, DEFAULT_AVG_SPEED_KMH);
    assert!((doubled - 30.0).abs() < 1e-9);
}

#[test]
fn test_score_zero_distance_idle_top_rated() {
    // Same location, no load, perfect rating: every component is zero
    let client = GeoPoint::new(6.5, 3.3);
    let candidate = presence_at("a", 6.5, 3.3, 0, 5.0);
    let scored = score_candidate(
        client,
        &candidate,
        &DispatchWeights::default(),
        DEFAULT_AVG_SPEED_KMH,
    );
    assert!(scored.score < 1e-9);
}

#[test]
fn test_score_load_and_rating_components() {
    let client = GeoPoint::new(6.5, 3.3);
    let candidate = presence_at("a", 6.5, 3.3, 2, 4.0);
    let scored = score_candidate(
        client,
        &candidate,
        &DispatchWeights::default(),
        DEFAULT_AVG_SPEED_KMH,
    );
    // 0.2 * 2 + 0.1 * (5 - 4) = 0.5
    assert!((scored.score - 0.5).abs() < 1e-9);
}

#[test]
fn test_pick_winner_lowest_score() {
    let client = GeoPoint::new(6.5, 3.3);
    let weights = DispatchWeights::default();
    let candidates = vec![
        score_candidate(client, &presence_at("far", 6.9, 3.7, 0, 5.0), &weights, 40.0),
        score_candidate(client, &presence_at("near", 6.51, 3.31, 0, 5.0), &weights, 40.0),
        score_candidate(client, &presence_at("busy", 6.51, 3.31, 5, 5.0), &weights, 40.0),
    ];

    let winner = pick_winner(candidates).unwrap();
    assert_eq!(winner.presence.agent_id, "near");
}

#[test]
fn test_pick_winner_empty() {
    assert!(pick_winner(vec![]).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_presence_expires_after_ttl() {
    let registry = PresenceRegistry::new(Duration::from_secs(60));
    registry.set_online("agent-1", GeoPoint::new(6.5, 3.3), 0, 5.0).await;

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(registry.get("agent-1").await.is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(registry.get("agent-1").await.is_none());
    assert!(registry.list_online().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_extends_presence() {
    let registry = PresenceRegistry::new(Duration::from_secs(60));
    registry.set_online("agent-1", GeoPoint::new(6.5, 3.3), 0, 5.0).await;

    tokio::time::advance(Duration::from_secs(45)).await;
    registry
        .heartbeat("agent-1", GeoPoint::new(6.55, 3.35), 1, 5.0)
        .await
        .unwrap();

    // 45s past the original deadline, but only 30s past the heartbeat
    tokio::time::advance(Duration::from_secs(30)).await;
    let presence = registry.get("agent-1").await.unwrap();
    assert_eq!(presence.load, 1);
    assert!((presence.location.lat - 6.55).abs() < 1e-9);
}

#[tokio::test]
async fn test_heartbeat_without_online_rejected() {
    let registry = PresenceRegistry::new(Duration::from_secs(60));
    let err = registry
        .heartbeat("ghost", GeoPoint::new(6.5, 3.3), 0, 5.0)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotOnline(_)));
}

#[tokio::test]
async fn test_offline_is_immediate() {
    let registry = PresenceRegistry::new(Duration::from_secs(60));
    registry.set_online("agent-1", GeoPoint::new(6.5, 3.3), 0, 5.0).await;
    assert!(registry.set_offline("agent-1").await);
    assert!(registry.get("agent-1").await.is_none());
    assert!(!registry.set_offline("agent-1").await);
}

#[tokio::test(start_paused = true)]
async fn test_request_expires_after_ttl() {
    let store = RequestStore::new(Duration::from_secs(600));
    let request = store.create("client-1", GeoPoint::new(6.5, 3.3), "Apartment").await;

    tokio::time::advance(Duration::from_secs(601)).await;
    assert!(store.get(&request.request_id).await.is_none());

    let err = store
        .transition(
            &request.request_id,
            RequestStatus::Pending,
            RequestStatus::Offered,
            Some("agent-1".to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
}

#[tokio::test]
async fn test_transition_requires_expected_status() {
    let store = RequestStore::new(Duration::from_secs(600));
    let request = store.create("client-1", GeoPoint::new(6.5, 3.3), "Hotel").await;

    store
        .transition(
            &request.request_id,
            RequestStatus::Pending,
            RequestStatus::Offered,
            Some("agent-1".to_string()),
        )
        .await
        .unwrap();

    // A second identical transition sees Offered, not Pending
    let err = store
        .transition(
            &request.request_id,
            RequestStatus::Pending,
            RequestStatus::Offered,
            Some("agent-2".to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::StatusConflict(_)));

    let current = store.get(&request.request_id).await.unwrap();
    assert_eq!(current.assigned_agent_id.as_deref(), Some("agent-1"));
}

#[tokio::test]
async fn test_matched_request_is_final() {
    let store = RequestStore::new(Duration::from_secs(600));
    let request = store.create("client-1", GeoPoint::new(6.5, 3.3), "Shortlet").await;

    store
        .transition(
            &request.request_id,
            RequestStatus::Pending,
            RequestStatus::Offered,
            Some("agent-1".to_string()),
        )
        .await
        .unwrap();
    store
        .transition(
            &request.request_id,
            RequestStatus::Offered,
            RequestStatus::Matched,
            None,
        )
        .await
        .unwrap();

    let err = store
        .transition(
            &request.request_id,
            RequestStatus::Matched,
            RequestStatus::Offered,
            Some("agent-2".to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::StatusConflict(_)));
}

#[tokio::test]
async fn test_declines_accumulate() {
    let store = RequestStore::new(Duration::from_secs(600));
    let request = store.create("client-1", GeoPoint::new(6.5, 3.3), "Apartment").await;

    store.record_decline(&request.request_id, "agent-1").await.unwrap();
    store.record_decline(&request.request_id, "agent-2").await.unwrap();
    store.record_decline(&request.request_id, "agent-1").await.unwrap();

    let current = store.get(&request.request_id).await.unwrap();
    assert_eq!(current.declined_by.len(), 2);
    assert!(current.declined_by.contains("agent-1"));
    assert!(current.declined_by.contains("agent-2"));
}
