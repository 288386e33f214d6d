use crate::core::geo::haversine_distance;
use crate::models::{AgentPresence, DispatchWeights, GeoPoint, ScoredCandidate};

/// Assumed average travel speed used to turn distance into an ETA
pub const DEFAULT_AVG_SPEED_KMH: f64 = 40.0;

/// Estimated travel time in minutes at the given average speed
#[inline]
pub fn eta_minutes(distance_km: f64, avg_speed_kmh: f64) -> f64 {
    distance_km / avg_speed_kmh * 60.0
}

/// Score one candidate for a client location; lower is better
///
/// Scoring formula:
/// ```text
/// score = eta_minutes * 0.7     # nearer agents win
///       + load        * 0.2    # busier agents lose
///       + (5 - rating) * 0.1   # better-rated agents win
/// ```
pub fn score_candidate(
    client: GeoPoint,
    presence: &AgentPresence,
    weights: &DispatchWeights,
    avg_speed_kmh: f64,
) -> ScoredCandidate {
    let distance_km = haversine_distance(
        client.lat,
        client.lng,
        presence.location.lat,
        presence.location.lng,
    );
    let eta = eta_minutes(distance_km, avg_speed_kmh);

    let score = eta * weights.eta
        + presence.load as f64 * weights.load
        + (5.0 - presence.rating) * weights.rating;

    ScoredCandidate {
        presence: presence.clone(),
        distance_km,
        eta_minutes: eta,
        score,
    }
}

/// Pick the candidate with the strictly lowest score
///
/// Ties keep the first-encountered candidate, so the result is deterministic
/// for a snapshot with stable iteration order.
pub fn pick_winner(candidates: Vec<ScoredCandidate>) -> Option<ScoredCandidate> {
    let mut winner: Option<ScoredCandidate> = None;
    for candidate in candidates {
        match &winner {
            Some(best) if candidate.score >= best.score => {}
            _ => winner = Some(candidate),
        }
    }
    winner
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn presence(id: &str, lat: f64, lng: f64, load: u32, rating: f64) -> AgentPresence {
        AgentPresence {
            agent_id: id.to_string(),
            location: GeoPoint::new(lat, lng),
            load,
            rating,
            online_since: Utc::now(),
            last_heartbeat: Utc::now(),
        }
    }

    #[test]
    fn test_eta_minutes() {
        // 40 km at 40 km/h is exactly one hour
        assert_eq!(eta_minutes(40.0, 40.0), 60.0);
        assert_eq!(eta_minutes(10.0, 40.0), 15.0);
    }

    #[test]
    fn test_zero_distance_score_is_rating_and_load_only() {
        let client = GeoPoint::new(6.5, 3.3);
        let agent = presence("a", 6.5, 3.3, 2, 4.0);
        let scored = score_candidate(client, &agent, &DispatchWeights::default(), 40.0);

        assert_eq!(scored.distance_km, 0.0);
        // 0.2 * 2 + 0.1 * (5 - 4) = 0.5
        assert!((scored.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_idle_nearby_agent_beats_loaded_far_agent() {
        let client = GeoPoint::new(6.5, 3.3);
        let a = presence("a", 6.5, 3.3, 0, 5.0);
        let b = presence("b", 6.52, 3.35, 3, 4.0);
        let weights = DispatchWeights::default();

        let scored_a = score_candidate(client, &a, &weights, 40.0);
        let scored_b = score_candidate(client, &b, &weights, 40.0);

        assert!(scored_a.score < scored_b.score);

        let winner = pick_winner(vec![scored_b, scored_a]).unwrap();
        assert_eq!(winner.presence.agent_id, "a");
    }

    #[test]
    fn test_tie_keeps_first_encountered() {
        let client = GeoPoint::new(6.5, 3.3);
        let a = presence("first", 6.5, 3.3, 1, 5.0);
        let b = presence("second", 6.5, 3.3, 1, 5.0);
        let weights = DispatchWeights::default();

        let winner = pick_winner(vec![
            score_candidate(client, &a, &weights, 40.0),
            score_candidate(client, &b, &weights, 40.0),
        ])
        .unwrap();

        assert_eq!(winner.presence.agent_id, "first");
    }

    #[test]
    fn test_empty_candidates_yield_no_winner() {
        assert!(pick_winner(vec![]).is_none());
    }
}
