//! `getContext`: the canonical view an agent fetches at session
//! start; recent observations, recent summaries, and the token-economics
//! statistics that justify the whole system's existence.

use recall_store::Store;
use recall_types::{Observation, SessionSummary};
use serde::Serialize;

use crate::error::QueryResult;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenStats {
    pub read_tokens: i64,
    pub work_tokens: i64,
    pub savings: i64,
    pub savings_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
    pub observations: Vec<Observation>,
    pub summaries: Vec<SessionSummary>,
    pub token_stats: TokenStats,
}

/// Rough token estimate for a chunk of text: ceil(chars / 4), a coarse
/// heuristic but stable and cheap enough to run on every fetch.
fn estimate_tokens(text: &str) -> i64 {
    let len = text.chars().count() as i64;
    (len + 3) / 4
}

fn observation_read_tokens(o: &Observation) -> i64 {
    let combined = [
        o.title.as_deref().unwrap_or_default(),
        o.subtitle.as_deref().unwrap_or_default(),
        o.narrative.as_deref().unwrap_or_default(),
        &o.facts.join(""),
    ]
    .concat();
    estimate_tokens(&combined)
}

fn compute_token_stats(observations: &[Observation]) -> TokenStats {
    let read_tokens: i64 = observations.iter().map(observation_read_tokens).sum();
    let work_tokens: i64 = observations.iter().map(|o| o.discovery_tokens).sum();
    let savings = work_tokens - read_tokens;
    let savings_percent = if work_tokens > 0 {
        (savings as f64 / work_tokens as f64) * 100.0
    } else {
        0.0
    };
    TokenStats {
        read_tokens,
        work_tokens,
        savings,
        savings_percent,
    }
}

pub async fn get_context(
    store: &Store,
    project: &str,
    limit: Option<i64>,
    summary_limit: Option<i64>,
) -> QueryResult<ContextResult> {
    let limit = limit.map(|n| n.clamp(1, 200)).unwrap_or(50);
    let summary_limit = summary_limit.map(|n| n.clamp(1, 50)).unwrap_or(10);

    let observations = store.get_recent_observations(Some(project), limit).await?;
    let summaries = store.get_recent_summaries(Some(project), summary_limit).await?;
    let token_stats = compute_token_stats(&observations);

    Ok(ContextResult {
        observations,
        summaries,
        token_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recall_types::ObservationType;

    fn observation(title: &str, discovery_tokens: i64) -> Observation {
        Observation {
            id: 1,
            sdk_session_id: "s".to_string(),
            project: "demo".to_string(),
            kind: ObservationType::Change,
            title: Some(title.to_string()),
            subtitle: None,
            narrative: None,
            facts: Vec::new(),
            concepts: Vec::new(),
            files_read: Vec::new(),
            files_modified: Vec::new(),
            prompt_number: None,
            discovery_tokens,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_stats_computes_savings_against_discovery_cost() {
        let observations = vec![observation("abcd", 100)];
        let stats = compute_token_stats(&observations);
        assert_eq!(stats.read_tokens, 1);
        assert_eq!(stats.work_tokens, 100);
        assert_eq!(stats.savings, 99);
        assert!((stats.savings_percent - 99.0).abs() < 0.01);
    }

    #[test]
    fn token_stats_with_no_observations_is_all_zero() {
        let stats = compute_token_stats(&[]);
        assert_eq!(stats.read_tokens, 0);
        assert_eq!(stats.work_tokens, 0);
        assert_eq!(stats.savings_percent, 0.0);
    }
}
