//! Startup self-healing: replays any observation/summary rows
//! written since the vector index's last recorded watermark, so a crash
//! between a Store write and its vector mirror does not leave search
//! permanently degraded for those rows.

use std::sync::Arc;

use recall_store::Store;
use recall_types::{EntityKind, Observation, SessionSummary};
use recall_vector::{VectorIndex, VectorMetadata};

const BATCH: i64 = 200;

fn observation_text(o: &Observation) -> String {
    [
        o.title.as_deref().unwrap_or_default(),
        o.subtitle.as_deref().unwrap_or_default(),
        o.narrative.as_deref().unwrap_or_default(),
        &o.facts.join(". "),
    ]
    .join("\n")
}

fn observation_metadata(o: &Observation) -> VectorMetadata {
    VectorMetadata {
        project: o.project.clone(),
        kind: o.kind.as_str().to_string(),
        created_at_epoch: o.created_at.timestamp(),
        concepts: o.concepts.clone(),
        files: o.files_read.iter().chain(o.files_modified.iter()).cloned().collect(),
        prompt_number: o.prompt_number,
    }
}

fn summary_text(s: &SessionSummary) -> String {
    [
        s.request.as_deref().unwrap_or_default(),
        s.investigated.as_deref().unwrap_or_default(),
        s.learned.as_deref().unwrap_or_default(),
        s.completed.as_deref().unwrap_or_default(),
        s.next_steps.as_deref().unwrap_or_default(),
        s.notes.as_deref().unwrap_or_default(),
    ]
    .join("\n")
}

fn summary_metadata(s: &SessionSummary) -> VectorMetadata {
    VectorMetadata {
        project: s.project.clone(),
        kind: "summary".to_string(),
        created_at_epoch: s.created_at.timestamp(),
        concepts: Vec::new(),
        files: Vec::new(),
        prompt_number: s.prompt_number,
    }
}

pub async fn resync_vector_index(store: &Store, vector: &Arc<dyn VectorIndex>) {
    let mut watermark = match store.vector_watermark("observation").await {
        Ok(w) => w,
        Err(err) => {
            tracing::warn!(error = %err, "could not read observation vector watermark, skipping resync");
            return;
        }
    };
    loop {
        let batch = match store.observations_after(watermark, BATCH).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "observation resync scan failed");
                return;
            }
        };
        if batch.is_empty() {
            break;
        }
        for observation in &batch {
            if let Err(err) = vector
                .upsert(EntityKind::Observation, observation.id, &observation_text(observation), observation_metadata(observation))
                .await
            {
                tracing::warn!(error = %err, id = observation.id, "observation resync upsert failed, will retry next startup");
                return;
            }
            watermark = observation.id;
        }
        if let Err(err) = store.set_vector_watermark("observation", watermark).await {
            tracing::warn!(error = %err, "failed to persist observation vector watermark");
        }
    }

    let mut watermark = match store.vector_watermark("summary").await {
        Ok(w) => w,
        Err(err) => {
            tracing::warn!(error = %err, "could not read summary vector watermark, skipping resync");
            return;
        }
    };
    loop {
        let batch = match store.summaries_after(watermark, BATCH).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "summary resync scan failed");
                return;
            }
        };
        if batch.is_empty() {
            break;
        }
        for summary in &batch {
            if let Err(err) = vector
                .upsert(EntityKind::Summary, summary.id, &summary_text(summary), summary_metadata(summary))
                .await
            {
                tracing::warn!(error = %err, id = summary.id, "summary resync upsert failed, will retry next startup");
                return;
            }
            watermark = summary.id;
        }
        if let Err(err) = store.set_vector_watermark("summary", watermark).await {
            tracing::warn!(error = %err, "failed to persist summary vector watermark");
        }
    }
}
