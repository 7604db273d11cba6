//! Node id migration: recompute every node's identifier from its display
//! name and write it back in batches.

use crate::document::{DocumentStore, FieldUpdate, StoreError};
use toolbelt_core::config::MigrateConfig;
use toolbelt_core::{try_normalize, Identifier, MonotonicSeeds, SeedSource};

/// Counters for one migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Documents listed.
    pub scanned: usize,
    /// Documents whose id was written by a successful commit.
    pub updated: usize,
    /// Documents in batches whose commit failed.
    pub failed: usize,
    /// Successful commits.
    pub batches: usize,
    /// Names that normalized to nothing and got a `node_<seed>` id.
    pub fallbacks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Completed(MigrationReport),
    /// The confirmation callback declined; nothing was written.
    Aborted { scanned: usize },
}

/// Recompute `cfg.id_field` for every document in the configured collection.
///
/// `confirm` receives the document count and is skipped when `assume_yes` or
/// `dry_run` is set. A failed commit is logged and its documents counted as
/// failed; the run moves on to the next batch.
pub async fn run_migration<S>(
    store: &dyn DocumentStore,
    cfg: &MigrateConfig,
    seeds: S,
    confirm: impl FnOnce(usize) -> bool,
) -> Result<MigrationOutcome, StoreError>
where
    S: SeedSource,
{
    cfg.validate()?;
    let seeds = MonotonicSeeds::new(seeds);
    let collection = cfg.collection_path();

    tracing::info!(collection = %collection, "fetching nodes");
    let docs = store.list_documents(&collection).await?;
    let total = docs.len();
    let mut report = MigrationReport {
        scanned: total,
        ..MigrationReport::default()
    };

    if docs.is_empty() {
        tracing::info!("No nodes to update.");
        return Ok(MigrationOutcome::Completed(report));
    }
    tracing::info!(count = total, "found nodes");

    if !(cfg.assume_yes || cfg.dry_run) && !confirm(total) {
        tracing::info!("aborted, nothing written");
        return Ok(MigrationOutcome::Aborted { scanned: total });
    }

    let mut batch: Vec<FieldUpdate> = Vec::with_capacity(cfg.batch_size);

    for (i, doc) in docs.iter().enumerate() {
        let name = doc
            .str_field(&cfg.name_field)
            .filter(|n| !n.is_empty())
            .unwrap_or(doc.id.as_str());
        let id = match try_normalize(name) {
            Some(id) => id,
            None => {
                report.fallbacks += 1;
                Identifier::fallback(seeds.next_seed())
            }
        };
        tracing::info!("[{}/{total}] name='{name}' -> id='{id}' (docId: {})", i + 1, doc.id);

        if cfg.dry_run {
            continue;
        }
        batch.push(FieldUpdate {
            path: doc.path.clone(),
            field: cfg.id_field.clone(),
            value: id.into_string(),
        });
        if batch.len() >= cfg.batch_size {
            flush(store, &mut batch, &mut report).await;
        }
    }
    if !batch.is_empty() {
        flush(store, &mut batch, &mut report).await;
    }

    if cfg.dry_run {
        tracing::info!(count = total, "dry run, nothing written");
    } else if report.failed == 0 {
        tracing::info!("Successfully updated {} nodes.", report.updated);
    } else {
        tracing::error!(
            updated = report.updated,
            failed = report.failed,
            "migration finished with failed batches"
        );
    }

    Ok(MigrationOutcome::Completed(report))
}

async fn flush(store: &dyn DocumentStore, batch: &mut Vec<FieldUpdate>, report: &mut MigrationReport) {
    let size = batch.len();
    match store.commit(batch).await {
        Ok(()) => {
            report.updated += size;
            report.batches += 1;
            tracing::info!(size, "committed batch");
        }
        Err(e) => {
            report.failed += size;
            tracing::error!(size, error = %e, "batch commit failed");
        }
    }
    batch.clear();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
