//! One monitoring cycle: scan, score, persist, retrieve, assemble.
//!
//! Only one cycle may run at a time. Scan and store failures abort the cycle;
//! embedding and generation failures degrade it and are reported on the
//! [`CycleOutcome`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::context::ServiceContext;
use crate::error::{Degradation, MonitorError};
use crate::report::{Report, ReportAssembler, DEFAULT_ALERT_THRESHOLD, DEFAULT_MAX_TOKENS};
use crate::retrieval::{Neighbor, ReconcileReport, SimilarityRetriever};
use crate::scanner;
use crate::score;
use crate::snapshot::Snapshot;
use crate::standards::Standards;
use crate::store::{EntryId, EntryReport, HistoryEntry, SnapshotStore};

/// Default number of neighbors handed to the report assembler.
pub const DEFAULT_TOP_K: usize = 5;

/// Tunables for a [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Text-generation model.
    pub model: String,
    /// Embedding model.
    pub embed_model: String,
    /// Upper bound for each embedding or generation call.
    pub timeout: Duration,
    /// Score at or above which a report raises an alert.
    pub alert_threshold: f64,
    /// Number of similar scans to retrieve.
    pub top_k: usize,
    /// Generation budget.
    pub max_tokens: u32,
    /// Path segments skipped while scanning.
    pub ignore_patterns: Vec<String>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL.to_string(),
            embed_model: crate::config::DEFAULT_EMBED_MODEL.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            max_tokens: DEFAULT_MAX_TOKENS,
            ignore_patterns: scanner::default_ignore_patterns(),
        }
    }
}

/// Everything produced by one successful cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Identifier of the stored entry.
    pub entry_id: EntryId,
    /// The scan result.
    pub snapshot: Snapshot,
    /// Score, narrative, and alert flag.
    pub report: Report,
    /// Similar past scans used for the narrative.
    pub neighbors: Vec<Neighbor>,
    /// Fallbacks taken during the cycle.
    pub degradations: Vec<Degradation>,
}

/// Runs monitoring cycles against one store.
pub struct Monitor {
    store: SnapshotStore,
    standards: Standards,
    retriever: SimilarityRetriever,
    assembler: ReportAssembler,
    options: MonitorOptions,
    in_flight: AtomicBool,
    /// Set while some stored entry is known to lack a vector.
    index_stale: AtomicBool,
}

/// Clears the in-flight flag when a cycle ends, including on early return.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Monitor {
    /// Creates a monitor and reconciles the similarity index with the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read during reconciliation.
    pub async fn start(
        ctx: &ServiceContext,
        store: SnapshotStore,
        standards: Standards,
        options: MonitorOptions,
    ) -> Result<(Self, ReconcileReport), MonitorError> {
        let retriever = SimilarityRetriever::new(options.embed_model.clone(), options.timeout);
        let assembler = ReportAssembler::new(options.model.clone(), options.timeout)
            .with_alert_threshold(options.alert_threshold)
            .with_max_tokens(options.max_tokens);
        let reconciled = retriever.reconcile(&store, ctx.embedder.as_ref()).await?;
        let monitor = Self {
            store,
            standards,
            retriever,
            assembler,
            options,
            in_flight: AtomicBool::new(false),
            index_stale: AtomicBool::new(reconciled.missing > 0),
        };
        Ok((monitor, reconciled))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// The standards every cycle is measured against.
    #[must_use]
    pub fn standards(&self) -> &Standards {
        &self.standards
    }

    /// Re-runs index reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn reconcile(&self, ctx: &ServiceContext) -> Result<ReconcileReport, MonitorError> {
        let report = self.retriever.reconcile(&self.store, ctx.embedder.as_ref()).await?;
        self.index_stale.store(report.missing > 0, Ordering::Release);
        Ok(report)
    }

    /// Runs one full cycle over `root`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleInFlight`] if another cycle is running,
    /// or the scan or store error that aborted this one. Nothing is persisted
    /// when the scan fails.
    pub async fn run_cycle(
        &self,
        ctx: &ServiceContext,
        root: &Path,
    ) -> Result<CycleOutcome, MonitorError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(MonitorError::CycleInFlight);
        }
        let _guard = CycleGuard(&self.in_flight);

        // Entries left unindexed by earlier degraded cycles are caught up first.
        if self.index_stale.load(Ordering::Acquire) {
            let caught_up = self.reconcile(ctx).await?;
            if caught_up.embedded > 0 {
                log::info!("indexed {} scan(s) missed while the embedder was down", caught_up.embedded);
            }
        }

        let snapshot = scanner::scan(
            ctx.fs.as_ref(),
            ctx.clock.as_ref(),
            root,
            &self.standards,
            &self.options.ignore_patterns,
        )?;
        let sub_scores = score::sub_scores(&snapshot, &self.standards);
        let total = sub_scores.total();

        let entry_id = self.store.append(&HistoryEntry {
            snapshot: snapshot.clone(),
            score: total,
            sub_scores,
            embedding: None,
            report: None,
        })?;
        log::info!("stored scan {entry_id} of {} (score {total:.2})", root.display());

        let mut degradations = Vec::new();
        let retrieval = self
            .retriever
            .retrieve(&self.store, ctx.embedder.as_ref(), entry_id, &snapshot, self.options.top_k)
            .await?;
        if retrieval.degradation.is_some() {
            self.index_stale.store(true, Ordering::Release);
        }
        degradations.extend(retrieval.degradation);

        let (report, generation) = self
            .assembler
            .assemble(ctx.llm.as_ref(), &snapshot, &sub_scores, &retrieval.neighbors, &self.standards)
            .await;
        degradations.extend(generation);

        self.store.attach_report(
            entry_id,
            &EntryReport {
                narrative: report.narrative.clone(),
                alert: report.alert,
                degraded: report.degraded,
            },
        )?;
        if report.alert {
            log::warn!(
                "messiness score {:.1} reached alert threshold {:.1}",
                report.score,
                self.assembler.alert_threshold()
            );
        }

        Ok(CycleOutcome { entry_id, snapshot, report, neighbors: retrieval.neighbors, degradations })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ScanError;
    use crate::store::TimeRange;
    use crate::testing::{FixedClock, HistogramEmbedder, MemFs, StubLlm};

    fn context(fs: MemFs, llm: StubLlm, embedder: HistogramEmbedder) -> ServiceContext {
        ServiceContext::from_parts(
            Box::new(FixedClock::epoch()),
            Box::new(fs),
            Box::new(llm),
            Box::new(embedder),
        )
    }

    fn tree() -> MemFs {
        let fs = MemFs::new();
        fs.add_file("/w/readme.md", 10);
        fs.add_file("/w/src/main.rs", 10);
        fs.add_file("/w/My Notes.txt", 10);
        fs.add_file("/w/temp.log", 10);
        fs
    }

    async fn monitor(ctx: &ServiceContext) -> Monitor {
        let store = SnapshotStore::open_in_memory().unwrap();
        let (monitor, _) =
            Monitor::start(ctx, store, Standards::default(), MonitorOptions::default()).await.unwrap();
        monitor
    }

    #[tokio::test]
    async fn cycle_persists_entry_vector_and_report() {
        let ctx = context(tree(), StubLlm::Answer("Tidy.".into()), HistogramEmbedder::working());
        let m = monitor(&ctx).await;

        let first = m.run_cycle(&ctx, Path::new("/w")).await.unwrap();
        assert!(first.degradations.is_empty());
        assert!(first.neighbors.is_empty());
        assert_eq!(first.report.narrative, "Tidy.");

        let second = m.run_cycle(&ctx, Path::new("/w")).await.unwrap();
        assert_eq!(second.neighbors.len(), 1);
        assert_eq!(second.neighbors[0].id, first.entry_id);

        let stored = m.store().get(second.entry_id).unwrap().unwrap();
        assert!(stored.entry.embedding.is_some());
        assert_eq!(stored.entry.report.unwrap().narrative, "Tidy.");
        assert_eq!(stored.entry.score.to_bits(), second.report.score.to_bits());
    }

    #[tokio::test]
    async fn cycle_degrades_when_backends_fail() {
        let ctx = context(tree(), StubLlm::Fail, HistogramEmbedder::failing());
        let m = monitor(&ctx).await;

        let outcome = m.run_cycle(&ctx, Path::new("/w")).await.unwrap();
        assert_eq!(outcome.degradations.len(), 2);
        assert!(outcome.report.degraded);
        assert!(outcome.report.score > 0.0);
        assert_eq!(m.store().len().unwrap(), 1);
        assert!(m.store().vectors().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cycles_after_an_outage_index_the_missed_scans() {
        let embedder = HistogramEmbedder::failing();
        let offline = embedder.failure_switch();
        let ctx = context(tree(), StubLlm::Answer("Ok.".into()), embedder);
        let m = monitor(&ctx).await;

        let missed = m.run_cycle(&ctx, Path::new("/w")).await.unwrap();
        assert!(missed.neighbors.is_empty());
        assert!(m.store().vectors().unwrap().is_empty());

        offline.store(false, std::sync::atomic::Ordering::SeqCst);
        let next = m.run_cycle(&ctx, Path::new("/w")).await.unwrap();
        assert!(next.degradations.is_empty());
        assert_eq!(next.neighbors.len(), 1);
        assert_eq!(next.neighbors[0].id, missed.entry_id);
        let indexed: Vec<EntryId> = m.store().vectors().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(indexed, vec![missed.entry_id, next.entry_id]);
    }

    #[tokio::test]
    async fn scan_failure_persists_nothing() {
        let ctx = context(tree(), StubLlm::Fail, HistogramEmbedder::working());
        let m = monitor(&ctx).await;

        let err = m.run_cycle(&ctx, Path::new("/missing")).await.unwrap_err();
        assert!(matches!(err, MonitorError::Scan(ScanError::MissingRoot(_))));
        assert!(m.store().query(TimeRange::all()).unwrap().is_empty());

        // The guard is released after a failed cycle.
        assert!(m.run_cycle(&ctx, Path::new("/w")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycles_are_rejected() {
        let ctx = Arc::new(context(tree(), StubLlm::Hang, HistogramEmbedder::working()));
        let m = Arc::new(monitor(&ctx).await);

        let first = {
            let (ctx, m) = (Arc::clone(&ctx), Arc::clone(&m));
            async move { m.run_cycle(&ctx, Path::new("/w")).await }
        };
        let second = {
            let (ctx, m) = (Arc::clone(&ctx), Arc::clone(&m));
            async move {
                tokio::task::yield_now().await;
                m.run_cycle(&ctx, Path::new("/w")).await
            }
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(MonitorError::CycleInFlight)));
        assert_eq!(m.store().len().unwrap(), 1);
    }
}
