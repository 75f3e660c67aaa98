//! `tidyscan reconcile` command.

use super::open_store;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::retrieval::{ReconcileReport, SimilarityRetriever};

/// Execute the `reconcile` command.
///
/// Drops vectors whose entry is gone and embeds entries that have none.
///
/// # Errors
///
/// Returns an error string if the history cannot be read or written.
pub async fn run(ctx: &ServiceContext, settings: &Settings) -> Result<(), String> {
    let store = open_store(settings)?;
    let retriever = SimilarityRetriever::new(settings.embed_model.clone(), settings.timeout);
    let report = retriever
        .reconcile(&store, ctx.embedder.as_ref())
        .await
        .map_err(|e| e.to_string())?;
    print!("{}", render(&report, retriever.len()));
    Ok(())
}

pub(crate) fn render(report: &ReconcileReport, indexed: usize) -> String {
    let mut out = format!(
        "Pruned {} orphaned vector(s), embedded {} scan(s); {indexed} indexed.\n",
        report.pruned, report.embedded
    );
    if report.missing > 0 {
        out.push_str(&format!(
            "{} scan(s) still have no vector; check that the embedding model is reachable.\n",
            report.missing
        ));
    }
    out
}
