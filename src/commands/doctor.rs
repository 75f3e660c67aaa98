//! `tidyscan doctor` command.

use std::fmt::Write;

use super::{load_standards, open_store};
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::ports::{CompletionRequest, EmbeddingRequest};

/// Result of one environment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, passed: true, detail: detail.into() }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, passed: false, detail: detail.into() }
    }
}

/// Execute the `doctor` command.
///
/// # Errors
///
/// Returns an error string naming how many checks failed.
pub async fn run(ctx: &ServiceContext, settings: &Settings) -> Result<(), String> {
    let checks = run_checks(ctx, settings).await;
    print!("{}", render(&checks));
    let failed = checks.iter().filter(|c| !c.passed).count();
    if failed == 0 {
        Ok(())
    } else {
        Err(format!("{failed} check(s) failed"))
    }
}

pub(crate) async fn run_checks(ctx: &ServiceContext, settings: &Settings) -> Vec<Check> {
    let mut checks = Vec::with_capacity(4);

    checks.push(match open_store(settings).and_then(|s| s.len().map_err(|e| e.to_string())) {
        Ok(n) => Check::pass("history", format!("{} ({n} scans)", settings.db_path.display())),
        Err(e) => Check::fail("history", e),
    });

    checks.push(match load_standards(ctx, settings) {
        Ok(_) if ctx.fs.exists(&settings.standards_path) => {
            Check::pass("standards", settings.standards_path.display().to_string())
        }
        Ok(_) => Check::pass("standards", "defaults (no standards file)"),
        Err(e) => Check::fail("standards", e),
    });

    let embed = EmbeddingRequest { model: settings.embed_model.clone(), text: "tidyscan".into() };
    checks.push(match tokio::time::timeout(settings.timeout, ctx.embedder.embed(&embed)).await {
        Ok(Ok(vector)) if !vector.is_empty() => {
            Check::pass("embedder", format!("{} ({} dimensions)", settings.embed_model, vector.len()))
        }
        Ok(Ok(_)) => Check::fail("embedder", format!("{} returned an empty vector", settings.embed_model)),
        Ok(Err(e)) => Check::fail("embedder", format!("{}: {e}", settings.embed_model)),
        Err(_) => Check::fail("embedder", format!("{}: timed out", settings.embed_model)),
    });

    let prompt = CompletionRequest {
        model: settings.model.clone(),
        system: "Reply with the single word ok.".into(),
        prompt: "ping".into(),
        max_tokens: 8,
    };
    checks.push(match tokio::time::timeout(settings.timeout, ctx.llm.complete(&prompt)).await {
        Ok(Ok(_)) => Check::pass("model", settings.model.clone()),
        Ok(Err(e)) => Check::fail("model", format!("{}: {e}", settings.model)),
        Err(_) => Check::fail("model", format!("{}: timed out", settings.model)),
    });

    checks
}

pub(crate) fn render(checks: &[Check]) -> String {
    let mut out = String::new();
    for check in checks {
        let mark = if check.passed { "ok" } else { "FAIL" };
        let _ = writeln!(out, "{mark:>4}  {:<10} {}", check.name, check.detail);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::cli::GlobalArgs;
    use crate::testing::{FixedClock, HistogramEmbedder, MemFs, StubLlm};

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::resolve(&GlobalArgs::default(), |_| None::<String>);
        settings.db_path = dir.join("history.db");
        settings.standards_path = dir.join("tidyscan.yaml");
        settings
    }

    fn ctx(llm: StubLlm, embedder: HistogramEmbedder) -> ServiceContext {
        ServiceContext::from_parts(
            Box::new(FixedClock::epoch()),
            Box::new(MemFs::new()),
            Box::new(llm),
            Box::new(embedder),
        )
    }

    #[tokio::test]
    async fn all_checks_pass_with_working_backends() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let checks = run_checks(&ctx(StubLlm::Answer("ok".into()), HistogramEmbedder::working()), &settings).await;

        assert_eq!(checks.len(), 4);
        assert!(checks.iter().all(|c| c.passed), "{checks:?}");
        assert_eq!(checks[1].detail, "defaults (no standards file)");
        assert!(checks[2].detail.contains("16 dimensions"));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_backends_fail_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let ctx = ctx(StubLlm::Hang, HistogramEmbedder::failing());

        let checks = run_checks(&ctx, &settings).await;
        assert!(checks[0].passed);
        assert!(!checks[2].passed);
        assert!(checks[3].detail.ends_with("timed out"));

        let err = run(&ctx, &settings).await.unwrap_err();
        assert_eq!(err, "2 check(s) failed");
    }

    #[test]
    fn render_marks_failures() {
        let text = render(&[Check::pass("history", "h.db"), Check::fail("model", "m: timed out")]);
        assert_eq!(text, "  ok  history    h.db\nFAIL  model      m: timed out\n");
    }
}
