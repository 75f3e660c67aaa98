//! Report assembler: turns a scored snapshot and its neighbors into a narrative.
//!
//! The text model is asked for a verdict, the top three issues, and concrete
//! actions. When it fails, times out, or answers with nothing, the narrative
//! falls back to a deterministic rendering of the sub-scores, so scoring and
//! alerting never depend on model availability.

pub mod export;

use std::fmt::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Degradation;
use crate::ports::{CompletionRequest, LlmClient};
use crate::retrieval::Neighbor;
use crate::score::{Category, SubScores, MAX_SCORE};
use crate::snapshot::Snapshot;
use crate::standards::Standards;

/// Default score at or above which a report raises an alert.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 5.0;
/// Default generation budget.
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Violations of each kind quoted in the prompt.
const PROMPT_LIST_LIMIT: usize = 10;

const SYSTEM_INSTRUCTION: &str = "You are a development standards expert reviewing the \
layout of a project directory. Answer in plain text without markdown. Start with a one-line \
overall verdict on how messy the directory is. Then list the top 3 issues, most severe first. \
Finish with specific recommended actions. Be concise and actionable.";

/// Outcome of assembling one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Messiness score in `[0, 10]`.
    pub score: f64,
    /// Score breakdown.
    pub sub_scores: SubScores,
    /// Generated or fallback narrative.
    pub narrative: String,
    /// `score >= alert_threshold`.
    pub alert: bool,
    /// `true` when `narrative` is the deterministic fallback.
    pub degraded: bool,
}

/// Builds prompts, calls the text model, and packages the result.
pub struct ReportAssembler {
    model: String,
    timeout: Duration,
    alert_threshold: f64,
    max_tokens: u32,
}

impl ReportAssembler {
    /// Creates an assembler for `model` with the default alert threshold.
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            timeout,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Overrides the alert threshold.
    #[must_use]
    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    /// Overrides the generation budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The configured alert threshold.
    #[must_use]
    pub fn alert_threshold(&self) -> f64 {
        self.alert_threshold
    }

    /// Assembles a report. Never fails; generation problems are returned as
    /// a [`Degradation`] next to a fallback report.
    pub async fn assemble(
        &self,
        llm: &dyn LlmClient,
        snapshot: &Snapshot,
        sub_scores: &SubScores,
        neighbors: &[Neighbor],
        standards: &Standards,
    ) -> (Report, Option<Degradation>) {
        let score = sub_scores.total();
        let request = CompletionRequest {
            model: self.model.clone(),
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: build_prompt(snapshot, sub_scores, neighbors, standards),
            max_tokens: self.max_tokens,
        };

        let generated = match tokio::time::timeout(self.timeout, llm.complete(&request)).await {
            Ok(Ok(response)) if response.text.trim().is_empty() => {
                Err(Degradation::Generation("model returned an empty answer".into()))
            }
            Ok(Ok(response)) => {
                log::debug!(
                    "generated narrative ({} prompt / {} completion tokens)",
                    response.prompt_tokens,
                    response.completion_tokens
                );
                Ok(response.text.trim().to_string())
            }
            Ok(Err(e)) => Err(Degradation::Generation(format!("generation failed: {e}"))),
            Err(_) => Err(Degradation::Generation(format!(
                "generation timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        let (narrative, degradation) = match generated {
            Ok(text) => (text, None),
            Err(degradation) => {
                log::warn!("{degradation}; using fallback narrative");
                (fallback_narrative(sub_scores), Some(degradation))
            }
        };

        let report = Report {
            score,
            sub_scores: *sub_scores,
            narrative,
            alert: score >= self.alert_threshold,
            degraded: degradation.is_some(),
        };
        (report, degradation)
    }
}

/// Renders the user prompt for one snapshot.
#[must_use]
pub fn build_prompt(
    snapshot: &Snapshot,
    sub_scores: &SubScores,
    neighbors: &[Neighbor],
    standards: &Standards,
) -> String {
    let mut p = String::new();
    let _ = writeln!(p, "Directory: {}", snapshot.root_path.display());
    let _ = writeln!(p, "Scanned at: {}", snapshot.timestamp.to_rfc3339());
    let _ = writeln!(p);
    let _ = writeln!(p, "Current state:");
    let _ = writeln!(p, "- Total files: {}", snapshot.total_files);
    let _ = writeln!(p, "- Total directories: {}", snapshot.total_dirs);
    let _ = writeln!(p, "- Maximum depth: {} (limit {})", snapshot.max_depth, standards.max_depth);
    let _ = writeln!(p, "- Naming violations: {}", snapshot.naming_violations.len());
    let _ = writeln!(p, "- Forbidden pattern hits: {}", snapshot.forbidden_pattern_hits.len());
    let _ = writeln!(p, "- Oversized files: {}", snapshot.oversized_files.len());
    let crowded = snapshot.crowded_dirs(standards.max_files_per_dir);
    let _ = writeln!(
        p,
        "- Directories over {} files: {}",
        standards.max_files_per_dir,
        crowded.len()
    );
    let _ = writeln!(p);

    let _ = writeln!(p, "Messiness score: {:.1}/{MAX_SCORE:.0}", sub_scores.total());
    for category in Category::ALL {
        let _ = writeln!(p, "- {}: {:.2}", category.label(), sub_scores.get(category));
    }

    let details: Vec<String> = snapshot
        .naming_violations
        .iter()
        .take(PROMPT_LIST_LIMIT)
        .map(|v| format!("- {} ({})", v.path, v.rule))
        .chain(
            snapshot
                .forbidden_pattern_hits
                .iter()
                .take(PROMPT_LIST_LIMIT)
                .map(|h| format!("- {} (matches \"{}\")", h.path, h.pattern)),
        )
        .chain(
            snapshot
                .oversized_files
                .iter()
                .take(PROMPT_LIST_LIMIT)
                .map(|f| format!("- {} ({} bytes)", f.path, f.size)),
        )
        .chain(
            crowded
                .iter()
                .take(PROMPT_LIST_LIMIT)
                .map(|(dir, count)| format!("- {dir}/ holds {count} files")),
        )
        .collect();
    if !details.is_empty() {
        let _ = writeln!(p);
        let _ = writeln!(p, "Specific issues:");
        for line in details {
            let _ = writeln!(p, "{line}");
        }
    }

    let _ = writeln!(p);
    let _ = writeln!(p, "Recommended structure: {}", standards.recommended_structure.join(", "));
    let _ = writeln!(p, "Forbidden patterns: {}", standards.forbidden_patterns.join(", "));

    if !neighbors.is_empty() {
        let _ = writeln!(p);
        let _ = writeln!(p, "Similar past scans:");
        for n in neighbors {
            let issues = if n.top_issues.is_empty() {
                "no issues".to_string()
            } else {
                n.top_issues.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
            };
            let _ = writeln!(
                p,
                "- {} (similarity {:.2}): score {:.1}, {issues}",
                n.timestamp.to_rfc3339(),
                n.similarity,
                n.score
            );
        }
    }
    p
}

/// Deterministic narrative built only from the sub-scores.
#[must_use]
pub fn fallback_narrative(sub_scores: &SubScores) -> String {
    let score = sub_scores.total();
    let ranked = sub_scores.ranked();
    if ranked.is_empty() {
        return format!("Verdict: clean (score {score:.1}/{MAX_SCORE:.0}). No issues detected.");
    }

    let verdict = match score {
        s if s >= 7.0 => "very messy",
        s if s >= 4.0 => "messy",
        s if s >= 2.0 => "somewhat messy",
        _ => "mostly tidy",
    };
    let mut out = format!("Verdict: {verdict} (score {score:.1}/{MAX_SCORE:.0}).\n\nTop issues:\n");
    for (i, (category, value)) in ranked.iter().take(3).enumerate() {
        let _ = writeln!(out, "{}. {} ({value:.2})", i + 1, category.label());
    }
    out.push_str("\nRecommended actions:\n");
    for (category, _) in ranked.iter().take(3) {
        let _ = writeln!(out, "- {}", category.remedy());
    }
    out.truncate(out.trim_end().len());
    out
}
