//! Structured observability hooks for unit attempts.
//!
//! - `attempt_span` tags everything inside an attempt
//! - `emit_*` functions for the lifecycle: session opened, task presented /
//!   rejected / evaluated, outcome, transition, delivery failures
//!
//! Lifecycle events are emitted at `info!`, recoverable failures at `warn!`.
//! Filter with `RUST_LOG`, e.g. `RUST_LOG=mastery_engine=debug`.

use tracing::{info, warn};

/// Span tagging everything that happens inside one attempt.
///
/// Attach it to the attempt future with `tracing::Instrument` rather than
/// entering it, since the attempt awaits across task boundaries.
pub fn attempt_span(unit: &str, attempt: &str) -> tracing::Span {
    tracing::info_span!("mastery.attempt", unit = %unit, attempt = %attempt)
}

pub fn emit_session_opened(unit: &str, attempt: &str, tasks: usize) {
    info!(event = "session.opened", unit = %unit, attempt = %attempt, tasks = tasks);
}

pub fn emit_task_presented(task_id: &str, order: u32, time_limit_secs: Option<u64>) {
    info!(
        event = "task.presented",
        task_id = %task_id,
        order = order,
        time_limit_secs = time_limit_secs,
    );
}

/// A learner submission was refused before grading.
pub fn emit_task_rejected(task_id: &str, reason: &dyn std::fmt::Display) {
    info!(event = "task.rejected", task_id = %task_id, reason = %reason);
}

pub fn emit_task_auto_submitted(task_id: &str) {
    info!(event = "task.auto_submitted", task_id = %task_id);
}

pub fn emit_task_evaluated(task_id: &str, score: u32, max_score: u32, source: &str) {
    info!(
        event = "task.evaluated",
        task_id = %task_id,
        score = score,
        max_score = max_score,
        source = %source,
    );
}

pub fn emit_task_skipped(task_id: &str) {
    info!(event = "task.skipped", task_id = %task_id);
}

pub fn emit_grader_unavailable(task_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "grader.unavailable", task_id = %task_id, error = %error);
}

pub fn emit_score_write_failed(task_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "score.write_failed", task_id = %task_id, error = %error);
}

pub fn emit_outcome(unit: &str, total: u32, pass_threshold: u32, passed: bool) {
    info!(
        event = "session.outcome",
        unit = %unit,
        total = total,
        pass_threshold = pass_threshold,
        passed = passed,
    );
}

pub fn emit_transition(unit: &str, kind: &str, route: &str, skipped_delay: bool) {
    info!(
        event = "router.transition",
        unit = %unit,
        kind = %kind,
        route = %route,
        skipped_delay = skipped_delay,
    );
}

/// Diagnostic channel for dropped completion records.
pub fn emit_delivery_failed(kind: &str, subject: &str, error: &dyn std::fmt::Display) {
    warn!(event = "delivery.failed", kind = %kind, subject = %subject, error = %error);
}
