//! Structured observability hooks for the stage run lifecycle.
//!
//! Events are emitted at `info!` level with an `event` field naming them;
//! panics caught at the check boundary are reported at `warn!`.

use autocoder_rules::Stage;
use tracing::{info, warn};

use crate::check::CheckId;

/// Span tagging everything logged during one stage run. Attach it with
/// `tracing::Instrument::instrument`.
pub fn stage_span(run_id: &str, stage: Stage) -> tracing::Span {
    tracing::info_span!("autocoder.run", run_id = %run_id, stage = %stage)
}

pub fn emit_stage_started(run_id: &str, stage: Stage, repository: &str, checks: usize) {
    info!(
        event = "stage.started",
        run_id = %run_id,
        stage = %stage,
        repository = %repository,
        checks = checks,
    );
}

pub fn emit_check_started(run_id: &str, check: CheckId) {
    info!(event = "check.started", run_id = %run_id, check = %check);
}

pub fn emit_check_finished(run_id: &str, check: CheckId, passed: bool, duration_ms: u64) {
    info!(
        event = "check.finished",
        run_id = %run_id,
        check = %check,
        passed = passed,
        duration_ms = duration_ms,
    );
}

/// Emit event: a check body panicked (warning level).
pub fn emit_check_panicked(run_id: &str, check: CheckId, message: &str) {
    warn!(event = "check.panicked", run_id = %run_id, check = %check, error = %message);
}

pub fn emit_stage_finished(
    run_id: &str,
    stage: Stage,
    passed: usize,
    failed: usize,
    duration_ms: u64,
) {
    info!(
        event = "stage.finished",
        run_id = %run_id,
        stage = %stage,
        passed = passed,
        failed = failed,
        success = failed == 0,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_span_create() {
        let span = stage_span("test-run-id", Stage::Three);
        let _entered = span.enter();
        emit_check_finished("test-run-id", CheckId::FileSet, true, 3);
    }
}
