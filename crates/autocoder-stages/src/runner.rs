//! Stage execution: run every planned check against one snapshot and
//! collect a report.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use autocoder_rules::Stage;
use autocoder_snapshot::{RemoteRepository, RemoteResult, RepositorySnapshot};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::check::CheckId;
use crate::checks::{self, CheckContext};
use crate::diagnostics::{CheckResult, Failure, FailureKind};
use crate::obs;
use crate::target::RepoTarget;

/// Run-time inputs that are not part of a stage's rules.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Expected content of `scripts/script.sh`; the comparison is skipped
    /// when absent.
    pub reference_script: Option<Vec<u8>>,
}

impl RunOptions {
    pub fn with_reference_script(mut self, script: impl Into<Vec<u8>>) -> Self {
        self.reference_script = Some(script.into());
        self
    }
}

/// Result of one check within a stage run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: CheckId,
    #[serde(flatten)]
    pub result: CheckResult,
    pub duration_ms: u64,
}

/// Result of a complete stage run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub run_id: String,
    pub stage: Stage,
    /// `owner/name`, or the raw URL when it could not be parsed
    pub repository: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Whether every check passed.
    pub success: bool,
    pub checks: Vec<CheckOutcome>,
}

impl StageReport {
    /// Number of checks that passed.
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.result.passed()).count()
    }

    /// Number of checks that failed.
    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count()
    }

    /// Outcome of `check`, if it was planned.
    pub fn outcome(&self, check: CheckId) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.check == check)
    }
}

/// Runs the checks of one stage.
pub struct StageRunner {
    stage: Stage,
    options: RunOptions,
}

impl StageRunner {
    pub fn new(stage: Stage) -> Self {
        StageRunner {
            stage,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Parse `repo_url`, connect with `connect` and run the stage.
    ///
    /// Never fails: an unusable URL or a failed connection is reported as a
    /// failure of every planned check that needs the repository.
    pub async fn run<F>(&self, repo_url: &str, connect: F) -> StageReport
    where
        F: FnOnce(&RepoTarget) -> RemoteResult<Arc<dyn RemoteRepository>>,
    {
        let target = match RepoTarget::parse(repo_url) {
            Ok(target) => target,
            Err(err) => {
                return self.report_without_repository(repo_url.trim(), |check| {
                    if check == CheckId::UrlSet {
                        CheckResult::fail(FailureKind::Validation, err.to_string())
                    } else {
                        CheckResult::processing(&err)
                    }
                });
            }
        };

        match connect(&target) {
            Ok(remote) => self.run_target(&target, remote).await,
            Err(err) => self.report_without_repository(&target.full_name(), |check| {
                if check == CheckId::UrlSet {
                    CheckResult::Pass
                } else {
                    CheckResult::classify(check, Err(err.clone().into()))
                }
            }),
        }
    }

    /// Run the stage against an already connected repository.
    pub async fn run_target(
        &self,
        target: &RepoTarget,
        remote: Arc<dyn RemoteRepository>,
    ) -> StageReport {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::stage_span(&run_id, self.stage);
        self.execute(run_id, target, remote).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: String,
        target: &RepoTarget,
        remote: Arc<dyn RemoteRepository>,
    ) -> StageReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let plan = CheckId::plan(self.stage);
        let repository = target.full_name();
        obs::emit_stage_started(&run_id, self.stage, &repository, plan.len());

        let rules = self.stage.rules(&repository);
        let snapshot = RepositorySnapshot::new(remote, repository.clone());
        let ctx = CheckContext {
            target,
            snapshot: &snapshot,
            rules: &rules,
            options: &self.options,
        };

        let mut outcomes = Vec::with_capacity(plan.len());
        for &check in plan {
            obs::emit_check_started(&run_id, check);
            let check_start = Instant::now();
            let result = match AssertUnwindSafe(checks::run(check, &ctx))
                .catch_unwind()
                .await
            {
                Ok(output) => CheckResult::classify(check, output),
                Err(payload) => {
                    let result = CheckResult::from_panic(payload.as_ref());
                    let message = result.failure().map(|f| f.message.as_str());
                    obs::emit_check_panicked(&run_id, check, message.unwrap_or_default());
                    result
                }
            };
            let duration_ms = check_start.elapsed().as_millis() as u64;
            obs::emit_check_finished(&run_id, check, result.passed(), duration_ms);
            outcomes.push(CheckOutcome {
                check,
                result,
                duration_ms,
            });
        }

        self.finish(
            run_id,
            repository,
            started_at,
            start.elapsed().as_millis() as u64,
            outcomes,
        )
    }

    fn report_without_repository(
        &self,
        repository: &str,
        result_for: impl Fn(CheckId) -> CheckResult,
    ) -> StageReport {
        let run_id = Uuid::new_v4().to_string();
        let plan = CheckId::plan(self.stage);
        obs::emit_stage_started(&run_id, self.stage, repository, plan.len());
        let outcomes = plan
            .iter()
            .map(|&check| {
                let result = result_for(check);
                obs::emit_check_finished(&run_id, check, result.passed(), 0);
                CheckOutcome {
                    check,
                    result,
                    duration_ms: 0,
                }
            })
            .collect();
        self.finish(run_id, repository.to_string(), Utc::now(), 0, outcomes)
    }

    fn finish(
        &self,
        run_id: String,
        repository: String,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        checks: Vec<CheckOutcome>,
    ) -> StageReport {
        let report = StageReport {
            run_id,
            stage: self.stage,
            repository,
            started_at,
            duration_ms,
            success: checks.iter().all(|c| c.result.passed()),
            checks,
        };
        obs::emit_stage_finished(
            &report.run_id,
            self.stage,
            report.passed_count(),
            report.failed_count(),
            duration_ms,
        );
        report
    }
}

/// Failures of a report in check order, for display.
pub fn failures(report: &StageReport) -> impl Iterator<Item = (CheckId, &Failure)> {
    report
        .checks
        .iter()
        .filter_map(|c| c.result.failure().map(|f| (c.check, f)))
}
