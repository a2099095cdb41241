//! AutoCoder stage verifier CLI
//!
//! The `autocoder-check` command verifies a learner's GitHub repository
//! against the rules of one AutoCoder course stage and prints one line per
//! check, or the full report as JSON.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use autocoder_github::{GithubClient, GithubConfig, DEFAULT_API_URL};
use autocoder_snapshot::RemoteRepository;
use autocoder_stages::{init_tracing, RunOptions, Stage, StageReport, StageRunner};

#[derive(Parser)]
#[command(name = "autocoder-check")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify a GitHub repository against an AutoCoder course stage", long_about = None)]
struct Cli {
    /// Repository to verify, e.g. https://github.com/owner/name
    #[arg(long, env = "AUTOCODER_REPO_URL")]
    repo_url: Option<String>,

    /// Course stage (1-7, "stage3" also accepted)
    #[arg(short, long, env = "AUTOCODER_STAGE")]
    stage: Stage,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Retries on rate limiting
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Script the learner's `scripts/script.sh` is compared with
    #[arg(long)]
    reference_script: Option<PathBuf>,

    /// Print the stage report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn github_config(&self) -> GithubConfig {
        let mut config = GithubConfig::new(self.api_url.as_deref().unwrap_or(DEFAULT_API_URL))
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries);
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }
        config
    }

    fn run_options(&self) -> Result<RunOptions> {
        let mut options = RunOptions::default();
        if let Some(path) = &self.reference_script {
            let script = std::fs::read(path)
                .with_context(|| format!("Failed to read reference script {:?}", path))?;
            options = options.with_reference_script(script);
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.log_json, level);

    let config = cli.github_config();
    let options = cli.run_options()?;
    let repo_url = cli.repo_url.clone().unwrap_or_default();

    info!(stage = %cli.stage, repo_url = %repo_url, "verifying repository");

    let report = StageRunner::new(cli.stage)
        .with_options(options)
        .run(&repo_url, |target| {
            GithubClient::new(config, &target.owner, &target.name)
                .map(|client| Arc::new(client) as Arc<dyn RemoteRepository>)
        })
        .await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", render_report(&report));
    }

    if report.success {
        Ok(())
    } else {
        anyhow::bail!("{} of {} checks failed", report.failed_count(), report.checks.len())
    }
}

fn render_report(report: &StageReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stage: {}", report.stage);
    let _ = writeln!(out, "Repository: {}", report.repository);
    let _ = writeln!(out, "Run ID: {}", report.run_id);
    let _ = writeln!(out);

    for outcome in &report.checks {
        match outcome.result.failure() {
            None => {
                let _ = writeln!(out, "  ✓ {} ({}ms)", outcome.check, outcome.duration_ms);
            }
            Some(failure) => {
                let _ = writeln!(
                    out,
                    "  ✗ {} ({}ms): {}",
                    outcome.check, outcome.duration_ms, failure.message
                );
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Summary: {}/{} checks passed",
        report.passed_count(),
        report.checks.len()
    );
    let _ = writeln!(
        out,
        "Status: {}",
        if report.success { "✓ PASSED" } else { "✗ FAILED" }
    );
    out
}
