//! `PipelineExecutor`: drives a batch of plans sequentially.

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};

use crate::action::Action;
use crate::config::PipelineConfig;
use crate::error::CacheError;
use crate::package_ref::PackageRef;
use crate::planner::Plan;

/// Drives a batch of `(ref, Plan)` pairs to completion in insertion order.
///
/// Per-ref failures are captured and reported together once the whole
/// batch has been attempted; only signal-delivered cancellation aborts the
/// batch early.
pub struct PipelineExecutor {
    config: PipelineConfig,
    plans: IndexMap<PackageRef, Plan>,
}

impl PipelineExecutor {
    pub fn new(config: PipelineConfig, plans: Vec<(PackageRef, Plan)>) -> Self {
        PipelineExecutor {
            config,
            plans: plans.into_iter().collect(),
        }
    }

    /// Runs every planned ref to completion. Returns
    /// [`CacheError::PartialFailureBatch`] if any ref failed; refs that
    /// succeeded before a failing one are left committed rather than rolled
    /// back, since the batch keeps going after a per-ref failure.
    pub async fn execute(&self) -> Result<(), CacheError> {
        if self.config.dry_run {
            return Ok(());
        }

        let mut failures = Vec::new();
        let total = self.plans.len();

        for (reference, plan) in &self.plans {
            let bar = self.make_bar(reference);
            let result = run_one(plan, &bar).await;
            bar.finish_and_clear();

            if self.config.json {
                emit_json_progress(reference, &result);
            }

            if let Err(e) = result {
                failures.push((reference.clone(), e.to_string()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CacheError::PartialFailureBatch { total, failures })
        }
    }

    fn make_bar(&self, reference: &PackageRef) -> ProgressBar {
        if self.config.quiet || self.config.json {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template("{msg} {bar:40} {pos}/{len}") {
            bar.set_style(style);
        }
        bar.set_message(format!("{} {}", reference.name, reference.version));
        bar
    }
}

/// Runs one ref's fetch then extract, scaling progress into the 0-75 /
/// 75-100 split, reversing both on failure. A `file:` fetch (or no fetch
/// at all) gives the full range to extract, since its progress fraction
/// is unused.
async fn run_one(plan: &Plan, bar: &ProgressBar) -> Result<(), CacheError> {
    let fetch_is_file = plan.fetch.as_ref().is_some_and(|f| f.url.scheme() == "file");
    let (fetch_share, extract_share) = if plan.fetch.is_some() && !fetch_is_file {
        (75.0, 25.0)
    } else {
        (0.0, 100.0)
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let terminate = wait_for_sigterm();
    tokio::pin!(terminate);

    let run = async {
        if let Some(fetch) = &plan.fetch {
            fetch.verify().await?;
            fetch
                .execute(&|frac| bar.set_position((frac * fetch_share) as u64))
                .await?;
        }
        if let Some(extract) = &plan.extract {
            extract.verify().await?;
            extract
                .execute(&|frac| bar.set_position((fetch_share + frac * extract_share) as u64))
                .await?;
        }
        Ok::<(), CacheError>(())
    };

    tokio::select! {
        result = run => {
            match result {
                Ok(()) => {
                    if let Some(extract) = &plan.extract {
                        extract.cleanup().await?;
                    }
                    if let Some(fetch) = &plan.fetch {
                        fetch.cleanup().await?;
                    }
                    Ok(())
                }
                Err(e) => {
                    reverse_both(plan).await;
                    Err(e)
                }
            }
        }
        _ = &mut ctrl_c => {
            reverse_both(plan).await;
            Err(CacheError::io(
                std::path::Path::new("<pipeline>"),
                std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted"),
            ))
        }
        _ = &mut terminate => {
            reverse_both(plan).await;
            Err(CacheError::io(
                std::path::Path::new("<pipeline>"),
                std::io::Error::new(std::io::ErrorKind::Interrupted, "terminated"),
            ))
        }
    }
}

/// Emits one machine-readable progress line per finished ref, for callers
/// running with `--json` instead of rendered progress bars.
fn emit_json_progress(reference: &PackageRef, result: &Result<(), CacheError>) {
    let line = serde_json::json!({
        "dist": reference.dist_str(),
        "success": result.is_ok(),
        "error": result.as_ref().err().map(ToString::to_string),
    });
    println!("{line}");
}

/// Waits for `SIGTERM` on unix; never resolves on platforms without it, so
/// the `select!` above falls through to `ctrl_c`/completion there.
#[cfg(unix)]
async fn wait_for_sigterm() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(_) => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending().await
}

/// Reverses extract before fetch: undoing the later step first.
async fn reverse_both(plan: &Plan) {
    if let Some(extract) = &plan.extract {
        let _ = extract.reverse().await;
    }
    if let Some(fetch) = &plan.fetch {
        let _ = fetch.reverse().await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::ExtractAction;
    use crate::config::CacheConfig;
    use crate::registry;
    use crate::root::CacheRoot;
    use crate::test_support::{make_ref, write_tarball};
    use std::sync::Arc;

    fn extract_only_plan(root: &Arc<CacheRoot>, tarball: std::path::PathBuf, dirname: &str) -> Plan {
        Plan {
            fetch: None,
            extract: Some(ExtractAction {
                source_tarball: tarball,
                target_root_path: root.path().to_path_buf(),
                target_root_config: root.config().clone(),
                channel: None,
                subdir: None,
                extracted_dirname: dirname.to_string(),
                md5: None,
                size: None,
                origin_url: None,
            }),
        }
    }

    #[tokio::test]
    async fn a_no_op_plan_succeeds_without_touching_disk() {
        let plans = vec![(make_ref("x", "1", "0"), Plan { fetch: None, extract: None })];
        let executor = PipelineExecutor::new(PipelineConfig { quiet: true, ..Default::default() }, plans);
        executor.execute().await.unwrap();
    }

    #[tokio::test]
    async fn runs_every_ref_and_commits_successes_even_when_one_fails() {
        let source_dir = tempfile::tempdir().unwrap();
        let good_tarball = source_dir.path().join("good-1-0.tar.bz2");
        write_tarball(&good_tarball, "good", "1", "0");
        let bad_tarball = source_dir.path().join("bad-1-0.tar.bz2");
        std::fs::write(&bad_tarball, b"not a tarball").unwrap();

        let target_dir = tempfile::tempdir().unwrap();
        let target_root = registry::get_or_create(target_dir.path(), CacheConfig::default());

        let plans = vec![
            (make_ref("good", "1", "0"), extract_only_plan(&target_root, good_tarball, "good-1-0")),
            (make_ref("bad", "1", "0"), extract_only_plan(&target_root, bad_tarball, "bad-1-0")),
        ];
        let executor = PipelineExecutor::new(PipelineConfig { quiet: true, ..Default::default() }, plans);

        let err = executor.execute().await.unwrap_err();
        match err {
            CacheError::PartialFailureBatch { total, failures } => {
                assert_eq!(total, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, make_ref("bad", "1", "0"));
            }
            other => panic!("expected PartialFailureBatch, got {other:?}"),
        }

        // The good ref's extraction was committed despite the later failure.
        assert!(target_root.values().iter().any(|e| e.reference.name == "good"));
        // The bad ref's partial extraction was reversed, not left behind.
        assert!(!target_dir.path().join("bad-1-0").exists());
    }

    #[tokio::test]
    async fn dry_run_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = registry::get_or_create(dir.path(), CacheConfig::default());
        let plans = vec![(
            make_ref("x", "1", "0"),
            extract_only_plan(&root, dir.path().join("missing.tar.bz2"), "x-1-0"),
        )];
        let executor = PipelineExecutor::new(
            PipelineConfig { dry_run: true, ..Default::default() },
            plans,
        );
        executor.execute().await.unwrap();
    }
}
