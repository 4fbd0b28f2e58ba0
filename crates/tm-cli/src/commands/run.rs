use std::sync::Arc;

use anyhow::Context;
use tm_config::ToolmineConfig;
use tm_pipeline::Pipeline;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunArgs;
use crate::output::output;
use crate::progress::Progress;

/// Handle `toolmine run`.
pub async fn handle(args: &RunArgs, mut config: ToolmineConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    config.run.force_rerun |= args.force;
    config.run.skip_screening |= args.skip_screening;
    if args.no_observations {
        config.run.extract_observations = false;
    }
    if let Some(workers) = args.workers {
        config.run.parallel_workers = workers;
    }
    if let Some(index) = &args.index {
        config.paths.publications.clone_from(index);
    }

    let progress = Arc::new(Progress::spinner("loading publication index"));
    let pipeline = Pipeline::from_config(config)
        .context("failed to set up the pipeline")?
        .with_observer(progress.clone());

    match pipeline.run_from_index().await {
        Ok(outcome) => {
            let counts = outcome.summary.counts;
            progress.finish_ok(&format!(
                "done: {} processed, {} reused, {} deferred, {} failed",
                counts.processed, counts.skipped_cached, counts.deferred, counts.failed
            ));
            output(&outcome.summary, flags.format)
        }
        Err(error) => {
            progress.finish_err("run failed");
            Err(error).context("pipeline run failed")
        }
    }
}
