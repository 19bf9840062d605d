use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use bilancio_cache::Fetched;
use bilancio_core::{ProgressSink, align};
use bilancio_types::{Dependency, LoadError, LoadPhase, ResourceKind};

use crate::core::Bilancio;
use crate::resolver::{LoadParams, PlannedResource};
use crate::result::{LoadResult, Outcome};

type StageOutcome<'p> = (&'p PlannedResource, Result<Fetched, LoadError>);

/// Turns per-resource completions into overall percentages.
struct Tracker<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    completed: usize,
}

impl<'a> Tracker<'a> {
    const fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            total,
            completed: 0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn advance(&mut self, kind: ResourceKind, message: &str) {
        self.completed += 1;
        let percent = if self.total == 0 {
            100.0
        } else {
            (self.completed as f32 / self.total as f32) * 100.0
        };
        self.sink.report_progress(kind.as_str(), percent, message);
    }

    fn fetched(&mut self, r: &PlannedResource, res: &Result<Fetched, LoadError>) {
        let message = match res {
            Ok(f) if f.stale => format!("{} served stale, refreshing", r.key()),
            Ok(f) if f.from_cache => format!("{} from cache", r.key()),
            Ok(f) => format!("{} loaded ({} rows)", r.key(), f.dataset.len()),
            Err(e) => format!("{} failed: {e}", r.key()),
        };
        self.advance(r.kind(), &message);
    }
}

fn set_phase(result: &mut LoadResult, phase: LoadPhase) {
    if !result.cancelled {
        result.phase = phase;
    }
}

fn soft_error(kind: ResourceKind, e: LoadError) -> LoadError {
    match e {
        e @ LoadError::Cancelled { .. } => e,
        other => LoadError::partial(kind, other),
    }
}

fn aligned_outcome(r: &PlannedResource, fetched: Fetched) -> Outcome {
    let result = align(fetched.dataset, r.kind());
    #[cfg(feature = "tracing")]
    if let Err(e) = &result {
        tracing::warn!(key = %r.key(), error = %e, "alignment failed");
    }
    Outcome {
        key: r.key().clone(),
        dependency: r.dependency,
        result,
        from_cache: fetched.from_cache,
        stale: fetched.stale,
    }
}

impl Bilancio {
    /// Load every resource of `profile` for `params`.
    ///
    /// Behavior:
    /// - Hard resources are fetched first, stage by stage; resources within a
    ///   stage are fetched concurrently.
    /// - After the first hard failure no further hard stages are issued; their
    ///   resources are reported as `DependencyFailed`. Soft resources are still
    ///   attempted so the view can show what is available.
    /// - Every loaded multi-period dataset is aligned before it is returned.
    /// - A failed soft resource carries a `PartialDependency` error and only
    ///   degrades the status to `Partial`.
    /// - `progress` receives one report per resource.
    ///
    /// # Errors
    /// Returns `UnknownProfile` if `profile` is not registered. Every other
    /// failure is attached to its resource's [`Outcome`].
    pub async fn load(
        &self,
        profile: &str,
        params: &LoadParams,
        progress: &dyn ProgressSink,
    ) -> Result<LoadResult, LoadError> {
        self.load_with_cancel(profile, params, progress, &CancellationToken::new())
            .await
    }

    /// [`load`](Self::load) with cooperative cancellation.
    ///
    /// Once `cancel` fires, no new resources are requested and resources not
    /// yet delivered get `Cancelled` outcomes. Fetches already running keep
    /// going in the background and still populate the cache.
    ///
    /// # Errors
    /// Returns `UnknownProfile` if `profile` is not registered.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "bilancio::loader::load",
            skip(self, params, progress, cancel),
            fields(entity = %params.entity()),
        )
    )]
    pub async fn load_with_cancel(
        &self,
        profile: &str,
        params: &LoadParams,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<LoadResult, LoadError> {
        let plan = self.plan(profile, params)?;
        let mut result = LoadResult::new(plan.profile());
        let mut tracker = Tracker::new(progress, plan.len());

        set_phase(&mut result, LoadPhase::LoadingHard);
        let mut loaded = Vec::new();
        let mut first_failure: Option<ResourceKind> = None;
        for stage in plan.stages(Dependency::Hard) {
            if let Some(dependency) = first_failure {
                for r in stage {
                    let err = LoadError::DependencyFailed {
                        kind: r.kind(),
                        dependency,
                    };
                    tracker.advance(r.kind(), &format!("{} skipped: {err}", r.key()));
                    result.record(Outcome::failed(r.key().clone(), r.dependency, err));
                }
                continue;
            }
            for (r, res) in self.fetch_stage(&stage, cancel, &mut tracker).await {
                match res {
                    Ok(fetched) => loaded.push((r, fetched)),
                    Err(e) => {
                        if !matches!(e, LoadError::Cancelled { .. }) {
                            first_failure.get_or_insert(r.kind());
                        }
                        result.record(Outcome::failed(r.key().clone(), r.dependency, e));
                    }
                }
            }
        }
        #[cfg(feature = "tracing")]
        if let Some(kind) = first_failure {
            tracing::warn!(kind = %kind, "hard dependency failed; remaining hard stages skipped");
        }

        set_phase(&mut result, LoadPhase::Aligning);
        for (r, fetched) in loaded {
            result.record(aligned_outcome(r, fetched));
        }

        set_phase(&mut result, LoadPhase::LoadingSoft);
        for stage in plan.stages(Dependency::Soft) {
            for (r, res) in self.fetch_stage(&stage, cancel, &mut tracker).await {
                let mut outcome = match res {
                    Ok(fetched) => aligned_outcome(r, fetched),
                    Err(e) => Outcome::failed(r.key().clone(), r.dependency, e),
                };
                outcome.result = outcome.result.map_err(|e| soft_error(r.kind(), e));
                result.record(outcome);
            }
        }

        set_phase(&mut result, LoadPhase::Done);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            status = ?result.overall_status,
            cancelled = result.cancelled,
            resources = result.outcomes.len(),
            "load finished"
        );
        Ok(result)
    }

    /// Fetch one stage concurrently, reporting progress as each resource lands.
    async fn fetch_stage<'p>(
        &self,
        stage: &[&'p PlannedResource],
        cancel: &CancellationToken,
        tracker: &mut Tracker<'_>,
    ) -> Vec<StageOutcome<'p>> {
        let mut out: Vec<StageOutcome<'p>> = Vec::with_capacity(stage.len());

        if !cancel.is_cancelled() {
            let mut pending: FuturesUnordered<_> = stage
                .iter()
                .map(|r| async move { (*r, self.fetch(&r.spec).await) })
                .collect();
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = pending.next() => match next {
                        Some((r, res)) => {
                            tracker.fetched(r, &res);
                            out.push((r, res));
                        }
                        None => break,
                    },
                }
            }
        }

        for r in stage {
            if out.iter().any(|(done, _)| done.key() == r.key()) {
                continue;
            }
            let err = LoadError::Cancelled { kind: r.kind() };
            tracker.advance(r.kind(), &format!("{} cancelled", r.key()));
            out.push((r, Err(err)));
        }
        out
    }
}
