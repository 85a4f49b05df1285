use crate::{
    core::{Lerp, clamp_progress},
    error::{StagecueError, StagecueResult},
    load::SceneReadiness,
    timeline::Timeline,
};

/// Progress at or above `1 - COMPLETION_EPSILON` counts as reaching the end
/// of the timeline.
pub const COMPLETION_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Animating,
    Completed,
    Disposed,
}

/// Fixed partition of `[0,1]` into discrete content stages.
///
/// Buckets are half-open `[lo, hi)`; the final bucket is closed at both ends
/// so `t = 1` lands in the last stage.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageBoundaries {
    edges: Vec<f64>,
}

impl StageBoundaries {
    pub fn new(edges: Vec<f64>) -> StagecueResult<Self> {
        if edges.len() < 2 {
            return Err(StagecueError::validation(
                "stage boundaries need at least two edges",
            ));
        }
        if edges.first() != Some(&0.0) || edges.last() != Some(&1.0) {
            return Err(StagecueError::validation(
                "stage boundaries must start at 0 and end at 1",
            ));
        }
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(StagecueError::validation(
                "stage boundaries must be strictly increasing",
            ));
        }
        Ok(Self { edges })
    }

    pub fn stage_count(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn bucket(&self, t: f64) -> usize {
        let t = clamp_progress(t);
        let idx = self.edges[1..].partition_point(|&hi| hi <= t);
        idx.min(self.stage_count() - 1)
    }
}

/// Side-effect sinks the choreographer fires. All methods default to no-ops
/// and must return without suspending; choreography ticks stay synchronous.
pub trait ChoreoHooks<T> {
    /// Interpolated parameters for the external renderer, once per tick.
    fn apply_render_params(&mut self, _params: &T) {}
    /// Edge-triggered stage transition (content swap).
    fn stage_changed(&mut self, _stage: usize) {}
    /// The readiness gate flipped open; fired at most once per instance.
    fn scene_ready(&mut self) {}
    /// The timeline reached its end; fired exactly once per instance.
    fn completed(&mut self) {}
}

/// Maps an external progress signal onto interpolated render parameters and
/// discrete stage/completion notifications.
///
/// Lifecycle: `Idle` until `setup`, then `Armed`; progress strictly inside
/// `(0,1)` moves to `Animating`; reaching the end moves to `Completed`;
/// `dispose` is terminal from anywhere. All reveal/completion flags are
/// instance fields guarded by these transitions, so two choreographers on one
/// page can never leak state into each other.
pub struct Choreographer<T> {
    phase: Phase,
    timeline: Option<Timeline<T>>,
    boundaries: Option<StageBoundaries>,
    hooks: Option<Box<dyn ChoreoHooks<T>>>,
    readiness_gate: Option<SceneReadiness>,
    progress: f64,
    current_stage: Option<usize>,
    params: Option<T>,
    completion_fired: bool,
    ready_fired: bool,
    replay_pending: bool,
}

impl<T> Choreographer<T>
where
    T: Lerp + Clone,
{
    pub fn new(hooks: Box<dyn ChoreoHooks<T>>) -> Self {
        Self {
            phase: Phase::Idle,
            timeline: None,
            boundaries: None,
            hooks: Some(hooks),
            readiness_gate: None,
            progress: 0.0,
            current_stage: None,
            params: None,
            completion_fired: false,
            ready_fired: false,
            replay_pending: false,
        }
    }

    /// Defer visible side effects until `readiness` reads true. State still
    /// updates while gated; the first ungated tick replays the current
    /// stage and parameters once.
    pub fn gate_on(mut self, readiness: SceneReadiness) -> Self {
        self.readiness_gate = Some(readiness);
        self
    }

    /// `Idle -> Armed`. The timeline and boundaries are fixed for the
    /// instance's lifetime; rebuilding a path mid-animation would move the
    /// interpolation target and produce a visible discontinuity.
    pub fn setup(
        &mut self,
        timeline: Timeline<T>,
        boundaries: StageBoundaries,
    ) -> StagecueResult<()> {
        match self.phase {
            Phase::Idle => {}
            Phase::Disposed => {
                return Err(StagecueError::choreography(
                    "cannot set up a disposed choreographer",
                ));
            }
            _ => {
                return Err(StagecueError::choreography(
                    "choreographer is already set up",
                ));
            }
        }
        self.timeline = Some(timeline);
        self.boundaries = Some(boundaries);
        self.phase = Phase::Armed;
        Ok(())
    }

    /// Feed one progress tick from the external scroll/timer binding.
    ///
    /// Out-of-range and infinite input is clamped into `[0,1]` and NaN is
    /// treated as 0, never rejected. Calls on a disposed instance are silent
    /// no-ops.
    pub fn on_progress(&mut self, raw_t: f64) -> StagecueResult<()> {
        match self.phase {
            Phase::Disposed => return Ok(()),
            Phase::Idle => {
                return Err(StagecueError::choreography(
                    "progress received before setup",
                ));
            }
            _ => {}
        }
        let (Some(timeline), Some(boundaries)) = (self.timeline.as_ref(), self.boundaries.as_ref())
        else {
            return Err(StagecueError::choreography("choreographer has no timeline"));
        };

        let t = clamp_progress(raw_t);
        let stage = boundaries.bucket(t);
        let stage_changed = self.current_stage != Some(stage);
        let reached_end = t >= 1.0 - COMPLETION_EPSILON;

        self.progress = t;
        self.params = Some(timeline.sample(t));
        self.current_stage = Some(stage);
        if self.phase != Phase::Completed {
            self.phase = if reached_end {
                Phase::Completed
            } else if t > 0.0 {
                Phase::Animating
            } else {
                self.phase
            };
        }

        let gated = self
            .readiness_gate
            .as_ref()
            .is_some_and(|gate| !gate.is_ready());
        if gated {
            self.replay_pending = true;
            return Ok(());
        }

        let fire_ready = self.readiness_gate.is_some() && !self.ready_fired;
        if fire_ready {
            self.ready_fired = true;
        }
        let replay = std::mem::take(&mut self.replay_pending);
        let fire_completion = reached_end && !self.completion_fired;
        if fire_completion {
            self.completion_fired = true;
        }

        if let Some(hooks) = self.hooks.as_mut() {
            if fire_ready {
                hooks.scene_ready();
            }
            if let Some(params) = self.params.as_ref() {
                hooks.apply_render_params(params);
            }
            if stage_changed || replay {
                hooks.stage_changed(stage);
            }
            if fire_completion {
                hooks.completed();
            }
        }
        Ok(())
    }

    /// Any state -> `Disposed`; detaches the hooks sink.
    pub fn dispose(&mut self) {
        self.phase = Phase::Disposed;
        self.hooks = None;
        self.replay_pending = false;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_stage(&self) -> Option<usize> {
        self.current_stage
    }

    pub fn params(&self) -> Option<&T> {
        self.params.as_ref()
    }
}
