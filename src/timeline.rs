use crate::{
    core::{Lerp, ViewportClass, ViewportProfile, clamp_progress},
    ease::Ease,
    error::{StagecueError, StagecueResult},
};

/// One waypoint segment of a choreography path.
///
/// `duration_share` is the segment's weight relative to the whole timeline;
/// shares are normalized at timeline construction, so `[1, 1, 2]` and
/// `[0.25, 0.25, 0.5]` describe the same path.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    pub params_before: T,
    pub params_after: T,
    pub duration_share: f64,
    pub ease: Ease,
}

/// Validated ordered keyframe sequence with precomputed cumulative shares.
///
/// Cumulative ends are derived once here and never mutated; sampling is a
/// pure function of the timeline and `t`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Timeline<T> {
    keys: Vec<Keyframe<T>>,
    cumulative_ends: Vec<f64>, // normalized, last entry exactly 1.0
}

impl<T> Timeline<T>
where
    T: Lerp + Clone,
{
    pub fn new(keys: Vec<Keyframe<T>>) -> StagecueResult<Self> {
        if keys.is_empty() {
            return Err(StagecueError::validation(
                "Timeline must have at least one keyframe",
            ));
        }
        let mut total = 0.0;
        for (idx, key) in keys.iter().enumerate() {
            if !key.duration_share.is_finite() || key.duration_share <= 0.0 {
                return Err(StagecueError::validation(format!(
                    "keyframe {idx} duration_share must be finite and > 0"
                )));
            }
            total += key.duration_share;
        }

        let mut cumulative_ends = Vec::with_capacity(keys.len());
        let mut acc = 0.0;
        for key in &keys {
            acc += key.duration_share;
            cumulative_ends.push(acc / total);
        }
        // Pin the final boundary so t=1 never falls off the end.
        if let Some(last) = cumulative_ends.last_mut() {
            *last = 1.0;
        }

        Ok(Self {
            keys,
            cumulative_ends,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    /// Segment index covering `t`, with half-open boundaries: `t` equal to a
    /// segment end belongs to the next segment, except `t = 1` which stays in
    /// the last.
    pub fn segment_at(&self, t: f64) -> usize {
        let t = clamp_progress(t);
        let idx = self.cumulative_ends.partition_point(|&end| end <= t);
        idx.min(self.keys.len() - 1)
    }

    /// Interpolate the path at `t` in `[0,1]` (clamped).
    ///
    /// `t = 0` and `t = 1` return the first `params_before` / last
    /// `params_after` as exact clones, with no float blend in between.
    pub fn sample(&self, t: f64) -> T {
        let t = clamp_progress(t);
        if t == 0.0 {
            return self.keys[0].params_before.clone();
        }
        if t == 1.0 {
            return self.keys[self.keys.len() - 1].params_after.clone();
        }

        let idx = self.segment_at(t);
        let start = if idx == 0 {
            0.0
        } else {
            self.cumulative_ends[idx - 1]
        };
        let span = self.cumulative_ends[idx] - start;
        let local = if span > 0.0 { (t - start) / span } else { 1.0 };
        let key = &self.keys[idx];
        let eased = key.ease.apply(local);
        T::lerp(&key.params_before, &key.params_after, eased)
    }
}

/// Builds the per-viewport timeline once at setup time.
///
/// Narrow and wide viewports get distinct paths, chosen by the profile's
/// class; the choice is fixed for the choreographer instance's lifetime so a
/// mid-animation rebuild can never move the interpolation target.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TimelineBuilder<T> {
    pub narrow: Vec<Keyframe<T>>,
    pub wide: Vec<Keyframe<T>>,
}

impl<T> TimelineBuilder<T>
where
    T: Lerp + Clone,
{
    pub fn build(&self, profile: ViewportProfile) -> StagecueResult<Timeline<T>> {
        let keys = match profile.class() {
            ViewportClass::Narrow => self.narrow.clone(),
            ViewportClass::Wide => self.wide.clone(),
        };
        Timeline::new(keys)
    }
}
