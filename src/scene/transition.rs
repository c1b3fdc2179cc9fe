//! Timed visual effects played while switching scenes.
//!
//! A [`Transition`] reads the image of one scene and renders a processed
//! version of it into its own render target. The manager composites that
//! target to the screen instead of the scene while the transition runs.
//!
//! Transitions are single-use: once started they always run to completion and
//! are then disposed by their owner.

use glam::{UVec2, Vec2};
use log::debug;

use super::effects::{EvenOddTileEffect, FadeEffect};
use crate::draw2d::Color;
use crate::error::SceneError;
use crate::graphics::{Graphics, RenderTarget, TargetDescriptor, TargetId};

/// Remaining time at or below this fraction of the duration counts as done,
/// so rounding in many small frame deltas cannot add a frame.
const FINISH_TOLERANCE: f64 = 1e-5;

/// Easing functions for smooth transitions.
///
/// These control the acceleration curve of transition animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Which side of a scene change a transition is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionRole {
    /// Applied to the scene being left.
    Outgoing,
    /// Applied to the scene being entered.
    Incoming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Finished,
}

/// Everything an effect needs to render one frame.
#[derive(Clone, Copy, Debug)]
pub struct TransitionFrame {
    /// The scene image being transformed.
    pub source: TargetId,
    pub source_size: UVec2,
    pub role: TransitionRole,
    pub duration: f32,
    pub remaining: f32,
    pub easing: Easing,
}

impl TransitionFrame {
    /// Fraction of the duration still remaining, 1 at start and 0 at the end.
    pub fn remaining_fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.remaining / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn source_size_f32(&self) -> Vec2 {
        self.source_size.as_vec2()
    }
}

/// The drawing half of a transition.
///
/// `render` is called with the transition's own target already bound and
/// cleared to transparent.
pub trait TransitionEffect {
    /// Called once from [`Transition::start`] with the size of the source image.
    fn on_start(&mut self, _source_size: UVec2) {}

    fn render(&mut self, gfx: &mut dyn Graphics, frame: &TransitionFrame);

    fn on_client_size_changed(&mut self, _surface: UVec2) {}
}

/// A time-bounded effect applied to one scene during a scene change.
pub struct Transition {
    effect: Box<dyn TransitionEffect>,
    name: String,
    duration: f32,
    /// Counted down in f64 so long runs of tiny deltas stay exact.
    remaining: f64,
    role: TransitionRole,
    easing: Easing,
    phase: Phase,
    source: Option<(TargetId, UVec2)>,
    target: Option<RenderTarget>,
}

impl Transition {
    /// Create a transition running `effect` for `duration` seconds.
    pub fn new(name: impl Into<String>, duration: f32, effect: impl TransitionEffect + 'static) -> Self {
        let duration = duration.max(0.0);
        Self {
            effect: Box::new(effect),
            name: name.into(),
            duration,
            remaining: f64::from(duration),
            role: TransitionRole::Outgoing,
            easing: Easing::Linear,
            phase: Phase::Idle,
            source: None,
            target: None,
        }
    }

    /// Fade the scene's alpha out (outgoing) or in (incoming).
    pub fn fade(duration: f32) -> Self {
        Self::new("fade", duration, FadeEffect)
    }

    /// Shrink (outgoing) or grow (incoming) a checkerboard of spinning tiles,
    /// one parity in each half of the duration.
    pub fn even_odd_tiles(tile_size: u32, duration: f32) -> Self {
        Self::new("even-odd tiles", duration, EvenOddTileEffect::new(tile_size))
    }

    /// Set the easing curve applied to the effect's progress.
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn remaining(&self) -> f32 {
        self.remaining as f32
    }

    pub fn role(&self) -> TransitionRole {
        self.role
    }

    /// Tag the transition with its role. Has no effect once started.
    pub(crate) fn set_role(&mut self, role: TransitionRole) {
        if self.phase == Phase::Idle {
            self.role = role;
        }
    }

    /// True from `start` until the update that finishes it.
    pub fn is_transitioning(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Linear progress from 0 at start to 1 when finished.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            if self.phase == Phase::Idle { 0.0 } else { 1.0 }
        } else {
            1.0 - self.remaining() / self.duration
        }
    }

    /// Begin transforming `source`.
    ///
    /// Resets the countdown and allocates the transition's own render target at
    /// the source size. Each transition can be started once.
    pub fn start(&mut self, gfx: &mut dyn Graphics, source: &RenderTarget) -> Result<(), SceneError> {
        if self.phase != Phase::Idle {
            return Err(SceneError::TransitionAlreadyStarted);
        }
        let source_id = source.id()?;
        let size = source.size();
        let desc = TargetDescriptor::new(size, format!("{} Transition Target", self.name));
        self.target = Some(RenderTarget::new(gfx, desc)?);
        self.source = Some((source_id, size));
        self.remaining = f64::from(self.duration);
        self.effect.on_start(size);
        self.phase = Phase::Running;
        debug!(
            "{} transition '{}' started ({:.2}s)",
            role_label(self.role),
            self.name,
            self.duration
        );
        Ok(())
    }

    /// Advance the countdown by `dt` seconds.
    ///
    /// Returns true exactly once: on the call that finishes the transition.
    /// Calls before `start` or after finishing do nothing.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.remaining -= f64::from(dt.max(0.0));
        if self.remaining <= f64::from(self.duration) * FINISH_TOLERANCE {
            self.remaining = 0.0;
            self.phase = Phase::Finished;
            debug!("{} transition '{}' finished", role_label(self.role), self.name);
            return true;
        }
        false
    }

    /// The transition's processed output. Errors before `start` and after `dispose`.
    pub fn target(&self) -> Result<&RenderTarget, SceneError> {
        self.target
            .as_ref()
            .filter(|t| !t.is_disposed())
            .ok_or(SceneError::TransitionNotStarted)
    }

    /// The current frame parameters, if started.
    pub fn frame(&self) -> Option<TransitionFrame> {
        let (source, source_size) = self.source?;
        Some(TransitionFrame {
            source,
            source_size,
            role: self.role,
            duration: self.duration,
            remaining: self.remaining(),
            easing: self.easing,
        })
    }

    /// Render the effect into the transition's own target.
    pub fn render(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let id = self.target()?.id()?;
        let frame = self.frame().ok_or(SceneError::TransitionNotStarted)?;
        gfx.begin_pass(Some(id), Some(Color::TRANSPARENT))?;
        self.effect.render(gfx, &frame);
        Ok(())
    }

    /// Recreate the output target after device loss. Progress is untouched.
    pub fn reload_graphics(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        if let Some(target) = self.target.as_mut().filter(|t| !t.is_disposed()) {
            target.reload(gfx)?;
        }
        Ok(())
    }

    pub fn on_client_size_changed(&mut self, surface: UVec2) {
        self.effect.on_client_size_changed(surface);
    }

    /// Release the output target. Safe to call more than once.
    pub fn dispose(&mut self, gfx: &mut dyn Graphics) {
        if let Some(target) = self.target.as_mut() {
            target.dispose(gfx);
        }
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("duration", &self.duration)
            .field("remaining", &self.remaining)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

fn role_label(role: TransitionRole) -> &'static str {
    match role {
        TransitionRole::Outgoing => "outgoing",
        TransitionRole::Incoming => "incoming",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{DrawRecord, HeadlessGraphics, ImageSource};

    fn setup() -> (HeadlessGraphics, RenderTarget) {
        let mut gfx = HeadlessGraphics::new(UVec2::new(64, 32));
        let source =
            RenderTarget::new(&mut gfx, TargetDescriptor::new(UVec2::new(64, 32), "scene")).unwrap();
        (gfx, source)
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert_eq!(Easing::EaseInOut.apply(0.5), 0.5);
    }

    #[test]
    fn not_transitioning_until_started() {
        let mut t = Transition::fade(1.0);
        assert!(!t.is_transitioning());
        assert!(!t.update(5.0));
        assert!(matches!(t.target(), Err(SceneError::TransitionNotStarted)));
    }

    #[test]
    fn remaining_decreases_to_exactly_zero() {
        let (mut gfx, source) = setup();
        let mut t = Transition::fade(1.0);
        t.start(&mut gfx, &source).unwrap();
        assert!(t.is_transitioning());

        let mut last = t.remaining();
        let mut fired = 0;
        for _ in 0..15 {
            if t.update(0.1) {
                fired += 1;
            }
            assert!(t.remaining() <= last);
            assert!(t.remaining() >= 0.0);
            last = t.remaining();
        }
        assert_eq!(t.remaining(), 0.0);
        assert_eq!(fired, 1);
        assert!(t.is_finished());
        assert!(!t.is_transitioning());
    }

    #[test]
    fn finishes_on_the_last_of_many_small_steps() {
        for steps in [60u32, 144, 240, 1000] {
            let (mut gfx, source) = setup();
            let mut t = Transition::fade(1.0);
            t.start(&mut gfx, &source).unwrap();
            let dt = 1.0 / steps as f32;
            for frame in 1..steps {
                assert!(!t.update(dt), "finished early on frame {frame} of {steps}");
            }
            assert!(t.update(dt), "not finished after {steps} frames");
            assert_eq!(t.remaining(), 0.0);
        }
    }

    #[test]
    fn overshooting_delta_clamps_and_fires_once() {
        let (mut gfx, source) = setup();
        let mut t = Transition::fade(0.5);
        t.start(&mut gfx, &source).unwrap();
        assert!(t.update(10.0));
        assert_eq!(t.remaining(), 0.0);
        assert!(!t.update(10.0));
        assert_eq!(t.progress(), 1.0);
    }

    #[test]
    fn second_start_is_rejected() {
        let (mut gfx, source) = setup();
        let mut t = Transition::fade(1.0);
        t.start(&mut gfx, &source).unwrap();
        assert!(matches!(
            t.start(&mut gfx, &source),
            Err(SceneError::TransitionAlreadyStarted)
        ));
    }

    #[test]
    fn start_allocates_target_at_source_size() {
        let (mut gfx, source) = setup();
        let mut t = Transition::even_odd_tiles(16, 1.0);
        t.start(&mut gfx, &source).unwrap();
        assert_eq!(t.target().unwrap().size(), UVec2::new(64, 32));

        t.dispose(&mut gfx);
        t.dispose(&mut gfx);
        assert!(t.target().is_err());
        assert_eq!(gfx.live_targets(), 1);
    }

    #[test]
    fn render_samples_source_into_own_target() {
        let (mut gfx, source) = setup();
        let mut t = Transition::fade(2.0);
        t.start(&mut gfx, &source).unwrap();
        t.update(0.5);
        t.render(&mut gfx).unwrap();

        let pass = &gfx.pending_passes()[0];
        assert_eq!(pass.target, Some(t.target().unwrap().id().unwrap()));
        let DrawRecord::Image { source: src, sprite } = &pass.draws[0] else {
            panic!("expected an image draw");
        };
        assert_eq!(*src, ImageSource::Target(source.id().unwrap()));
        assert_eq!(sprite.tint.a, 0.75);
    }

    #[test]
    fn reload_keeps_progress() {
        let (mut gfx, source) = setup();
        let mut t = Transition::fade(1.0);
        t.start(&mut gfx, &source).unwrap();
        t.update(0.25);
        t.reload_graphics(&mut gfx).unwrap();
        t.reload_graphics(&mut gfx).unwrap();
        assert_eq!(t.remaining(), 0.75);
        assert!(t.is_transitioning());
        assert_eq!(gfx.reload_count(t.target().unwrap().id().unwrap()), 2);
    }

    #[test]
    fn role_is_fixed_once_started() {
        let (mut gfx, source) = setup();
        let mut t = Transition::fade(1.0);
        t.set_role(TransitionRole::Incoming);
        t.start(&mut gfx, &source).unwrap();
        t.set_role(TransitionRole::Outgoing);
        assert_eq!(t.role(), TransitionRole::Incoming);
    }
}
