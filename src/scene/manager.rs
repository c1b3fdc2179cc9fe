//! Scene manager: the active scene, the pending scene, and the transitions
//! between them.
//!
//! Completion is polled: each `update` advances whichever transition is
//! running and acts on the tick it reports finishing. The sequencing rules are:
//!
//! - With an outgoing transition, the swap waits for it to finish. The old
//!   scene keeps its render target until then, since the transition samples it.
//! - With only an incoming transition, the swap happens inside the change call
//!   and the transition starts against the new scene.
//! - With neither, the swap happens on the next `update`.
//! - A scene is begun (unpaused) once nothing is left to play in.

use std::collections::{HashMap, HashSet};

use glam::UVec2;
use log::{debug, error, info, warn};

use super::scene::{Scene, SceneCommand, SceneId, SceneTarget};
use super::transition::{Transition, TransitionRole};
use crate::draw2d::{Color, Rect, Sprite};
use crate::error::SceneError;
use crate::graphics::{Graphics, ImageSource};
use crate::input::Input;
use crate::time::Time;

/// What the manager is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerState {
    /// Nothing pending.
    Idle,
    /// A scene is queued and will be swapped in on the next update.
    SwapPending,
    /// The outgoing transition is running; the swap follows its completion.
    AwaitingOutgoing,
    /// The incoming transition is running; the scene begins on its completion.
    AwaitingIncoming,
}

/// Result of a scene change request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    Accepted,
    /// Dropped because a transition was already running.
    Ignored,
}

/// Owns every registered scene and sequences scene changes.
pub struct SceneManager {
    scenes: HashMap<SceneId, Scene>,
    /// Scenes created by other scenes at runtime; dropped once unloaded.
    transient: HashSet<SceneId>,
    active: Option<SceneId>,
    next: Option<SceneId>,
    outgoing: Option<Transition>,
    incoming: Option<Transition>,
    commands: Vec<SceneCommand>,
    reset_time_rate: bool,
    exit_requested: bool,
    clear_color: Color,
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneManager {
    pub fn new() -> Self {
        Self {
            scenes: HashMap::new(),
            transient: HashSet::new(),
            active: None,
            next: None,
            outgoing: None,
            incoming: None,
            commands: Vec::new(),
            reset_time_rate: false,
            exit_requested: false,
            clear_color: Color::BLACK,
        }
    }

    /// Color the screen is cleared to around and behind the composited scene.
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Register a scene and return its id.
    pub fn add(&mut self, scene: Scene) -> SceneId {
        let id = scene.id();
        debug!("registered scene '{}' ({id})", scene.name());
        self.scenes.insert(id, scene);
        id
    }

    fn add_transient(&mut self, scene: Scene) -> SceneId {
        let id = self.add(scene);
        self.transient.insert(id);
        id
    }

    fn forget_if_transient(&mut self, id: SceneId) {
        if self.transient.remove(&id) {
            self.scenes.remove(&id);
        }
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.scenes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(&id)
    }

    pub fn active_id(&self) -> Option<SceneId> {
        self.active
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.active.and_then(|id| self.scenes.get(&id))
    }

    pub fn next_id(&self) -> Option<SceneId> {
        self.next
    }

    pub fn outgoing(&self) -> Option<&Transition> {
        self.outgoing.as_ref()
    }

    pub fn incoming(&self) -> Option<&Transition> {
        self.incoming.as_ref()
    }

    /// The transition currently playing, if any.
    pub fn active_transition(&self) -> Option<&Transition> {
        self.outgoing
            .as_ref()
            .filter(|t| t.is_transitioning())
            .or_else(|| self.incoming.as_ref().filter(|t| t.is_transitioning()))
    }

    fn active_transition_mut(&mut self) -> Option<&mut Transition> {
        if self.outgoing.as_ref().is_some_and(|t| t.is_transitioning()) {
            self.outgoing.as_mut()
        } else {
            self.incoming.as_mut().filter(|t| t.is_transitioning())
        }
    }

    /// True while a requested change is still playing out its transitions.
    pub fn is_transitioning(&self) -> bool {
        self.outgoing.is_some() || self.incoming.is_some()
    }

    pub fn state(&self) -> ManagerState {
        if self.outgoing.is_some() {
            ManagerState::AwaitingOutgoing
        } else if self.incoming.is_some() {
            ManagerState::AwaitingIncoming
        } else if self.next.is_some() {
            ManagerState::SwapPending
        } else {
            ManagerState::Idle
        }
    }

    /// True once a scene has asked the application to exit.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Switch to `id` without a visual transition. The swap happens on the next update.
    pub fn change_scene(
        &mut self,
        gfx: &mut dyn Graphics,
        id: SceneId,
    ) -> Result<ChangeOutcome, SceneError> {
        self.change_scene_with(gfx, id, None, None)
    }

    /// Switch to `id` with optional outgoing and incoming transitions.
    ///
    /// Changing to the active scene is an error. A request made while a
    /// transition is running is dropped and reported as
    /// [`ChangeOutcome::Ignored`]. An outgoing transition requested while no
    /// scene is active is discarded, since there is nothing to transition out of.
    pub fn change_scene_with(
        &mut self,
        gfx: &mut dyn Graphics,
        id: SceneId,
        outgoing: Option<Transition>,
        incoming: Option<Transition>,
    ) -> Result<ChangeOutcome, SceneError> {
        if self.active == Some(id) {
            return Err(SceneError::SelfTransition(id));
        }
        if self.is_transitioning() {
            warn!("ignoring change to scene {id}: a transition is already running");
            return Ok(ChangeOutcome::Ignored);
        }
        if !self.scenes.contains_key(&id) {
            return Err(SceneError::UnknownScene(id));
        }

        let mut incoming = incoming;
        if let Some(t) = incoming.as_mut() {
            t.set_role(TransitionRole::Incoming);
        }

        if let Some(mut out) = outgoing {
            out.set_role(TransitionRole::Outgoing);
            match self.active.and_then(|a| self.scenes.get(&a)) {
                Some(scene) => {
                    out.start(gfx, scene.render_target()?)?;
                    self.outgoing = Some(out);
                }
                None => debug!("no active scene, discarding outgoing transition"),
            }
        }

        if let Some(prev) = self.next.replace(id) {
            debug!("pending scene {prev} replaced by {id}");
            self.forget_if_transient(prev);
        }
        self.incoming = incoming;

        if self.outgoing.is_none() && self.incoming.is_some() {
            if let Err(e) = self.swap(gfx) {
                self.discard_incoming(gfx);
                return Err(e);
            }
            self.start_incoming_or_begin(gfx)?;
        }

        Ok(ChangeOutcome::Accepted)
    }

    /// Advance one frame: the running transition or a pending swap, then the
    /// active scene, then any changes the scene requested. The active scene is
    /// not updated on ticks that leave a transition running.
    pub fn update(
        &mut self,
        gfx: &mut dyn Graphics,
        input: &Input,
        time: &mut Time,
    ) -> Result<(), SceneError> {
        self.apply_time_rate_reset(time);

        let dt = time.raw_delta();
        if let Some(out) = self.outgoing.as_mut() {
            if out.update(dt) {
                self.finish_outgoing(gfx)?;
            }
        } else if let Some(inc) = self.incoming.as_mut() {
            if inc.update(dt) {
                self.finish_incoming(gfx);
            }
        } else if self.next.is_some() {
            self.swap(gfx)?;
            self.begin_active();
        }

        self.apply_time_rate_reset(time);

        // While a transition plays only its timer advances.
        if self.active_transition().is_some() {
            return Ok(());
        }
        self.update_active(gfx, input, time)
    }

    fn apply_time_rate_reset(&mut self, time: &mut Time) {
        if std::mem::take(&mut self.reset_time_rate) {
            time.reset_time_rate();
        }
    }

    fn update_active(
        &mut self,
        gfx: &mut dyn Graphics,
        input: &Input,
        time: &mut Time,
    ) -> Result<(), SceneError> {
        let Some(id) = self.active else {
            return Ok(());
        };
        let resolution = gfx.resolution();
        let mut commands = std::mem::take(&mut self.commands);
        if let Some(scene) = self.scenes.get_mut(&id) {
            scene.update(input, time, resolution, &mut commands);
        }
        let result = self.apply_commands(gfx, &mut commands);
        self.commands = commands;
        result
    }

    /// Apply queued scene commands in order. The first error is returned after
    /// all commands have been processed.
    fn apply_commands(
        &mut self,
        gfx: &mut dyn Graphics,
        commands: &mut Vec<SceneCommand>,
    ) -> Result<(), SceneError> {
        let mut first_error = None;
        for command in commands.drain(..) {
            match command {
                SceneCommand::Exit => {
                    info!("exit requested");
                    self.exit_requested = true;
                }
                SceneCommand::Change {
                    target,
                    outgoing,
                    incoming,
                } => {
                    let (id, is_new) = match target {
                        SceneTarget::Registered(id) => (id, false),
                        SceneTarget::New(scene) => (self.add_transient(scene), true),
                    };
                    let result = self.change_scene_with(gfx, id, outgoing, incoming);
                    let keep = self.next == Some(id) || self.active == Some(id);
                    if is_new && !keep {
                        self.forget_if_transient(id);
                    }
                    if let Err(e) = result {
                        error!("scene change to {id} failed: {e}");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Unload the active scene and initialize the pending one in its place.
    fn swap(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let next = self.next.take().ok_or(SceneError::NoPendingScene)?;

        if let Some(old) = self.active.take() {
            if let Some(scene) = self.scenes.get_mut(&old) {
                scene.unload(gfx);
            }
            self.forget_if_transient(old);
        }
        self.reset_time_rate = true;

        let scene = self
            .scenes
            .get_mut(&next)
            .ok_or(SceneError::UnknownScene(next))?;
        info!("switching to scene '{}'", scene.name());
        if let Err(e) = scene.initialize(gfx) {
            self.forget_if_transient(next);
            return Err(e);
        }
        self.active = Some(next);
        Ok(())
    }

    fn finish_outgoing(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        if let Some(mut out) = self.outgoing.take() {
            out.dispose(gfx);
        }
        if let Err(e) = self.swap(gfx) {
            self.discard_incoming(gfx);
            return Err(e);
        }
        self.start_incoming_or_begin(gfx)
    }

    fn finish_incoming(&mut self, gfx: &mut dyn Graphics) {
        if let Some(mut inc) = self.incoming.take() {
            inc.dispose(gfx);
        }
        self.begin_active();
    }

    /// Start the stored incoming transition against the active scene, or begin
    /// the scene right away when there is none.
    fn start_incoming_or_begin(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let Some(active) = self.active else {
            self.discard_incoming(gfx);
            return Ok(());
        };
        if let Some(mut inc) = self.incoming.take() {
            let started = match self.scenes.get(&active) {
                Some(scene) => scene.render_target().and_then(|t| inc.start(gfx, t)),
                None => Err(SceneError::UnknownScene(active)),
            };
            match started {
                Ok(()) => {
                    self.incoming = Some(inc);
                    return Ok(());
                }
                Err(e) => {
                    inc.dispose(gfx);
                    self.begin_active();
                    return Err(e);
                }
            }
        }
        self.begin_active();
        Ok(())
    }

    fn discard_incoming(&mut self, gfx: &mut dyn Graphics) {
        if let Some(mut inc) = self.incoming.take() {
            inc.dispose(gfx);
        }
    }

    fn begin_active(&mut self) {
        if let Some(scene) = self.active.and_then(|id| self.scenes.get_mut(&id)) {
            scene.begin();
        }
    }

    /// Draw the active scene into its target, render the running transition,
    /// and composite the result to the screen.
    pub fn render(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let resolution = gfx.resolution();
        let Some(id) = self.active else {
            gfx.begin_pass(None, Some(self.clear_color))?;
            return Ok(());
        };

        let scene = self
            .scenes
            .get_mut(&id)
            .ok_or(SceneError::UnknownScene(id))?;
        scene.draw(gfx)?;
        let mut source = scene.render_target()?.id()?;

        if let Some(transition) = self.active_transition_mut() {
            transition.render(gfx)?;
            source = transition.target()?.id()?;
        }

        gfx.begin_pass(None, Some(self.clear_color))?;
        let dst = Rect::from_size(resolution.as_vec2());
        gfx.draw_image(ImageSource::Target(source), &Sprite::new(dst));
        Ok(())
    }

    pub fn on_client_size_changed(&mut self, surface: UVec2) {
        for id in [self.active, self.next].into_iter().flatten() {
            if let Some(scene) = self.scenes.get_mut(&id) {
                scene.on_client_size_changed(surface);
            }
        }
        for transition in [self.outgoing.as_mut(), self.incoming.as_mut()]
            .into_iter()
            .flatten()
        {
            transition.on_client_size_changed(surface);
        }
    }

    pub fn on_graphics_device_created(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        debug!("graphics device created, reloading render targets");
        self.reload_graphics(gfx)
    }

    /// Reload every render target after a device reset. Running transitions
    /// keep their progress. Calling this repeatedly is harmless.
    pub fn on_graphics_device_reset(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        debug!("graphics device reset, reloading render targets");
        self.reload_graphics(gfx)
    }

    fn reload_graphics(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let mut first_error = None;
        for id in [self.active, self.next].into_iter().flatten() {
            if let Some(scene) = self.scenes.get_mut(&id) {
                if let Err(e) = scene.reload_graphics(gfx) {
                    first_error.get_or_insert(e);
                }
            }
        }
        for transition in [self.outgoing.as_mut(), self.incoming.as_mut()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = transition.reload_graphics(gfx) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Dispose transitions and unload every scene. The manager is empty afterwards.
    pub fn shutdown(&mut self, gfx: &mut dyn Graphics) {
        if let Some(mut out) = self.outgoing.take() {
            out.dispose(gfx);
        }
        self.discard_incoming(gfx);
        for scene in self.scenes.values_mut() {
            scene.unload(gfx);
        }
        self.scenes.clear();
        self.transient.clear();
        self.active = None;
        self.next = None;
        info!("scene manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graphics::{DrawRecord, HeadlessGraphics};
    use crate::scene::scene::tests::{Calls, Recorder};
    use crate::scene::{SceneLogic, SceneState, UpdateContext};

    const RES: UVec2 = UVec2::new(320, 180);

    struct Harness {
        gfx: HeadlessGraphics,
        scenes: SceneManager,
        input: Input,
        time: Time,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                gfx: HeadlessGraphics::new(RES),
                scenes: SceneManager::new(),
                input: Input::new(),
                time: Time::new(),
            }
        }

        fn add(&mut self, name: &str) -> (SceneId, Rc<RefCell<Calls>>) {
            let (scene, calls) = Recorder::scene(name);
            (self.scenes.add(scene), calls)
        }

        fn tick(&mut self, dt: f32) {
            self.time.advance(dt);
            self.scenes
                .update(&mut self.gfx, &self.input, &mut self.time)
                .unwrap();
            self.scenes.render(&mut self.gfx).unwrap();
            self.gfx.end_frame().unwrap();
        }

        fn run(&mut self, seconds: f32, dt: f32) {
            let steps = (seconds / dt).round() as u32;
            for _ in 0..steps {
                self.tick(dt);
            }
        }

        fn change(&mut self, id: SceneId) -> Result<ChangeOutcome, SceneError> {
            self.scenes.change_scene(&mut self.gfx, id)
        }

        fn change_with(
            &mut self,
            id: SceneId,
            out: Option<Transition>,
            inc: Option<Transition>,
        ) -> Result<ChangeOutcome, SceneError> {
            self.scenes.change_scene_with(&mut self.gfx, id, out, inc)
        }

        fn scene(&self, id: SceneId) -> &Scene {
            self.scenes.scene(id).unwrap()
        }

        /// Make `id` the active, begun scene.
        fn activate(&mut self, id: SceneId) {
            self.change(id).unwrap();
            self.tick(0.0);
        }

        /// A scene whose `load_content` always fails.
        fn add_failing(&mut self, name: &str) -> SceneId {
            let recorder = Recorder {
                calls: Rc::default(),
                fail_load: true,
            };
            self.scenes.add(Scene::new(name, recorder))
        }

        /// Like `tick`, but hands back the update error instead of panicking.
        fn try_tick(&mut self, dt: f32) -> Result<(), SceneError> {
            self.time.advance(dt);
            let updated = self.scenes.update(&mut self.gfx, &self.input, &mut self.time);
            self.scenes.render(&mut self.gfx)?;
            self.gfx.end_frame()?;
            updated
        }

        fn check_invariants(&self) {
            let transitions: Vec<&Transition> = [self.scenes.outgoing(), self.scenes.incoming()]
                .into_iter()
                .flatten()
                .collect();
            let running = transitions.iter().filter(|t| t.is_transitioning()).count();
            assert!(running <= 1, "more than one transition running");
            if running > 0 {
                assert!(self.scenes.active_id().is_some(), "transition without active scene");
            }
            if let Some(out) = self.scenes.outgoing() {
                assert!(out.is_transitioning(), "idle outgoing transition kept");
                assert!(self.scenes.next_id().is_some(), "outgoing transition with nowhere to go");
            }
            if self.scenes.outgoing().is_none() {
                if let Some(inc) = self.scenes.incoming() {
                    assert!(inc.is_transitioning(), "incoming transition stored but not started");
                }
            }

            let active = self.scenes.active_id().map(|id| self.scene(id));
            if self.scenes.incoming().is_some_and(|t| t.is_transitioning()) {
                assert!(active.is_some_and(|s| s.is_paused()), "scene runs under its incoming transition");
            }
            if self.scenes.state() == ManagerState::Idle {
                if let Some(scene) = active {
                    assert!(!scene.is_paused(), "idle manager with a paused scene");
                }
            }

            // Only the active scene holds content, plus one target per started transition.
            let started = transitions.iter().filter(|t| t.target().is_ok()).count();
            let loaded = usize::from(active.is_some());
            assert_eq!(self.gfx.live_targets(), loaded + started, "leaked render target");
            assert_eq!(self.gfx.live_textures(), loaded, "leaked texture");
        }
    }

    #[test_log::test]
    fn scenario_a_first_scene_swaps_on_next_tick() {
        let mut h = Harness::new();
        let (x, calls) = h.add("x");

        assert_eq!(h.change(x).unwrap(), ChangeOutcome::Accepted);
        assert_eq!(h.scenes.active_id(), None);
        assert_eq!(h.scenes.state(), ManagerState::SwapPending);

        h.tick(1.0 / 60.0);
        assert_eq!(h.scenes.active_id(), Some(x));
        assert!(!h.scene(x).is_paused());
        assert_eq!(calls.borrow().start, 1);
        assert_eq!(calls.borrow().update, 1);
        assert_eq!(h.scenes.state(), ManagerState::Idle);
    }

    #[test_log::test]
    fn scenario_b_outgoing_then_incoming() {
        let mut h = Harness::new();
        let (x, x_calls) = h.add("x");
        let (y, y_calls) = h.add("y");
        h.activate(x);

        let outcome = h
            .change_with(y, Some(Transition::fade(1.0)), Some(Transition::fade(1.0)))
            .unwrap();
        assert_eq!(outcome, ChangeOutcome::Accepted);
        assert_eq!(h.scenes.active_id(), Some(x));
        assert!(h.scenes.outgoing().unwrap().is_transitioning());
        assert_eq!(h.scenes.state(), ManagerState::AwaitingOutgoing);

        let x_updates = x_calls.borrow().update;
        for _ in 0..4 {
            h.tick(0.25);
            h.check_invariants();
        }
        // The outgoing scene is frozen while it transitions out.
        assert_eq!(x_calls.borrow().update, x_updates);
        assert_eq!(x_calls.borrow().unload, 1);

        assert_eq!(h.scenes.active_id(), Some(y));
        assert!(h.scenes.outgoing().is_none());
        assert!(h.scenes.incoming().unwrap().is_transitioning());
        assert_eq!(h.scenes.state(), ManagerState::AwaitingIncoming);
        assert!(h.scene(y).is_paused());

        for _ in 0..4 {
            h.tick(0.25);
            h.check_invariants();
        }
        assert!(h.scenes.incoming().is_none());
        assert!(!h.scene(y).is_paused());
        assert_eq!(y_calls.borrow().start, 1);
        assert_eq!(h.scenes.state(), ManagerState::Idle);

        // Scene x target and both transition targets are gone; only y's remains.
        assert_eq!(h.gfx.live_targets(), 1);
    }

    #[test_log::test]
    fn invariants_hold_across_mixed_change_sequences() {
        const DT: f32 = 0.125;
        let mut h = Harness::new();
        let (a, _) = h.add("a");
        let (b, _) = h.add("b");
        let (c, _) = h.add("c");
        let broken = h.add_failing("broken");

        let settle = |h: &mut Harness, frames: u32| {
            let mut errors = 0;
            for _ in 0..frames {
                if h.try_tick(DT).is_err() {
                    errors += 1;
                }
                h.check_invariants();
            }
            errors
        };

        // First scene, incoming transition only.
        assert_eq!(
            h.change_with(a, None, Some(Transition::fade(0.5))).unwrap(),
            ChangeOutcome::Accepted
        );
        h.check_invariants();
        assert_eq!(settle(&mut h, 5), 0);
        assert_eq!(h.scenes.active_id(), Some(a));

        // Outgoing only, with a request dropped halfway through.
        h.change_with(b, Some(Transition::fade(0.5)), None).unwrap();
        h.check_invariants();
        assert_eq!(settle(&mut h, 2), 0);
        assert_eq!(h.change_with(c, None, None).unwrap(), ChangeOutcome::Ignored);
        h.check_invariants();
        assert_eq!(settle(&mut h, 3), 0);
        assert_eq!(h.scenes.active_id(), Some(b));

        // Plain swap.
        h.change(c).unwrap();
        h.check_invariants();
        assert_eq!(settle(&mut h, 1), 0);
        assert_eq!(h.scenes.active_id(), Some(c));

        // Incoming only.
        h.change_with(a, None, Some(Transition::fade(0.25))).unwrap();
        h.check_invariants();
        assert_eq!(h.scenes.active_id(), Some(a));
        assert_eq!(settle(&mut h, 3), 0);

        // Both transitions, with a request dropped during the incoming half.
        h.change_with(b, Some(Transition::fade(0.25)), Some(Transition::fade(0.25)))
            .unwrap();
        h.check_invariants();
        assert_eq!(settle(&mut h, 3), 0);
        assert_eq!(h.change(c).unwrap(), ChangeOutcome::Ignored);
        h.check_invariants();
        assert_eq!(settle(&mut h, 2), 0);
        assert_eq!(h.scenes.active_id(), Some(b));
        assert_eq!(h.scenes.state(), ManagerState::Idle);

        // A scene that fails to load, reached by a plain swap.
        h.change(broken).unwrap();
        h.check_invariants();
        assert_eq!(settle(&mut h, 1), 1);
        assert_eq!(h.scenes.active_id(), None);

        // Recover with an incoming-only first scene, then fail incoming-only.
        h.change_with(c, None, Some(Transition::fade(0.25))).unwrap();
        h.check_invariants();
        assert_eq!(settle(&mut h, 3), 0);
        assert_eq!(h.scenes.active_id(), Some(c));
        assert!(h.change_with(broken, None, Some(Transition::fade(0.25))).is_err());
        h.check_invariants();
        assert_eq!(h.scenes.active_id(), None);

        // And once more behind an outgoing transition.
        h.change(a).unwrap();
        assert_eq!(settle(&mut h, 1), 0);
        h.change_with(broken, Some(Transition::fade(0.25)), Some(Transition::fade(0.25)))
            .unwrap();
        h.check_invariants();
        assert_eq!(settle(&mut h, 4), 1);
        assert_eq!(h.scenes.active_id(), None);
        assert!(!h.scenes.is_transitioning());
        assert_eq!(h.gfx.live_targets(), 0);
    }

    #[test_log::test]
    fn scenario_c_self_change_is_an_error() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        h.activate(x);

        let before = h.gfx.created_targets();
        let err = h
            .change_with(x, Some(Transition::fade(1.0)), Some(Transition::fade(1.0)))
            .unwrap_err();
        assert!(matches!(err, SceneError::SelfTransition(id) if id == x));
        assert!(matches!(h.change(x), Err(SceneError::SelfTransition(_))));

        assert_eq!(h.scenes.active_id(), Some(x));
        assert_eq!(h.scenes.next_id(), None);
        assert!(!h.scenes.is_transitioning());
        assert_eq!(h.gfx.created_targets(), before);
    }

    #[test_log::test]
    fn change_while_transitioning_is_ignored() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        let (z, _) = h.add("z");
        h.activate(x);

        h.change_with(y, Some(Transition::fade(1.0)), None).unwrap();
        let outcome = h.change_with(z, None, Some(Transition::fade(1.0))).unwrap();
        assert_eq!(outcome, ChangeOutcome::Ignored);
        assert_eq!(h.change(z).unwrap(), ChangeOutcome::Ignored);
        assert_eq!(h.scenes.next_id(), Some(y));

        h.run(1.0, 0.25);
        assert_eq!(h.scenes.active_id(), Some(y));
        assert!(!h.scene(y).is_paused());
        assert_eq!(h.scene(z).state(), SceneState::Constructed);
    }

    #[test_log::test]
    fn incoming_only_swaps_immediately() {
        let mut h = Harness::new();
        let (x, x_calls) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);

        h.change_with(y, None, Some(Transition::fade(0.5))).unwrap();
        assert_eq!(h.scenes.active_id(), Some(y));
        assert_eq!(x_calls.borrow().unload, 1);
        assert!(h.scene(y).is_paused());
        let incoming = h.scenes.incoming().unwrap();
        assert!(incoming.is_transitioning());
        assert_eq!(incoming.role(), TransitionRole::Incoming);

        h.run(0.5, 0.25);
        assert!(!h.scene(y).is_paused());
        assert!(!h.scenes.is_transitioning());
    }

    #[test_log::test]
    fn first_scene_with_incoming_fade() {
        let mut h = Harness::new();
        let (x, calls) = h.add("x");

        h.change_with(x, None, Some(Transition::fade(0.5))).unwrap();
        assert_eq!(h.scenes.active_id(), Some(x));
        assert_eq!(h.scenes.state(), ManagerState::AwaitingIncoming);

        h.tick(0.25);
        assert_eq!(calls.borrow().update, 0);
        h.tick(0.25);
        assert_eq!(calls.borrow().start, 1);
        assert_eq!(calls.borrow().update, 1);
    }

    #[test_log::test]
    fn outgoing_without_active_scene_is_discarded() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");

        h.change_with(x, Some(Transition::fade(1.0)), None).unwrap();
        assert!(h.scenes.outgoing().is_none());
        assert_eq!(h.scenes.state(), ManagerState::SwapPending);

        h.tick(0.0);
        assert_eq!(h.scenes.active_id(), Some(x));
        assert!(!h.scene(x).is_paused());
    }

    #[test_log::test]
    fn outgoing_only_begins_new_scene_on_completion() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, y_calls) = h.add("y");
        h.activate(x);

        h.change_with(y, Some(Transition::even_odd_tiles(32, 0.5)), None)
            .unwrap();
        h.tick(0.25);
        assert_eq!(h.scenes.active_id(), Some(x));
        h.tick(0.25);
        assert_eq!(h.scenes.active_id(), Some(y));
        assert!(!h.scene(y).is_paused());
        // Begun during the same tick, so it also updated.
        assert_eq!(y_calls.borrow().update, 1);
    }

    #[test_log::test]
    fn old_scene_target_outlives_outgoing_transition() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);
        let x_target = h.scene(x).render_target().unwrap().id().unwrap();

        h.change_with(y, Some(Transition::fade(1.0)), None).unwrap();
        for _ in 0..3 {
            h.tick(0.25);
            assert!(h.gfx.is_live(x_target));
        }
        assert_eq!(h.gfx.invalid_draws(), 0);
        h.tick(0.25);
        assert!(!h.gfx.is_live(x_target));
    }

    #[test_log::test]
    fn render_composites_transition_output() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);
        let x_target = h.scene(x).render_target().unwrap().id().unwrap();

        let screen_source = |h: &Harness| match h.gfx.last_screen_pass().unwrap().draws[0] {
            DrawRecord::Image {
                source: ImageSource::Target(id),
                ..
            } => id,
            ref other => panic!("unexpected screen draw {other:?}"),
        };
        assert_eq!(screen_source(&h), x_target);

        h.change_with(y, Some(Transition::fade(1.0)), None).unwrap();
        h.tick(0.25);
        let out_target = h.scenes.outgoing().unwrap().target().unwrap().id().unwrap();
        assert_eq!(screen_source(&h), out_target);

        // Scene pass, transition pass, screen pass.
        assert_eq!(h.gfx.last_frame().len(), 3);
        assert_eq!(h.gfx.last_frame()[1].target, Some(out_target));
    }

    #[test_log::test]
    fn device_reset_is_idempotent_and_keeps_progress() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);
        h.change_with(y, Some(Transition::fade(1.0)), Some(Transition::fade(1.0)))
            .unwrap();
        h.tick(0.25);

        let x_target = h.scene(x).render_target().unwrap().id().unwrap();
        h.scenes.on_graphics_device_reset(&mut h.gfx).unwrap();
        h.scenes.on_graphics_device_reset(&mut h.gfx).unwrap();

        assert_eq!(h.gfx.reload_count(x_target), 2);
        assert_eq!(h.gfx.target_size(x_target), Some(RES));
        assert_eq!(h.scenes.outgoing().unwrap().remaining(), 0.75);
        assert!(h.scenes.outgoing().unwrap().is_transitioning());

        h.scenes.on_graphics_device_created(&mut h.gfx).unwrap();
        assert_eq!(h.gfx.reload_count(x_target), 3);
    }

    #[test_log::test]
    fn client_size_change_reaches_scenes() {
        let mut h = Harness::new();
        let (x, calls) = h.add("x");
        h.activate(x);
        h.scenes.on_client_size_changed(UVec2::new(800, 600));
        assert_eq!(calls.borrow().resized, 1);
    }

    #[test_log::test]
    fn unknown_scene_is_rejected() {
        let mut h = Harness::new();
        let (stray, _) = Recorder::scene("stray");
        let err = h.change(stray.id()).unwrap_err();
        assert!(matches!(err, SceneError::UnknownScene(_)));
        assert_eq!(h.scenes.state(), ManagerState::Idle);
    }

    #[test_log::test]
    fn swap_resets_time_rate() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);
        h.time.set_time_rate(0.5);
        h.change(y).unwrap();
        h.tick(0.1);
        assert_eq!(h.time.time_rate(), 1.0);
    }

    struct Changer {
        target: Option<SceneTarget>,
        fired: bool,
    }

    impl SceneLogic for Changer {
        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            if let Some(target) = self.target.take() {
                ctx.change_scene_with(target, Some(Transition::fade(0.5)), None);
                self.fired = true;
            } else if self.fired {
                ctx.exit();
            }
        }

        fn draw(&mut self, _gfx: &mut dyn Graphics) {}
    }

    #[test_log::test]
    fn scene_commands_apply_in_same_tick() {
        let mut h = Harness::new();
        let (next, next_calls) = Recorder::scene("next");
        let next_id = next.id();
        let changer = h.scenes.add(Scene::new(
            "changer",
            Changer {
                target: Some(next.into()),
                fired: false,
            },
        ));
        h.activate(changer);

        assert!(h.scenes.contains(next_id));
        assert_eq!(h.scenes.state(), ManagerState::AwaitingOutgoing);
        h.run(0.5, 0.25);
        assert_eq!(h.scenes.active_id(), Some(next_id));
        assert_eq!(next_calls.borrow().start, 1);
        // Changer was registered up front, so it stays around after unloading.
        assert_eq!(h.scene(changer).state(), SceneState::Disposed);
    }

    #[test_log::test]
    fn ignored_runtime_scene_is_dropped() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);
        h.change_with(y, Some(Transition::fade(1.0)), None).unwrap();

        let (extra, _) = Recorder::scene("extra");
        let extra_id = extra.id();
        let mut commands = vec![SceneCommand::Change {
            target: extra.into(),
            outgoing: None,
            incoming: None,
        }];
        h.scenes.apply_commands(&mut h.gfx, &mut commands).unwrap();
        assert!(!h.scenes.contains(extra_id));
        assert_eq!(h.scenes.len(), 2);
    }

    #[test_log::test]
    fn transient_scenes_are_forgotten_after_unload() {
        let mut h = Harness::new();
        let (x, _) = Recorder::scene("x");
        let x_id = x.id();
        let mut commands = vec![SceneCommand::Change {
            target: x.into(),
            outgoing: None,
            incoming: None,
        }];
        h.scenes.apply_commands(&mut h.gfx, &mut commands).unwrap();
        h.tick(0.0);
        assert_eq!(h.scenes.active_id(), Some(x_id));

        let (y, _) = h.add("y");
        h.change(y).unwrap();
        h.tick(0.0);
        assert!(!h.scenes.contains(x_id));
    }

    #[test_log::test]
    fn exit_command_sets_flag() {
        let mut h = Harness::new();
        let mut commands = vec![SceneCommand::Exit];
        h.scenes.apply_commands(&mut h.gfx, &mut commands).unwrap();
        assert!(h.scenes.exit_requested());
    }

    #[test_log::test]
    fn shutdown_releases_everything() {
        let mut h = Harness::new();
        let (x, _) = h.add("x");
        let (y, _) = h.add("y");
        h.activate(x);
        h.change_with(y, Some(Transition::fade(1.0)), Some(Transition::fade(1.0)))
            .unwrap();
        h.tick(0.25);

        h.scenes.shutdown(&mut h.gfx);
        assert_eq!(h.gfx.live_targets(), 0);
        assert_eq!(h.gfx.live_textures(), 0);
        assert!(h.scenes.is_empty());
        assert_eq!(h.scenes.state(), ManagerState::Idle);
    }

    #[test_log::test]
    fn render_without_scene_clears_screen() {
        let mut h = Harness::new();
        h.tick(0.1);
        let screen = h.gfx.last_screen_pass().unwrap();
        assert_eq!(screen.clear, Some(Color::BLACK));
        assert!(screen.draws.is_empty());
    }
}
