//! Pointer interaction for the glyph.
//!
//! `InteractionController` is a small state machine over hit-zone pointer events:
//!
//! ```text
//! Idle --down--> Pressed --up-----> ReturningFromPress --pop done--> Idle
//!                        \--leave--> ReturningFromLeave --restore done--> Idle
//! ```
//!
//! Handlers are installed and removed on every transition (`HandlerSet`), so an event
//! without an installed handler is ignored: a second press cannot start while the first
//! activation is still running. Handled events are reported as `Consumed` so the caller
//! stops propagating them.
//!
//! Multi-step choreography (activation, restore) is an ordered list of [`Cue`]s run by a
//! [`Sequence`]; the next cue only runs once the awaited tween completes.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use crate::anim::sequence::Sequence;
use crate::anim::{Ease, GroupDelta, Motion, ShapeDelta, TweenEngine, TweenEvent, TweenId};
use crate::font::OutlineSource;
use crate::scene::{GLYPH, GROUP, Stage, replace};

/// Tunables for the press / release / leave motions.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionConfig {
    /// Group scale while pressed.
    pub press_scale: f32,
    pub press: Motion,
    /// Group back to 1.0 on release.
    pub release: Motion,
    /// Glyph scale at the top of the activation pop.
    pub pop_scale: f32,
    /// Rotation offsets (degrees) the pop picks from, uniformly.
    pub pop_rotations: Vec<f32>,
    pub pop: Motion,
    /// Glyph back to scale 1, rotation 0, centered on the disc.
    pub settle: Motion,
    /// Group back to 1.0 after the pointer leaves while pressed.
    pub restore: Motion,
    /// Characters to cycle through on each activation. Empty disables replacement.
    pub replacements: Vec<char>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            press_scale: 0.9,
            press: Motion::new(200, Ease::OutBack(4.0)),
            release: Motion::new(200, Ease::OutBack(5.0)),
            pop_scale: 1.25,
            pop_rotations: vec![-4.0, 4.0, -5.0, 5.0, -8.0, 8.0, -10.0, 10.0],
            pop: Motion::new(200, Ease::OutBack(1.0)),
            settle: Motion::new(200, Ease::OutBack(4.0)),
            restore: Motion::new(200, Ease::OutExpo),
            replacements: Vec::new(),
        }
    }
}

impl InteractionConfig {
    #[inline]
    pub fn with_pop(mut self, scale: f32, rotations: Vec<f32>) -> Self {
        self.pop_scale = scale;
        self.pop_rotations = rotations;
        self
    }

    #[inline]
    pub fn with_replacements(mut self, replacements: impl IntoIterator<Item = char>) -> Self {
        self.replacements = replacements.into_iter().collect();
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InteractionState {
    Idle,
    Pressed,
    ReturningFromPress,
    ReturningFromLeave,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PointerEvent {
    Enter,
    Down,
    Up,
    Leave,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EventResponse {
    /// Handled; do not propagate.
    Consumed,
    /// No handler installed for this event.
    Ignored,
}

/// Which hit-zone handlers are currently installed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct HandlerSet {
    pub down: bool,
    pub up: bool,
    pub leave: bool,
}

impl HandlerSet {
    pub const NONE: Self = Self {
        down: false,
        up: false,
        leave: false,
    };

    #[inline]
    fn accepts(self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Enter => false,
            PointerEvent::Down => self.down,
            PointerEvent::Up => self.up,
            PointerEvent::Leave => self.leave,
        }
    }
}

/// Wrapping cursor over an ordered candidate list, owned per controller.
#[derive(Debug, Clone, Default)]
pub struct CycleCursor {
    candidates: Vec<char>,
    next: usize,
}

impl CycleCursor {
    pub fn new(candidates: Vec<char>) -> Self {
        Self {
            candidates,
            next: 0,
        }
    }

    /// The next candidate, wrapping to the start after the last.
    pub fn advance(&mut self) -> Option<char> {
        let ch = *self.candidates.get(self.next)?;
        self.next = (self.next + 1) % self.candidates.len();
        Some(ch)
    }
}

/// One step of an interaction sequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Cue {
    /// Release the group, optionally swap the glyph, and pop the glyph. Awaited.
    Pop,
    /// Reinstall the down handler.
    Arm,
    /// Glyph back to rest on the disc center.
    Settle,
    /// Group back to 1.0 after a drag-off. Awaited.
    Restore,
}

/// What the controller needs from its owner to act on a transition.
pub struct InteractionContext<'a> {
    pub stage: &'a mut Stage,
    pub tweens: &'a mut TweenEngine,
    pub outlines: &'a dyn OutlineSource,
    /// Current glyph target size (used when a replacement glyph is fitted).
    pub size: f32,
}

pub struct InteractionController {
    config: InteractionConfig,
    state: InteractionState,
    handlers: HandlerSet,
    cursor: CycleCursor,
    rng: Box<dyn RngCore>,
    sequence: Option<Sequence<Cue>>,
}

impl std::fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionController")
            .field("state", &self.state)
            .field("handlers", &self.handlers)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self::with_rng(config, Box::new(StdRng::from_entropy()))
    }

    pub fn with_rng(config: InteractionConfig, rng: Box<dyn RngCore>) -> Self {
        let cursor = CycleCursor::new(config.replacements.clone());
        Self {
            config,
            state: InteractionState::Idle,
            handlers: HandlerSet::NONE,
            cursor,
            rng,
            sequence: None,
        }
    }

    #[inline]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    #[inline]
    pub fn handlers(&self) -> HandlerSet {
        self.handlers
    }

    /// Install the down handler and return to `Idle`.
    pub fn arm(&mut self) {
        debug!("interaction armed (from {:?})", self.state);
        self.state = InteractionState::Idle;
        self.handlers = HandlerSet {
            down: true,
            ..HandlerSet::NONE
        };
    }

    /// Remove every handler and drop any running sequence (e.g. before a reload).
    pub fn disarm(&mut self) {
        self.state = InteractionState::Idle;
        self.handlers = HandlerSet::NONE;
        self.sequence = None;
    }

    /// Uniform pick from the configured rotation set (0 when the set is empty).
    pub fn pick_rotation(&mut self) -> f32 {
        self.config
            .pop_rotations
            .choose(&mut *self.rng)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn handle(&mut self, event: PointerEvent, ctx: &mut InteractionContext<'_>) -> EventResponse {
        if !self.handlers.accepts(event) {
            return EventResponse::Ignored;
        }

        match (self.state, event) {
            (InteractionState::Idle, PointerEvent::Down) => {
                self.state = InteractionState::Pressed;
                self.handlers = HandlerSet {
                    down: false,
                    up: true,
                    leave: true,
                };
                let m = self.config.press;
                ctx.tweens.animate(
                    &*ctx.stage,
                    GROUP,
                    [GroupDelta::Scale(self.config.press_scale)],
                    m.duration,
                    m.ease,
                );
            }
            (InteractionState::Pressed, PointerEvent::Up) => {
                self.state = InteractionState::ReturningFromPress;
                self.handlers = HandlerSet::NONE;
                self.run(Sequence::new("activation", [Cue::Pop, Cue::Arm, Cue::Settle]), ctx);
            }
            (InteractionState::Pressed, PointerEvent::Leave) => {
                self.state = InteractionState::ReturningFromLeave;
                self.handlers = HandlerSet::NONE;
                self.run(Sequence::new("restore", [Cue::Restore, Cue::Arm]), ctx);
            }
            (state, event) => {
                // Handlers are only installed for the transitions above.
                debug!("unexpected {event:?} in {state:?}");
                return EventResponse::Ignored;
            }
        }

        debug!("pointer {event:?} -> {:?}", self.state);
        EventResponse::Consumed
    }

    /// Route a tween event into the running sequence.
    pub fn on_tween_event(&mut self, event: TweenEvent, ctx: &mut InteractionContext<'_>) {
        let Some(seq) = self.sequence.as_mut() else {
            return;
        };
        let awaited = seq.awaiting();
        if seq.notify(event) {
            self.pump(ctx);
        } else if awaited.is_some() && seq.is_finished() {
            // The awaited tween was cancelled; never leave the glyph unarmed.
            self.sequence = None;
            self.arm();
        }
    }

    fn run(&mut self, sequence: Sequence<Cue>, ctx: &mut InteractionContext<'_>) {
        self.sequence = Some(sequence);
        self.pump(ctx);
    }

    fn pump(&mut self, ctx: &mut InteractionContext<'_>) {
        while let Some(cue) = self.sequence.as_mut().and_then(Sequence::next_ready) {
            let wait = self.perform(cue, ctx);
            if let Some(seq) = self.sequence.as_mut() {
                seq.wait_for(wait);
            }
        }
        if self.sequence.as_ref().is_some_and(Sequence::is_finished) {
            self.sequence = None;
        }
    }

    fn perform(&mut self, cue: Cue, ctx: &mut InteractionContext<'_>) -> Option<TweenId> {
        debug!("cue {cue:?}");
        match cue {
            Cue::Pop => {
                let m = self.config.release;
                ctx.tweens
                    .animate(&*ctx.stage, GROUP, [GroupDelta::Scale(1.0)], m.duration, m.ease);

                if let Some(ch) = self.cursor.advance() {
                    self.swap_glyph(ch, ctx);
                }

                let rotation = self.pick_rotation();
                let m = self.config.pop;
                Some(ctx.tweens.animate(
                    &*ctx.stage,
                    GLYPH,
                    [
                        ShapeDelta::Scale(self.config.pop_scale),
                        ShapeDelta::Rotation(rotation),
                    ],
                    m.duration,
                    m.ease,
                ))
            }
            Cue::Arm => {
                self.arm();
                None
            }
            Cue::Settle => {
                let center = ctx.stage.glyph()?.disc.center;
                let m = self.config.settle;
                ctx.tweens.animate(
                    &*ctx.stage,
                    GLYPH,
                    [
                        ShapeDelta::Scale(1.0),
                        ShapeDelta::Rotation(0.0),
                        ShapeDelta::Position(center),
                    ],
                    m.duration,
                    m.ease,
                );
                None
            }
            Cue::Restore => {
                let m = self.config.restore;
                Some(ctx.tweens.animate(
                    &*ctx.stage,
                    GROUP,
                    [GroupDelta::Scale(1.0)],
                    m.duration,
                    m.ease,
                ))
            }
        }
    }

    fn swap_glyph(&mut self, ch: char, ctx: &mut InteractionContext<'_>) {
        let commands = match ctx.outlines.outline(ch) {
            Ok(commands) => commands,
            Err(err) => {
                warn!("replacement glyph {ch:?} unavailable: {err}");
                return;
            }
        };
        let Some(glyph) = ctx.stage.glyph() else {
            return;
        };
        let next = replace(&glyph.shape, &commands, ctx.size);
        ctx.stage.replace_glyph(next);
        debug!("glyph replaced with {ch:?}");
    }
}
