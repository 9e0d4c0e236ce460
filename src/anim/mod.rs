//! Tween engine.
//!
//! A tween interpolates one or more properties of one node from their current values
//! to target values over a duration, shaped by an [`Ease`]. The engine:
//! - does not own the animated values; it reads/writes them through [`PropertyHost`]
//!   and only for the lifetime of the tween,
//! - advances on every frame via `tick(dt, host)`,
//! - reports `Completed`/`Cancelled` events in completion-time order so callers can
//!   chain the next step (see [`sequence`]).
//!
//! Replace semantics: starting a tween on a (node, property) that is already being
//! animated takes that property away from the older tween. The newer tween starts from
//! the property's *current* value, so motion is redirected instead of snapping. A tween
//! that loses all of its properties this way is cancelled.
//!
//! Numeric semantics:
//! - rotation is in degrees and never normalized (370 stays 370),
//! - scale is a factor applied about the node's own center,
//! - position and radius are absolute targets.
//!
//! Which properties a node accepts is decided by its target type: a circle takes
//! [`CircleDelta`]s, a compound shape [`ShapeDelta`]s, a group [`GroupDelta`]s. Asking a
//! group to rotate does not compile.
//!
//! Usage sketch:
//! ```ignore
//! let id = tweens.animate(&stage, GLYPH, [ShapeDelta::Scale(1.25), ShapeDelta::Rotation(8.0)],
//!     Duration::from_millis(200), Ease::OutBack(1.0));
//! // per frame:
//! for event in tweens.tick(dt, &mut stage) { /* chain on Completed(id) */ }
//! ```

pub mod sequence;

use std::time::Duration;

use log::trace;
use lyon::math::Point;

/// Back-out overshoot used when none is specified.
pub const DEFAULT_OVERSHOOT: f32 = 1.70158;

/// How to map animation time into a normalized [0,1] parameter.
///
/// Overshoot easings may leave [0,1] in between but always end exactly at 1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Ease {
    Linear,
    /// Circular ease-in: slow start, sharp finish.
    InCirc,
    /// Exponential ease-out (normalized to hit 1 exactly).
    OutExpo,
    /// Back ease-out; the parameter is the overshoot amount.
    OutBack(f32),
}

impl Ease {
    #[inline]
    pub fn sample(self, x: f32) -> f32 {
        let t = x.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Ease::OutExpo => {
                // 2^-10 is subtracted and the result rescaled so f(1) == 1.
                1.0 - (2f32.powf(-10.0 * t) - 0.000_976_562_5) * 1.000_977_5
            }
            Ease::OutBack(s) => {
                let u = t - 1.0;
                u * u * ((s + 1.0) * u + s) + 1.0
            }
        }
    }
}

impl Default for Ease {
    fn default() -> Self {
        Ease::Linear
    }
}

/// Duration + easing pair used by configuration structs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Motion {
    pub duration: Duration,
    pub ease: Ease,
}

impl Motion {
    #[inline]
    pub const fn new(millis: u64, ease: Ease) -> Self {
        Self {
            duration: Duration::from_millis(millis),
            ease,
        }
    }
}

/// Opaque node handle understood by a `PropertyHost`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

/// The closed set of animatable properties.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PropertyKind {
    Scale,
    Rotation,
    Position,
    Radius,
    Opacity,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(f32),
    Point(Point),
}

impl PropertyValue {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        match (self, to) {
            (PropertyValue::Scalar(a), PropertyValue::Scalar(b)) => {
                PropertyValue::Scalar(a + (b - a) * t)
            }
            (PropertyValue::Point(a), PropertyValue::Point(b)) => PropertyValue::Point(a.lerp(b, t)),
            // Mismatched kinds cannot be produced through the typed deltas.
            (_, to) => to,
        }
    }

    #[inline]
    pub fn scalar(self) -> Option<f32> {
        match self {
            PropertyValue::Scalar(v) => Some(v),
            PropertyValue::Point(_) => None,
        }
    }

    #[inline]
    pub fn point(self) -> Option<Point> {
        match self {
            PropertyValue::Point(p) => Some(p),
            PropertyValue::Scalar(_) => None,
        }
    }
}

/// One property target of a tween.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Channel {
    pub kind: PropertyKind,
    pub to: PropertyValue,
}

/// Targets accepted by circles.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CircleDelta {
    Radius(f32),
    Position(Point),
    Opacity(f32),
}

/// Targets accepted by compound shapes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ShapeDelta {
    Scale(f32),
    Rotation(f32),
    Position(Point),
    Opacity(f32),
}

/// Targets accepted by groups.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GroupDelta {
    Scale(f32),
}

impl From<CircleDelta> for Channel {
    fn from(d: CircleDelta) -> Self {
        match d {
            CircleDelta::Radius(r) => scalar(PropertyKind::Radius, r),
            CircleDelta::Position(p) => Channel {
                kind: PropertyKind::Position,
                to: PropertyValue::Point(p),
            },
            CircleDelta::Opacity(a) => scalar(PropertyKind::Opacity, a),
        }
    }
}

impl From<ShapeDelta> for Channel {
    fn from(d: ShapeDelta) -> Self {
        match d {
            ShapeDelta::Scale(s) => scalar(PropertyKind::Scale, s),
            ShapeDelta::Rotation(deg) => scalar(PropertyKind::Rotation, deg),
            ShapeDelta::Position(p) => Channel {
                kind: PropertyKind::Position,
                to: PropertyValue::Point(p),
            },
            ShapeDelta::Opacity(a) => scalar(PropertyKind::Opacity, a),
        }
    }
}

impl From<GroupDelta> for Channel {
    fn from(d: GroupDelta) -> Self {
        match d {
            GroupDelta::Scale(s) => scalar(PropertyKind::Scale, s),
        }
    }
}

#[inline]
fn scalar(kind: PropertyKind, v: f32) -> Channel {
    Channel {
        kind,
        to: PropertyValue::Scalar(v),
    }
}

/// A typed handle to an animatable node.
pub trait TweenTarget: Copy {
    type Delta: Into<Channel>;

    fn node(self) -> NodeId;
}

/// Storage the engine reads start values from and writes interpolated values into.
pub trait PropertyHost {
    fn read(&self, node: NodeId, kind: PropertyKind) -> Option<PropertyValue>;
    fn write(&mut self, node: NodeId, kind: PropertyKind, value: PropertyValue);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TweenId(u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TweenEvent {
    /// Reached progress 1; every channel holds its exact target.
    Completed(TweenId),
    /// Cancelled or fully superseded; values stay where they were.
    Cancelled(TweenId),
}

#[derive(Debug, Copy, Clone)]
struct Track {
    kind: PropertyKind,
    from: PropertyValue,
    to: PropertyValue,
}

/// One running tween.
#[derive(Debug, Clone)]
pub struct Tween {
    id: TweenId,
    node: NodeId,
    tracks: Vec<Track>,
    duration: Duration,
    elapsed: Duration,
    ease: Ease,
}

impl Tween {
    #[inline]
    pub fn id(&self) -> TweenId {
        self.id
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Normalized time in [0,1]. Exactly 1.0 once `duration` has elapsed.
    pub fn progress(&self) -> f32 {
        if self.elapsed >= self.duration {
            1.0
        } else {
            (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
        }
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn apply(&self, host: &mut impl PropertyHost) {
        let p = self.progress();
        let k = self.ease.sample(p);
        for track in &self.tracks {
            let value = if p >= 1.0 {
                track.to
            } else {
                track.from.lerp(track.to, k)
            };
            host.write(self.node, track.kind, value);
        }
    }
}

/// Frame-driven tween scheduler.
#[derive(Debug, Default)]
pub struct TweenEngine {
    next_id: u64,
    active: Vec<Tween>,
    pending: Vec<TweenEvent>,
}

impl TweenEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tween on `target`. Start values are read from `host` now.
    pub fn animate<T: TweenTarget>(
        &mut self,
        host: &impl PropertyHost,
        target: T,
        deltas: impl IntoIterator<Item = T::Delta>,
        duration: Duration,
        ease: Ease,
    ) -> TweenId {
        let node = target.node();
        let id = TweenId(self.next_id);
        self.next_id += 1;

        let mut tracks: Vec<Track> = Vec::new();
        for delta in deltas {
            let channel: Channel = delta.into();
            self.release(node, channel.kind);
            let from = host.read(node, channel.kind).unwrap_or(channel.to);
            tracks.retain(|t| t.kind != channel.kind);
            tracks.push(Track {
                kind: channel.kind,
                from,
                to: channel.to,
            });
        }

        trace!("tween {id:?} on {node:?}: {tracks:?} over {duration:?}");
        self.active.push(Tween {
            id,
            node,
            tracks,
            duration,
            elapsed: Duration::ZERO,
            ease,
        });
        id
    }

    /// Take `kind` on `node` away from any running tween.
    fn release(&mut self, node: NodeId, kind: PropertyKind) {
        let pending = &mut self.pending;
        self.active.retain_mut(|tween| {
            if tween.node != node {
                return true;
            }
            let before = tween.tracks.len();
            tween.tracks.retain(|t| t.kind != kind);
            if before > 0 && tween.tracks.is_empty() {
                trace!("tween {:?} superseded", tween.id);
                pending.push(TweenEvent::Cancelled(tween.id));
                return false;
            }
            true
        });
    }

    /// Stop a tween where it is. Its completion never fires.
    pub fn cancel(&mut self, id: TweenId) -> bool {
        let before = self.active.len();
        self.active.retain(|t| t.id != id);
        let removed = self.active.len() != before;
        if removed {
            self.pending.push(TweenEvent::Cancelled(id));
        }
        removed
    }

    /// Advance all tweens by `dt`, write their values, and drain events.
    ///
    /// Completions are ordered by when they happened inside the step, then by start
    /// order.
    pub fn tick(&mut self, dt: Duration, host: &mut impl PropertyHost) -> Vec<TweenEvent> {
        let mut finished: Vec<(Duration, TweenId)> = Vec::new();

        for tween in &mut self.active {
            let remaining = tween.duration.saturating_sub(tween.elapsed);
            tween.elapsed = (tween.elapsed + dt).min(tween.duration);
            tween.apply(&mut *host);
            if tween.is_finished() {
                finished.push((remaining, tween.id));
            }
        }

        self.active.retain(|t| !t.is_finished());
        finished.sort();

        let mut events = std::mem::take(&mut self.pending);
        events.extend(finished.into_iter().map(|(_, id)| TweenEvent::Completed(id)));
        events
    }

    #[inline]
    pub fn is_active(&self, id: TweenId) -> bool {
        self.active.iter().any(|t| t.id == id)
    }

    #[inline]
    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.active.iter().find(|t| t.id == id)
    }

    /// Remap both ends of the track driving `kind` on `target`, leaving its timing
    /// alone. With an affine `f`, a host value also passed through `f` stays on the
    /// remapped curve. Returns the tween that was retargeted.
    pub fn retarget<T: TweenTarget>(
        &mut self,
        target: T,
        kind: PropertyKind,
        f: impl Fn(PropertyValue) -> PropertyValue,
    ) -> Option<TweenId> {
        let node = target.node();
        let tween = self
            .active
            .iter_mut()
            .find(|t| t.node == node && t.tracks.iter().any(|tr| tr.kind == kind))?;
        for track in tween.tracks.iter_mut().filter(|tr| tr.kind == kind) {
            track.from = f(track.from);
            track.to = f(track.to);
        }
        trace!("tween {:?} retargeted {kind:?} on {node:?}", tween.id);
        Some(tween.id)
    }

    /// The tween currently driving `kind` on `node`, if any.
    pub fn driving(&self, node: NodeId, kind: PropertyKind) -> Option<TweenId> {
        self.active
            .iter()
            .find(|t| t.node == node && t.tracks.iter().any(|tr| tr.kind == kind))
            .map(|t| t.id)
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyon::math::point;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Host(HashMap<(NodeId, PropertyKind), PropertyValue>);

    impl PropertyHost for Host {
        fn read(&self, node: NodeId, kind: PropertyKind) -> Option<PropertyValue> {
            self.0.get(&(node, kind)).copied()
        }

        fn write(&mut self, node: NodeId, kind: PropertyKind, value: PropertyValue) {
            self.0.insert((node, kind), value);
        }
    }

    impl Host {
        fn scalar(&self, node: NodeId, kind: PropertyKind) -> f32 {
            self.0[&(node, kind)].scalar().expect("scalar")
        }
    }

    #[derive(Copy, Clone)]
    struct Shape(NodeId);
    impl TweenTarget for Shape {
        type Delta = ShapeDelta;
        fn node(self) -> NodeId {
            self.0
        }
    }

    const A: Shape = Shape(NodeId(1));
    const B: Shape = Shape(NodeId(2));

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn host_with_scale(v: f32) -> Host {
        let mut host = Host::default();
        host.write(A.0, PropertyKind::Scale, PropertyValue::Scalar(v));
        host.write(B.0, PropertyKind::Scale, PropertyValue::Scalar(v));
        host
    }

    #[test]
    fn eases_start_at_zero_and_end_at_one() {
        for ease in [
            Ease::Linear,
            Ease::InCirc,
            Ease::OutExpo,
            Ease::OutBack(DEFAULT_OVERSHOOT),
            Ease::OutBack(4.0),
        ] {
            assert!(ease.sample(0.0).abs() < 1e-6, "{ease:?}");
            assert!((ease.sample(1.0) - 1.0).abs() < 1e-6, "{ease:?}");
        }
    }

    #[test]
    fn back_out_overshoots() {
        let peak = (1..100)
            .map(|i| Ease::OutBack(4.0).sample(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn progress_is_monotonic_and_reaches_target_exactly() {
        let mut host = host_with_scale(1.0);
        let mut tweens = TweenEngine::new();
        let id = tweens.animate(&host, A, [ShapeDelta::Scale(0.3)], ms(100), Ease::OutBack(4.0));

        // 5 x 17 ms stays short of the 100 ms duration.
        let mut last = 0.0;
        for _ in 0..5 {
            assert!(tweens.tick(ms(17), &mut host).is_empty());
            let p = tweens.get(id).expect("running").progress();
            assert!(p >= last && p < 1.0, "{p}");
            last = p;
        }
        let events = tweens.tick(ms(17), &mut host);
        assert_eq!(events, vec![TweenEvent::Completed(id)]);
        assert_eq!(host.scalar(A.0, PropertyKind::Scale), 0.3);
        assert!(tweens.is_idle());
    }

    #[test]
    fn linear_interpolation_midway() {
        let mut host = host_with_scale(0.0);
        let mut tweens = TweenEngine::new();
        tweens.animate(&host, A, [ShapeDelta::Scale(10.0)], ms(100), Ease::Linear);
        tweens.tick(ms(50), &mut host);
        assert!((host.scalar(A.0, PropertyKind::Scale) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn new_tween_starts_from_current_value() {
        let mut host = host_with_scale(0.0);
        let mut tweens = TweenEngine::new();
        let first = tweens.animate(&host, A, [ShapeDelta::Scale(10.0)], ms(100), Ease::Linear);
        tweens.tick(ms(50), &mut host);

        let second = tweens.animate(&host, A, [ShapeDelta::Scale(0.0)], ms(100), Ease::Linear);
        // The first tween lost its only channel.
        assert!(!tweens.is_active(first));

        let events = tweens.tick(ms(50), &mut host);
        assert_eq!(events, vec![TweenEvent::Cancelled(first)]);
        // Halfway from 5 (not 10, not 0) down to 0.
        assert!((host.scalar(A.0, PropertyKind::Scale) - 2.5).abs() < 1e-4);
        assert!(tweens.is_active(second));
    }

    #[test]
    fn partially_superseded_tween_still_completes() {
        let mut host = host_with_scale(1.0);
        host.write(A.0, PropertyKind::Rotation, PropertyValue::Scalar(0.0));
        let mut tweens = TweenEngine::new();
        let both = tweens.animate(
            &host,
            A,
            [ShapeDelta::Scale(2.0), ShapeDelta::Rotation(10.0)],
            ms(100),
            Ease::Linear,
        );
        tweens.tick(ms(10), &mut host);
        let scale_only = tweens.animate(&host, A, [ShapeDelta::Scale(1.0)], ms(200), Ease::Linear);

        assert_eq!(tweens.driving(A.0, PropertyKind::Rotation), Some(both));
        assert_eq!(tweens.driving(A.0, PropertyKind::Scale), Some(scale_only));

        let events = tweens.tick(ms(90), &mut host);
        assert_eq!(events, vec![TweenEvent::Completed(both)]);
        assert_eq!(host.scalar(A.0, PropertyKind::Rotation), 10.0);
    }

    #[test]
    fn rotation_is_not_normalized() {
        let mut host = Host::default();
        host.write(A.0, PropertyKind::Rotation, PropertyValue::Scalar(350.0));
        let mut tweens = TweenEngine::new();
        tweens.animate(&host, A, [ShapeDelta::Rotation(370.0)], ms(10), Ease::Linear);
        tweens.tick(ms(10), &mut host);
        assert_eq!(host.scalar(A.0, PropertyKind::Rotation), 370.0);
    }

    #[test]
    fn cancel_freezes_value_and_skips_completion() {
        let mut host = host_with_scale(0.0);
        let mut tweens = TweenEngine::new();
        let id = tweens.animate(&host, A, [ShapeDelta::Scale(10.0)], ms(100), Ease::Linear);
        tweens.tick(ms(30), &mut host);
        assert!(tweens.cancel(id));
        assert!(!tweens.cancel(id));

        let events = tweens.tick(ms(100), &mut host);
        assert_eq!(events, vec![TweenEvent::Cancelled(id)]);
        assert!((host.scalar(A.0, PropertyKind::Scale) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn retarget_remaps_both_ends_and_keeps_timing() {
        let mut host = host_with_scale(0.0);
        let mut tweens = TweenEngine::new();
        let id = tweens.animate(&host, A, [ShapeDelta::Scale(10.0)], ms(100), Ease::Linear);
        tweens.tick(ms(50), &mut host);

        let double = |v: PropertyValue| PropertyValue::Scalar(v.scalar().unwrap_or(0.0) * 2.0);
        assert_eq!(tweens.retarget(A, PropertyKind::Scale, double), Some(id));
        assert_eq!(tweens.retarget(A, PropertyKind::Rotation, double), None);
        assert_eq!(tweens.retarget(B, PropertyKind::Scale, double), None);

        tweens.tick(ms(25), &mut host);
        assert!((host.scalar(A.0, PropertyKind::Scale) - 15.0).abs() < 1e-4);
        let events = tweens.tick(ms(25), &mut host);
        assert_eq!(events, vec![TweenEvent::Completed(id)]);
        assert_eq!(host.scalar(A.0, PropertyKind::Scale), 20.0);
    }

    #[test]
    fn completions_are_ordered_by_completion_time() {
        let mut host = host_with_scale(1.0);
        let mut tweens = TweenEngine::new();
        // Started first but finishes later inside the same step.
        let slow = tweens.animate(&host, A, [ShapeDelta::Scale(2.0)], ms(40), Ease::Linear);
        let fast = tweens.animate(&host, B, [ShapeDelta::Scale(2.0)], ms(20), Ease::Linear);

        let events = tweens.tick(ms(50), &mut host);
        assert_eq!(events, vec![
            TweenEvent::Completed(fast),
            TweenEvent::Completed(slow)
        ]);
    }

    #[test]
    fn zero_duration_completes_on_next_tick() {
        let mut host = Host::default();
        host.write(A.0, PropertyKind::Position, PropertyValue::Point(point(0.0, 0.0)));
        let mut tweens = TweenEngine::new();
        let id = tweens.animate(
            &host,
            A,
            [ShapeDelta::Position(point(4.0, 2.0))],
            Duration::ZERO,
            Ease::OutBack(4.0),
        );
        assert_eq!(tweens.tick(Duration::ZERO, &mut host), vec![
            TweenEvent::Completed(id)
        ]);
        assert_eq!(
            host.read(A.0, PropertyKind::Position),
            Some(PropertyValue::Point(point(4.0, 2.0)))
        );
    }
}
