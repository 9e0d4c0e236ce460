//! Step sequencing on top of tween events.
//!
//! A `Sequence<S>` is a queue of caller-defined steps. The owner pops a step with
//! `next_ready`, performs it, and either keeps going or hands back the tween it must
//! wait for via `wait_for`. Feeding tween events through `notify` unblocks the queue:
//! - `Completed(awaited)` releases the next step,
//! - `Cancelled(awaited)` abandons the remaining steps (the motion they were meant to
//!   follow never finished).
//!
//! Steps run strictly in order; a step never starts before the tween it follows has
//! completed.

use std::collections::VecDeque;

use log::debug;

use crate::anim::{TweenEvent, TweenId};

#[derive(Debug, Clone)]
pub struct Sequence<S> {
    label: &'static str,
    steps: VecDeque<S>,
    awaiting: Option<TweenId>,
}

impl<S> Sequence<S> {
    pub fn new(label: &'static str, steps: impl IntoIterator<Item = S>) -> Self {
        Self {
            label,
            steps: steps.into_iter().collect(),
            awaiting: None,
        }
    }

    /// Pop the next step if nothing is being awaited.
    pub fn next_ready(&mut self) -> Option<S> {
        if self.awaiting.is_some() {
            return None;
        }
        self.steps.pop_front()
    }

    /// Block the remaining steps on `tween` (no-op for `None`).
    #[inline]
    pub fn wait_for(&mut self, tween: Option<TweenId>) {
        self.awaiting = tween;
    }

    #[inline]
    pub fn awaiting(&self) -> Option<TweenId> {
        self.awaiting
    }

    /// Feed a tween event. Returns `true` if the sequence may now make progress.
    pub fn notify(&mut self, event: TweenEvent) -> bool {
        match event {
            TweenEvent::Completed(id) if self.awaiting == Some(id) => {
                self.awaiting = None;
                true
            }
            TweenEvent::Cancelled(id) if self.awaiting == Some(id) => {
                debug!(
                    "{} sequence abandoned {} step(s)",
                    self.label,
                    self.steps.len()
                );
                self.awaiting = None;
                self.steps.clear();
                false
            }
            _ => false,
        }
    }

    /// Nothing queued and nothing awaited.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.awaiting.is_none() && self.steps.is_empty()
    }
}
