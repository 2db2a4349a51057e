//! Randomness seam.
//!
//! Combat rolls, passive triggers and planet placement all draw from a
//! [`Dice`]. The core never touches a global RNG: the service layer supplies a
//! seeded [`RngDice`], tests supply a [`SequenceDice`].

use std::collections::VecDeque;

use rand::Rng;

/// Upper bound of passive trigger rolls.
pub const PERCENT_ROLL: u32 = 100;

/// A source of uniform integer rolls.
pub trait Dice {
    /// Uniform integer in `0..=max`.
    fn roll(&mut self, max: u32) -> u32;

    /// Roll `0..=100` and report whether the result is at most `threshold`.
    fn chance(&mut self, threshold: u32) -> bool {
        self.roll(PERCENT_ROLL) <= threshold
    }
}

/// [`Dice`] backed by any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RngDice<R>(pub R);

impl<R: Rng> Dice for RngDice<R> {
    fn roll(&mut self, max: u32) -> u32 {
        self.0.gen_range(0..=max)
    }
}

/// [`Dice`] that replays a fixed script.
///
/// Each roll takes the next scripted value clamped to the requested maximum.
/// When the script runs out it repeats `fallback`.
#[derive(Debug, Clone, Default)]
pub struct SequenceDice {
    script: VecDeque<u32>,
    fallback: u32,
}

impl SequenceDice {
    /// Replay `rolls` in order, then `u32::MAX` (clamped, so "roll the max").
    #[must_use]
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: rolls.into_iter().collect(),
            fallback: u32::MAX,
        }
    }

    /// Replay `rolls` in order, then `fallback` forever.
    #[must_use]
    pub fn with_fallback(rolls: impl IntoIterator<Item = u32>, fallback: u32) -> Self {
        Self {
            script: rolls.into_iter().collect(),
            fallback,
        }
    }

    /// Scripted rolls not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Dice for SequenceDice {
    fn roll(&mut self, max: u32) -> u32 {
        self.script.pop_front().unwrap_or(self.fallback).min(max)
    }
}
