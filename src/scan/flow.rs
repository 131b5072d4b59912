// src/scan/flow.rs

//! Control-flow outcomes returned by scan functions.
//!
//! Functions steer the nested sweep by returning a [`Flow`] instead of
//! raising. The runner threads the outcome back up the recursion:
//! - `Continue`: keep going with the next action.
//! - `Break`: stop the enclosing setter loop(s), see [`LoopBreak`].
//! - `Abort`: stop the whole run; restoration still happens.

/// Outcome of a single action, as seen by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break(LoopBreak),
    Abort,
}

impl Flow {
    /// Break out of the innermost enclosing setter loop.
    pub fn break_loop() -> Self {
        Flow::Break(LoopBreak::default())
    }

    /// Break out of `levels` enclosing setter loops.
    pub fn break_loops(levels: u32) -> Self {
        Flow::Break(LoopBreak::levels(levels))
    }

    /// Break out of every setter loop; the run ends as `Broken`.
    pub fn break_all() -> Self {
        Flow::Break(LoopBreak::all())
    }
}

/// Request to leave one or more enclosing setter loops early.
///
/// Each setter loop the signal passes through consumes one level. The loop
/// that consumes the last level stops iterating its remaining values and the
/// next-outer setter continues with its next value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopBreak {
    remaining: u32,
}

impl LoopBreak {
    /// Unwind `levels` setter loops. Zero is treated as one.
    pub fn levels(levels: u32) -> Self {
        Self {
            remaining: levels.max(1),
        }
    }

    /// Unwind every loop of the scan.
    pub fn all() -> Self {
        Self {
            remaining: u32::MAX,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one level at a setter loop. Returns `true` when this loop is the
    /// last one to unwind.
    pub(crate) fn absorb(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

impl Default for LoopBreak {
    fn default() -> Self {
        Self::levels(1)
    }
}
