// Delay line - fixed-depth shift register for side signals
//
// Each call to `shift` is one clock edge: the value entering now leaves after
// exactly `depth` further edges. Depth zero passes values straight through.

use std::collections::VecDeque;

/// Shift register of fixed depth
#[derive(Debug, Clone)]
pub struct DelayLine<T> {
    stages: VecDeque<T>,
    depth: usize,
}

impl<T: Copy + Default> DelayLine<T> {
    /// Create a delay line filled with `T::default()`
    pub fn new(depth: usize) -> Self {
        DelayLine {
            stages: std::iter::repeat_n(T::default(), depth).collect(),
            depth,
        }
    }

    /// Number of stages
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Value currently leaving the line (the oldest stage)
    pub fn output(&self) -> Option<T> {
        self.stages.front().copied()
    }

    /// Clock one value in and return the value leaving on this edge
    pub fn shift(&mut self, input: T) -> T {
        if self.depth == 0 {
            return input;
        }
        self.stages.push_back(input);
        self.stages.pop_front().unwrap_or(input)
    }
}
