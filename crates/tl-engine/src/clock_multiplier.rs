//! Clock rate translation between the master clock and output sinks.

/// Converts master-clock ticks into ticks at an output's own resolution.
///
/// An integer rate divider: the accumulator carries the fractional
/// remainder between calls so the long-run rate is exact for any ratio
/// (480 PPQN driving a 24 PPQN device emits one tick every 20 calls).
#[derive(Clone, Debug)]
pub struct ClockMultiplier {
    output_rate: u32,
    input_rate: u32,
    acc: u64,
}

impl ClockMultiplier {
    /// Create a translator from `input_rate` master ticks per beat to
    /// `output_rate` output ticks per beat.
    pub fn new(output_rate: u32, input_rate: u32) -> Self {
        Self {
            output_rate,
            input_rate: input_rate.max(1),
            acc: 0,
        }
    }

    /// Number of output ticks due for one master tick.
    pub fn next_ticks(&mut self) -> u32 {
        self.acc += self.output_rate as u64;
        let ticks = self.acc / self.input_rate as u64;
        self.acc -= ticks * self.input_rate as u64;
        ticks as u32
    }

    /// Change the master resolution, keeping the fractional progress
    /// towards the next output tick.
    pub fn set_input_rate(&mut self, input_rate: u32) {
        let input_rate = input_rate.max(1);
        if input_rate == self.input_rate {
            return;
        }
        self.acc = self.acc * input_rate as u64 / self.input_rate as u64;
        self.input_rate = input_rate;
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }
}
