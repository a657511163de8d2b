use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct StepTimings {
    pub step: Duration,
    pub record: Duration,
    pub total: Duration,
}

/// Hook for capturing how long each `HeadlessRunner` step took.
///
/// Independent of game-specific State/Input types so the same profiler can watch the CLI,
/// the HTTP shell and tests.
pub trait Profiler {
    fn on_step(&mut self, _frame: usize, _timings: StepTimings) {}
}

/// Keeps the slowest step seen so far. Handy for a one-line summary at the end of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorstStep {
    pub frame: usize,
    pub timings: StepTimings,
    pub steps: usize,
}

impl Profiler for WorstStep {
    fn on_step(&mut self, frame: usize, timings: StepTimings) {
        self.steps += 1;
        if self.steps == 1 || timings.total > self.timings.total {
            self.frame = frame;
            self.timings = timings;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_step_keeps_slowest_frame() {
        let mut worst = WorstStep::default();
        let fast = StepTimings {
            total: Duration::from_micros(5),
            ..StepTimings::default()
        };
        let slow = StepTimings {
            total: Duration::from_micros(50),
            ..StepTimings::default()
        };

        worst.on_step(1, fast);
        worst.on_step(2, slow);
        worst.on_step(3, fast);

        assert_eq!(worst.steps, 3);
        assert_eq!(worst.frame, 2);
        assert_eq!(worst.timings.total, Duration::from_micros(50));
    }
}
