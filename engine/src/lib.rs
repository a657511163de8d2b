pub mod agent;
pub mod editor;
pub mod profiling;
pub mod regression;

use std::{
    fs, io,
    path::Path,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeMachine<State> {
    states: Vec<State>,
    /// Cursor, as an index into `states`.
    frame: usize,
    /// Absolute frame number of `states[0]`; non-zero once the oldest frames were dropped.
    #[serde(default)]
    first_frame: usize,
    #[serde(default)]
    max_len: Option<usize>,
}

impl<State> TimeMachine<State> {
    pub fn new(initial_state: State) -> Self {
        Self {
            states: vec![initial_state],
            frame: 0,
            first_frame: 0,
            max_len: None,
        }
    }

    /// Keeps at most `max_len` states, dropping the oldest as new ones are recorded.
    /// Frame numbers stay absolute.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len.max(1));
        self.enforce_max_len();
        self
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn frame(&self) -> usize {
        self.first_frame + self.frame
    }

    /// Oldest frame still held.
    pub fn first_frame(&self) -> usize {
        self.first_frame
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self) -> &State {
        &self.states[self.frame]
    }

    pub fn state_at(&self, frame: usize) -> Option<&State> {
        frame
            .checked_sub(self.first_frame)
            .and_then(|index| self.states.get(index))
    }

    pub fn history(&self) -> &[State] {
        &self.states
    }

    pub fn can_rewind(&self) -> bool {
        self.frame > 0
    }

    pub fn can_forward(&self) -> bool {
        self.frame + 1 < self.states.len()
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames);
        self.frame()
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let max_index = self.states.len().saturating_sub(1);
        self.frame = self.frame.saturating_add(frames).min(max_index);
        self.frame()
    }

    /// Moves the cursor to `frame`, clamped to the held history.
    pub fn seek(&mut self, frame: usize) -> usize {
        let index = frame.saturating_sub(self.first_frame);
        self.frame = index.min(self.states.len().saturating_sub(1));
        self.frame()
    }

    /// Records a new state after the cursor. Any "future" frames past the cursor are dropped,
    /// so recording after a rewind branches the timeline.
    pub fn record(&mut self, state: State) -> usize {
        if self.frame + 1 < self.states.len() {
            self.states.truncate(self.frame + 1);
        }
        self.states.push(state);
        self.frame += 1;
        self.enforce_max_len();
        self.frame()
    }

    fn enforce_max_len(&mut self) {
        let Some(max_len) = self.max_len else {
            return;
        };
        let excess = self.states.len().saturating_sub(max_len);
        if excess > 0 {
            self.states.drain(..excess);
            self.frame = self.frame.saturating_sub(excess);
            self.first_frame += excess;
        }
    }
}

impl<State: Serialize> TimeMachine<State> {
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }
}

impl<State: DeserializeOwned> TimeMachine<State> {
    pub fn load_json_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mut tm: Self = serde_json::from_slice(&bytes).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed parsing timemachine json {}: {e}", path.display()),
            )
        })?;
        if tm.states.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("timemachine json {} has no states", path.display()),
            ));
        }
        tm.frame = tm.frame.min(tm.states.len() - 1);
        Ok(tm)
    }
}

pub trait GameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;
    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State;
}

#[derive(Debug)]
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    timemachine: TimeMachine<G::State>,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::new(initial_state),
        }
    }

    /// Like `new`, but the timeline holds at most `max_len` states.
    pub fn with_history_limit(game: G, max_len: usize) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::new(initial_state).with_max_len(max_len),
        }
    }

    /// Resumes from a previously recorded timeline (e.g. one loaded from disk).
    pub fn from_timemachine(game: G, timemachine: TimeMachine<G::State>) -> Self {
        Self { game, timemachine }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn history(&self) -> &[G::State] {
        self.timemachine.history()
    }

    pub fn timemachine(&self) -> &TimeMachine<G::State> {
        &self.timemachine
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        let next_state = self.game.step(self.timemachine.state(), input);
        self.timemachine.record(next_state)
    }

    pub fn step_profiled<P: profiling::Profiler>(&mut self, input: G::Input, profiler: &mut P) -> usize {
        use std::time::Instant;

        let total_start = Instant::now();

        let step_start = Instant::now();
        let next_state = self.game.step(self.timemachine.state(), input);
        let step_dt = step_start.elapsed();

        let record_start = Instant::now();
        let frame = self.timemachine.record(next_state);
        let record_dt = record_start.elapsed();

        profiler.on_step(
            frame,
            profiling::StepTimings {
                step: step_dt,
                record: record_dt,
                total: total_start.elapsed(),
            },
        );

        frame
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last_frame = self.frame();
        for input in inputs {
            last_frame = self.step(input);
        }
        last_frame
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.timemachine.rewind(frames)
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.timemachine.forward(frames)
    }

    pub fn seek(&mut self, frame: usize) -> usize {
        self.timemachine.seek(frame)
    }
}
