use crate::{GameLogic, HeadlessRunner};

/// Commands an external driver (test harness, HTTP shell, scripted agent) can send to a
/// headless session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand<I> {
    Step(I),
    Reset,
    GetState,
    GetHistory,
    Rewind { frames: usize },
    Forward { frames: usize },
    Seek { frame: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentResponse<S> {
    State { frame: usize, state: S },
    History { frame: usize, history: Vec<S> },
}

pub struct AgentHost<G>
where
    G: GameLogic + Clone,
{
    game: G,
    runner: HeadlessRunner<G>,
    history_limit: Option<usize>,
}

impl<G> AgentHost<G>
where
    G: GameLogic + Clone,
    G::State: Clone,
{
    pub fn new(game: G) -> Self {
        let runner = HeadlessRunner::new(game.clone());
        Self {
            game,
            runner,
            history_limit: None,
        }
    }

    /// A host whose timeline keeps at most `max_len` states, for long-running shells.
    pub fn with_history_limit(game: G, max_len: usize) -> Self {
        let runner = HeadlessRunner::with_history_limit(game.clone(), max_len);
        Self {
            game,
            runner,
            history_limit: Some(max_len),
        }
    }

    pub fn handle(&mut self, command: AgentCommand<G::Input>) -> AgentResponse<G::State> {
        match command {
            AgentCommand::Step(input) => {
                let frame = self.runner.step(input);
                self.state_response(frame)
            }
            AgentCommand::Reset => {
                self.runner = match self.history_limit {
                    Some(max_len) => HeadlessRunner::with_history_limit(self.game.clone(), max_len),
                    None => HeadlessRunner::new(self.game.clone()),
                };
                self.state_response(self.runner.frame())
            }
            AgentCommand::GetState => self.state_response(self.runner.frame()),
            AgentCommand::GetHistory => AgentResponse::History {
                frame: self.runner.frame(),
                history: self.runner.history().to_vec(),
            },
            AgentCommand::Rewind { frames } => {
                let frame = self.runner.rewind(frames);
                self.state_response(frame)
            }
            AgentCommand::Forward { frames } => {
                let frame = self.runner.forward(frames);
                self.state_response(frame)
            }
            AgentCommand::Seek { frame } => {
                let frame = self.runner.seek(frame);
                self.state_response(frame)
            }
        }
    }

    pub fn runner(&self) -> &HeadlessRunner<G> {
        &self.runner
    }

    fn state_response(&self, frame: usize) -> AgentResponse<G::State> {
        AgentResponse::State {
            frame,
            state: self.runner.state().clone(),
        }
    }
}
