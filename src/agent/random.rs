use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{agent_rng, Action, Agent};
use crate::config::{AgentArgs, ConfigError};
use crate::engine::{Board, Move};

/// Baseline player: a uniformly random legal slide.
pub struct RandomPlayer {
    args: AgentArgs,
    rng: StdRng,
    opcodes: [Move; 4],
}

impl RandomPlayer {
    pub fn from_args(args: &str) -> Result<Self, ConfigError> {
        let args = AgentArgs::parse("name=dummy role=player", args);
        let rng = agent_rng(&args)?;
        Ok(Self { args, rng, opcodes: Move::ALL })
    }
}

impl Agent for RandomPlayer {
    fn select_action(&mut self, board: &Board) -> Action {
        self.opcodes.shuffle(&mut self.rng);
        self.opcodes
            .iter()
            .copied()
            .find(|&dir| board.after(dir).is_some())
            .map_or(Action::None, Action::Slide)
    }

    fn args(&self) -> &AgentArgs { &self.args }
}
