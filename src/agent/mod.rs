//! Agents that act on a [`Board`].
//!
//! Every participant of an episode, player or environment, implements
//! [`Agent`]. The players the binary can instantiate form the closed set
//! [`Player`].

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AgentArgs, ConfigError};
use crate::engine::{Board, Move, Reward, ILLEGAL};
use crate::network::WeightError;

mod environment;
mod random;
mod td;

pub use environment::{edge_cells, RandomEnvironment};
pub use random::RandomPlayer;
pub use td::{Step, TdAgent, UpdateStats};

/// An agent's decision for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do; ends the episode.
    None,
    Slide(Move),
    Place { pos: usize, code: u8 },
}

impl Action {
    /// Apply to `board`, returning the engine's reward ([`ILLEGAL`] for `None`).
    pub fn apply(&self, board: &mut Board) -> Reward {
        match *self {
            Action::None => ILLEGAL,
            Action::Slide(dir) => board.slide(dir),
            Action::Place { pos, code } => board.place(pos, code),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool { matches!(self, Action::None) }
}

#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("bad agent arguments: {0}")]
    Config(#[from] ConfigError),
    #[error("weights: {0}")]
    Weights(#[from] WeightError),
}

/// Capability shared by players and environments.
pub trait Agent {
    /// Called before the first turn of an episode.
    fn on_episode_start(&mut self) {}

    /// Choose this turn's action for `board`.
    fn select_action(&mut self, board: &Board) -> Action;

    /// Called once the episode is over.
    fn on_episode_end(&mut self) {}

    fn args(&self) -> &AgentArgs;

    fn name(&self) -> &str { self.args().name() }

    fn role(&self) -> &str { self.args().role() }
}

/// Players selectable from an argument string.
pub enum Player {
    Random(RandomPlayer),
    Td(TdAgent),
}

impl Player {
    /// `name=random` selects the random player; anything else the TD learner.
    pub fn from_args(args: &str) -> Result<Self, AgentError> {
        if AgentArgs::parse("", args).name() == "random" {
            Ok(Player::Random(RandomPlayer::from_args(args)?))
        } else {
            Ok(Player::Td(TdAgent::from_args(args)?))
        }
    }

    pub fn as_td(&self) -> Option<&TdAgent> {
        match self {
            Player::Td(td) => Some(td),
            Player::Random(_) => None,
        }
    }

    pub fn as_td_mut(&mut self) -> Option<&mut TdAgent> {
        match self {
            Player::Td(td) => Some(td),
            Player::Random(_) => None,
        }
    }
}

impl Agent for Player {
    fn on_episode_start(&mut self) {
        match self {
            Player::Random(p) => p.on_episode_start(),
            Player::Td(p) => p.on_episode_start(),
        }
    }

    fn select_action(&mut self, board: &Board) -> Action {
        match self {
            Player::Random(p) => p.select_action(board),
            Player::Td(p) => p.select_action(board),
        }
    }

    fn on_episode_end(&mut self) {
        match self {
            Player::Random(p) => p.on_episode_end(),
            Player::Td(p) => p.on_episode_end(),
        }
    }

    fn args(&self) -> &AgentArgs {
        match self {
            Player::Random(p) => p.args(),
            Player::Td(p) => p.args(),
        }
    }
}

/// One generator per agent: seeded from `seed=` when given.
pub(crate) fn agent_rng(args: &AgentArgs) -> Result<StdRng, ConfigError> {
    Ok(match args.seed()? {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    })
}
