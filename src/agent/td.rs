//! TD(0) afterstate learner over an n-tuple network.
//!
//! Each turn the agent scores every legal slide by its merge reward plus the
//! network value of the resulting afterstate and plays the best one, keeping
//! the afterstate and reward in the episode trajectory. When the episode
//! ends the trajectory is replayed from the last step to the first:
//!
//! - last step: `target = 0`
//! - step `i`: `target = reward[i] + lambda * V(after[i + 1])`
//! - `delta = alpha * (target - V(after[i])) / 24`
//!
//! where `V` evaluates the canonical image of a board. Values of later steps
//! are read after they have been updated.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::{agent_rng, Action, Agent, AgentError};
use crate::config::AgentArgs;
use crate::engine::{Board, Move, Reward};
use crate::network::{canonicalize, NTupleNetwork, WeightError};

const DEFAULT_ALPHA: f32 = 0.1;
const DEFAULT_LAMBDA: f32 = 1.0;

/// Divisor applied to every weight step.
const STEP_SCALE: f32 = 24.0;

/// One played move: the afterstate and its merge reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub after: Board,
    pub reward: Reward,
}

/// Summary of one backward pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateStats {
    pub steps: usize,
    pub mean_abs_error: f32,
}

pub struct TdAgent {
    args: AgentArgs,
    alpha: f32,
    lambda: f32,
    net: NTupleNetwork,
    trajectory: Vec<Step>,
    rng: StdRng,
    learning: bool,
}

impl TdAgent {
    /// Build from an argument string.
    ///
    /// Recognized keys: `alpha` (0.1), `leda` (1), `seed`, `load` (weight
    /// file to start from, fresh zero tables otherwise) and `save` (see
    /// [`TdAgent::save_weights`]).
    pub fn from_args(args: &str) -> Result<Self, AgentError> {
        let parsed = AgentArgs::parse("", args);
        let net = match parsed.property("load") {
            Some(path) => NTupleNetwork::load(path)?,
            None => NTupleNetwork::new(),
        };
        Self::with_network(args, net)
    }

    /// Build around an existing network; `load` is ignored.
    pub fn with_network(args: &str, net: NTupleNetwork) -> Result<Self, AgentError> {
        let args = AgentArgs::parse("name=td role=player", args);
        let alpha = args.get_or("alpha", DEFAULT_ALPHA)?;
        let lambda = args.get_or("leda", DEFAULT_LAMBDA)?;
        let rng = agent_rng(&args)?;
        Ok(Self {
            args,
            alpha,
            lambda,
            net,
            trajectory: Vec::with_capacity(1024),
            rng,
            learning: true,
        })
    }

    #[inline]
    pub fn alpha(&self) -> f32 { self.alpha }

    #[inline]
    pub fn lambda(&self) -> f32 { self.lambda }

    pub fn network(&self) -> &NTupleNetwork { &self.net }

    pub fn trajectory(&self) -> &[Step] { &self.trajectory }

    /// Whether [`Agent::on_episode_end`] learns or only discards the episode.
    pub fn set_learning(&mut self, learning: bool) { self.learning = learning; }

    /// Greedy one-ply choice; exact ties are broken uniformly at random.
    ///
    /// Records the chosen afterstate and reward. Returns [`Action::None`]
    /// when no slide is legal.
    pub fn take_action(&mut self, board: &Board) -> Action {
        let mut best: Vec<(Move, Step)> = Vec::with_capacity(4);
        let mut best_value = f32::NEG_INFINITY;
        for dir in Move::ALL {
            let Some((after, reward)) = board.after(dir) else { continue };
            let value = reward as f32 + self.net.value(&after);
            if best.is_empty() || value > best_value {
                best_value = value;
                best.clear();
                best.push((dir, Step { after, reward }));
            } else if value == best_value {
                best.push((dir, Step { after, reward }));
            }
        }
        match best.choose(&mut self.rng) {
            Some(&(dir, step)) => {
                self.trajectory.push(step);
                Action::Slide(dir)
            }
            None => Action::None,
        }
    }

    /// Backward pass over the trajectory, then clear it.
    pub fn update(&mut self) -> UpdateStats {
        let steps = &self.trajectory;
        let net = &mut self.net;
        let mut abs_error = 0.0f32;
        for i in (0..steps.len()).rev() {
            let target = match steps.get(i + 1) {
                Some(next) => steps[i].reward as f32 + self.lambda * net.value(&next.after),
                None => 0.0,
            };
            let current = canonicalize(&steps[i].after);
            let error = target - net.evaluate(&current);
            net.increment(&current, self.alpha * error / STEP_SCALE);
            abs_error += error.abs();
        }
        let stats = UpdateStats {
            steps: steps.len(),
            mean_abs_error: if steps.is_empty() { 0.0 } else { abs_error / steps.len() as f32 },
        };
        self.trajectory.clear();
        stats
    }

    /// Drop the trajectory without learning.
    pub fn clear(&mut self) { self.trajectory.clear(); }

    /// Write the network to the `save=` path, if one was given.
    pub fn save_weights(&self) -> Result<Option<PathBuf>, WeightError> {
        match self.args.property("save") {
            Some(path) => {
                self.net.save(path)?;
                Ok(Some(PathBuf::from(path)))
            }
            None => Ok(None),
        }
    }
}

impl Agent for TdAgent {
    fn on_episode_start(&mut self) { self.clear(); }

    fn select_action(&mut self, board: &Board) -> Action { self.take_action(board) }

    fn on_episode_end(&mut self) {
        if self.learning {
            let stats = self.update();
            debug!(steps = stats.steps, mean_abs_error = stats.mean_abs_error, "td update");
        } else {
            self.clear();
        }
    }

    fn args(&self) -> &AgentArgs { &self.args }
}
