use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{agent_rng, Action, Agent};
use crate::config::{AgentArgs, ConfigError};
use crate::engine::{Board, LastMove, Move, PLACEABLE};

/// Cells of the edge a slide in `dir` moved away from.
pub fn edge_cells(dir: Move) -> [usize; 4] {
    match dir {
        Move::Up => [12, 13, 14, 15],
        Move::Right => [0, 4, 8, 12],
        Move::Down => [0, 1, 2, 3],
        Move::Left => [3, 7, 11, 15],
    }
}

/// Places the next tile after every player move.
///
/// Tile codes come from a bag of `{1, 2, 3}` drawn without replacement and
/// refilled when empty. A fresh board accepts the tile on any empty cell;
/// otherwise it goes on a random empty cell of the edge the last slide moved
/// away from.
pub struct RandomEnvironment {
    args: AgentArgs,
    rng: StdRng,
    bag: [u8; 3],
    drawn: usize,
    cells: [usize; 16],
}

impl RandomEnvironment {
    pub fn from_args(args: &str) -> Result<Self, ConfigError> {
        let args = AgentArgs::parse("name=random role=environment", args);
        let rng = agent_rng(&args)?;
        Ok(Self {
            args,
            rng,
            bag: PLACEABLE,
            drawn: PLACEABLE.len(),
            cells: std::array::from_fn(|i| i),
        })
    }

    /// Next code from the bag, refilling it first when empty.
    pub fn next_tile(&mut self) -> u8 {
        if self.drawn == self.bag.len() {
            self.bag.shuffle(&mut self.rng);
            self.drawn = 0;
        }
        let code = self.bag[self.drawn];
        self.drawn += 1;
        code
    }
}

impl Agent for RandomEnvironment {
    fn on_episode_start(&mut self) {
        self.drawn = self.bag.len();
    }

    fn select_action(&mut self, after: &Board) -> Action {
        let code = self.next_tile();
        let pos = match after.last_move() {
            LastMove::Initial => {
                self.cells.shuffle(&mut self.rng);
                self.cells.iter().copied().find(|&pos| after.cell(pos) == 0)
            }
            LastMove::Slid(dir) => {
                let mut edge = edge_cells(dir);
                edge.shuffle(&mut self.rng);
                edge.into_iter().find(|&pos| after.cell(pos) == 0)
            }
            LastMove::Illegal => None,
        };
        match pos {
            Some(pos) => Action::Place { pos, code },
            None => Action::None,
        }
    }

    fn args(&self) -> &AgentArgs { &self.args }
}
