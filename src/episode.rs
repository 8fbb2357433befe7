//! One game from an empty board to the end.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::agent::{Action, Agent};
use crate::engine::{Board, ILLEGAL};

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The player had no legal slide.
    NoMove,
    /// The environment found no cell to fill.
    NoPlacement,
    /// `max_steps` player moves were played.
    StepLimit,
}

#[derive(Debug, Clone)]
pub struct EpisodeOptions {
    /// Tiles the environment places before the player's first move.
    pub init_tiles: usize,
    /// Optional cap on player moves.
    pub max_steps: Option<usize>,
}

impl Default for EpisodeOptions {
    fn default() -> Self { Self { init_tiles: 9, max_steps: None } }
}

#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    /// Board when the episode stopped.
    pub board: Board,
    /// Player moves applied.
    pub moves: usize,
    /// Sum of the merge rewards of those moves.
    pub reward: i64,
    pub elapsed: Duration,
    pub ended_by: EndReason,
}

/// Alternate `player` and `env` on a fresh board until one of them cannot act.
///
/// A rejected action never advances the board. Both agents see
/// `on_episode_start` before the first placement and `on_episode_end` after
/// the last action, which is where a learning player updates.
pub fn play_episode<P, E>(player: &mut P, env: &mut E, opts: &EpisodeOptions) -> EpisodeRecord
where
    P: Agent + ?Sized,
    E: Agent + ?Sized,
{
    let start = Instant::now();
    player.on_episode_start();
    env.on_episode_start();

    let mut board = Board::EMPTY;
    let mut moves = 0usize;
    let mut reward = 0i64;
    let mut ended_by = None;

    for _ in 0..opts.init_tiles {
        let place = env.select_action(&board);
        if !try_apply(&mut board, place) {
            ended_by = Some(EndReason::NoPlacement);
            break;
        }
    }

    let ended_by = loop {
        if let Some(reason) = ended_by {
            break reason;
        }
        if opts.max_steps.is_some_and(|limit| moves >= limit) {
            break EndReason::StepLimit;
        }
        let mut next = board;
        let gained = player.select_action(&board).apply(&mut next);
        if gained == ILLEGAL {
            break EndReason::NoMove;
        }
        board = next;
        moves += 1;
        reward += i64::from(gained);
        let place = env.select_action(&board);
        if !try_apply(&mut board, place) {
            ended_by = Some(EndReason::NoPlacement);
        }
    };

    player.on_episode_end();
    env.on_episode_end();

    let record = EpisodeRecord { board, moves, reward, elapsed: start.elapsed(), ended_by };
    debug!(
        moves = record.moves,
        reward = record.reward,
        highest = record.board.highest_tile(),
        ended_by = ?record.ended_by,
        "episode finished"
    );
    record
}

fn try_apply(board: &mut Board, action: Action) -> bool {
    let mut next = *board;
    if action.apply(&mut next) == ILLEGAL {
        return false;
    }
    *board = next;
    true
}
