//! Block summaries over finished episodes.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::episode::EpisodeRecord;

/// Summary of one block of episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    /// Episodes seen so far, including this block.
    pub total: usize,
    pub episodes: usize,
    pub mean_reward: f64,
    pub max_reward: i64,
    pub mean_moves: f64,
    pub moves_per_sec: f64,
    /// `(tile, share)`: fraction of episodes whose highest tile reached at
    /// least `tile`, ascending by tile.
    pub tiles: Vec<(u32, f64)>,
}

impl fmt::Display for BlockSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\tavg = {:.1}, max = {}, moves = {:.1}, ops = {:.0}",
            self.total, self.mean_reward, self.max_reward, self.mean_moves, self.moves_per_sec
        )
    }
}

/// Accumulates episodes and summarizes every `block` of them.
pub struct Statistics {
    block: usize,
    total: usize,
    records: Vec<EpisodeRecord>,
}

impl Statistics {
    /// `block` is clamped to at least 1.
    pub fn new(block: usize) -> Self {
        let block = block.max(1);
        Self { block, total: 0, records: Vec::with_capacity(block) }
    }

    #[inline]
    pub fn total(&self) -> usize { self.total }

    /// Record an episode; returns and logs the summary when a block completes.
    pub fn push(&mut self, record: EpisodeRecord) -> Option<BlockSummary> {
        self.total += 1;
        self.records.push(record);
        if self.records.len() < self.block {
            return None;
        }
        let summary = self.summarize();
        self.records.clear();
        log_summary(&summary);
        Some(summary)
    }

    /// Summary of the episodes of the current, possibly partial, block.
    pub fn summarize(&self) -> BlockSummary {
        let n = self.records.len();
        let denom = n.max(1) as f64;
        let reward: i64 = self.records.iter().map(|r| r.reward).sum();
        let moves: usize = self.records.iter().map(|r| r.moves).sum();
        let elapsed: Duration = self.records.iter().map(|r| r.elapsed).sum();

        let mut highest: Vec<u32> = self.records.iter().map(|r| r.board.highest_tile()).collect();
        highest.sort_unstable();
        let mut tiles = Vec::new();
        for (i, &tile) in highest.iter().enumerate() {
            if i == 0 || highest[i - 1] != tile {
                tiles.push((tile, (n - i) as f64 / denom));
            }
        }

        BlockSummary {
            total: self.total,
            episodes: n,
            mean_reward: reward as f64 / denom,
            max_reward: self.records.iter().map(|r| r.reward).max().unwrap_or(0),
            mean_moves: moves as f64 / denom,
            moves_per_sec: moves as f64 / elapsed.as_secs_f64().max(1e-9),
            tiles,
        }
    }
}

fn log_summary(summary: &BlockSummary) {
    info!("{summary}");
    for &(tile, share) in &summary.tiles {
        info!("\t{tile}\t{:.1}%", share * 100.0);
    }
}
