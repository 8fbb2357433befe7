//! threes-td: a Threes board engine + n-tuple TD learner
//!
//! This crate provides:
//! - A packed `Board` type with slides, placement and the 8 board symmetries (`engine`)
//! - An n-tuple value network with canonicalization and weight persistence (`network`)
//! - Agents: the TD(0) afterstate learner, a random player and the tile environment (`agent`)
//! - An episode driver and block statistics (`episode`, `stats`)
//! - Agent argument strings such as `"alpha=0.1 leda=1 seed=7"` (`config`)
//!
//! Quick start:
//! ```
//! use threes_td::engine::{Board, Move};
//!
//! let mut b = Board::EMPTY;
//! b.place(0, 1);
//! b.place(1, 2);
//! assert_eq!(b.slide(Move::Left), 1);
//! assert_eq!(b.cell(0), 3);
//! ```
//!
//! Learning loop (a short network keeps the doctest small; the full one has
//! 32 tables of 16^6 weights):
//! ```
//! use threes_td::agent::{RandomEnvironment, TdAgent};
//! use threes_td::episode::{play_episode, EpisodeOptions};
//! use threes_td::network::NTupleNetwork;
//!
//! let mut player = TdAgent::with_network("alpha=0.1 seed=1", NTupleNetwork::zeroed(4)).unwrap();
//! let mut env = RandomEnvironment::from_args("seed=2").unwrap();
//! let record = play_episode(&mut player, &mut env, &EpisodeOptions::default());
//! assert!(record.moves > 0);
//! assert!(player.trajectory().is_empty());
//! ```
//!
pub mod agent;
pub mod config;
pub mod engine;
pub mod episode;
pub mod network;
pub mod stats;
