//! Resumable evolutionary optimization for expensive fitness functions.
//!
//! Provides a generic (mu + lambda) generational loop:
//!
//! - **Evaluation dispatch**: Scores only individuals without a valid
//!   fitness, sequentially or in parallel, failing fast on the first error.
//! - **Adaptive timeouts**: Proposes a percentile of recent evaluation
//!   durations as the advisory budget for the next round.
//! - **Lineage**: Records every evaluated individual with its parents and
//!   keeps a bounded hall of fame of non-dominated solutions.
//! - **Checkpointing**: Atomically persists the complete loop state at a
//!   configurable cadence, with an independent backup and a progress log.
//!   A resumed run follows the same trajectory as an uninterrupted one.
//!
//! # Architecture
//!
//! The crate contains no domain concepts. Genomes, fitness functions and
//! variation operators are supplied by consumers through the traits in
//! [`ea`]; the loop itself only manages fitness, lineage and state.

pub mod ea;
