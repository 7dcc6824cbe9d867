//! Audio-rate domain.
//!
//! Architecture:
//! - Dispatcher writes [`ParamUpdate`]s into a lock-free queue
//! - [`EffectChain::process`] drains it at the start of each block
//! - Enabled effects run in canonical order, then master volume
//!
//! Nothing here blocks, allocates or takes a lock.

pub mod chain;

pub use chain::{Effect, EffectChain, BLOCK_SIZE};

use heapless::mpmc::MpMcQueue;

use crate::fx::ParamUpdate;

/// Parameter hand-off from the control plane (power of two, at most 128).
pub const PARAM_QUEUE_DEPTH: usize = 64;

/// Control plane to audio domain.
pub type ParamQueue = MpMcQueue<ParamUpdate, PARAM_QUEUE_DEPTH>;
