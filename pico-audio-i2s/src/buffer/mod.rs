//! Buffer storage and the pools that circulate it.
//!
//! A [`BufferArena`] owns the memory. A [`Stream`](crate::Stream) claims the
//! arena and splits it between a producer and a consumer [`BufferPool`].
//! Every buffer sits on exactly one list at a time, or is held by one party:
//!
//! ```text
//!            take(free)            give            take(prepared)
//!   free ───────────────► app ─────────────► prepared ───────────► DMA
//!    ▲                                                              │
//!    └──────────────────────────── give ────────────────────────────┘
//! ```

mod arena;
mod handle;
pub(crate) mod list;
mod pool;
mod sample_buffer;

pub use arena::{BufferArena, BufferSlot};
pub use handle::AudioBuffer;
pub use pool::{BufferPool, PoolConfig, PoolRole};
pub use sample_buffer::SampleBuffer;
