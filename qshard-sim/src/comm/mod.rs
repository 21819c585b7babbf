//! Message passing between workers
//!
//! The engine only needs ordered point-to-point delivery between every pair
//! of workers. [`Transport`] is that contract; [`mesh`] builds an in-process
//! implementation where each worker is a thread and each ordered pair of
//! workers owns one unbounded FIFO channel. [`Communicator`] layers pairwise
//! exchange and deterministic collectives on top for a group of workers.

pub mod communicator;
pub mod mesh;

pub use communicator::Communicator;
pub use mesh::{mesh, MeshEndpoint};

use crate::error::Result;
use num_complex::Complex64;

/// Purpose of a message, checked on receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Amplitudes for a pairwise exchange
    Exchange,
    /// Contribution to an all-reduce
    Reduce,
    /// Contribution to an all-gather
    Gather,
    /// Value sent by a broadcast root
    Broadcast,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Exchange => "exchange",
            Tag::Reduce => "reduce",
            Tag::Gather => "gather",
            Tag::Broadcast => "broadcast",
        }
    }
}

/// Message body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Amplitudes(Vec<Complex64>),
    Reals(Vec<f64>),
    Words(Vec<u64>),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Amplitudes(_) => "amplitudes",
            Payload::Reals(_) => "reals",
            Payload::Words(_) => "words",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Amplitudes(v) => v.len(),
            Payload::Reals(v) => v.len(),
            Payload::Words(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub tag: Tag,
    pub payload: Payload,
}

impl Message {
    pub fn new(tag: Tag, payload: Payload) -> Self {
        Self { tag, payload }
    }
}

/// Ordered point-to-point delivery between the workers of a pool
///
/// Ranks are global (pool-wide). Messages between one ordered pair arrive in
/// the order they were sent. `recv` blocks until a message from `src`
/// arrives and fails with [`crate::SimulatorError::Disconnected`] once `src`
/// has gone away.
pub trait Transport: Send + Sync {
    /// Global rank of this worker
    fn rank(&self) -> usize;

    /// Number of workers in the pool
    fn size(&self) -> usize;

    fn send(&self, dest: usize, message: Message) -> Result<()>;

    fn recv(&self, src: usize) -> Result<Message>;
}
