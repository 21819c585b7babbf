//! In-process transport over crossbeam channels

use super::{Message, Transport};
use crate::error::{Result, SimulatorError};
use crossbeam_channel::{Receiver, Sender};

/// One worker's end of a fully connected channel mesh
///
/// Dropping an endpoint closes every channel into and out of that worker,
/// so peers blocked on it see a disconnect instead of hanging.
pub struct MeshEndpoint {
    rank: usize,
    outgoing: Vec<Sender<Message>>,
    incoming: Vec<Receiver<Message>>,
}

/// Build `size` connected endpoints, indexed by rank
pub fn mesh(size: usize) -> Vec<MeshEndpoint> {
    // channels[src][dst]
    let channels: Vec<Vec<(Sender<Message>, Receiver<Message>)>> = (0..size)
        .map(|_| (0..size).map(|_| crossbeam_channel::unbounded()).collect())
        .collect();

    (0..size)
        .map(|rank| MeshEndpoint {
            rank,
            outgoing: (0..size).map(|dst| channels[rank][dst].0.clone()).collect(),
            incoming: (0..size).map(|src| channels[src][rank].1.clone()).collect(),
        })
        .collect()
}

impl Transport for MeshEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outgoing.len()
    }

    fn send(&self, dest: usize, message: Message) -> Result<()> {
        self.outgoing
            .get(dest)
            .ok_or(SimulatorError::Disconnected { peer: dest })?
            .send(message)
            .map_err(|_| SimulatorError::Disconnected { peer: dest })
    }

    fn recv(&self, src: usize) -> Result<Message> {
        self.incoming
            .get(src)
            .ok_or(SimulatorError::Disconnected { peer: src })?
            .recv()
            .map_err(|_| SimulatorError::Disconnected { peer: src })
    }
}

impl std::fmt::Debug for MeshEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshEndpoint")
            .field("rank", &self.rank)
            .field("size", &self.outgoing.len())
            .finish()
    }
}
