//! Pairwise exchange and collectives for a group of workers

use super::{Message, Payload, Tag, Transport};
use crate::error::{Result, SimulatorError};
use num_complex::Complex64;
use std::sync::Arc;
use tracing::debug;

/// A group of workers sharing one transport
///
/// Members are addressed by their rank inside the group; the group maps
/// them to global transport ranks. Every collective must be entered by all
/// members in the same order. Sums are accumulated in member order on every
/// worker, so all members obtain bit-identical results.
#[derive(Clone)]
pub struct Communicator {
    transport: Arc<dyn Transport>,
    members: Vec<usize>,
    rank: usize,
}

impl Communicator {
    /// Group of the given global ranks; the calling worker must be one of them
    pub fn new(transport: Arc<dyn Transport>, members: Vec<usize>) -> Result<Self> {
        let me = transport.rank();
        let rank = members.iter().position(|&m| m == me).ok_or_else(|| {
            SimulatorError::InvalidConfig(format!("worker {me} is not a member of {members:?}"))
        })?;
        if let Some(&bad) = members.iter().find(|&&m| m >= transport.size()) {
            return Err(SimulatorError::InvalidConfig(format!(
                "group member {bad} outside a pool of {}",
                transport.size()
            )));
        }
        Ok(Self {
            transport,
            members,
            rank,
        })
    }

    /// Group of every worker of the transport
    pub fn world(transport: Arc<dyn Transport>) -> Self {
        let members = (0..transport.size()).collect();
        let rank = transport.rank();
        Self {
            transport,
            members,
            rank,
        }
    }

    /// Rank inside the group
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Rank inside the transport
    pub fn global_rank(&self) -> usize {
        self.members[self.rank]
    }

    fn send(&self, member: usize, tag: Tag, payload: Payload) -> Result<()> {
        self.transport
            .send(self.members[member], Message::new(tag, payload))
    }

    fn recv(&self, member: usize, tag: Tag) -> Result<Payload> {
        let peer = self.members[member];
        let message = self.transport.recv(peer)?;
        if message.tag != tag {
            return Err(SimulatorError::TagMismatch {
                peer,
                expected: tag.name(),
                actual: message.tag.name(),
            });
        }
        Ok(message.payload)
    }

    fn recv_reals(&self, member: usize, tag: Tag, expected: usize) -> Result<Vec<f64>> {
        let peer = self.members[member];
        match self.recv(member, tag)? {
            Payload::Reals(values) => check_len(peer, expected, values),
            other => Err(wrong_payload(peer, "reals", &other)),
        }
    }

    fn recv_words(&self, member: usize, tag: Tag, expected: usize) -> Result<Vec<u64>> {
        let peer = self.members[member];
        match self.recv(member, tag)? {
            Payload::Words(values) => check_len(peer, expected, values),
            other => Err(wrong_payload(peer, "words", &other)),
        }
    }

    fn send_amplitudes(
        &self,
        member: usize,
        tag: Tag,
        data: &[Complex64],
        max_chunk: usize,
    ) -> Result<()> {
        if data.is_empty() {
            return self.send(member, tag, Payload::Amplitudes(Vec::new()));
        }
        for chunk in data.chunks(max_chunk.max(1)) {
            self.send(member, tag, Payload::Amplitudes(chunk.to_vec()))?;
        }
        Ok(())
    }

    fn recv_amplitudes(&self, member: usize, tag: Tag, expected: usize) -> Result<Vec<Complex64>> {
        let peer = self.members[member];
        let mut out = Vec::with_capacity(expected);
        loop {
            let chunk = match self.recv(member, tag)? {
                Payload::Amplitudes(chunk) => chunk,
                other => return Err(wrong_payload(peer, "amplitudes", &other)),
            };
            let received = out.len() + chunk.len();
            if received > expected || (chunk.is_empty() && expected > 0) {
                return Err(SimulatorError::LengthMismatch {
                    peer,
                    expected,
                    actual: received,
                });
            }
            out.extend(chunk);
            if out.len() == expected {
                return Ok(out);
            }
        }
    }

    /// Send `data` to `partner` and receive a slice of the same length back
    ///
    /// Transfers larger than `max_chunk` amplitudes are split into several
    /// messages. All chunks are sent before any is received, which cannot
    /// block on unbounded channels.
    pub fn exchange_amplitudes(
        &self,
        partner: usize,
        data: &[Complex64],
        max_chunk: usize,
    ) -> Result<Vec<Complex64>> {
        if partner == self.rank {
            return Ok(data.to_vec());
        }
        debug!(
            "worker {} exchanging {} amplitudes with worker {}",
            self.global_rank(),
            data.len(),
            self.members[partner]
        );
        self.send_amplitudes(partner, Tag::Exchange, data, max_chunk)?;
        self.recv_amplitudes(partner, Tag::Exchange, data.len())
    }

    /// Elementwise sum of `values` over all members
    pub fn all_reduce_sum(&self, values: &[f64]) -> Result<Vec<f64>> {
        if self.size() == 1 {
            return Ok(values.to_vec());
        }
        for member in (0..self.size()).filter(|&m| m != self.rank) {
            self.send(member, Tag::Reduce, Payload::Reals(values.to_vec()))?;
        }
        let mut total = vec![0.0; values.len()];
        for member in 0..self.size() {
            let contribution = if member == self.rank {
                values.to_vec()
            } else {
                self.recv_reals(member, Tag::Reduce, values.len())?
            };
            for (t, v) in total.iter_mut().zip(contribution) {
                *t += v;
            }
        }
        Ok(total)
    }

    /// Every member's `values`, indexed by member rank
    pub fn all_gather_words(&self, values: &[u64]) -> Result<Vec<Vec<u64>>> {
        for member in (0..self.size()).filter(|&m| m != self.rank) {
            self.send(member, Tag::Gather, Payload::Words(values.to_vec()))?;
        }
        (0..self.size())
            .map(|member| {
                if member == self.rank {
                    Ok(values.to_vec())
                } else {
                    self.recv_words(member, Tag::Gather, values.len())
                }
            })
            .collect()
    }

    /// Every member's slice, indexed by member rank; all slices have the same length
    pub fn all_gather_amplitudes(
        &self,
        data: &[Complex64],
        max_chunk: usize,
    ) -> Result<Vec<Vec<Complex64>>> {
        for member in (0..self.size()).filter(|&m| m != self.rank) {
            self.send_amplitudes(member, Tag::Gather, data, max_chunk)?;
        }
        (0..self.size())
            .map(|member| {
                if member == self.rank {
                    Ok(data.to_vec())
                } else {
                    self.recv_amplitudes(member, Tag::Gather, data.len())
                }
            })
            .collect()
    }

    /// Value of member `root`, delivered to every member
    pub fn broadcast_word(&self, root: usize, value: u64) -> Result<u64> {
        if root >= self.size() {
            return Err(SimulatorError::Precondition(format!(
                "broadcast root {root} outside a group of {}",
                self.size()
            )));
        }
        if self.rank == root {
            for member in (0..self.size()).filter(|&m| m != root) {
                self.send(member, Tag::Broadcast, Payload::Words(vec![value]))?;
            }
            Ok(value)
        } else {
            Ok(self.recv_words(root, Tag::Broadcast, 1)?[0])
        }
    }

    /// Wait until every member has arrived
    pub fn barrier(&self) -> Result<()> {
        self.all_reduce_sum(&[]).map(|_| ())
    }
}

fn check_len<T>(peer: usize, expected: usize, values: Vec<T>) -> Result<Vec<T>> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(SimulatorError::LengthMismatch {
            peer,
            expected,
            actual: values.len(),
        })
    }
}

fn wrong_payload(peer: usize, expected: &'static str, actual: &Payload) -> SimulatorError {
    SimulatorError::TagMismatch {
        peer,
        expected,
        actual: actual.kind(),
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("members", &self.members)
            .finish()
    }
}
