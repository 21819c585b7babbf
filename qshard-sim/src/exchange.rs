//! Gate execution when an operand sits on a worker bit
//!
//! A gate on a worker bit pairs amplitudes held by different workers. Each
//! protocol here fetches exactly the partner data it needs, then lets every
//! worker compute its own rows independently.

use crate::config::LayoutPolicy;
use crate::error::Result;
use crate::register::Register;
use num_complex::Complex64;
use qshard_core::{Matrix2, Matrix4};
use qshard_state::kernels;
use tracing::debug;

impl Register {
    /// Full-slice exchange with the partner across `position`, then keep row `c`
    pub(crate) fn apply_1q_on_worker_bit(&mut self, position: usize, matrix: &Matrix2) -> Result<()> {
        let partner = self.partner(position);
        let bit = self.worker_bit(position);
        let theirs = self
            .comm
            .exchange_amplitudes(partner, self.store.amplitudes(), self.max_chunk())?;
        let threshold = self.threshold();
        kernels::apply_single_qubit_with_partner(
            self.store.amplitudes_mut(),
            &theirs,
            matrix,
            bit,
            threshold,
        );
        Ok(())
    }

    /// One operand local, the other a worker bit
    pub(crate) fn apply_2q_one_worker_bit(
        &mut self,
        first: usize,
        second: usize,
        matrix: &Matrix4,
    ) -> Result<()> {
        let worker_is_first = !self.is_local(first);
        let (worker, local) = if worker_is_first {
            (first, second)
        } else {
            (second, first)
        };
        let partner = self.partner(worker);
        let bit = self.worker_bit(worker);
        let theirs = self
            .comm
            .exchange_amplitudes(partner, self.store.amplitudes(), self.max_chunk())?;
        let threshold = self.threshold();
        kernels::apply_two_qubit_with_partner(
            self.store.amplitudes_mut(),
            &theirs,
            matrix,
            local,
            worker_is_first,
            bit,
            threshold,
        );
        Ok(())
    }

    /// Both operands are worker bits
    pub(crate) fn apply_2q_two_worker_bits(
        &mut self,
        first: usize,
        second: usize,
        matrix: &Matrix4,
    ) -> Result<()> {
        if self.config.layout_policy == LayoutPolicy::Relocate && self.local_qubits > 0 {
            // the higher operand moves to the top local position
            let target = self.local_qubits - 1;
            let (first, second) = if first > second {
                self.relocate_position(first, target)?;
                (target, second)
            } else {
                self.relocate_position(second, target)?;
                (first, target)
            };
            self.apply_2q_one_worker_bit(first, second, matrix)
        } else {
            self.apply_2q_gathered(first, second, matrix)
        }
    }

    /// Two-stage hypercube gather of the four slices that share this
    /// worker's other bits, then one matrix row per worker
    fn apply_2q_gathered(&mut self, first: usize, second: usize, matrix: &Matrix4) -> Result<()> {
        let (low, high) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        let low_bit = self.worker_bit(low);
        let high_bit = self.worker_bit(high);
        debug!(
            "worker {} gathering slices across worker bits {} and {}",
            self.global_rank(),
            low - self.local_qubits,
            high - self.local_qubits
        );

        // Stage 1: held[b] is the slice whose low bit is b
        let mine = self.store.amplitudes().to_vec();
        let across_low =
            self.comm
                .exchange_amplitudes(self.partner(low), &mine, self.max_chunk())?;
        let held = if low_bit == 0 {
            [mine, across_low]
        } else {
            [across_low, mine]
        };

        // Stage 2: forward both held slices across the high bit
        let len = self.store.len();
        let outgoing: Vec<Complex64> = held.concat();
        let across_high =
            self.comm
                .exchange_amplitudes(self.partner(high), &outgoing, self.max_chunk())?;
        let (other0, other1) = across_high.split_at(len);

        // sources[2·(high bit differs from ours) + low bit]
        let sources: [&[Complex64]; 4] = [&held[0], &held[1], other0, other1];
        let first_is_high = first == high;
        let slices: [&[Complex64]; 4] = std::array::from_fn(|k| {
            let (bf, bs) = (k >> 1, k & 1);
            let (h, l) = if first_is_high { (bf, bs) } else { (bs, bf) };
            sources[2 * usize::from(h != high_bit) + l]
        });
        let row = 2 * self.worker_bit(first) + self.worker_bit(second);
        let updated = kernels::apply_two_qubit_gathered(slices, &matrix[row], self.threshold());
        self.store.replace(updated)?;
        Ok(())
    }

    /// Exchange the contents of data positions `a` and `b`
    ///
    /// SWAP without arithmetic. The permutation is not touched; callers that
    /// relocate update it themselves.
    pub(crate) fn move_positions(&mut self, a: usize, b: usize) -> Result<()> {
        if a == b {
            return Ok(());
        }
        let threshold = self.threshold();
        match (self.is_local(a), self.is_local(b)) {
            (true, true) => {
                kernels::swap_positions(self.store.amplitudes_mut(), a, b, threshold);
            }
            (true, false) | (false, true) => {
                let (local, worker) = if self.is_local(a) { (a, b) } else { (b, a) };
                let bit = self.worker_bit(worker);
                // the half whose local bit disagrees with our worker bit moves
                let outgoing = kernels::copy_half(self.store.amplitudes(), local, 1 - bit);
                let incoming =
                    self.comm
                        .exchange_amplitudes(self.partner(worker), &outgoing, self.max_chunk())?;
                kernels::write_half(self.store.amplitudes_mut(), local, 1 - bit, &incoming);
            }
            (false, false) => {
                if self.worker_bit(a) != self.worker_bit(b) {
                    let mask = (1 << (a - self.local_qubits)) | (1 << (b - self.local_qubits));
                    let partner = self.comm.rank() ^ mask;
                    let theirs = self.comm.exchange_amplitudes(
                        partner,
                        self.store.amplitudes(),
                        self.max_chunk(),
                    )?;
                    self.store.replace(theirs)?;
                }
            }
        }
        Ok(())
    }
}
