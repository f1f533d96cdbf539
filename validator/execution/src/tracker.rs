// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Error, ExecutionState, Machine};
use log::trace;
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::Arc;

/// Replays a machine forward through a fixed set of gas offsets, producing
/// the execution state at each one.
///
/// Offsets must be queried in strictly increasing order; the machine is
/// owned exclusively by the tracker and never rewound. With snapshotting
/// enabled, a cloned machine is retained at every offset that is one of the
/// declared targets, so a later [`ExecutionTracker::machine_at`] does not
/// replay from zero. The snapshot index is append-only and bounded by the
/// number of targets.
pub struct ExecutionTracker<M> {
    machine: M,
    /// Sorted target offsets this tracker will be asked about.
    targets: Vec<BigUint>,
    /// Micro-steps executed since construction.
    steps: BigUint,
    last_offset: Option<BigUint>,
    snapshots: Option<Vec<(BigUint, Arc<M>)>>,
}

impl<M: Machine> ExecutionTracker<M> {
    pub fn new(machine: M, targets: &[BigUint], keep_snapshots: bool) -> Self {
        let mut targets = targets.to_vec();
        targets.sort();
        targets.dedup();
        let snapshots = keep_snapshots.then(|| Vec::with_capacity(targets.len()));
        Self {
            machine,
            targets,
            steps: BigUint::zero(),
            last_offset: None,
            snapshots,
        }
    }

    /// Steps the machine until its consumed gas reaches `offset` and returns
    /// the state there, together with the cumulative micro-step count.
    ///
    /// Stepping may overshoot the offset because instructions are atomic:
    /// the returned state's `total_gas_consumed` is the first value at or
    /// past `offset`. If the machine blocks short of the offset, the state
    /// reports the blocked position instead; deciding whether that makes the
    /// offset unreachable is the caller's concern.
    pub fn execution_state_at(
        &mut self,
        offset: &BigUint,
    ) -> Result<(ExecutionState, BigUint), Error> {
        if let Some(prev) = &self.last_offset {
            if offset <= prev {
                return Err(Error::NonMonotonicOffset {
                    prev: prev.clone(),
                    next: offset.clone(),
                });
            }
        }

        while self.machine.total_gas_consumed() < *offset {
            match self.machine.step_once() {
                Some(_) => self.steps += 1u32,
                None => {
                    trace!(
                        "Machine blocked at gas {} short of offset {}",
                        self.machine.total_gas_consumed(),
                        offset,
                    );
                    break;
                }
            }
        }
        self.last_offset = Some(offset.clone());

        let state = ExecutionState::from_machine(&self.machine);
        if let Some(snapshots) = &mut self.snapshots {
            if self.targets.binary_search(offset).is_ok() {
                snapshots.push((offset.clone(), Arc::new(self.machine.clone())));
            }
        }
        Ok((state, self.steps.clone()))
    }

    /// A snapshot of the machine as it stood at `offset`, which must be a
    /// target already visited by [`ExecutionTracker::execution_state_at`].
    pub fn machine_at(&self, offset: &BigUint) -> Result<Arc<M>, Error> {
        self.snapshots
            .as_ref()
            .and_then(|snapshots| {
                snapshots
                    .iter()
                    .find(|(at, _)| at == offset)
                    .map(|(_, machine)| machine.clone())
            })
            .ok_or_else(|| Error::SnapshotMissing(offset.clone()))
    }

    /// Drops snapshots at offsets below `offset`, which can no longer be
    /// requested once the game has moved past them.
    pub fn release_below(&mut self, offset: &BigUint) {
        if let Some(snapshots) = &mut self.snapshots {
            snapshots.retain(|(at, _)| at >= offset);
        }
    }

    /// Number of retained machine snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingMachine;

    fn offsets(raw: &[u64]) -> Vec<BigUint> {
        raw.iter().map(|v| BigUint::from(*v)).collect()
    }

    #[test]
    fn replay_is_deterministic_across_trackers() {
        let machine = CountingMachine::with_defaults();
        let targets = offsets(&[50, 120, 333]);
        let mut a = ExecutionTracker::new(machine.clone(), &targets, false);
        let mut b = ExecutionTracker::new(machine, &targets, false);

        for offset in &targets {
            let (state_a, steps_a) = a.execution_state_at(offset).unwrap();
            let (state_b, steps_b) = b.execution_state_at(offset).unwrap();
            assert_eq!(state_a.hash(), state_b.hash());
            assert_eq!(steps_a, steps_b);
        }
    }

    #[test]
    fn overshoot_lands_on_first_offset_at_or_past_target() {
        let machine = CountingMachine::with_defaults();
        let mut tracker = ExecutionTracker::new(machine, &offsets(&[101]), false);
        let (state, _) = tracker
            .execution_state_at(&BigUint::from(101u64))
            .unwrap();
        assert!(state.total_gas_consumed >= BigUint::from(101u64));
    }

    #[test]
    fn offsets_must_strictly_increase() {
        let machine = CountingMachine::with_defaults();
        let targets = offsets(&[100, 200]);
        let mut tracker = ExecutionTracker::new(machine, &targets, false);
        tracker.execution_state_at(&targets[1]).unwrap();
        assert!(matches!(
            tracker.execution_state_at(&targets[0]),
            Err(Error::NonMonotonicOffset { .. })
        ));
    }

    #[test]
    fn blocked_machine_stops_short() {
        // Ten steps of ten gas, then the machine halts.
        let machine = CountingMachine::new(10, 0, 0, 10);
        let mut tracker = ExecutionTracker::new(machine, &offsets(&[1_000]), false);
        let (state, steps) = tracker
            .execution_state_at(&BigUint::from(1_000u64))
            .unwrap();
        assert!(state.total_gas_consumed < BigUint::from(1_000u64));
        assert_eq!(steps, BigUint::from(10u8));
    }

    #[test]
    fn snapshots_serve_machine_queries() {
        let machine = CountingMachine::with_defaults();
        let targets = offsets(&[60, 200]);
        let mut tracker = ExecutionTracker::new(machine, &targets, true);
        let (state, _) = tracker.execution_state_at(&targets[0]).unwrap();
        tracker.execution_state_at(&targets[1]).unwrap();

        let snapshot = tracker.machine_at(&targets[0]).unwrap();
        assert_eq!(snapshot.hash(), state.machine_hash);
        assert_eq!(tracker.snapshot_count(), 2);

        tracker.release_below(&targets[1]);
        assert_eq!(tracker.snapshot_count(), 1);
        assert!(matches!(
            tracker.machine_at(&targets[0]),
            Err(Error::SnapshotMissing(_))
        ));
    }

    #[test]
    fn non_target_offsets_are_not_cached() {
        let machine = CountingMachine::with_defaults();
        let mut tracker = ExecutionTracker::new(machine, &offsets(&[500]), true);
        tracker.execution_state_at(&BigUint::from(90u64)).unwrap();
        assert_eq!(tracker.snapshot_count(), 0);
    }
}
