// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod assertion;
mod errors;
mod inbox;
mod machine;
mod state;
pub mod testing;
mod tracker;

pub use assertion::Assertion;
pub use errors::Error;
pub use inbox::{extend_inbox_acc, InboxLookup, InboxMessage};
pub use machine::{Machine, MachineProof};
pub use state::ExecutionState;
pub use tracker::ExecutionTracker;
