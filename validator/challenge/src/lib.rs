// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod bisection;
mod checkpoint;
mod config;
mod cut;
mod errors;
mod execution;
mod game;
mod inbox_delta;
mod kind;
pub mod metrics;
mod segment;

pub use alder_ledger::ChallengeKind;
pub use bisection::Bisection;
pub use checkpoint::ChallengeCheckpoint;
pub use config::ChallengeConfig;
pub use cut::{Cut, UNREACHABLE_CUT_HASH};
pub use errors::ChallengeError;
pub use execution::ExecutionDispute;
pub use game::{ChallengeGame, ChallengeState, GamePhase, Role, Winner};
pub use inbox_delta::InboxDeltaDispute;
pub use kind::{DisputeOps, DivergenceInfo, OneStepData};
pub use segment::ChallengeSegment;
