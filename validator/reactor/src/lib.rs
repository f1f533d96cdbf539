// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod driver;
mod errors;
pub mod metrics;
mod reactor;
pub mod scripted;

pub use driver::{resume_challenge, run_challenge, ChallengeDriver, OpsFactory};
pub use errors::ReactorError;
pub use reactor::{EventReactor, ReactorConfig, ReactorItem};
