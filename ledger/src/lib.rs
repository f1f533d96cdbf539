// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod actions;
mod block_id;
mod cancel;
mod connection;
mod errors;
mod events;
mod retry;

pub use actions::ChallengeAction;
pub use block_id::{BlockHeight, BlockId, LogPosition};
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use connection::{LedgerConnection, LedgerNotification, NotificationStream, TxReceipt};
pub use errors::Error;
pub use events::{ChallengeEvent, ChallengeEventKind, ChallengeKind};
pub use retry::{submit_with_retry, RetryConfig};
