// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_std::channel::{bounded, Receiver, Sender};

/// Creates a linked cancellation handle/token pair. Every blocking operation
/// of a challenge task selects against the token; firing the handle makes
/// all of them resolve promptly with a cancelled failure.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = bounded::<()>(1);
    (CancelHandle { _tx: tx }, CancelToken { rx })
}

/// Owning side of the cancellation signal. Dropping the handle (or calling
/// [`CancelHandle::cancel`]) fires every linked token.
pub struct CancelHandle {
    _tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(self) {
        // Dropping the only sender closes the channel, which is the signal.
    }
}

/// Cloneable cancellation observer.
#[derive(Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    /// Resolves once the linked handle fired. Nothing is ever sent on the
    /// channel, so `recv` returns only on close.
    pub async fn cancelled(&self) {
        let _ = self.rx.recv().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_std::task;

    #[test]
    fn tokens_resolve_on_cancel() {
        let (handle, token) = cancel_pair();
        let other = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();

        assert!(token.is_cancelled());
        task::block_on(async {
            token.cancelled().await;
            other.cancelled().await;
        });
    }
}
