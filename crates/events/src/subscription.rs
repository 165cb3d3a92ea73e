//! Channel-backed subscription (pull side of the observer registry).
//!
//! Callback observers run on the notifying thread. Consumers that live on
//! another thread register a channel instead and drain it at their own pace:
//!
//! ```ignore
//! let (_token, subscription) = registry.subscribe_channel();
//!
//! loop {
//!     match subscription.recv_timeout(Duration::from_secs(1)) {
//!         Ok(map) => rerender(&map),
//!         Err(RecvTimeoutError::Timeout) => continue,
//!         Err(RecvTimeoutError::Disconnected) => break, // registry released us
//!     }
//! }
//! ```
//!
//! Messages arrive in notification order. Once the registry drops the sending
//! side (unregister, `clear`, or the registry itself going away) the receiver
//! reports `Disconnected` after draining what was already queued.

use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every message queued so far without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}
