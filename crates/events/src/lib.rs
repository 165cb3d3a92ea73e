//! Observer registration and ordered, synchronous fan-out.

pub mod observer;
pub mod subscription;

pub use observer::ObserverRegistry;
pub use subscription::Subscription;
