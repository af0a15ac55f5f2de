//! Notification delivery worker.
//!
//! Drains the queue of pending notifications and delivers each one to its
//! target, by email to users or by HTTP POST to webhooks:
//! 1. Claim the oldest unprocessed notification inside a transaction
//!    (`store`), skipping rows locked by other worker instances
//! 2. Prepare the event's template data, reusing cached copies (`cache`,
//!    `render`)
//! 3. Render and send it through the matching channel (`template`, `channels`)
//! 4. Record the outcome, or roll back so a retryable failure is picked up
//!    again on a later iteration (`worker`)

pub mod cache;
pub mod channels;
pub mod error;
pub mod render;
pub mod store;
pub mod template;
pub mod worker;

pub use error::{DeliveryError, Disposition, WorkerError};
pub use worker::{Outcome, Worker, WorkerConfig};
