//! Background worker and the services it orchestrates.
//!
//! - `store`: persisted state and change broadcasts
//! - `applier`: system proxy configuration
//! - `prober`: connectivity checks
//! - `manager`: profile lifecycle and connection state machine
//! - `router`: request dispatch and the JSON message protocol
//! - `worker` / `monitor`: the owning task and its health ticker

pub mod applier;
pub mod manager;
mod monitor;
pub mod prober;
pub mod router;
pub mod store;
pub mod worker;

pub use worker::WorkerHandle;
