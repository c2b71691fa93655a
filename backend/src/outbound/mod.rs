//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **memory**: process-local repositories for local runs and tests
//! - **live**: Redis pub/sub live channel
//! - **delivery**: webhook, ntfy, and email transports
//! - **queue**: bounded notification queue and fan-out worker
//! - **verification**: one-time password and DNS ownership checks
//! - **storage**: local document storage
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod delivery;
pub mod live;
pub mod memory;
pub mod persistence;
pub mod queue;
pub mod storage;
pub mod verification;
