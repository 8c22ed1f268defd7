//! Deterministic simulation harness for Parley testing.
//!
//! In-memory implementations of the socket server and the [`Driver`] trait,
//! driven by a virtual clock, so the production runtime can be exercised
//! without a network and with reproducible timing.
//!
//! Two ways to drive a client:
//! - [`SimClient`] steps the sans-IO client in lockstep with the server, for
//!   property tests and wire transcripts
//! - [`sim_runtime`] builds the production runtime on a [`SimDriver`], for
//!   end-to-end scenarios through the async handle
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! chat invariants.
//!
//! [`Driver`]: parley_app::Driver

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_client;
pub mod sim_driver;
pub mod sim_server;

pub use invariants::{
    ActiveRoomUnreadZero, ClientSnapshot, Invariant, InvariantRegistry, InvariantResult,
    MessageAgreement, SystemSnapshot, TimelineInActiveRoom, UniqueMessageIds, UniqueRoomIds,
    Violation,
};
pub use parley_core::env::test_utils::{MockEnv as SimEnv, VirtualInstant};
pub use sim_client::{Direction, SimClient, WireRecord};
pub use sim_driver::{SimDriver, SimDriverError, sim_runtime};
pub use sim_server::{MockServer, SessionId, SharedServer, create_shared_server};
