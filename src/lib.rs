//! End-to-end harness for EmpowerChain: composes a seeded genesis, runs a
//! local validator network, provisions the test actors and resolves tx
//! acknowledgments into typed message responses.

pub mod actors;
pub mod config;
pub mod genesis;
pub mod identity;
pub mod network;
pub mod prelude;
pub mod resolve;
pub mod suite;

pub use empower_e2e_core as core;
pub use empower_e2e_core::confirm;
