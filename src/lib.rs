//! quorumtrader — committee-based trading strategy evaluation.
//!
//! Strategies are committees of decision units that vote on every market
//! tick; a deterministic simulator replays historical bars through them and
//! a fixed-size scheduler evaluates whole populations of candidate
//! strategies, promoting the ones that earn it.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], the worker pool in
//! [`scheduler`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod scheduler;
