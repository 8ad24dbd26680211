//! Core domain: market data, voting, simulation and strategy lifecycle.

pub mod bar;
pub mod committee;
pub mod config;
pub mod error;
pub mod metrics;
pub mod portfolio;
pub mod position;
pub mod simulator;
pub mod strategy;
pub mod unit;
pub mod units;
pub mod vote;
