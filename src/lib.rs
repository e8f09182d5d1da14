//! Self-healing element locators.
//!
//! When a locator stops matching, [`heal::engine::HealingEngine`] looks up how
//! the element looked the last time it was found, snapshots the current page,
//! one-hot encodes both and picks the nearest element within tolerance.

pub mod cli;
pub mod config;
pub mod driver;
pub mod element;
pub mod encode;
pub mod extract;
pub mod heal;
pub mod matcher;
pub mod report;
pub mod store;
pub mod trace;
