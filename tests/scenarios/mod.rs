//! Scenario-based integration tests
//!
//! Each module plays out one area of the rules through the public API.

mod combat;
mod files;
mod initiative;
mod rooms;
