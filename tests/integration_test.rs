//! Integration tests for the rules engine

mod harness;
mod scenarios;
