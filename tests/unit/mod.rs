//! Unit tests for individual components

mod error_test;
mod config_test;
mod events_test;
mod decision_test;
