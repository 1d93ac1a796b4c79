//! Integration tests

mod common;
mod config_test;
mod engine_test;
mod store_test;
