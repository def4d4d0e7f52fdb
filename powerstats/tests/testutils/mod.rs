//! Shared utilities for PowerStats integration tests

#![allow(dead_code)]

pub mod test_fixture;
