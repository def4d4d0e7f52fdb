// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parameter checks applied before any cache or store access

use crate::error::{QueryError, QueryResult};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_TOP: u32 = 1;
pub const MAX_TOP: u32 = 100;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

static STATE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("state code pattern is valid"));

pub fn validate_top(top: u32) -> QueryResult<()> {
    if (MIN_TOP..=MAX_TOP).contains(&top) {
        Ok(())
    } else {
        Err(QueryError::validation(
            "top",
            format!("must be between {} and {}, got {}", MIN_TOP, MAX_TOP, top),
        ))
    }
}

pub fn validate_year(year: i32) -> QueryResult<()> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(QueryError::validation(
            "year",
            format!("must be between {} and {}, got {}", MIN_YEAR, MAX_YEAR, year),
        ))
    }
}

pub fn validate_state_code(code: &str) -> QueryResult<()> {
    if STATE_CODE.is_match(code) {
        Ok(())
    } else {
        Err(QueryError::validation(
            "state",
            format!("must be two uppercase letters, got '{}'", code),
        ))
    }
}

/// True when `code` has the shape of a state code
pub fn is_state_code(code: &str) -> bool {
    STATE_CODE.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_bounds() {
        assert!(validate_top(1).is_ok());
        assert!(validate_top(100).is_ok());
        assert!(validate_top(0).is_err());
        assert!(validate_top(101).is_err());
    }

    #[test]
    fn test_year_bounds() {
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(2100).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(2101).is_err());
    }

    #[test]
    fn test_state_code_shape() {
        assert!(validate_state_code("TX").is_ok());
        for bad in ["tx", "T", "TEX", "T1", "", " TX"] {
            match validate_state_code(bad) {
                Err(QueryError::ValidationFailed { parameter, .. }) => assert_eq!(parameter, "state"),
                other => panic!("{:?} accepted: {:?}", bad, other),
            }
        }
    }
}
