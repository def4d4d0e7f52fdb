// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key construction
//!
//! Keys are `{domain}:{operation}:{param}:...` with parameters in a fixed
//! order and `ALL` standing in for an absent optional parameter:
//!
//! ```text
//! plants:top:{top}:{STATE|ALL}:{YEAR|ALL}
//! states:summary:{year}
//! states:all
//! state:{CODE}:{year}:top:{n}
//! plant:{id}
//! ```

use crate::error::QueryResult;
use crate::query::validation::{validate_state_code, validate_top, validate_year};
use crate::query::TopPlantsQuery;
use std::fmt;

/// Sentinel for an omitted optional parameter
pub const ALL: &str = "ALL";

/// Every prefix under which generation-dependent results are cached
pub const GENERATION_PREFIXES: [&str; 4] = ["plants:", "states:", "state:", "plant:"];

/// A cacheable query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TopPlants {
        top: u32,
        state: Option<String>,
        year: Option<i32>,
    },
    StatesSummary {
        year: i32,
    },
    AllStates,
    StateDetail {
        code: String,
        year: i32,
        top: u32,
    },
    Plant {
        id: u64,
    },
}

impl CacheKey {
    pub fn top_plants(query: &TopPlantsQuery) -> Self {
        CacheKey::TopPlants {
            top: query.top,
            state: query.state.clone(),
            year: query.year,
        }
    }

    /// Reject parameters outside their allowed ranges
    pub fn validate(&self) -> QueryResult<()> {
        match self {
            CacheKey::TopPlants { top, state, year } => {
                validate_top(*top)?;
                if let Some(code) = state {
                    validate_state_code(code)?;
                }
                if let Some(year) = year {
                    validate_year(*year)?;
                }
                Ok(())
            }
            CacheKey::StatesSummary { year } => validate_year(*year),
            CacheKey::AllStates | CacheKey::Plant { .. } => Ok(()),
            CacheKey::StateDetail { code, year, top } => {
                validate_state_code(code)?;
                validate_year(*year)?;
                validate_top(*top)
            }
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::TopPlants { top, state, year } => {
                let state = state.as_deref().unwrap_or(ALL);
                match year {
                    Some(year) => write!(f, "plants:top:{}:{}:{}", top, state, year),
                    None => write!(f, "plants:top:{}:{}:{}", top, state, ALL),
                }
            }
            CacheKey::StatesSummary { year } => write!(f, "states:summary:{}", year),
            CacheKey::AllStates => write!(f, "states:all"),
            CacheKey::StateDetail { code, year, top } => {
                write!(f, "state:{}:{}:top:{}", code, year, top)
            }
            CacheKey::Plant { id } => write!(f, "plant:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_key_shapes() {
        let global = CacheKey::top_plants(&TopPlantsQuery::new(10));
        assert_eq!(global.render(), "plants:top:10:ALL:ALL");
        assert_eq!(
            CacheKey::top_plants(&TopPlantsQuery::new(10).year(2023)).render(),
            "plants:top:10:ALL:2023"
        );
        assert_eq!(
            CacheKey::top_plants(&TopPlantsQuery::new(5).state("TX")).render(),
            "plants:top:5:TX:ALL"
        );
        assert_eq!(
            CacheKey::StatesSummary { year: 2023 }.render(),
            "states:summary:2023"
        );
        assert_eq!(CacheKey::AllStates.render(), "states:all");
        assert_eq!(
            CacheKey::StateDetail {
                code: "TX".to_string(),
                year: 2023,
                top: 10
            }
            .render(),
            "state:TX:2023:top:10"
        );
        assert_eq!(CacheKey::Plant { id: 42 }.render(), "plant:42");
    }

    #[test]
    fn test_every_key_falls_under_a_generation_prefix() {
        let keys = [
            CacheKey::top_plants(&TopPlantsQuery::new(10)),
            CacheKey::StatesSummary { year: 2020 },
            CacheKey::AllStates,
            CacheKey::StateDetail {
                code: "CA".to_string(),
                year: 2020,
                top: 20,
            },
            CacheKey::Plant { id: 1 },
        ];
        for key in keys {
            let rendered = key.render();
            assert!(
                GENERATION_PREFIXES.iter().any(|p| rendered.starts_with(p)),
                "{} is not invalidated",
                rendered
            );
        }
        // `state:` must not swallow `states:` keys and vice versa
        assert!(!"states:all".starts_with("state:"));
    }

    #[test]
    fn test_validation_rejects_out_of_range_parameters() {
        assert!(CacheKey::top_plants(&TopPlantsQuery::new(0)).validate().is_err());
        assert!(CacheKey::top_plants(&TopPlantsQuery::new(10).state("ALL"))
            .validate()
            .is_err());
        assert!(CacheKey::StatesSummary { year: 1800 }.validate().is_err());
        assert!(CacheKey::StateDetail {
            code: "tx".to_string(),
            year: 2023,
            top: 10
        }
        .validate()
        .is_err());
        assert!(CacheKey::Plant { id: 0 }.validate().is_ok());
    }
}
