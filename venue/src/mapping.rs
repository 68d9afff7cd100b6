//! Column-mapping filter for historical market-data feeds (spec §9): resolves a flat
//! list of configured source-column bindings into the concrete per-depth-level
//! bindings a historical-feed parser consumes. Grounded in
//! `generator/historical/mapping/column_mapping_filter.cpp`'s three-way split between
//! depth-less columns, a single "variable depth" template expanded across
//! `depth_to_parse`, and explicitly enumerated per-level columns.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDepth {
    /// The column carries no depth dimension (e.g. `instrumentId`).
    NoDepth,
    /// Expand automatically across every level from 1 to `depth_to_parse`.
    VariableDepth,
    /// An explicit, single depth level (e.g. `bidParty3` is level 3 of `bidParty`).
    Fixed(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub column: String,
    pub depth: ColumnDepth,
    pub target_template: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub column: String,
    /// `0` for [`ColumnDepth::NoDepth`] columns.
    pub level: u32,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("column `{0}` mixes a variable-depth binding with explicit fixed-depth bindings")]
    MixedDepthKinds(String),
    #[error("column `{column}` has a fixed depth level {level} outside 1..={max}")]
    DepthOutOfRange { column: String, level: u32, max: u32 },
    #[error("column `{column}` has a gap in its emitted depth levels between {after} and {before}")]
    DepthGap { column: String, after: u32, before: u32 },
}

/// Resolves `columns` into concrete bindings. Columns sharing the same name are
/// grouped; a `NoDepth` entry yields one binding at level 0, a `VariableDepth` entry
/// expands to levels `1..=depth_to_parse` with `target_template` suffixed by the
/// level number, and `Fixed` entries are emitted as given after validating that their
/// levels fall within `1..=depth_to_parse` and leave no gap.
pub fn resolve_columns(columns: &[ColumnConfig], depth_to_parse: u32) -> Result<Vec<ColumnBinding>, MappingError> {
    let mut result = Vec::new();
    let mut seen_columns: Vec<&str> = Vec::new();

    for name in columns.iter().map(|c| c.column.as_str()) {
        if seen_columns.contains(&name) {
            continue;
        }
        seen_columns.push(name);

        let group: Vec<&ColumnConfig> = columns.iter().filter(|c| c.column == name).collect();
        let has_variable = group.iter().any(|c| c.depth == ColumnDepth::VariableDepth);
        let has_fixed = group.iter().any(|c| matches!(c.depth, ColumnDepth::Fixed(_)));

        if has_variable && has_fixed {
            return Err(MappingError::MixedDepthKinds(name.to_string()));
        }

        if has_variable {
            let template = &group.iter().find(|c| c.depth == ColumnDepth::VariableDepth).unwrap().target_template;
            for level in 1..=depth_to_parse {
                result.push(ColumnBinding {
                    column: name.to_string(),
                    level,
                    target: format!("{template}{level}"),
                });
            }
            continue;
        }

        if has_fixed {
            let mut levels: Vec<u32> = group
                .iter()
                .filter_map(|c| match c.depth {
                    ColumnDepth::Fixed(level) => Some(level),
                    _ => None,
                })
                .collect();
            levels.sort_unstable();

            let min_level = *levels.first().unwrap();
            let max_level = *levels.last().unwrap();
            if min_level < 1 || max_level > depth_to_parse {
                return Err(MappingError::DepthOutOfRange {
                    column: name.to_string(),
                    level: if min_level < 1 { min_level } else { max_level },
                    max: depth_to_parse,
                });
            }
            for window in levels.windows(2) {
                if window[1] - window[0] > 1 {
                    return Err(MappingError::DepthGap {
                        column: name.to_string(),
                        after: window[0],
                        before: window[1],
                    });
                }
            }

            for config in group.iter().filter(|c| matches!(c.depth, ColumnDepth::Fixed(_))) {
                if let ColumnDepth::Fixed(level) = config.depth {
                    result.push(ColumnBinding {
                        column: name.to_string(),
                        level,
                        target: config.target_template.clone(),
                    });
                }
            }
            continue;
        }

        // NoDepth
        let config = group.iter().find(|c| c.depth == ColumnDepth::NoDepth).unwrap();
        result.push(ColumnBinding {
            column: name.to_string(),
            level: 0,
            target: config.target_template.clone(),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_depth(column: &str, target: &str) -> ColumnConfig {
        ColumnConfig {
            column: column.to_string(),
            depth: ColumnDepth::NoDepth,
            target_template: target.to_string(),
        }
    }

    fn variable(column: &str, template: &str) -> ColumnConfig {
        ColumnConfig {
            column: column.to_string(),
            depth: ColumnDepth::VariableDepth,
            target_template: template.to_string(),
        }
    }

    fn fixed(column: &str, level: u32, target: &str) -> ColumnConfig {
        ColumnConfig {
            column: column.to_string(),
            depth: ColumnDepth::Fixed(level),
            target_template: target.to_string(),
        }
    }

    #[test]
    fn no_depth_column_yields_single_level_zero_binding() {
        let columns = vec![no_depth("instrumentId", "instrument_id")];
        let bindings = resolve_columns(&columns, 5).unwrap();
        assert_eq!(bindings, vec![ColumnBinding { column: "instrumentId".into(), level: 0, target: "instrument_id".into() }]);
    }

    #[test]
    fn variable_depth_expands_across_full_range_with_no_gaps() {
        let columns = vec![variable("bidParty", "bid_party")];
        let bindings = resolve_columns(&columns, 4).unwrap();
        assert_eq!(bindings.len(), 4);
        let mut levels: Vec<u32> = bindings.iter().map(|b| b.level).collect();
        levels.sort_unstable();
        assert_eq!(levels, vec![1, 2, 3, 4]);
        assert!(levels.windows(2).all(|w| w[1] - w[0] == 1));
        assert_eq!(bindings[0].target, "bid_party1");
    }

    #[test]
    fn explicit_fixed_levels_with_no_gap_are_accepted() {
        let columns = vec![fixed("bidParty", 1, "bp1"), fixed("bidParty", 2, "bp2"), fixed("bidParty", 3, "bp3")];
        let bindings = resolve_columns(&columns, 5).unwrap();
        assert_eq!(bindings.len(), 3);
        let min = bindings.iter().map(|b| b.level).min().unwrap();
        let max = bindings.iter().map(|b| b.level).max().unwrap();
        assert!(1 <= min && min <= max && max <= 5);
    }

    #[test]
    fn gap_in_explicit_fixed_levels_is_rejected() {
        let columns = vec![fixed("bidParty", 1, "bp1"), fixed("bidParty", 3, "bp3")];
        let result = resolve_columns(&columns, 5);
        assert_eq!(result, Err(MappingError::DepthGap { column: "bidParty".into(), after: 1, before: 3 }));
    }

    #[test]
    fn fixed_level_beyond_depth_to_parse_is_rejected() {
        let columns = vec![fixed("bidParty", 1, "bp1"), fixed("bidParty", 6, "bp6")];
        let result = resolve_columns(&columns, 5);
        assert_eq!(result, Err(MappingError::DepthOutOfRange { column: "bidParty".into(), level: 6, max: 5 }));
    }

    #[test]
    fn mixing_variable_and_fixed_for_the_same_column_is_rejected() {
        let columns = vec![variable("bidParty", "bid_party"), fixed("bidParty", 2, "bp2")];
        let result = resolve_columns(&columns, 5);
        assert_eq!(result, Err(MappingError::MixedDepthKinds("bidParty".into())));
    }

    #[test]
    fn independent_columns_resolve_independently() {
        let columns = vec![no_depth("instrumentId", "instrument_id"), variable("bidParty", "bid_party"), fixed("askParty", 1, "ap1")];
        let bindings = resolve_columns(&columns, 2).unwrap();
        assert_eq!(bindings.len(), 1 + 2 + 1);
    }
}
