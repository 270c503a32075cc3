//! Ordered lookup tables for variable and coordinate names.
//!
//! TEMPO products have moved the NO2 column between groups across dataset
//! versions. The first candidate present in a file wins.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A (group, variable) pair to probe for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCandidate {
    /// Group name, `None` for the root group
    #[serde(default)]
    pub group: Option<String>,
    pub name: String,
}

impl VariableCandidate {
    pub fn root(name: &str) -> Self {
        Self {
            group: None,
            name: name.to_string(),
        }
    }

    pub fn in_group(group: &str, name: &str) -> Self {
        Self {
            group: Some(group.to_string()),
            name: name.to_string(),
        }
    }

    /// Fully qualified path, e.g. `/product/vertical_column_troposphere`.
    pub fn path(&self) -> String {
        match &self.group {
            Some(group) => format!("/{}/{}", group, self.name),
            None => format!("/{}", self.name),
        }
    }
}

impl fmt::Display for VariableCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}/{}", group, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// NO2 column variables in priority order.
pub fn default_no2_candidates() -> Vec<VariableCandidate> {
    vec![
        VariableCandidate::in_group("product", "vertical_column_troposphere"),
        VariableCandidate::in_group("support_data", "vertical_column_total"),
        VariableCandidate::root("vertical_column_troposphere"),
        VariableCandidate::root("vertical_column_total"),
        VariableCandidate::in_group("product", "vertical_column_troposphere_uncertainty"),
        VariableCandidate::in_group("support_data", "fitted_slant_column"),
    ]
}

/// Accepted (latitude, longitude) coordinate variable names, in priority order.
pub const COORDINATE_NAMES: [(&str, &str); 2] = [("latitude", "longitude"), ("lat", "lon")];

pub const TIME_DIMENSION: &str = "time";

pub fn is_latitude_like(dim: &str) -> bool {
    matches!(dim, "latitude" | "lat")
}

pub fn is_longitude_like(dim: &str) -> bool {
    matches!(dim, "longitude" | "lon")
}

pub fn is_spatial(dim: &str) -> bool {
    is_latitude_like(dim) || is_longitude_like(dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_starts_with_product_group() {
        let candidates = default_no2_candidates();
        assert_eq!(candidates.len(), 6);
        assert_eq!(candidates[0].to_string(), "product/vertical_column_troposphere");
        assert_eq!(candidates[2].path(), "/vertical_column_troposphere");
    }

    #[test]
    fn test_spatial_names() {
        assert!(is_spatial("lat"));
        assert!(is_spatial("longitude"));
        assert!(!is_spatial("time"));
        assert!(!is_spatial("xtrack"));
    }
}
