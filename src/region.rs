//! ### Region
//! The fixed set of load zones a dataset reports on, and the column
//! naming convention that ties raw headers to region keys.

/// Raw load columns are named `"<Region> Actual Load (MW)"`.
pub const LOAD_COLUMN_SUFFIX: &str = " Actual Load (MW)";

/// ISO New England load zones, in the column order of the EIA export.
pub const NEW_ENGLAND_REGIONS: [&str; 8] = [
    "Connecticut",
    "Maine",
    "New Hampshire",
    "Northeast Massachusetts",
    "Rhode Island",
    "Southeast Massachusetts",
    "Vermont",
    "Western/Central Massachusetts",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRegistry {
    names: Vec<String>,
}

impl RegionRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { names: unique }
    }

    pub fn new_england() -> Self {
        Self::new(NEW_ENGLAND_REGIONS)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, region: &str) -> bool {
        self.names.iter().any(|name| name == region)
    }

    pub fn position(&self, region: &str) -> Option<usize> {
        self.names.iter().position(|name| name == region)
    }

    /// `(region, raw column header)` pairs in registry order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, String)> {
        self.names
            .iter()
            .map(|name| (name.as_str(), column_name(name)))
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new_england()
    }
}

pub fn column_name(region: &str) -> String {
    format!("{region}{LOAD_COLUMN_SUFFIX}")
}

/// Strips the load suffix; `None` when the header isn't a load column.
pub fn region_from_column(header: &str) -> Option<&str> {
    header
        .strip_suffix(LOAD_COLUMN_SUFFIX)
        .filter(|region| !region.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_england_has_eight_zones() {
        let registry = RegionRegistry::new_england();
        assert_eq!(registry.len(), 8);
        assert!(registry.contains("Western/Central Massachusetts"));
        assert!(!registry.contains("Massachusetts"));
        assert!(!registry.contains("maine"));
    }

    #[test]
    fn duplicates_are_dropped() {
        let registry = RegionRegistry::new(["Maine", "Vermont", "Maine"]);
        assert_eq!(registry.names(), &["Maine".to_string(), "Vermont".to_string()]);
    }

    #[test]
    fn column_names_round_trip() {
        assert_eq!(column_name("Maine"), "Maine Actual Load (MW)");
        assert_eq!(region_from_column("Maine Actual Load (MW)"), Some("Maine"));
        assert_eq!(region_from_column("Hour Number"), None);
        assert_eq!(region_from_column(" Actual Load (MW)"), None);
    }
}
