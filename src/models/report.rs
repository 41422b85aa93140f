//! Request schema and row types for the weekly software-usage report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::SiteCatalog;

/// Request fields with fixed meaning; every other submitted field name is a
/// candidate package selection.
pub const RESERVED_KEYS: [&str; 3] = ["system", "start_date", "end_date"];

/// Date constraint on job start, derived from the `start_date` / `end_date`
/// form fields. Dates stay free-text here and are bound as SQL parameters;
/// the variant is a pure function of the two strings (absent == empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRange {
    On(String),
    Between(String, String),
    After(String),
    Before(String),
    Unbounded,
}

impl DateRange {
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Self {
        let start = start.unwrap_or("");
        let end = end.unwrap_or("");
        match (start.is_empty(), end.is_empty()) {
            (false, false) if start == end => DateRange::On(start.to_string()),
            (false, false) => DateRange::Between(start.to_string(), end.to_string()),
            (false, true) => DateRange::After(start.to_string()),
            (true, false) => DateRange::Before(end.to_string()),
            (true, true) => DateRange::Unbounded,
        }
    }

    /// Human-readable page-title suffix, mirroring the predicate branch.
    pub fn title_suffix(&self) -> String {
        match self {
            DateRange::On(d) => format!(" started on {d}"),
            DateRange::Between(s, e) => format!(" started between {s} and {e}"),
            DateRange::After(s) => format!(" started after {s}"),
            DateRange::Before(e) => format!(" started before {e}"),
            DateRange::Unbounded => String::new(),
        }
    }

    /// The raw field values to echo in bookmark links and forms.
    pub fn as_fields(&self) -> (Option<&str>, Option<&str>) {
        match self {
            DateRange::On(d) => (Some(d), Some(d)),
            DateRange::Between(s, e) => (Some(s), Some(e)),
            DateRange::After(s) => (Some(s), None),
            DateRange::Before(e) => (None, Some(e)),
            DateRange::Unbounded => (None, None),
        }
    }
}

/// Parsed usage-report request: the enumerated schema built once from the
/// raw parameter map.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub system: Option<String>,
    pub range: DateRange,
    /// Selected package ids: submitted field names minus the reserved keys,
    /// restricted to the catalog so filter lookup stays server-defined.
    /// Presence alone selects; the field's value is ignored.
    pub selected: Vec<String>,
}

impl ReportRequest {
    pub fn from_params(params: &BTreeMap<String, String>, catalog: &SiteCatalog) -> Self {
        let selected = catalog
            .ids()
            .filter(|id| {
                params.contains_key(*id) && !RESERVED_KEYS.contains(id)
            })
            .map(String::from)
            .collect();

        ReportRequest {
            system: params.get("system").cloned(),
            range: DateRange::from_params(
                params.get("start_date").map(String::as_str),
                params.get("end_date").map(String::as_str),
            ),
            selected,
        }
    }

    pub fn title(&self) -> String {
        let mut title = String::from("Software usage by week");
        if let Some(system) = &self.system {
            title.push_str(" on ");
            title.push_str(system);
        }
        title.push_str(&self.range.title_suffix());
        title
    }
}

/// One week of aggregate usage for a single package. Built fresh per result
/// row; no shared scratch buffer.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct WeeklyUsageRow {
    pub week: String,
    pub jobcount: i64,
    pub cpuhours: f64,
    pub cpuhours_alt: f64,
    pub users: i64,
    pub groups: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn equal_nonempty_dates_select_exact_day() {
        let range = DateRange::from_params(Some("2020-01-01"), Some("2020-01-01"));
        assert_eq!(range, DateRange::On("2020-01-01".into()));
        assert_eq!(range.title_suffix(), " started on 2020-01-01");
    }

    #[test]
    fn differing_dates_select_inclusive_range() {
        let range = DateRange::from_params(Some("2020-01-01"), Some("2020-01-31"));
        assert_eq!(
            range,
            DateRange::Between("2020-01-01".into(), "2020-01-31".into())
        );
        assert_eq!(
            range.title_suffix(),
            " started between 2020-01-01 and 2020-01-31"
        );
    }

    #[test]
    fn start_only_selects_on_or_after() {
        let range = DateRange::from_params(Some("2020-01-01"), Some(""));
        assert_eq!(range, DateRange::After("2020-01-01".into()));
        assert_eq!(range.title_suffix(), " started after 2020-01-01");

        // Absent end behaves like empty end.
        assert_eq!(
            DateRange::from_params(Some("2020-01-01"), None),
            DateRange::After("2020-01-01".into())
        );
    }

    #[test]
    fn end_only_selects_on_or_before() {
        let range = DateRange::from_params(Some(""), Some("2020-01-31"));
        assert_eq!(range, DateRange::Before("2020-01-31".into()));
        assert_eq!(range.title_suffix(), " started before 2020-01-31");
    }

    #[test]
    fn no_dates_means_unconstrained() {
        let range = DateRange::from_params(Some(""), Some(""));
        assert_eq!(range, DateRange::Unbounded);
        assert_eq!(range.title_suffix(), "");
        assert_eq!(DateRange::from_params(None, None), DateRange::Unbounded);
    }

    #[test]
    fn selection_is_set_difference_against_reserved_keys() {
        let catalog = crate::catalog::SiteCatalog::default();
        let req = ReportRequest::from_params(
            &params(&[
                ("system", "glenn"),
                ("start_date", "2020-01-01"),
                ("end_date", ""),
                ("gaussian", "on"),
                ("amber", "on"),
            ]),
            &catalog,
        );
        assert_eq!(req.system.as_deref(), Some("glenn"));
        assert_eq!(req.selected, vec!["amber", "gaussian"]);
    }

    #[test]
    fn empty_valued_field_still_selects_package() {
        let catalog = crate::catalog::SiteCatalog::default();
        let req = ReportRequest::from_params(
            &params(&[("system", "glenn"), ("matlab", "")]),
            &catalog,
        );
        assert_eq!(req.selected, vec!["matlab"]);
    }

    #[test]
    fn unknown_field_names_are_not_selectors() {
        let catalog = crate::catalog::SiteCatalog::default();
        let req = ReportRequest::from_params(
            &params(&[("system", "glenn"), ("1=1; --", "on")]),
            &catalog,
        );
        assert!(req.selected.is_empty());
    }

    #[test]
    fn title_combines_system_and_date_suffix() {
        let catalog = crate::catalog::SiteCatalog::default();
        let req = ReportRequest::from_params(
            &params(&[
                ("system", "glenn"),
                ("start_date", "2020-01-01"),
                ("end_date", "2020-01-31"),
            ]),
            &catalog,
        );
        assert_eq!(
            req.title(),
            "Software usage by week on glenn started between 2020-01-01 and 2020-01-31"
        );

        let bare = ReportRequest::from_params(&params(&[]), &catalog);
        assert_eq!(bare.title(), "Software usage by week");
    }
}
