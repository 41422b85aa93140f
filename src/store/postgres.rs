use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::models::report::{DateRange, WeeklyUsageRow};

/// Server-defined expression bucketing a job's start timestamp into its ISO
/// week for grouping.
const WEEK_EXPR: &str = "to_char(start_ts, 'IYYY-\"W\"IW')";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Result of an ad-hoc statement: column names plus every value rendered as
/// text. NULL and undecodable values render as the empty string.
#[derive(Debug)]
pub struct AdHocResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Pool that defers connecting until first use. Lets the router come up
    /// (and the no-query paths run) without a reachable database.
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// One week-bucketed aggregate query for a single package. `system` and
    /// the date bounds are bound parameters; `filter_fragment` is a
    /// server-defined expression from the site catalog, never request input.
    pub async fn weekly_software_usage(
        &self,
        system: &str,
        filter_fragment: &str,
        range: &DateRange,
    ) -> Result<Vec<WeeklyUsageRow>, sqlx::Error> {
        let (sql, date_binds) = build_usage_sql(filter_fragment, range);
        let mut query = sqlx::query_as::<_, WeeklyUsageRow>(&sql).bind(system);
        for bound in &date_binds {
            query = query.bind(bound.as_str());
        }
        query.fetch_all(&self.pool).await
    }

    /// Execute a free-text statement verbatim and render every value as
    /// text. The raw `sqlx::Error` is surfaced so the SQL terminal can echo
    /// the database-supplied message.
    pub async fn run_adhoc(&self, sql: &str) -> Result<AdHocResult, sqlx::Error> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let columns = match rows.first() {
            Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };

        let rows = rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(i, col)| decode_value(row, i, col.type_info().name()))
                    .collect()
            })
            .collect();

        Ok(AdHocResult { columns, rows })
    }
}

/// Build the per-package aggregate query. Returns the SQL text plus the date
/// strings to bind after the system pattern ($1).
pub fn build_usage_sql(filter_fragment: &str, range: &DateRange) -> (String, Vec<String>) {
    let (date_sql, date_binds) = match range {
        DateRange::On(d) => ("start_ts::date = $2::date".to_string(), vec![d.clone()]),
        DateRange::Between(s, e) => (
            "start_ts::date BETWEEN $2::date AND $3::date".to_string(),
            vec![s.clone(), e.clone()],
        ),
        DateRange::After(s) => ("start_ts::date >= $2::date".to_string(), vec![s.clone()]),
        DateRange::Before(e) => ("start_ts::date <= $2::date".to_string(), vec![e.clone()]),
        DateRange::Unbounded => ("TRUE".to_string(), vec![]),
    };

    let sql = format!(
        "SELECT {WEEK_EXPR} AS week, \
         COUNT(jobid) AS jobcount, \
         (COALESCE(SUM(nproc * walltime_sec), 0)::double precision) / 3600.0 AS cpuhours, \
         (COALESCE(SUM(cput_sec), 0)::double precision) / 3600.0 AS cpuhours_alt, \
         COUNT(DISTINCT username) AS users, \
         COUNT(DISTINCT groupname) AS groups \
         FROM jobs \
         WHERE system LIKE $1 AND ( {filter_fragment} ) AND ( {date_sql} ) \
         GROUP BY week ORDER BY week"
    );

    (sql, date_binds)
}

/// Column categories the ad-hoc executor knows how to decode, keyed on the
/// Postgres type name reported at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Date,
    Timestamp,
    TimestampTz,
    Text,
}

impl ColumnKind {
    fn from_type_name(type_name: &str) -> Self {
        match type_name.to_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => ColumnKind::Bool,
            "INT2" | "SMALLINT" => ColumnKind::Int2,
            "INT4" | "INT" | "INTEGER" => ColumnKind::Int4,
            "INT8" | "BIGINT" => ColumnKind::Int8,
            "FLOAT4" | "REAL" => ColumnKind::Float4,
            "FLOAT8" | "DOUBLE PRECISION" => ColumnKind::Float8,
            // Aggregates like AVG and SUM over integers come back NUMERIC.
            "NUMERIC" | "DECIMAL" => ColumnKind::Numeric,
            "DATE" => ColumnKind::Date,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            _ => ColumnKind::Text,
        }
    }
}

/// Decode one column of an ad-hoc result row to display text (the
/// statement's shape is unknown ahead of time).
fn decode_value(row: &PgRow, index: usize, type_name: &str) -> String {
    fn display<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    match ColumnKind::from_type_name(type_name) {
        ColumnKind::Bool => display(row.try_get::<Option<bool>, _>(index).ok().flatten()),
        ColumnKind::Int2 => display(row.try_get::<Option<i16>, _>(index).ok().flatten()),
        ColumnKind::Int4 => display(row.try_get::<Option<i32>, _>(index).ok().flatten()),
        ColumnKind::Int8 => display(row.try_get::<Option<i64>, _>(index).ok().flatten()),
        ColumnKind::Float4 => display(row.try_get::<Option<f32>, _>(index).ok().flatten()),
        ColumnKind::Float8 => display(row.try_get::<Option<f64>, _>(index).ok().flatten()),
        ColumnKind::Numeric => display(row.try_get::<Option<Decimal>, _>(index).ok().flatten()),
        ColumnKind::Date => display(row.try_get::<Option<NaiveDate>, _>(index).ok().flatten()),
        ColumnKind::Timestamp => {
            display(row.try_get::<Option<NaiveDateTime>, _>(index).ok().flatten())
        }
        ColumnKind::TimestampTz => display(
            row.try_get::<Option<DateTime<Utc>>, _>(index)
                .ok()
                .flatten()
                .map(|ts| ts.to_rfc3339()),
        ),
        // Everything else: take it as text if the driver allows, else blank.
        ColumnKind::Text => display(row.try_get::<Option<String>, _>(index).ok().flatten()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_sql_binds_system_first_and_dates_after() {
        let (sql, binds) = build_usage_sql(
            "script LIKE '%amber%' OR software LIKE '%amber%'",
            &DateRange::Between("2020-01-01".into(), "2020-01-31".into()),
        );
        assert!(sql.contains("system LIKE $1"));
        assert!(sql.contains("start_ts::date BETWEEN $2::date AND $3::date"));
        assert!(sql.contains("( script LIKE '%amber%' OR software LIKE '%amber%' )"));
        assert_eq!(binds, vec!["2020-01-01", "2020-01-31"]);
    }

    #[test]
    fn exact_day_uses_single_date_bind() {
        let (sql, binds) = build_usage_sql("TRUE", &DateRange::On("2020-01-01".into()));
        assert!(sql.contains("start_ts::date = $2::date"));
        assert_eq!(binds, vec!["2020-01-01"]);
        assert!(!sql.contains("$3"));
    }

    #[test]
    fn open_ended_ranges_use_inequality_predicates() {
        let (after, _) = build_usage_sql("TRUE", &DateRange::After("2020-01-01".into()));
        assert!(after.contains("start_ts::date >= $2::date"));

        let (before, _) = build_usage_sql("TRUE", &DateRange::Before("2020-01-31".into()));
        assert!(before.contains("start_ts::date <= $2::date"));
    }

    #[test]
    fn unbounded_range_has_no_date_binds() {
        let (sql, binds) = build_usage_sql("TRUE", &DateRange::Unbounded);
        assert!(sql.contains("AND ( TRUE )"));
        assert!(binds.is_empty());
        assert!(!sql.contains("$2"));
    }

    #[test]
    fn numeric_and_decimal_columns_are_not_textual_fallbacks() {
        // AVG/SUM over integer columns report NUMERIC; these must get a
        // dedicated decode path instead of the lossy text fallback.
        assert_eq!(ColumnKind::from_type_name("NUMERIC"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_type_name("DECIMAL"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_type_name("numeric"), ColumnKind::Numeric);
    }

    #[test]
    fn column_kind_maps_common_type_names() {
        assert_eq!(ColumnKind::from_type_name("BOOL"), ColumnKind::Bool);
        assert_eq!(ColumnKind::from_type_name("INT8"), ColumnKind::Int8);
        assert_eq!(
            ColumnKind::from_type_name("DOUBLE PRECISION"),
            ColumnKind::Float8
        );
        assert_eq!(
            ColumnKind::from_type_name("TIMESTAMPTZ"),
            ColumnKind::TimestampTz
        );
        assert_eq!(ColumnKind::from_type_name("VARCHAR"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_type_name("UUID"), ColumnKind::Text);
    }

    #[test]
    fn usage_sql_selects_all_report_columns() {
        let (sql, _) = build_usage_sql("TRUE", &DateRange::Unbounded);
        for column in ["week", "jobcount", "cpuhours", "cpuhours_alt", "users", "groups"] {
            assert!(sql.contains(&format!("AS {column}")), "missing column {column}");
        }
        assert!(sql.contains("GROUP BY week ORDER BY week"));
    }
}
