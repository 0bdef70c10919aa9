//! Derived columns: sequence number, tenure, age and membership category.
//!
//! Every per-row computation degrades to `Cell::Empty` on bad input; a single
//! unparsable row never aborts the batch.

use chrono::NaiveDate;
use serde::Serialize;

use crate::classify::{classify_membership, MembershipCategory};
use crate::config::{FieldRole, ReconConfig, SchemaKind};
use crate::error::ReconError;
use crate::identity::identity_keys;
use crate::model::{Cell, Dataset};

const DAYS_PER_YEAR: i64 = 365;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%Y年%m月%d日"];

// (year-month format, suffix that completes it to a day)
const MONTH_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%d", "-01"),
    ("%Y/%m/%d", "/01"),
    ("%Y.%m.%d", ".01"),
    ("%Y年%m月%d日", "01日"),
];

/// Interpret a cell as a calendar date.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date_text(s),
        Cell::Int(n) => parse_date_text(&n.to_string()),
        Cell::Empty | Cell::Float(_) | Cell::Bool(_) => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    // Drop a trailing time component ("2020-06-15 00:00:00", "2020-06-15T08:00").
    let date_part = s.trim().split([' ', 'T']).next()?;
    if date_part.is_empty() {
        return None;
    }

    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
    {
        return Some(d);
    }

    // Year-month only resolves to the first of the month.
    MONTH_FORMATS.iter().find_map(|(fmt, suffix)| {
        NaiveDate::parse_from_str(&format!("{date_part}{suffix}"), fmt).ok()
    })
}

/// Whole years from `from` to `reference`, or `None` when `from` is later.
pub fn whole_years(from: NaiveDate, reference: NaiveDate) -> Option<i64> {
    let days = (reference - from).num_days();
    (days >= 0).then(|| days / DAYS_PER_YEAR)
}

pub fn tenure_years(join: &Cell, reference: NaiveDate) -> Option<i64> {
    whole_years(parse_date(join)?, reference)
}

/// Birth date embedded as `YYYYMMDD` at character `offset` of an identity key.
pub fn birth_date_from_identity(key: &str, offset: usize) -> Option<NaiveDate> {
    let digits: String = key.chars().skip(offset).take(8).collect();
    if digits.chars().count() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn age_years(key: &str, offset: usize, reference: NaiveDate) -> Option<i64> {
    whole_years(birth_date_from_identity(key, offset)?, reference)
}

fn years_cell(years: Option<i64>) -> Cell {
    years.map(Cell::Int).unwrap_or(Cell::Empty)
}

// ---------------------------------------------------------------------------
// Dataset enrichment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    pub rows: usize,
    pub tenure_missing: usize,
    pub age_missing: usize,
    /// `None` when membership is not derived for this schema.
    pub probationary: Option<usize>,
}

/// Add the derived columns to `dataset` in place.
///
/// Identity keys must already be normalized; the identity column itself is
/// required, everything else degrades to empty values.
pub fn enrich(
    dataset: &mut Dataset,
    schema: SchemaKind,
    config: &ReconConfig,
) -> Result<EnrichStats, ReconError> {
    let identity_col = config.identity_column(schema)?;
    let identity_idx = dataset
        .column_index(identity_col)
        .ok_or_else(|| ReconError::MissingColumn {
            dataset: dataset.label.clone(),
            column: identity_col.into(),
        })?;

    let reference = config.reference_date;
    let rows = dataset.len();
    let mut stats = EnrichStats { rows, ..Default::default() };

    let join_values: Vec<Cell> = match config.role_field(FieldRole::JoinDate) {
        Some(field) => match dataset.column_index(field.column(schema)) {
            Some(idx) => (0..rows).map(|r| dataset.cell(r, idx).clone()).collect(),
            None => {
                log::warn!(
                    "dataset '{}': join-date column '{}' not found; tenure left empty",
                    dataset.label,
                    field.column(schema)
                );
                vec![Cell::Empty; rows]
            }
        },
        None => {
            log::warn!("no field has role = \"join_date\"; tenure left empty");
            vec![Cell::Empty; rows]
        }
    };

    let sequence: Vec<Cell> = (1..=rows as i64).map(Cell::Int).collect();

    let tenure: Vec<Cell> = join_values
        .iter()
        .map(|join| years_cell(tenure_years(join, reference)))
        .collect();
    stats.tenure_missing = tenure.iter().filter(|c| c.is_empty()).count();

    let age: Vec<Cell> = identity_keys(dataset, identity_idx)
        .iter()
        .map(|key| years_cell(age_years(key, config.derived.birth_offset, reference)))
        .collect();
    stats.age_missing = age.iter().filter(|c| c.is_empty()).count();

    let membership = if config.schema(schema).derive_membership {
        match config.role_field(FieldRole::Membership) {
            Some(field) => {
                let categories: Vec<MembershipCategory> = join_values
                    .iter()
                    .map(|join| classify_membership(join, reference, config.membership.rule))
                    .collect();
                stats.probationary = Some(
                    categories
                        .iter()
                        .filter(|c| **c == MembershipCategory::Probationary)
                        .count(),
                );
                let labels = categories
                    .iter()
                    .map(|c| Cell::text(c.label(&config.membership)))
                    .collect();
                Some((field.column(schema).to_string(), labels))
            }
            None => {
                log::warn!("no field has role = \"membership\"; category not derived");
                None
            }
        }
    } else {
        None
    };

    dataset.set_column(&config.derived.sequence, sequence);
    dataset.set_column(&config.derived.tenure, tenure);
    dataset.set_column(&config.derived.age, age);
    if let Some((column, labels)) = membership {
        dataset.set_column(&column, labels);
    }

    if stats.tenure_missing > 0 {
        log::info!(
            "dataset '{}': {} of {} rows have no usable join date",
            dataset.label,
            stats.tenure_missing,
            rows
        );
    }
    if stats.age_missing > 0 {
        log::info!(
            "dataset '{}': {} of {} identity keys carry no valid birth date",
            dataset.label,
            stats.age_missing,
            rows
        );
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference() -> NaiveDate {
        ymd(2025, 12, 31)
    }

    #[test]
    fn tenure_floor_divides_days() {
        assert_eq!(tenure_years(&Cell::text("2020-06-15"), reference()), Some(5));
        assert_eq!(tenure_years(&Cell::Date(ymd(2020, 6, 15)), reference()), Some(5));
    }

    #[test]
    fn age_from_identity_digits() {
        // 13148 days / 365
        assert_eq!(age_years("110101199001011234", 6, reference()), Some(36));
        assert_eq!(birth_date_from_identity("110101199001011234", 6), Some(ymd(1990, 1, 1)));
    }

    #[test]
    fn age_missing_for_bad_identity() {
        assert_eq!(age_years("1101011990", 6, reference()), None);
        assert_eq!(age_years("110101199013011234", 6, reference()), None);
        assert_eq!(age_years("110101ABCDEFGH1234", 6, reference()), None);
        assert_eq!(age_years("", 6, reference()), None);
    }

    #[test]
    fn future_dates_yield_missing() {
        assert_eq!(tenure_years(&Cell::text("2026-01-01"), reference()), None);
        assert_eq!(whole_years(reference(), reference()), Some(0));
    }

    #[test]
    fn parses_common_date_spellings() {
        let expected = Some(ymd(2020, 6, 15));
        for text in [
            "2020-06-15",
            "2020/6/15",
            "2020.06.15",
            "20200615",
            "2020年06月15日",
            "2020-06-15 00:00:00",
            " 2020-06-15T08:30:00 ",
        ] {
            assert_eq!(parse_date(&Cell::text(text)), expected, "{text}");
        }
        assert_eq!(parse_date(&Cell::Int(20200615)), expected);
    }

    #[test]
    fn year_month_resolves_to_first_day() {
        assert_eq!(parse_date(&Cell::text("2020-06")), Some(ymd(2020, 6, 1)));
        assert_eq!(parse_date(&Cell::text("2020.06")), Some(ymd(2020, 6, 1)));
        assert_eq!(parse_date(&Cell::text("2020年6月")), Some(ymd(2020, 6, 1)));
    }

    #[test]
    fn unparsable_dates_are_none() {
        for cell in [Cell::Empty, Cell::text("unknown"), Cell::Float(1.5), Cell::text("2020-13-01")] {
            assert_eq!(parse_date(&cell), None, "{cell:?}");
        }
    }

    fn local_dataset() -> Dataset {
        let mut ds = Dataset::new(
            "单机",
            vec!["姓名".into(), "身份证号".into(), "入党时间".into()],
        );
        ds.push_row(vec![Cell::text("张三"), Cell::text("110101199001011234"), Cell::text("2020-06-15")]);
        ds.push_row(vec![Cell::text("李四"), Cell::text("BAD"), Cell::text("not a date")]);
        ds.push_row(vec![Cell::text("王五"), Cell::text("110101200002021234"), Cell::text("2025-03-01")]);
        ds
    }

    #[test]
    fn enrich_adds_derived_columns() {
        let config = ReconConfig::default();
        let mut ds = local_dataset();
        let stats = enrich(&mut ds, SchemaKind::Local, &config).unwrap();

        assert_eq!(
            ds.columns,
            vec!["姓名", "身份证号", "入党时间", "序号", "党龄", "年龄", "人员类别"]
        );
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.tenure_missing, 1);
        assert_eq!(stats.age_missing, 1);
        assert_eq!(stats.probationary, Some(1));

        let col = |name: &str| ds.column_index(name).unwrap();
        assert_eq!(ds.cell(0, col("序号")), &Cell::Int(1));
        assert_eq!(ds.cell(2, col("序号")), &Cell::Int(3));
        assert_eq!(ds.cell(0, col("党龄")), &Cell::Int(5));
        assert_eq!(ds.cell(1, col("党龄")), &Cell::Empty);
        assert_eq!(ds.cell(1, col("年龄")), &Cell::Empty);
        assert_eq!(ds.cell(0, col("人员类别")), &Cell::text("正式党员"));
        assert_eq!(ds.cell(2, col("人员类别")), &Cell::text("预备党员"));
    }

    #[test]
    fn national_keeps_its_own_category_column() {
        let config = ReconConfig::default();
        let mut ds = Dataset::new(
            "全国",
            vec!["身份证号码".into(), "入党日期".into(), "人员类别".into()],
        );
        ds.push_row(vec![Cell::text("110101199001011234"), Cell::text("2025-03-01"), Cell::text("正式党员")]);

        let stats = enrich(&mut ds, SchemaKind::National, &config).unwrap();
        assert_eq!(stats.probationary, None);
        assert_eq!(ds.cell(0, 2), &Cell::text("正式党员"));
        assert_eq!(ds.cell(0, ds.column_index("党龄").unwrap()), &Cell::Int(0));
    }

    #[test]
    fn missing_join_column_degrades_to_empty() {
        let config = ReconConfig::default();
        let mut ds = Dataset::new("单机", vec!["身份证号".into()]);
        ds.push_row(vec![Cell::text("110101199001011234")]);

        let stats = enrich(&mut ds, SchemaKind::Local, &config).unwrap();
        assert_eq!(stats.tenure_missing, 1);
        assert_eq!(ds.cell(0, ds.column_index("党龄").unwrap()), &Cell::Empty);
        assert_eq!(ds.cell(0, ds.column_index("年龄").unwrap()), &Cell::Int(36));
        assert_eq!(ds.cell(0, ds.column_index("人员类别").unwrap()), &Cell::text("正式党员"));
    }

    #[test]
    fn existing_sequence_column_is_overwritten() {
        let config = ReconConfig::default();
        let mut ds = Dataset::new("单机", vec!["序号".into(), "身份证号".into()]);
        ds.push_row(vec![Cell::Int(10), Cell::text("A1")]);
        ds.push_row(vec![Cell::Int(20), Cell::text("A2")]);

        enrich(&mut ds, SchemaKind::Local, &config).unwrap();
        assert_eq!(ds.columns[0], "序号");
        assert_eq!(ds.cell(0, 0), &Cell::Int(1));
        assert_eq!(ds.cell(1, 0), &Cell::Int(2));
    }

    #[test]
    fn missing_identity_column_is_fatal() {
        let config = ReconConfig::default();
        let mut ds = Dataset::new("单机", vec!["姓名".into()]);
        ds.push_row(vec![Cell::text("张三")]);
        assert!(matches!(
            enrich(&mut ds, SchemaKind::Local, &config),
            Err(ReconError::MissingColumn { .. })
        ));
    }
}
