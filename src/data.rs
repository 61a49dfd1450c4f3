//! # Survey Loading and Filtering Module
//!
//! This module is the exclusive entry point for the raw survey extract. Its
//! responsibility is to read the tab-delimited dataset, validate it against
//! the fixed source schema, resolve each row's treatment-group label from the
//! assignment indicator columns, and hand the statistical core a clean vector
//! of analyzable respondents.
//!
//! - Strict Schema: Column names are not configurable. The module enforces
//!   the source column names (`surveyid`, `treatXlump`, `psy_index_z0`, ...),
//!   which eliminates a class of configuration errors.
//! - Documented Exclusions: rows without a baseline measurement carry no
//!   defined delta and are dropped. The pure-control cohort was never
//!   measured at baseline, so its exclusion falls out of the same rule.
//! - Loud Emptiness: an input that filters down to nothing is a data error,
//!   never an empty chart.

use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

use crate::types::{Gender, GroupResolution, IndicatorFlags, Respondent};

/// A comprehensive error type for all loading and filtering failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. It contains non-numeric data. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Indicator column '{column_name}' holds {value} at data row {row}; indicator columns must contain only 0 or 1."
    )]
    InvalidIndicator {
        column_name: String,
        value: i64,
        row: usize,
    },
    #[error(
        "Respondent '{survey_id}' carries conflicting treatment-assignment flags; each respondent must resolve to exactly one treatment group."
    )]
    ConflictingTreatmentFlags { survey_id: String },
    #[error(
        "Respondent '{survey_id}' is flagged as both female and male; gender indicators must be mutually exclusive."
    )]
    ConflictingGenderFlags { survey_id: String },
    #[error(
        "All {total} data rows were excluded during filtering; there is nothing to analyze. Check that the input file carries baseline measurements for the treated and spillover cohorts."
    )]
    NoAnalyzableRows { total: usize },
}

/// Loads the survey extract, applies the documented exclusion policy, and
/// returns one labeled [`Respondent`] per retained row.
pub fn load_survey(path: &str) -> Result<Vec<Respondent>, DataError> {
    let df = internal::read_frame(path)?;
    let rows = internal::filter_and_label(&df)?;
    println!(
        "Retained {} respondents with a resolved treatment group and both index measurements.",
        rows.len()
    );
    Ok(rows)
}

/// Internal module for schema validation and column extraction.
mod internal {
    use super::*;

    const SURVEY_ID: &str = "surveyid";
    const FEMALE: &str = "femaleres";
    const MALE: &str = "maleres";
    const VILLAGE: &str = "village";
    const TREAT: &str = "treat";
    const PURE_CONTROL: &str = "purecontrol";
    const ARM_LUMP: &str = "treatXlump";
    const ARM_MONTHLY: &str = "treatXmonthly";
    const ARM_LARGE: &str = "treatXlarge";
    const ARM_SMALL: &str = "treatXsmall";
    const BASELINE: &str = "psy_index_z0";
    const BASELINE_MISSING: &str = "psy_index_z_miss0";
    const ENDLINE: &str = "psy_index_z1";

    const REQUIRED_COLUMNS: [&str; 13] = [
        SURVEY_ID,
        FEMALE,
        MALE,
        VILLAGE,
        TREAT,
        PURE_CONTROL,
        ARM_LUMP,
        ARM_MONTHLY,
        ARM_LARGE,
        ARM_SMALL,
        BASELINE,
        BASELINE_MISSING,
        ENDLINE,
    ];

    /// Reads the tab-delimited file and projects it down to the columns the
    /// pipeline actually consumes. The extract ships with over a hundred
    /// columns; everything outside the schema is ignored.
    pub(super) fn read_frame(path: &str) -> Result<DataFrame, DataError> {
        println!("Loading survey data from '{path}'");

        let mut df = CsvReader::new(File::open(Path::new(path))?)
            .with_options(
                CsvReadOptions::default()
                    .with_has_header(true)
                    .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
            )
            .finish()?;

        let columns_set: HashSet<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        for col_name in REQUIRED_COLUMNS {
            if !columns_set.contains(col_name) {
                return Err(DataError::ColumnNotFound(col_name.to_string()));
            }
        }

        df = df.select(REQUIRED_COLUMNS)?;
        println!("Loaded {} data rows; all required columns found.", df.height());
        Ok(df)
    }

    /// Applies the exclusion policy row by row and attaches the derived
    /// categorical labels.
    pub(super) fn filter_and_label(df: &DataFrame) -> Result<Vec<Respondent>, DataError> {
        let n = df.height();

        let ids = extract_ids(df, n)?;
        let female = extract_indicator(df, FEMALE)?;
        let male = extract_indicator(df, MALE)?;
        let village = extract_optional_int(df, VILLAGE)?;
        let treat = extract_indicator(df, TREAT)?;
        let purecontrol = extract_indicator(df, PURE_CONTROL)?;
        let lump = extract_indicator(df, ARM_LUMP)?;
        let monthly = extract_indicator(df, ARM_MONTHLY)?;
        let large = extract_indicator(df, ARM_LARGE)?;
        let small = extract_indicator(df, ARM_SMALL)?;
        let baseline = extract_optional_numeric(df, BASELINE)?;
        let baseline_missing = extract_indicator(df, BASELINE_MISSING)?;
        let endline = extract_optional_numeric(df, ENDLINE)?;

        let mut respondents = Vec::with_capacity(n);
        let mut excluded_unlabeled = 0usize;
        let mut excluded_no_gender = 0usize;
        let mut excluded_missing_baseline = 0usize;
        let mut excluded_missing_endline = 0usize;
        let mut missing_flag_mismatches = 0usize;

        for i in 0..n {
            // The source ships an explicit missing-baseline flag alongside the
            // value itself. The value is authoritative; disagreement is only
            // worth a warning.
            if baseline_missing[i] != baseline[i].is_none() {
                missing_flag_mismatches += 1;
            }

            let flags = IndicatorFlags {
                treat: treat[i],
                purecontrol: purecontrol[i],
                lump: lump[i],
                monthly: monthly[i],
                large: large[i],
                small: small[i],
            };

            let group = match flags.resolve() {
                GroupResolution::Assigned(group) => group,
                GroupResolution::Unresolved => {
                    excluded_unlabeled += 1;
                    continue;
                }
                GroupResolution::Conflicting => {
                    return Err(DataError::ConflictingTreatmentFlags {
                        survey_id: ids[i].clone(),
                    });
                }
            };

            let gender = match (female[i], male[i]) {
                (true, false) => Gender::Female,
                (false, true) => Gender::Male,
                (false, false) => {
                    excluded_no_gender += 1;
                    continue;
                }
                (true, true) => {
                    return Err(DataError::ConflictingGenderFlags {
                        survey_id: ids[i].clone(),
                    });
                }
            };

            let Some(baseline_value) = baseline[i] else {
                excluded_missing_baseline += 1;
                continue;
            };
            let Some(endline_value) = endline[i] else {
                excluded_missing_endline += 1;
                continue;
            };

            respondents.push(Respondent {
                survey_id: ids[i].clone(),
                village: village[i],
                group,
                gender,
                baseline: baseline_value,
                endline: endline_value,
            });
        }

        if missing_flag_mismatches > 0 {
            log::warn!(
                "{missing_flag_mismatches} rows disagree between '{BASELINE_MISSING}' and the actual nullness of '{BASELINE}'; trusting the value column."
            );
        }
        log::debug!(
            "Exclusions: {excluded_unlabeled} without a treatment-group label (pure control or unassigned), {excluded_no_gender} without a gender indicator, {excluded_missing_baseline} labeled rows missing a baseline, {excluded_missing_endline} missing an endline."
        );
        let villages: HashSet<i64> = respondents.iter().filter_map(|r| r.village).collect();
        log::debug!(
            "Retained respondents span {} villages (no cluster weighting is applied).",
            villages.len()
        );

        if respondents.is_empty() {
            return Err(DataError::NoAnalyzableRows { total: n });
        }
        Ok(respondents)
    }

    /// Extracts a 0/1 indicator column as booleans. Null cells count as 0:
    /// the extract leaves assignment flags empty for cohorts they do not
    /// apply to.
    fn extract_indicator(df: &DataFrame, column_name: &str) -> Result<Vec<bool>, DataError> {
        let series = df.column(column_name)?;
        let casted = match series.cast(&DataType::Int64) {
            Ok(casted) => casted,
            Err(_) => {
                return Err(DataError::ColumnWrongType {
                    column_name: column_name.to_string(),
                    expected_type: "0/1 indicator",
                    found_type: format!("{:?}", series.dtype()),
                });
            }
        };
        if casted.null_count() > series.null_count() {
            return Err(DataError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "0/1 indicator",
                found_type: format!("{:?}", series.dtype()),
            });
        }

        let chunked = casted.i64()?.rechunk();
        let mut values = Vec::with_capacity(df.height());
        for (i, value) in chunked.into_iter().enumerate() {
            match value {
                None | Some(0) => values.push(false),
                Some(1) => values.push(true),
                Some(other) => {
                    return Err(DataError::InvalidIndicator {
                        column_name: column_name.to_string(),
                        value: other,
                        row: i + 1,
                    });
                }
            }
        }
        Ok(values)
    }

    /// Extracts a numeric column that may legitimately contain missing
    /// values. Non-finite entries are treated as missing.
    fn extract_optional_numeric(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<f64>>, DataError> {
        let series = df.column(column_name)?;
        let casted = match series.cast(&DataType::Float64) {
            Ok(casted) => casted,
            Err(_) => {
                return Err(DataError::ColumnWrongType {
                    column_name: column_name.to_string(),
                    expected_type: "f64 (numeric)",
                    found_type: format!("{:?}", series.dtype()),
                });
            }
        };
        if casted.null_count() > series.null_count() {
            return Err(DataError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "f64 (numeric)",
                found_type: format!("{:?}", series.dtype()),
            });
        }

        let chunked = casted.f64()?.rechunk();
        let values = chunked
            .into_iter()
            .map(|value| value.filter(|v| v.is_finite()))
            .collect();
        Ok(values)
    }

    /// Extracts an integer column that may contain missing values.
    fn extract_optional_int(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<i64>>, DataError> {
        let series = df.column(column_name)?;
        let casted = match series.cast(&DataType::Int64) {
            Ok(casted) => casted,
            Err(_) => {
                return Err(DataError::ColumnWrongType {
                    column_name: column_name.to_string(),
                    expected_type: "i64 (integer)",
                    found_type: format!("{:?}", series.dtype()),
                });
            }
        };
        let chunked = casted.i64()?.rechunk();
        Ok(chunked.into_iter().collect())
    }

    /// Reads the respondent identifier column as strings, falling back to
    /// sequential 1-based IDs for null or empty cells.
    fn extract_ids(df: &DataFrame, n: usize) -> Result<Vec<String>, DataError> {
        let series = df.column(SURVEY_ID)?;
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let value = series.get(i).unwrap_or(AnyValue::Null);
            ids.push(match value {
                AnyValue::Null => (i + 1).to_string(),
                _ => {
                    let text = value.str_value().to_string();
                    if text.is_empty() { (i + 1).to_string() } else { text }
                }
            });
        }
        Ok(ids)
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreatmentGroup;
    use approx::assert_abs_diff_eq;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    const HEADER: &str = "surveyid\tfemaleres\tmaleres\tvillage\ttreat\tpurecontrol\ttreatXlump\ttreatXmonthly\ttreatXlarge\ttreatXsmall\tpsy_index_z0\tpsy_index_z_miss0\tpsy_index_z1";

    /// A robust helper to create a temporary TSV file for testing.
    fn create_test_tsv(rows: &[&str]) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", HEADER)?;
        for row in rows {
            writeln!(file, "{}", row)?;
        }
        file.flush()?;
        Ok(file)
    }

    fn load(file: &NamedTempFile) -> Result<Vec<Respondent>, DataError> {
        load_survey(file.path().to_str().unwrap())
    }

    #[test]
    fn labels_are_assigned_from_indicator_columns() {
        let file = create_test_tsv(&[
            "s1\t1\t0\t10\t0\t0\t0\t0\t0\t0\t-0.20\t0\t0.05",
            "s2\t0\t1\t10\t1\t0\t1\t0\t0\t0\t0.10\t0\t0.45",
            "s3\t1\t0\t11\t1\t0\t0\t1\t0\t0\t-0.05\t0\t0.25",
            "s4\t0\t1\t11\t1\t0\t0\t0\t1\t0\t0.00\t0\t0.50",
            "s5\t1\t0\t12\t1\t0\t0\t0\t0\t1\t0.15\t0\t0.30",
        ])
        .unwrap();
        let rows = load(&file).unwrap();

        assert_eq!(rows.len(), 5);
        let groups: Vec<TreatmentGroup> = rows.iter().map(|r| r.group).collect();
        assert_eq!(
            groups,
            vec![
                TreatmentGroup::SpilloverControl,
                TreatmentGroup::LumpSum,
                TreatmentGroup::Monthly,
                TreatmentGroup::LargeTransfer,
                TreatmentGroup::SmallTransfer,
            ]
        );
        assert_eq!(rows[0].gender, Gender::Female);
        assert_eq!(rows[1].gender, Gender::Male);
        assert_eq!(rows[1].survey_id, "s2");
        assert_eq!(rows[0].village, Some(10));
        assert_abs_diff_eq!(rows[0].baseline, -0.20, epsilon = 1e-12);
        assert_abs_diff_eq!(rows[0].endline, 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(rows[1].delta(), 0.35, epsilon = 1e-12);
    }

    #[test]
    fn pure_control_rows_without_baseline_are_excluded() {
        let file = create_test_tsv(&[
            "kept\t1\t0\t10\t1\t0\t1\t0\t0\t0\t-0.10\t0\t0.30",
            "pc1\t1\t0\t20\t0\t1\t0\t0\t0\t0\t\t1\t0.10",
            "pc2\t0\t1\t20\t0\t1\t0\t0\t0\t0\t\t1\t-0.05",
        ])
        .unwrap();
        let rows = load(&file).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].survey_id, "kept");
    }

    #[test]
    fn rows_missing_an_endline_are_dropped() {
        let file = create_test_tsv(&[
            "kept\t1\t0\t10\t1\t0\t1\t0\t0\t0\t-0.10\t0\t0.30",
            "gone\t1\t0\t10\t1\t0\t1\t0\t0\t0\t-0.10\t0\t",
        ])
        .unwrap();
        let rows = load(&file).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].survey_id, "kept");
    }

    #[test]
    fn treated_rows_without_an_arm_flag_are_silently_excluded() {
        let file = create_test_tsv(&[
            "kept\t1\t0\t10\t0\t0\t0\t0\t0\t0\t-0.10\t0\t0.30",
            "gone\t1\t0\t10\t1\t0\t0\t0\t0\t0\t-0.10\t0\t0.30",
        ])
        .unwrap();
        let rows = load(&file).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group, TreatmentGroup::SpilloverControl);
    }

    #[test]
    fn rows_without_a_gender_indicator_are_silently_excluded() {
        let file = create_test_tsv(&[
            "kept\t0\t1\t10\t1\t0\t0\t1\t0\t0\t-0.10\t0\t0.30",
            "gone\t0\t0\t10\t1\t0\t0\t1\t0\t0\t-0.10\t0\t0.30",
        ])
        .unwrap();
        let rows = load(&file).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].survey_id, "kept");
    }

    #[test]
    fn conflicting_treatment_flags_are_a_data_error() {
        let file = create_test_tsv(&[
            "ok\t1\t0\t10\t1\t0\t1\t0\t0\t0\t-0.10\t0\t0.30",
            "bad\t1\t0\t10\t1\t0\t1\t0\t1\t0\t-0.10\t0\t0.30",
        ])
        .unwrap();
        let err = load(&file).unwrap_err();
        match err {
            DataError::ConflictingTreatmentFlags { survey_id } => assert_eq!(survey_id, "bad"),
            other => panic!("Expected ConflictingTreatmentFlags, got {:?}", other),
        }
    }

    #[test]
    fn conflicting_gender_flags_are_a_data_error() {
        let file = create_test_tsv(&["bad\t1\t1\t10\t1\t0\t1\t0\t0\t0\t-0.10\t0\t0.30"]).unwrap();
        let err = load(&file).unwrap_err();
        match err {
            DataError::ConflictingGenderFlags { survey_id } => assert_eq!(survey_id, "bad"),
            other => panic!("Expected ConflictingGenderFlags, got {:?}", other),
        }
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "surveyid\tfemaleres\tmaleres").unwrap();
        writeln!(file, "s1\t1\t0").unwrap();
        file.flush().unwrap();
        let err = load(&file).unwrap_err();
        match err {
            DataError::ColumnNotFound(col) => assert_eq!(col, "village"),
            other => panic!("Expected ColumnNotFound, got {:?}", other),
        }
    }

    #[test]
    fn non_numeric_index_column_is_reported() {
        let file = create_test_tsv(&[
            "s1\t1\t0\t10\t1\t0\t1\t0\t0\t0\tnot_a_number\t0\t0.30",
            "s2\t1\t0\t10\t1\t0\t1\t0\t0\t0\talso_bad\t0\t0.10",
        ])
        .unwrap();
        let err = load(&file).unwrap_err();
        match err {
            DataError::ColumnWrongType { column_name, .. } => {
                assert_eq!(column_name, "psy_index_z0")
            }
            other => panic!("Expected ColumnWrongType, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_indicator_is_reported() {
        let file =
            create_test_tsv(&["s1\t1\t0\t10\t2\t0\t1\t0\t0\t0\t-0.10\t0\t0.30"]).unwrap();
        let err = load(&file).unwrap_err();
        match err {
            DataError::InvalidIndicator {
                column_name,
                value,
                row,
            } => {
                assert_eq!(column_name, "treat");
                assert_eq!(value, 2);
                assert_eq!(row, 1);
            }
            other => panic!("Expected InvalidIndicator, got {:?}", other),
        }
    }

    #[test]
    fn fully_filtered_input_is_an_explicit_failure() {
        let file = create_test_tsv(&[
            "pc1\t1\t0\t20\t0\t1\t0\t0\t0\t0\t\t1\t0.10",
            "pc2\t0\t1\t20\t0\t1\t0\t0\t0\t0\t\t1\t-0.05",
        ])
        .unwrap();
        let err = load(&file).unwrap_err();
        match err {
            DataError::NoAnalyzableRows { total } => assert_eq!(total, 2),
            other => panic!("Expected NoAnalyzableRows, got {:?}", other),
        }
    }

    #[test]
    fn stale_missing_baseline_flag_is_tolerated() {
        // Flag says missing, value is present. The value wins.
        let file =
            create_test_tsv(&["s1\t1\t0\t10\t1\t0\t1\t0\t0\t0\t-0.10\t1\t0.30"]).unwrap();
        let rows = load(&file).unwrap();
        assert_eq!(rows.len(), 1);
        assert_abs_diff_eq!(rows[0].baseline, -0.10, epsilon = 1e-12);
    }
}
