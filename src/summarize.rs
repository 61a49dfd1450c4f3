//! Aggregates retained respondents into one summary row per
//! (treatment group, gender) pair.
//!
//! Means are plain unweighted arithmetic means; no village or cluster
//! weighting and no standard errors, matching the presentation layer of the
//! source study rather than its inference tables.

use thiserror::Error;

use crate::percentile::PercentileShift;
use crate::types::{Gender, Respondent, SummaryRow, TreatmentGroup};

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error(
        "No respondents were available for aggregation. The filtered dataset is empty, which indicates a configuration or data problem upstream."
    )]
    EmptyInput,
}

/// Computes the (group, gender) summary table. Pairs with no members are
/// skipped; the output order is the fixed group order crossed with the fixed
/// gender order, so identical input always yields an identical table.
pub fn summarize(respondents: &[Respondent]) -> Result<Vec<SummaryRow>, SummaryError> {
    if respondents.is_empty() {
        return Err(SummaryError::EmptyInput);
    }

    let mut rows = Vec::new();
    for group in TreatmentGroup::ALL {
        for gender in Gender::ALL {
            let mut count = 0usize;
            let mut baseline_sum = 0.0;
            let mut endline_sum = 0.0;
            for respondent in respondents
                .iter()
                .filter(|r| r.group == group && r.gender == gender)
            {
                count += 1;
                baseline_sum += respondent.baseline;
                endline_sum += respondent.endline;
            }
            if count == 0 {
                log::debug!("No {gender} respondents in group '{group}'; pair skipped.");
                continue;
            }

            let mean_baseline = baseline_sum / count as f64;
            let mean_endline = endline_sum / count as f64;
            let delta = mean_endline - mean_baseline;
            rows.push(SummaryRow {
                group,
                gender,
                mean_baseline,
                mean_endline,
                delta,
                delta_display: format!("{delta:.2}"),
                percentile_shift: PercentileShift::from_delta(delta).to_string(),
            });
        }
    }
    Ok(rows)
}

/// Mean of the per-respondent deltas across the whole retained sample. This
/// is a true per-individual average, not an average of the subgroup means,
/// and feeds the chart's reference line.
pub fn overall_mean_delta(respondents: &[Respondent]) -> Option<f64> {
    if respondents.is_empty() {
        return None;
    }
    let sum: f64 = respondents.iter().map(Respondent::delta).sum();
    Some(sum / respondents.len() as f64)
}
