use std::fmt;

/// Treatment arm assigned to a respondent, derived from the indicator flags
/// in the raw survey extract. Exactly one label applies to every respondent
/// retained for analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreatmentGroup {
    SpilloverControl,
    SmallTransfer,
    LumpSum,
    Monthly,
    LargeTransfer,
}

impl TreatmentGroup {
    /// Fixed iteration order used everywhere a deterministic group order is
    /// needed (aggregation, summary export).
    pub const ALL: [TreatmentGroup; 5] = [
        TreatmentGroup::SpilloverControl,
        TreatmentGroup::SmallTransfer,
        TreatmentGroup::LumpSum,
        TreatmentGroup::Monthly,
        TreatmentGroup::LargeTransfer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TreatmentGroup::SpilloverControl => "Spillover Control",
            TreatmentGroup::SmallTransfer => "Small Transfer",
            TreatmentGroup::LumpSum => "Lump Sum",
            TreatmentGroup::Monthly => "Monthly",
            TreatmentGroup::LargeTransfer => "Large Transfer",
        }
    }
}

impl fmt::Display for TreatmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw treatment-assignment indicators for a single row, before label
/// resolution. Null cells in the source file are read as `false`.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndicatorFlags {
    pub treat: bool,
    pub purecontrol: bool,
    pub lump: bool,
    pub monthly: bool,
    pub large: bool,
    pub small: bool,
}

/// Outcome of resolving the indicator flags to a categorical label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupResolution {
    Assigned(TreatmentGroup),
    /// No label applies. Covers the pure-control cohort, which is excluded
    /// from the analysis rather than treated as an error.
    Unresolved,
    /// The flags contradict each other (more than one arm claimed, or an
    /// arm flag on an untreated row). This violates the one-label invariant
    /// and must surface as a data error.
    Conflicting,
}

impl IndicatorFlags {
    pub fn resolve(&self) -> GroupResolution {
        let arm_flags = [self.lump, self.monthly, self.large, self.small];
        let arms_set = arm_flags.iter().filter(|&&set| set).count();

        if !self.treat {
            if arms_set > 0 {
                return GroupResolution::Conflicting;
            }
            if self.purecontrol {
                return GroupResolution::Unresolved;
            }
            return GroupResolution::Assigned(TreatmentGroup::SpilloverControl);
        }

        if self.purecontrol {
            return GroupResolution::Conflicting;
        }

        match arms_set {
            0 => GroupResolution::Unresolved,
            1 => {
                let group = if self.lump {
                    TreatmentGroup::LumpSum
                } else if self.monthly {
                    TreatmentGroup::Monthly
                } else if self.large {
                    TreatmentGroup::LargeTransfer
                } else {
                    TreatmentGroup::SmallTransfer
                };
                GroupResolution::Assigned(group)
            }
            _ => GroupResolution::Conflicting,
        }
    }
}

/// One survey participant retained for analysis: labeled, gendered, and with
/// both index measurements present.
#[derive(Clone, Debug)]
pub struct Respondent {
    pub survey_id: String,
    pub village: Option<i64>,
    pub group: TreatmentGroup,
    pub gender: Gender,
    /// Baseline value of the standardized psychological wellbeing index.
    pub baseline: f64,
    /// Endline value of the same index.
    pub endline: f64,
}

impl Respondent {
    pub fn delta(&self) -> f64 {
        self.endline - self.baseline
    }
}

/// One record per non-empty (group, gender) pair. Computed once per run and
/// immutable thereafter; consumed by the renderer and the optional export.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub group: TreatmentGroup,
    pub gender: Gender,
    pub mean_baseline: f64,
    pub mean_endline: f64,
    /// mean(endline) - mean(baseline) for the rows in this pair.
    pub delta: f64,
    /// Delta rounded to two decimal places for display.
    pub delta_display: String,
    /// Approximate percentile shift implied by the delta, e.g.
    /// "≈ 50th → 60th percentile".
    pub percentile_shift: String,
}
