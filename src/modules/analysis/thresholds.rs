/// Cutoffs used by the analyzers. None of them are learned.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// a weather correlation is surfaced below this p-value
    pub p_value_cutoff: f64,
    /// |r| above this is at least a moderate correlation
    pub significant_correlation: f64,
    /// |r| above this is a strong correlation
    pub strong_correlation: f64,
    pub min_laps_for_trend: usize,
    /// slopes within +-this many seconds per lap are stable
    pub trend_slope_s_per_lap: f64,
    pub consistency_high_score: f64,
    pub consistency_moderate_score: f64,
    pub section_consistency_high_std_s: f64,
    pub section_consistency_moderate_std_s: f64,
    pub max_priority_score: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            p_value_cutoff: 0.05,
            significant_correlation: 0.3,
            strong_correlation: 0.5,
            min_laps_for_trend: 3,
            trend_slope_s_per_lap: 0.1,
            consistency_high_score: 6.0,
            consistency_moderate_score: 4.0,
            section_consistency_high_std_s: 0.1,
            section_consistency_moderate_std_s: 0.3,
            max_priority_score: 10.0,
        }
    }
}
