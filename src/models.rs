use serde::{Deserialize, Serialize};

/// Every record kind held by the document store.
///
/// Serialized with a `kind` tag so the batch jobs and the api agree on the
/// exact shape of every stored body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    Track(TrackDoc),
    Race(RaceDoc),
    Composite(CompositeDoc),
    SectionRecommendation(SectionRecommendationDoc),
    WeatherRecommendation(WeatherRecommendationDoc),
    PatternRecommendation(PatternRecommendationDoc),
    CoachingInsight(CoachingInsightDoc),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackDoc {
    pub track_id: String,
    pub name: String,
    pub abbreviation: String,
    /// races of the track in the store
    pub race_count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RaceDoc {
    pub race_id: String,
    pub track_id: String,
    pub race_number: u32,
    pub driver_count: usize,
    pub lap_count: usize,
    /// sections declared by the sections file header, in track order
    pub sections: Vec<String>,
    pub missing_sections: Vec<String>,
    pub has_weather: bool,
    pub bad_rows: u64,
    pub warnings: Vec<String>,
    pub is_partial: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompositeScope {
    Race,
    Track,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompositeSection {
    pub section_name: String,
    pub best_time_s: f64,
    pub race_id: String,
    pub driver_id: String,
    pub lap: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompositeDoc {
    pub track_id: String,
    pub race_id: Option<String>,
    pub scope: CompositeScope,
    pub sections: Vec<CompositeSection>,
    /// declared sections without a single valid observation
    pub missing_sections: Vec<String>,
    pub theoretical_best_lap_s: f64,
    pub is_partial: bool,
}

impl CompositeDoc {
    pub fn section(&self, section_name: &str) -> Option<&CompositeSection> {
        self.sections
            .iter()
            .find(|section| section.section_name == section_name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LapGap {
    pub lap: u32,
    pub time_s: f64,
    pub gap_s: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SectionRecommendationDoc {
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub section_name: String,
    pub composite_time_s: f64,
    pub laps: Vec<LapGap>,
    pub mean_gap_s: f64,
    pub std_gap_s: f64,
    pub best_gap_s: f64,
    /// least squares slope of the gap over lap number
    pub gap_trend_s_per_lap: Option<f64>,
    /// lower is faster
    pub field_percentile: f64,
    pub priority_score: f64,
    pub commentary: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherVariable {
    AirTemp,
    TrackTemp,
    Humidity,
    WindSpeed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VariableStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WeatherSummary {
    pub air_temp_c: Option<VariableStats>,
    pub track_temp_c: Option<VariableStats>,
    pub humidity_pct: Option<VariableStats>,
    pub wind_speed: Option<VariableStats>,
    pub rain: bool,
    pub samples: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherCorrelation {
    pub variable: WeatherVariable,
    pub r: f64,
    pub p_value: f64,
    pub samples: usize,
    pub strength: CorrelationStrength,
    /// only surfaced correlations back a claim in the interpretation
    pub surfaced: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BestPerformer {
    pub driver_id: String,
    pub lap: u32,
    pub lap_time_s: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherRecommendationDoc {
    pub track_id: String,
    pub race_id: String,
    pub summary: WeatherSummary,
    pub correlations: Vec<WeatherCorrelation>,
    pub best_performer: Option<BestPerformer>,
    pub interpretation: Vec<String>,
    pub is_partial: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Degrading,
    Stable,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    High,
    Moderate,
    Low,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LapTrend {
    pub first_lap: u32,
    pub last_lap: u32,
    pub slope_s_per_lap: f64,
    pub direction: TrendDirection,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SectionConsistency {
    pub section_name: String,
    pub std_s: f64,
    pub level: ConsistencyLevel,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LapTime {
    pub lap: u32,
    pub lap_time_s: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PatternRecommendationDoc {
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    /// every recorded lap, timed or not
    pub laps: Vec<LapTime>,
    /// laps with a valid lap time
    pub lap_count: usize,
    pub best_lap_s: Option<f64>,
    pub mean_lap_s: Option<f64>,
    pub std_lap_s: Option<f64>,
    pub trend: Option<LapTrend>,
    pub coefficient_of_variation: Option<f64>,
    pub field_coefficient_of_variation: Option<f64>,
    pub consistency_score: Option<f64>,
    pub consistency: Option<ConsistencyLevel>,
    pub section_consistency: Vec<SectionConsistency>,
    pub strongest_section: Option<String>,
    pub weakest_section: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SectionGapSummary {
    pub section_name: String,
    pub composite_time_s: f64,
    pub mean_gap_s: f64,
    pub std_gap_s: f64,
    pub field_percentile: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PatternSummary {
    pub lap_count: usize,
    pub best_lap_s: Option<f64>,
    pub mean_lap_s: Option<f64>,
    pub consistency_score: Option<f64>,
    pub consistency: Option<ConsistencyLevel>,
    pub trend: Option<TrendDirection>,
}

/// Statistics handed to the narrative service. The shape is fixed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoachingPayload {
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub theoretical_best_lap_s: f64,
    pub section_gaps: Vec<SectionGapSummary>,
    pub pattern: PatternSummary,
    pub weather: WeatherSummary,
}

/// Text returned by the narrative service. The shape is fixed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Narrative {
    pub facts: Vec<String>,
    pub hypotheses: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoachingInsightDoc {
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub statistics: CoachingPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
}

/************ API VIEWS ************/

/// A driver of a race as listed by the api.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverSummary {
    pub driver_id: String,
    pub lap_count: usize,
    pub best_lap_s: Option<f64>,
    pub mean_lap_s: Option<f64>,
    pub consistency_score: Option<f64>,
    pub consistency: Option<ConsistencyLevel>,
}

impl From<&PatternRecommendationDoc> for DriverSummary {
    fn from(pattern: &PatternRecommendationDoc) -> Self {
        DriverSummary {
            driver_id: pattern.driver_id.clone(),
            lap_count: pattern.lap_count,
            best_lap_s: pattern.best_lap_s,
            mean_lap_s: pattern.mean_lap_s,
            consistency_score: pattern.consistency_score,
            consistency: pattern.consistency,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LapSection {
    pub section_name: String,
    pub time_s: f64,
    pub gap_s: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverLap {
    pub lap: u32,
    pub lap_time_s: Option<f64>,
    pub sections: Vec<LapSection>,
}

/// Every lap of a driver split into its section times.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverLaps {
    pub race_id: String,
    pub driver_id: String,
    pub laps: Vec<DriverLap>,
}

impl DriverLaps {
    /// # join the lap times with the section gaps of a driver
    /// sections follow `section_order`, unknown sections go last.
    pub fn build(
        pattern: &PatternRecommendationDoc,
        sections: &[SectionRecommendationDoc],
        section_order: &[String],
    ) -> DriverLaps {
        let position = |name: &str| {
            section_order
                .iter()
                .position(|section| section == name)
                .unwrap_or(section_order.len())
        };

        let mut ordered: Vec<&SectionRecommendationDoc> = sections
            .iter()
            .filter(|doc| doc.driver_id == pattern.driver_id)
            .collect();
        ordered.sort_by(|a, b| {
            position(&a.section_name)
                .cmp(&position(&b.section_name))
                .then_with(|| a.section_name.cmp(&b.section_name))
        });

        let laps = pattern
            .laps
            .iter()
            .map(|lap| DriverLap {
                lap: lap.lap,
                lap_time_s: lap.lap_time_s,
                sections: ordered
                    .iter()
                    .filter_map(|doc| {
                        let gap = doc.laps.iter().find(|gap| gap.lap == lap.lap)?;
                        Some(LapSection {
                            section_name: doc.section_name.clone(),
                            time_s: gap.time_s,
                            gap_s: gap.gap_s,
                        })
                    })
                    .collect(),
            })
            .collect();

        DriverLaps {
            race_id: pattern.race_id.clone(),
            driver_id: pattern.driver_id.clone(),
            laps,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Health {
    pub status: String,
    pub database: bool,
    pub cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> PatternRecommendationDoc {
        PatternRecommendationDoc {
            track_id: "barber".to_string(),
            race_id: "barber-race-1".to_string(),
            driver_id: "13".to_string(),
            laps: vec![
                LapTime { lap: 1, lap_time_s: Some(101.5) },
                LapTime { lap: 2, lap_time_s: None },
            ],
            lap_count: 1,
            best_lap_s: Some(101.5),
            mean_lap_s: Some(101.5),
            std_lap_s: None,
            trend: None,
            coefficient_of_variation: None,
            field_coefficient_of_variation: None,
            consistency_score: None,
            consistency: None,
            section_consistency: vec![],
            strongest_section: None,
            weakest_section: None,
        }
    }

    fn section(name: &str, laps: Vec<LapGap>) -> SectionRecommendationDoc {
        SectionRecommendationDoc {
            track_id: "barber".to_string(),
            race_id: "barber-race-1".to_string(),
            driver_id: "13".to_string(),
            section_name: name.to_string(),
            composite_time_s: 34.2,
            laps,
            mean_gap_s: 0.0,
            std_gap_s: 0.0,
            best_gap_s: 0.0,
            gap_trend_s_per_lap: None,
            field_percentile: 50.0,
            priority_score: 0.0,
            commentary: String::new(),
        }
    }

    #[test]
    fn documents_carry_their_kind() {
        let doc = Document::Track(TrackDoc {
            track_id: "cota".to_string(),
            name: "Circuit of the Americas".to_string(),
            abbreviation: "cota".to_string(),
            race_count: 1,
        });
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["kind"], "track");
        assert_eq!(serde_json::from_value::<Document>(json).unwrap(), doc);
    }

    #[test]
    fn breakdown_follows_section_order() {
        let sections = vec![
            section("Section 2", vec![LapGap { lap: 1, time_s: 41.0, gap_s: 1.0 }]),
            section(
                "Section 1",
                vec![
                    LapGap { lap: 1, time_s: 34.9, gap_s: 0.7 },
                    LapGap { lap: 2, time_s: 35.0, gap_s: 0.8 },
                ],
            ),
        ];
        let order = vec!["Section 1".to_string(), "Section 2".to_string()];

        let breakdown = DriverLaps::build(&pattern(), &sections, &order);

        assert_eq!(breakdown.laps.len(), 2);
        let names: Vec<&str> = breakdown.laps[0].sections.iter().map(|s| s.section_name.as_str()).collect();
        assert_eq!(names, vec!["Section 1", "Section 2"]);
        assert_eq!(breakdown.laps[1].lap_time_s, None);
        assert_eq!(breakdown.laps[1].sections.len(), 1);
    }
}
