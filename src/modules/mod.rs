pub mod analysis;
pub mod narrative;
pub mod redis;
pub mod telemetry_loader;

pub mod models {
    pub mod general;

    pub mod track;
    pub mod race;
    pub mod composite;
    pub mod section_recommendation;
    pub mod weather_recommendation;
    pub mod pattern_recommendation;
    pub mod coaching_insight;
}

pub mod helpers {
    pub mod general;
    pub mod logging;
    pub mod math;
    pub mod track;

    pub mod fairings {
        pub mod cors;
    }
}
