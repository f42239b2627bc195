//! Derived display metrics.
//!
//! Every numeric field the dashboard shows passes through one of these
//! functions. They are pure and total: out-of-range input is clamped, never
//! rejected. The three-bucket color and the four-bucket label deliberately
//! use different cut points, and density classification uses strict `>`
//! where the score color uses `>=`.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::AreaScore;

/// Lower bound of the green bucket.
pub const STRONG_SCORE: f64 = 70.0;
/// Lower bound of the amber bucket.
pub const MODERATE_SCORE: f64 = 50.0;

pub const EXCELLENT_SCORE: f64 = 75.0;
pub const GOOD_SCORE: f64 = 60.0;
pub const FAIR_SCORE: f64 = 45.0;

/// Density strictly above this is High.
pub const HIGH_DENSITY: f64 = 75.0;
/// Density strictly above this is Medium.
pub const MEDIUM_DENSITY: f64 = 50.0;

pub const GAUGE_SWEEP_DEGREES: f64 = 180.0;
/// Length of the semicircular gauge arc in the 200x100 viewbox.
pub const GAUGE_ARC_LENGTH: f64 = 283.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreColor {
    Green,
    Amber,
    Red,
}

impl ScoreColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreColor::Green => "green",
            ScoreColor::Amber => "amber",
            ScoreColor::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::Good => "Good",
            ScoreLabel::Fair => "Fair",
            ScoreLabel::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DensityLevel {
    High,
    Medium,
    Low,
}

impl DensityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DensityLevel::High => "High",
            DensityLevel::Medium => "Medium",
            DensityLevel::Low => "Low",
        }
    }
}

/// Legend entry for the area ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBand {
    pub color: ScoreColor,
    pub label: &'static str,
}

/// Shared by the headline score and the area ranking.
pub fn color_for_score(score: f64) -> ScoreColor {
    if score >= STRONG_SCORE {
        ScoreColor::Green
    } else if score >= MODERATE_SCORE {
        ScoreColor::Amber
    } else {
        ScoreColor::Red
    }
}

/// Headline score only.
pub fn label_for_score(score: f64) -> ScoreLabel {
    if score >= EXCELLENT_SCORE {
        ScoreLabel::Excellent
    } else if score >= GOOD_SCORE {
        ScoreLabel::Good
    } else if score >= FAIR_SCORE {
        ScoreLabel::Fair
    } else {
        ScoreLabel::Poor
    }
}

/// Clamp to [0, 100]. NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Sweep of the semicircular gauge in degrees, 0 to 180.
pub fn gauge_angle(score: f64) -> f64 {
    clamp_score(score) / 100.0 * GAUGE_SWEEP_DEGREES
}

/// Needle rotation relative to vertical, -90 to 90.
pub fn gauge_needle_rotation(score: f64) -> f64 {
    gauge_angle(score) - GAUGE_SWEEP_DEGREES / 2.0
}

/// Dash offset that leaves `score` percent of the arc stroked.
pub fn gauge_arc_offset(score: f64) -> f64 {
    GAUGE_ARC_LENGTH - GAUGE_ARC_LENGTH * clamp_score(score) / 100.0
}

pub fn density_label(density: f64) -> DensityLevel {
    if density > HIGH_DENSITY {
        DensityLevel::High
    } else if density > MEDIUM_DENSITY {
        DensityLevel::Medium
    } else {
        DensityLevel::Low
    }
}

/// Saturated markets are bad news, so the colors run opposite to the score.
pub fn density_color(density: f64) -> ScoreColor {
    match density_label(density) {
        DensityLevel::High => ScoreColor::Red,
        DensityLevel::Medium => ScoreColor::Amber,
        DensityLevel::Low => ScoreColor::Green,
    }
}

fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Descending by score. Stable: equal scores keep their input order.
pub fn rank_areas(areas: &[AreaScore]) -> Vec<AreaScore> {
    let mut ranked = areas.to_vec();
    ranked.sort_by(|a, b| descending(a.score, b.score));
    ranked
}

fn descending(a: f64, b: f64) -> Ordering {
    rank_key(b).total_cmp(&rank_key(a))
}

/// "24% - 39%" from fractional rates.
pub fn roi_percent_range(min: f64, max: f64) -> String {
    format!("{:.0}% - {:.0}%", min * 100.0, max * 100.0)
}

pub fn score_legend() -> [ScoreBand; 3] {
    [
        ScoreBand { color: ScoreColor::Green, label: "High Score (70+)" },
        ScoreBand { color: ScoreColor::Amber, label: "Medium Score (50-70)" },
        ScoreBand { color: ScoreColor::Red, label: "Low Score (<50)" },
    ]
}
