//! What the screen shows, derived from orchestrator state.
//!
//! [`project`] is total and keeps no memory of its own: the same
//! orchestrator state always yields the same [`ViewState`]. [`Dashboard`]
//! layers the display values on top, every number passing through
//! `metrics`.

use serde::Serialize;

use crate::metrics::{
    clamp_score, color_for_score, density_color, density_label, gauge_angle, gauge_arc_offset,
    gauge_needle_rotation, label_for_score, rank_areas, roi_percent_range, score_legend, DensityLevel,
    ScoreBand, ScoreColor, ScoreLabel,
};
use crate::model::{AnalysisResult, AreaScore, CompetitionSnapshot, Factor, NearbyBusiness, Panel, ProjectionPoint, RiskLevel};
use crate::orchestrator::AnalysisOrchestrator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PanelVisibility {
    pub financial: bool,
    pub competition: bool,
    pub ranking: bool,
}

impl PanelVisibility {
    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Financial => self.financial,
            Panel::Competition => self.competition,
            Panel::Ranking => self.ranking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    /// No result and nothing in flight: show the call to action.
    Empty,
    Loading,
    Result { panels: PanelVisibility },
}

/// In-flight wins over a present result. A pending panel is not visible.
pub fn project(state: &AnalysisOrchestrator) -> ViewState {
    if state.in_flight() {
        return ViewState::Loading;
    }
    match state.result() {
        None => ViewState::Empty,
        Some(_) => {
            let secondary = state.secondary();
            ViewState::Result {
                panels: PanelVisibility {
                    financial: secondary.is_present(Panel::Financial),
                    competition: secondary.is_present(Panel::Competition),
                    ranking: secondary.is_present(Panel::Ranking),
                },
            }
        }
    }
}

// =============================================================================
// Render model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorView {
    pub name: String,
    pub score: f64,
    pub description: String,
    pub color: ScoreColor,
}

impl FactorView {
    fn from_factor(factor: &Factor) -> Self {
        Self {
            name: factor.name.clone(),
            score: factor.score,
            description: factor.description.clone(),
            color: color_for_score(factor.score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub score: f64,
    /// Rounded for the headline number.
    pub display_score: String,
    pub color: ScoreColor,
    pub label: ScoreLabel,
    pub gauge_angle: f64,
    pub needle_rotation: f64,
    pub arc_offset: f64,
    pub success_probability: f64,
    pub risk_level: RiskLevel,
    pub roi_range: String,
    pub breakeven_months: u32,
    pub insights: String,
    pub positive_factors: Vec<FactorView>,
    pub risk_factors: Vec<FactorView>,
}

impl ScoreCard {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let score = clamp_score(result.viability_score);
        Self {
            score,
            display_score: format!("{:.0}", score),
            color: color_for_score(score),
            label: label_for_score(score),
            gauge_angle: gauge_angle(score),
            needle_rotation: gauge_needle_rotation(score),
            arc_offset: gauge_arc_offset(score),
            success_probability: result.success_probability,
            risk_level: result.risk_level,
            roi_range: roi_percent_range(result.expected_roi_min, result.expected_roi_max),
            breakeven_months: result.breakeven_months,
            insights: result.ai_insights.clone(),
            positive_factors: result.positive_factors.iter().map(FactorView::from_factor).collect(),
            risk_factors: result.risk_factors.iter().map(FactorView::from_factor).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialPanel {
    pub points: Vec<ProjectionPoint>,
    pub final_cumulative_profit: Option<f64>,
    /// First month whose cumulative profit is non-negative, if any.
    pub breakeven_month: Option<u32>,
}

impl FinancialPanel {
    pub fn from_points(points: &[ProjectionPoint]) -> Self {
        Self {
            points: points.to_vec(),
            final_cumulative_profit: points.last().map(|p| p.cumulative_profit),
            breakeven_month: points.iter().find(|p| p.cumulative_profit >= 0.0).map(|p| p.month),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitionPanel {
    pub total_competitors: u32,
    pub density_score: f64,
    pub density: DensityLevel,
    pub density_color: ScoreColor,
    pub nearby: Vec<NearbyBusiness>,
}

impl CompetitionPanel {
    pub fn from_snapshot(snapshot: &CompetitionSnapshot) -> Self {
        Self {
            total_competitors: snapshot.total_competitors,
            density_score: snapshot.density_score,
            density: density_label(snapshot.density_score),
            density_color: density_color(snapshot.density_score),
            nearby: snapshot.nearby_businesses.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedArea {
    pub rank: usize,
    pub area_name: String,
    pub score: f64,
    pub color: ScoreColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingPanel {
    pub areas: Vec<RankedArea>,
    pub legend: [ScoreBand; 3],
}

impl RankingPanel {
    pub fn from_areas(areas: &[AreaScore]) -> Self {
        Self {
            areas: rank_areas(areas)
                .into_iter()
                .enumerate()
                .map(|(i, a)| RankedArea {
                    rank: i + 1,
                    color: color_for_score(a.score),
                    area_name: a.area_name,
                    score: a.score,
                    lat: a.lat,
                    lng: a.lng,
                })
                .collect(),
            legend: score_legend(),
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub view: ViewState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<FinancialPanel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition: Option<CompetitionPanel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingPanel>,
}

impl Dashboard {
    pub fn from_state(state: &AnalysisOrchestrator) -> Self {
        let view = project(state);
        let mut dashboard = Dashboard {
            view,
            score: None,
            financial: None,
            competition: None,
            ranking: None,
        };
        let ViewState::Result { panels } = view else {
            return dashboard;
        };

        let secondary = state.secondary();
        dashboard.score = state.result().map(ScoreCard::from_result);
        if panels.financial {
            dashboard.financial = secondary.financial.present().map(|p| FinancialPanel::from_points(p));
        }
        if panels.competition {
            dashboard.competition = secondary.competition.present().map(CompetitionPanel::from_snapshot);
        }
        if panels.ranking {
            dashboard.ranking = secondary.ranking.present().map(|a| RankingPanel::from_areas(a));
        }
        dashboard
    }
}
