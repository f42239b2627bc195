//! Controller flows against a scripted in-process backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use viabilityhub::api::{Backend, Endpoint};
use viabilityhub::config::Config;
use viabilityhub::controller::Controller;
use viabilityhub::error::{AnalysisError, BackendError};
use viabilityhub::metrics::{ScoreColor, ScoreLabel};
use viabilityhub::model::{
    AnalysisRequest, AnalysisResult, AreaScore, BusinessType, CompetitionSnapshot, Location, NearbyBusiness,
    ProjectionPoint, RiskLevel,
};
use viabilityhub::orchestrator::{Disposition, DraftEdit};
use viabilityhub::view::ViewState;

/// Secondaries for this business type wait on the gate.
const GATED: &str = "cafe";

struct ScriptedBackend {
    calls: Mutex<HashMap<Endpoint, usize>>,
    failing: HashSet<Endpoint>,
    gate: Semaphore,
}

impl ScriptedBackend {
    fn new(failing: &[Endpoint]) -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            failing: failing.iter().copied().collect(),
            gate: Semaphore::new(0),
        }
    }

    fn ungated(failing: &[Endpoint]) -> Self {
        let backend = Self::new(failing);
        backend.gate.add_permits(1_000);
        backend
    }

    fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls.lock().unwrap().get(&endpoint).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn enter(&self, endpoint: Endpoint) -> Result<(), BackendError> {
        *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;
        if self.failing.contains(&endpoint) {
            return Err(BackendError::Status { endpoint, status: 500 });
        }
        Ok(())
    }

    async fn wait_gate(&self, request: &AnalysisRequest) {
        if request.business_type == GATED {
            self.gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn business_types(&self) -> Result<Vec<BusinessType>, BackendError> {
        self.enter(Endpoint::BusinessTypes)?;
        Ok(["cafe", "gym"]
            .iter()
            .map(|id| BusinessType {
                id: id.to_string(),
                name: id.to_uppercase(),
                category: None,
                avg_startup_cost: None,
                avg_roi: None,
            })
            .collect())
    }

    async fn locations(&self) -> Result<Vec<Location>, BackendError> {
        self.enter(Endpoint::Locations)?;
        Ok(vec![Location {
            id: "nyc_manhattan".to_string(),
            area: "Manhattan".to_string(),
            city: "New York".to_string(),
            state: Some("NY".to_string()),
            lat: None,
            lng: None,
        }])
    }

    async fn predict_viability(&self, request: &AnalysisRequest) -> Result<AnalysisResult, BackendError> {
        self.enter(Endpoint::PredictViability)?;
        let score = if request.business_type == "cafe" { 82.0 } else { 64.0 };
        Ok(AnalysisResult {
            viability_score: score,
            success_probability: 70.0,
            breakeven_months: 18,
            expected_roi_min: 0.2,
            expected_roi_max: 0.35,
            risk_level: RiskLevel::Low,
            ai_insights: format!("{} looks promising", request.business_type),
            positive_factors: Vec::new(),
            risk_factors: Vec::new(),
        })
    }

    async fn financial_projection(&self, request: &AnalysisRequest) -> Result<Vec<ProjectionPoint>, BackendError> {
        self.wait_gate(request).await;
        self.enter(Endpoint::FinancialProjection)?;
        let months = if request.business_type == "cafe" { 24 } else { 36 };
        Ok((1..=months)
            .map(|month| ProjectionPoint {
                month,
                revenue: 10_000.0,
                expenses: 8_000.0,
                profit: Some(2_000.0),
                cumulative_profit: -request.investment_budget + 2_000.0 * month as f64,
            })
            .collect())
    }

    async fn competition_analysis(&self, request: &AnalysisRequest) -> Result<CompetitionSnapshot, BackendError> {
        self.wait_gate(request).await;
        self.enter(Endpoint::CompetitionAnalysis)?;
        Ok(CompetitionSnapshot {
            total_competitors: 12,
            density_score: 62.0,
            nearby_businesses: vec![NearbyBusiness {
                name: format!("Rival {}", request.business_type),
                distance: 0.4,
                rating: 4.2,
                reviews: 310,
            }],
        })
    }

    async fn area_heatmap(&self, request: &AnalysisRequest) -> Result<Vec<AreaScore>, BackendError> {
        self.wait_gate(request).await;
        self.enter(Endpoint::AreaHeatmap)?;
        Ok([("North", 40.0), ("Center", 88.0), ("South", 65.0)]
            .iter()
            .map(|(name, score)| AreaScore {
                area_name: format!("{} {}", request.business_type, name),
                score: *score,
                lat: None,
                lng: None,
            })
            .collect())
    }
}

fn controller(backend: &Arc<ScriptedBackend>) -> Controller<ScriptedBackend> {
    Controller::new(Arc::clone(backend), &Config::default())
}

fn fill(controller: &mut Controller<ScriptedBackend>, business_type: &str) {
    controller.edit(DraftEdit::BusinessType(business_type.to_string()));
    controller.edit(DraftEdit::Location("nyc_manhattan".to_string()));
    controller.edit(DraftEdit::InvestmentBudget("48000".to_string()));
}

fn record_notices(controller: &mut Controller<ScriptedBackend>) -> Arc<Mutex<Vec<String>>> {
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    controller.on_notice(move |err: &AnalysisError| {
        if let Some(message) = err.user_message() {
            sink.lock().unwrap().push(message);
        }
    });
    notices
}

#[tokio::test]
async fn invalid_form_never_reaches_backend() {
    let backend = Arc::new(ScriptedBackend::ungated(&[]));
    let mut controller = controller(&backend);
    let notices = record_notices(&mut controller);

    controller.edit(DraftEdit::BusinessType("cafe".to_string()));
    let err = controller.submit().unwrap_err();
    assert!(matches!(err, AnalysisError::Validation(_)));

    controller.edit(DraftEdit::Location("nyc_manhattan".to_string()));
    controller.edit(DraftEdit::InvestmentBudget("free".to_string()));
    assert!(controller.submit().is_err());

    controller.settle().await;
    assert_eq!(backend.total_calls(), 0);
    assert_eq!(controller.outstanding(), 0);
    assert_eq!(controller.view(), ViewState::Empty);
    assert_eq!(
        *notices.lock().unwrap(),
        vec!["Please fill in all required fields", "Please enter a valid investment budget"]
    );
}

#[tokio::test]
async fn view_goes_empty_loading_result() {
    let backend = Arc::new(ScriptedBackend::ungated(&[]));
    let mut controller = controller(&backend);
    let views = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&views);
    controller.on_render(move |view, _| {
        let name = match view {
            ViewState::Empty => "empty",
            ViewState::Loading => "loading",
            ViewState::Result { .. } => "result",
        };
        let mut seen = sink.lock().unwrap();
        if seen.last() != Some(&name) {
            seen.push(name);
        }
    });

    controller.load_catalog().await.unwrap();
    fill(&mut controller, "cafe");
    controller.submit().unwrap();
    assert_eq!(controller.view(), ViewState::Loading);
    controller.settle().await;

    assert_eq!(*views.lock().unwrap(), vec!["empty", "loading", "result"]);

    let dashboard = controller.dashboard();
    let score = dashboard.score.expect("score card");
    assert_eq!(score.display_score, "82");
    assert_eq!(score.color, ScoreColor::Green);
    assert_eq!(score.label, ScoreLabel::Excellent);
    assert_eq!(score.risk_level, RiskLevel::Low);

    let ranking = dashboard.ranking.expect("ranking panel");
    let order: Vec<&str> = ranking.areas.iter().map(|a| a.area_name.as_str()).collect();
    assert_eq!(order, vec!["cafe Center", "cafe South", "cafe North"]);

    let financial = dashboard.financial.expect("financial panel");
    assert_eq!(financial.points.len(), 24);
    assert_eq!(financial.breakeven_month, Some(24));
    assert!(dashboard.competition.is_some());

    for endpoint in [
        Endpoint::PredictViability,
        Endpoint::FinancialProjection,
        Endpoint::CompetitionAnalysis,
        Endpoint::AreaHeatmap,
    ] {
        assert_eq!(backend.calls(endpoint), 1, "{endpoint}");
    }
}

#[tokio::test]
async fn resubmission_drops_superseded_secondaries() {
    let backend = Arc::new(ScriptedBackend::new(&[]));
    let mut controller = controller(&backend);

    fill(&mut controller, "cafe");
    let first = controller.submit().unwrap();
    assert_eq!(controller.next_arrival().await, Some(Disposition::Applied));
    // Cafe secondaries are now parked on the gate.
    assert_eq!(controller.outstanding(), 3);

    controller.edit(DraftEdit::BusinessType("gym".to_string()));
    let second = controller.submit().unwrap();
    assert!(second > first);

    // Gym primary plus its three secondaries.
    for _ in 0..4 {
        assert_eq!(controller.next_arrival().await, Some(Disposition::Applied));
    }

    backend.gate.add_permits(3);
    for _ in 0..3 {
        assert_eq!(controller.next_arrival().await, Some(Disposition::Stale));
    }
    assert_eq!(controller.next_arrival().await, None);

    let dashboard = controller.dashboard();
    assert_eq!(dashboard.score.map(|s| s.score), Some(64.0));
    assert_eq!(dashboard.financial.map(|f| f.points.len()), Some(36));
    let ranking = dashboard.ranking.expect("ranking panel");
    assert!(ranking.areas.iter().all(|a| a.area_name.starts_with("gym")));
    let competition = dashboard.competition.expect("competition panel");
    assert_eq!(competition.nearby[0].name, "Rival gym");
}

#[tokio::test]
async fn failed_panel_is_omitted_without_notice() {
    let backend = Arc::new(ScriptedBackend::ungated(&[Endpoint::CompetitionAnalysis]));
    let mut controller = controller(&backend);
    let notices = record_notices(&mut controller);

    fill(&mut controller, "gym");
    controller.submit().unwrap();
    controller.settle().await;

    let ViewState::Result { panels } = controller.view() else {
        panic!("expected a result view");
    };
    assert!(panels.financial);
    assert!(!panels.competition);
    assert!(panels.ranking);

    let dashboard = controller.dashboard();
    assert!(dashboard.competition.is_none());
    assert!(dashboard.financial.is_some());
    assert_eq!(dashboard.score.map(|s| s.score), Some(64.0));
    assert!(notices.lock().unwrap().is_empty());
}

#[tokio::test]
async fn primary_failure_shows_notice_and_skips_secondaries() {
    let backend = Arc::new(ScriptedBackend::ungated(&[Endpoint::PredictViability]));
    let mut controller = controller(&backend);
    let notices = record_notices(&mut controller);

    fill(&mut controller, "gym");
    controller.submit().unwrap();
    controller.settle().await;

    assert_eq!(controller.view(), ViewState::Empty);
    assert!(controller.state().result().is_none());
    assert_eq!(*notices.lock().unwrap(), vec!["Failed to analyze business viability"]);
    assert_eq!(backend.calls(Endpoint::PredictViability), 1);
    assert_eq!(backend.calls(Endpoint::FinancialProjection), 0);
    assert_eq!(backend.calls(Endpoint::CompetitionAnalysis), 0);
    assert_eq!(backend.calls(Endpoint::AreaHeatmap), 0);
}

#[tokio::test]
async fn catalog_failure_leaves_form_usable() {
    let backend = Arc::new(ScriptedBackend::ungated(&[Endpoint::Locations]));
    let mut controller = controller(&backend);
    let notices = record_notices(&mut controller);

    let err = controller.load_catalog().await.unwrap_err();
    assert!(matches!(err, AnalysisError::ReferenceLoad(_)));
    assert!(controller.state().catalog().is_empty());
    assert_eq!(*notices.lock().unwrap(), vec!["Failed to load initial data"]);

    fill(&mut controller, "gym");
    controller.submit().unwrap();
    controller.settle().await;
    assert!(matches!(controller.view(), ViewState::Result { .. }));
}
