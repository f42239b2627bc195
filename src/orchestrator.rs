//! Analysis state and its transitions: (State, Event) -> Commands.
//!
//! Nothing in here performs I/O. `submit` freezes the draft into a request,
//! bumps the generation and asks for the primary fetch. A successful primary
//! arrival asks for the three secondary fetches, all tagged with the same
//! generation. Arrivals tagged with any other generation are dropped
//! unapplied, which is how a new submission supersedes requests still in
//! flight.
//!
//! ```text
//! Idle ──submit──► (validate) ──err──► Idle + notice
//!                      │
//!                      ▼
//!                 Submitting ──primary err──► Idle + notice
//!                      │
//!                 primary ok
//!                      ▼
//!              AwaitingSecondary ──last panel settles──► Ready
//! ```

use std::sync::Arc;

use crate::error::{AnalysisError, BackendError, Field, ValidationError};
use crate::logging::{log_panel, log_rejected, log_stale_drop, log_submit};
use crate::model::{
    AnalysisRequest, AnalysisResult, AreaScore, CompetitionSnapshot, Panel, ProjectionPoint,
    ReferenceCatalog, RiskAppetite, DEFAULT_BUSINESS_SIZE,
};

/// Monotonic tag identifying one submitted analysis.
pub type Generation = u64;

// =============================================================================
// Form draft
// =============================================================================

/// The form as the user is editing it. Budget stays raw text until submit.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisDraft {
    pub business_type: String,
    pub location_id: String,
    pub investment_budget: String,
    pub business_size: u32,
    pub risk_appetite: RiskAppetite,
}

impl Default for AnalysisDraft {
    fn default() -> Self {
        Self {
            business_type: String::new(),
            location_id: String::new(),
            investment_budget: String::new(),
            business_size: DEFAULT_BUSINESS_SIZE,
            risk_appetite: RiskAppetite::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    BusinessType(String),
    Location(String),
    InvestmentBudget(String),
    BusinessSize(u32),
    RiskAppetite(RiskAppetite),
}

impl AnalysisDraft {
    pub fn apply(&mut self, edit: DraftEdit) {
        match edit {
            DraftEdit::BusinessType(id) => self.business_type = id,
            DraftEdit::Location(id) => self.location_id = id,
            DraftEdit::InvestmentBudget(text) => self.investment_budget = text,
            DraftEdit::BusinessSize(size) => self.business_size = size,
            DraftEdit::RiskAppetite(risk) => self.risk_appetite = risk,
        }
    }

    /// Freeze into a request. Business size and risk appetite never block.
    pub fn validate(&self) -> Result<AnalysisRequest, ValidationError> {
        let business_type = self.business_type.trim();
        if business_type.is_empty() {
            return Err(ValidationError::MissingField(Field::BusinessType));
        }
        let location_id = self.location_id.trim();
        if location_id.is_empty() {
            return Err(ValidationError::MissingField(Field::Location));
        }
        let investment_budget = parse_budget(&self.investment_budget)?;
        let business_size = if self.business_size == 0 {
            DEFAULT_BUSINESS_SIZE
        } else {
            self.business_size
        };

        Ok(AnalysisRequest {
            business_type: business_type.to_string(),
            location_id: location_id.to_string(),
            investment_budget,
            business_size,
            risk_appetite: self.risk_appetite,
        })
    }
}

pub fn validate(draft: &AnalysisDraft) -> Result<AnalysisRequest, ValidationError> {
    draft.validate()
}

/// Accepts "80000", "80,000" and "$80,000.50".
fn parse_budget(text: &str) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(Field::InvestmentBudget));
    }
    let cleaned: String = trimmed
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ValidationError::InvalidBudget(text.to_string())),
    }
}

// =============================================================================
// Secondary slots
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Absent,
    Pending,
    Present(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Absent
    }
}

impl<T> Slot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    pub fn present(&self) -> Option<&T> {
        match self {
            Slot::Present(value) => Some(value),
            _ => None,
        }
    }

    fn settle(&mut self, outcome: Result<T, BackendError>) -> Result<(), BackendError> {
        match outcome {
            Ok(value) => {
                *self = Slot::Present(value);
                Ok(())
            }
            Err(err) => {
                *self = Slot::Absent;
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondaryData {
    pub financial: Slot<Vec<ProjectionPoint>>,
    pub competition: Slot<CompetitionSnapshot>,
    pub ranking: Slot<Vec<AreaScore>>,
}

impl SecondaryData {
    fn pending() -> Self {
        Self {
            financial: Slot::Pending,
            competition: Slot::Pending,
            ranking: Slot::Pending,
        }
    }

    pub fn is_pending(&self, panel: Panel) -> bool {
        match panel {
            Panel::Financial => self.financial.is_pending(),
            Panel::Competition => self.competition.is_pending(),
            Panel::Ranking => self.ranking.is_pending(),
        }
    }

    pub fn is_present(&self, panel: Panel) -> bool {
        match panel {
            Panel::Financial => self.financial.present().is_some(),
            Panel::Competition => self.competition.present().is_some(),
            Panel::Ranking => self.ranking.present().is_some(),
        }
    }

    pub fn any_pending(&self) -> bool {
        Panel::ALL.iter().any(|p| self.is_pending(*p))
    }
}

// =============================================================================
// Events and commands
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryOutcome {
    Financial(Result<Vec<ProjectionPoint>, BackendError>),
    Competition(Result<CompetitionSnapshot, BackendError>),
    Ranking(Result<Vec<AreaScore>, BackendError>),
}

impl SecondaryOutcome {
    pub fn panel(&self) -> Panel {
        match self {
            SecondaryOutcome::Financial(_) => Panel::Financial,
            SecondaryOutcome::Competition(_) => Panel::Competition,
            SecondaryOutcome::Ranking(_) => Panel::Ranking,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Edit(DraftEdit),
    Submit,
    CatalogArrived(Result<ReferenceCatalog, AnalysisError>),
    PrimaryArrived {
        generation: Generation,
        outcome: Result<AnalysisResult, BackendError>,
    },
    SecondaryArrived {
        generation: Generation,
        outcome: SecondaryOutcome,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchPrimary {
        generation: Generation,
        request: AnalysisRequest,
    },
    FetchSecondary {
        generation: Generation,
        panel: Panel,
        request: AnalysisRequest,
    },
    /// Show a transient notice to the user.
    Notify(AnalysisError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// State changed.
    Applied,
    /// Refused (invalid draft, repeated catalog); state unchanged.
    Rejected,
    /// Tagged for a superseded generation; state unchanged.
    Stale,
}

#[derive(Debug)]
pub struct Transition {
    pub disposition: Disposition,
    pub commands: Vec<Command>,
}

impl Transition {
    fn applied(commands: Vec<Command>) -> Self {
        Self { disposition: Disposition::Applied, commands }
    }

    fn rejected(commands: Vec<Command>) -> Self {
        Self { disposition: Disposition::Rejected, commands }
    }

    fn stale() -> Self {
        Self { disposition: Disposition::Stale, commands: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    AwaitingSecondary,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    NotLoaded,
    Loaded,
    Failed,
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Debug)]
pub struct AnalysisOrchestrator {
    draft: AnalysisDraft,
    catalog: Arc<ReferenceCatalog>,
    catalog_status: CatalogStatus,
    active: Option<AnalysisRequest>,
    result: Option<AnalysisResult>,
    secondary: SecondaryData,
    phase: Phase,
    generation: Generation,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOrchestrator {
    pub fn new() -> Self {
        Self {
            draft: AnalysisDraft::default(),
            catalog: Arc::new(ReferenceCatalog::default()),
            catalog_status: CatalogStatus::NotLoaded,
            active: None,
            result: None,
            secondary: SecondaryData::default(),
            phase: Phase::Idle,
            generation: 0,
        }
    }

    pub fn draft(&self) -> &AnalysisDraft {
        &self.draft
    }

    pub fn catalog(&self) -> &Arc<ReferenceCatalog> {
        &self.catalog
    }

    pub fn catalog_status(&self) -> CatalogStatus {
        self.catalog_status
    }

    /// The frozen request of the current generation.
    pub fn active_request(&self) -> Option<&AnalysisRequest> {
        self.active.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn secondary(&self) -> &SecondaryData {
        &self.secondary
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn in_flight(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn apply(&mut self, event: Event) -> Transition {
        match event {
            Event::Edit(edit) => {
                self.draft.apply(edit);
                Transition::applied(Vec::new())
            }
            Event::Submit => self.on_submit(),
            Event::CatalogArrived(outcome) => self.on_catalog(outcome),
            Event::PrimaryArrived { generation, outcome } => self.on_primary(generation, outcome),
            Event::SecondaryArrived { generation, outcome } => self.on_secondary(generation, outcome),
        }
    }

    fn on_submit(&mut self) -> Transition {
        let request = match self.draft.validate() {
            Ok(request) => request,
            Err(err) => {
                log_rejected(&err.to_string());
                return Transition::rejected(vec![Command::Notify(err.into())]);
            }
        };

        self.generation += 1;
        self.result = None;
        self.secondary = SecondaryData::default();
        self.phase = Phase::Submitting;
        self.active = Some(request.clone());

        log_submit(
            self.generation,
            &request.fingerprint(),
            &request.business_type,
            &request.location_id,
            request.investment_budget,
        );
        Transition::applied(vec![Command::FetchPrimary {
            generation: self.generation,
            request,
        }])
    }

    fn on_catalog(&mut self, outcome: Result<ReferenceCatalog, AnalysisError>) -> Transition {
        if self.catalog_status == CatalogStatus::Loaded {
            return Transition::rejected(Vec::new());
        }
        match outcome {
            Ok(catalog) => {
                self.catalog = Arc::new(catalog);
                self.catalog_status = CatalogStatus::Loaded;
                Transition::applied(Vec::new())
            }
            Err(err) => {
                self.catalog_status = CatalogStatus::Failed;
                Transition::applied(vec![Command::Notify(err)])
            }
        }
    }

    fn on_primary(&mut self, generation: Generation, outcome: Result<AnalysisResult, BackendError>) -> Transition {
        if generation != self.generation || self.phase != Phase::Submitting {
            log_stale_drop("primary", generation, self.generation);
            return Transition::stale();
        }

        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.secondary = SecondaryData::pending();
                self.phase = Phase::AwaitingSecondary;
                let commands = match &self.active {
                    Some(request) => Panel::ALL
                        .iter()
                        .map(|panel| Command::FetchSecondary {
                            generation,
                            panel: *panel,
                            request: request.clone(),
                        })
                        .collect(),
                    None => Vec::new(),
                };
                Transition::applied(commands)
            }
            Err(err) => {
                self.result = None;
                self.phase = Phase::Idle;
                Transition::applied(vec![Command::Notify(AnalysisError::PrimaryAnalysis(err))])
            }
        }
    }

    fn on_secondary(&mut self, generation: Generation, outcome: SecondaryOutcome) -> Transition {
        let panel = outcome.panel();
        if generation != self.generation || !self.secondary.is_pending(panel) {
            log_stale_drop(panel.as_str(), generation, self.generation);
            return Transition::stale();
        }

        let settled = match outcome {
            SecondaryOutcome::Financial(r) => {
                let len = r.as_ref().map(|v| v.len()).unwrap_or(0);
                self.secondary.financial.settle(r).map(|_| len)
            }
            SecondaryOutcome::Competition(r) => {
                let len = r.as_ref().map(|c| c.nearby_businesses.len()).unwrap_or(0);
                self.secondary.competition.settle(r).map(|_| len)
            }
            SecondaryOutcome::Ranking(r) => {
                let len = r.as_ref().map(|v| v.len()).unwrap_or(0);
                self.secondary.ranking.settle(r).map(|_| len)
            }
        };
        match settled {
            Ok(items) => log_panel(generation, panel.as_str(), Ok(items)),
            Err(source) => {
                let err = AnalysisError::SecondaryAnalysis { panel, source };
                log_panel(generation, panel.as_str(), Err(err.to_string().as_str()));
            }
        }

        if !self.secondary.any_pending() {
            self.phase = Phase::Ready;
        }
        Transition::applied(Vec::new())
    }
}
