use std::fmt;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::{
    AnalysisRequest, AnalysisResult, AreaScore, BusinessType, CompetitionSnapshot, Location, Panel,
    ProjectionPoint,
};

mod http;

pub use http::HttpBackend;

/// Backend routes, relative to the API prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    BusinessTypes,
    Locations,
    PredictViability,
    FinancialProjection,
    CompetitionAnalysis,
    AreaHeatmap,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::BusinessTypes => "/business-types",
            Endpoint::Locations => "/locations",
            Endpoint::PredictViability => "/predict_viability",
            Endpoint::FinancialProjection => "/financial_projection",
            Endpoint::CompetitionAnalysis => "/competition_analysis",
            Endpoint::AreaHeatmap => "/area_heatmap",
        }
    }

    /// Endpoint backing a secondary panel.
    pub fn for_panel(panel: Panel) -> Self {
        match panel {
            Panel::Financial => Endpoint::FinancialProjection,
            Panel::Competition => Endpoint::CompetitionAnalysis,
            Panel::Ranking => Endpoint::AreaHeatmap,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The scoring backend. Every call is independent; none retries.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn business_types(&self) -> Result<Vec<BusinessType>, BackendError>;
    async fn locations(&self) -> Result<Vec<Location>, BackendError>;
    async fn predict_viability(&self, request: &AnalysisRequest) -> Result<AnalysisResult, BackendError>;
    /// Needs business type, location and the numeric budget.
    async fn financial_projection(&self, request: &AnalysisRequest) -> Result<Vec<ProjectionPoint>, BackendError>;
    /// Needs location and business type.
    async fn competition_analysis(&self, request: &AnalysisRequest) -> Result<CompetitionSnapshot, BackendError>;
    /// Needs business type only.
    async fn area_heatmap(&self, request: &AnalysisRequest) -> Result<Vec<AreaScore>, BackendError>;
}
