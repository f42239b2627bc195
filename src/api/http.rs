use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::api::{Backend, Endpoint};
use crate::config::Config;
use crate::error::{BackendError, ConfigError};
use crate::logging::{Domain, ProfileScope};
use crate::model::{
    AnalysisRequest, AnalysisResult, AreaScore, BusinessType, BusinessTypeEnvelope, CompetitionSnapshot,
    HeatmapEnvelope, Location, LocationEnvelope, ProjectionEnvelope, ProjectionPoint,
};

/// JSON-over-HTTP client for the scoring backend.
pub struct HttpBackend {
    client: Client,
    root: Url,
}

#[derive(Serialize)]
struct FinancialQuery<'a> {
    business_type: &'a str,
    investment_budget: f64,
    location_id: &'a str,
}

#[derive(Serialize)]
struct CompetitionQuery<'a> {
    location_id: &'a str,
    business_type: &'a str,
}

#[derive(Serialize)]
struct HeatmapQuery<'a> {
    business_type: &'a str,
}

impl HttpBackend {
    pub fn new(cfg: &Config) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            root: cfg.api_root()?,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url, BackendError> {
        self.root
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|e| BackendError::Transport {
                endpoint,
                message: e.to_string(),
            })
    }

    fn get(&self, endpoint: Endpoint) -> Result<RequestBuilder, BackendError> {
        Ok(self.client.get(self.url(endpoint)?))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        domain: Domain,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let _profile = ProfileScope::new(domain, endpoint.path());
        let resp = request.send().await.map_err(|e| classify(endpoint, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(|e| classify(endpoint, e))?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

fn classify(endpoint: Endpoint, err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout { endpoint }
    } else if err.is_decode() {
        BackendError::Decode {
            endpoint,
            message: err.to_string(),
        }
    } else {
        BackendError::Transport {
            endpoint,
            message: err.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn business_types(&self) -> Result<Vec<BusinessType>, BackendError> {
        let endpoint = Endpoint::BusinessTypes;
        let envelope: BusinessTypeEnvelope = self.fetch(endpoint, Domain::Catalog, self.get(endpoint)?).await?;
        Ok(envelope.business_types)
    }

    async fn locations(&self) -> Result<Vec<Location>, BackendError> {
        let endpoint = Endpoint::Locations;
        let envelope: LocationEnvelope = self.fetch(endpoint, Domain::Catalog, self.get(endpoint)?).await?;
        Ok(envelope.locations)
    }

    async fn predict_viability(&self, request: &AnalysisRequest) -> Result<AnalysisResult, BackendError> {
        let endpoint = Endpoint::PredictViability;
        let builder = self.client.post(self.url(endpoint)?).json(request);
        self.fetch(endpoint, Domain::Primary, builder).await
    }

    async fn financial_projection(&self, request: &AnalysisRequest) -> Result<Vec<ProjectionPoint>, BackendError> {
        let endpoint = Endpoint::FinancialProjection;
        let query = FinancialQuery {
            business_type: &request.business_type,
            investment_budget: request.investment_budget,
            location_id: &request.location_id,
        };
        let envelope: ProjectionEnvelope = self
            .fetch(endpoint, Domain::Secondary, self.get(endpoint)?.query(&query))
            .await?;
        Ok(envelope.projections)
    }

    async fn competition_analysis(&self, request: &AnalysisRequest) -> Result<CompetitionSnapshot, BackendError> {
        let endpoint = Endpoint::CompetitionAnalysis;
        let query = CompetitionQuery {
            location_id: &request.location_id,
            business_type: &request.business_type,
        };
        self.fetch(endpoint, Domain::Secondary, self.get(endpoint)?.query(&query)).await
    }

    async fn area_heatmap(&self, request: &AnalysisRequest) -> Result<Vec<AreaScore>, BackendError> {
        let endpoint = Endpoint::AreaHeatmap;
        let query = HeatmapQuery {
            business_type: &request.business_type,
        };
        let envelope: HeatmapEnvelope = self
            .fetch(endpoint, Domain::Secondary, self.get(endpoint)?.query(&query))
            .await?;
        Ok(envelope.heatmap)
    }
}
