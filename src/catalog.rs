//! Reference data: the business-type and location choice lists.

use serde::Serialize;

use crate::api::Backend;
use crate::error::AnalysisError;
use crate::logging::log_catalog_loaded;
use crate::model::ReferenceCatalog;

pub struct ReferenceDataLoader<'a, B: Backend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> ReferenceDataLoader<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Both catalogs or neither. The two requests run concurrently and the
    /// first failure abandons the other.
    pub async fn load(&self) -> Result<ReferenceCatalog, AnalysisError> {
        let (business_types, locations) =
            tokio::try_join!(self.backend.business_types(), self.backend.locations())
                .map_err(AnalysisError::ReferenceLoad)?;
        log_catalog_loaded(business_types.len(), locations.len());
        Ok(ReferenceCatalog {
            business_types,
            locations,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

/// What the form's two dropdowns offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormOptions {
    pub business_types: Vec<Choice>,
    pub locations: Vec<Choice>,
}

impl FormOptions {
    pub fn from_catalog(catalog: &ReferenceCatalog) -> Self {
        Self {
            business_types: catalog
                .business_types
                .iter()
                .map(|b| Choice {
                    id: b.id.clone(),
                    label: b.name.clone(),
                })
                .collect(),
            locations: catalog
                .locations
                .iter()
                .map(|l| Choice {
                    id: l.id.clone(),
                    label: l.display_name(),
                })
                .collect(),
        }
    }
}
