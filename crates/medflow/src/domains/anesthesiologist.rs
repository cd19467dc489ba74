//! Anesthesiologist dashboard API.

use medflow_cache::{CacheStore, Tag};
use medflow_client::RequestDescriptor;

use super::{actions, decode, kinds};
use crate::error::Result;
use crate::types::{CreateRecommendationRequest, Recommendation, VasScore};

/// Anesthesiologist domain API client.
#[derive(Debug, Clone)]
pub struct AnesthesiologistApi {
    store: CacheStore,
}

impl AnesthesiologistApi {
    pub(crate) fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Pain score history for a patient.
    pub async fn vas_scores(&self, patient_id: &str) -> Result<Vec<VasScore>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get(format!("anesthesiologist/patients/{}/vas", patient_id)),
                &[Tag::id(kinds::VAS_SCORE, patient_id)],
            )
            .await?;
        decode("vas scores", value)
    }

    /// Propose a recommendation for doctor review.
    pub async fn create_recommendation(
        &self,
        request: CreateRecommendationRequest,
    ) -> Result<Recommendation> {
        let value = self
            .store
            .write(
                &RequestDescriptor::post("anesthesiologist/recommendations").with_json(&request)?,
                actions::CREATE_RECOMMENDATION,
                &[Tag::kind(kinds::RECOMMENDATION)],
            )
            .await?;
        decode("recommendation", value)
    }
}
