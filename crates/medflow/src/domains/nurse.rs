//! Nurse dashboard API.

use medflow_cache::{CacheStore, Tag};
use medflow_client::RequestDescriptor;

use super::{actions, decode, kinds};
use crate::error::Result;
use crate::types::{CreateRecommendationRequest, Patient, Recommendation, SubmitVasScoreRequest, VasScore};

/// Nurse domain API client.
#[derive(Debug, Clone)]
pub struct NurseApi {
    store: CacheStore,
}

impl NurseApi {
    pub(crate) fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Recommendations still waiting for a doctor's decision.
    pub async fn pending_recommendations(&self) -> Result<Vec<Recommendation>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get("nurse/recommendations/pending"),
                &[Tag::kind(kinds::RECOMMENDATION)],
            )
            .await?;
        decode("recommendations", value)
    }

    /// Propose a recommendation for doctor review.
    pub async fn create_recommendation(
        &self,
        request: CreateRecommendationRequest,
    ) -> Result<Recommendation> {
        let value = self
            .store
            .write(
                &RequestDescriptor::post("nurse/recommendations").with_json(&request)?,
                actions::CREATE_RECOMMENDATION,
                &[Tag::kind(kinds::RECOMMENDATION)],
            )
            .await?;
        decode("recommendation", value)
    }

    /// Record a pain score.
    pub async fn submit_vas_score(&self, request: SubmitVasScoreRequest) -> Result<VasScore> {
        let tag = Tag::id(kinds::VAS_SCORE, request.patient_id.as_str());
        let value = self
            .store
            .write(
                &RequestDescriptor::post("nurse/vas").with_json(&request)?,
                actions::SUBMIT_VAS_SCORE,
                &[tag],
            )
            .await?;
        decode("vas score", value)
    }

    /// Patients on the nurse's ward.
    pub async fn patients(&self) -> Result<Vec<Patient>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get("nurse/patients"),
                &[Tag::kind(kinds::PATIENT)],
            )
            .await?;
        decode("patients", value)
    }
}
