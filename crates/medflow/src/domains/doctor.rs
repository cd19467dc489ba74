//! Doctor dashboard API.

use medflow_cache::{CacheStore, Tag};
use medflow_client::RequestDescriptor;

use super::{actions, decode, kinds};
use crate::error::Result;
use crate::types::{Patient, Recommendation, RejectRecommendationRequest};

/// Doctor domain API client.
#[derive(Debug, Clone)]
pub struct DoctorApi {
    store: CacheStore,
}

impl DoctorApi {
    pub(crate) fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// All recommendations visible to the doctor.
    pub async fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get("doctor/recommendations"),
                &[Tag::kind(kinds::RECOMMENDATION)],
            )
            .await?;
        decode("recommendations", value)
    }

    /// Get a recommendation by ID.
    pub async fn recommendation(&self, id: &str) -> Result<Recommendation> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get(format!("doctor/recommendations/{}", id)),
                &[Tag::id(kinds::RECOMMENDATION, id)],
            )
            .await?;
        decode("recommendation", value)
    }

    /// Approve a pending recommendation.
    pub async fn approve_recommendation(&self, id: &str) -> Result<Recommendation> {
        let value = self
            .store
            .write(
                &RequestDescriptor::post(format!("doctor/recommendations/{}/approve", id)),
                actions::APPROVE_RECOMMENDATION,
                &[Tag::id(kinds::RECOMMENDATION, id)],
            )
            .await?;
        decode("recommendation", value)
    }

    /// Reject a pending recommendation with a reason.
    pub async fn reject_recommendation(
        &self,
        id: &str,
        reason: impl Into<String>,
    ) -> Result<Recommendation> {
        let request = RequestDescriptor::post(format!("doctor/recommendations/{}/reject", id))
            .with_json(&RejectRecommendationRequest {
                reason: reason.into(),
            })?;
        let value = self
            .store
            .write(
                &request,
                actions::REJECT_RECOMMENDATION,
                &[Tag::id(kinds::RECOMMENDATION, id)],
            )
            .await?;
        decode("recommendation", value)
    }

    /// Patients under the doctor's care.
    pub async fn patients(&self) -> Result<Vec<Patient>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get("doctor/patients"),
                &[Tag::kind(kinds::PATIENT)],
            )
            .await?;
        decode("patients", value)
    }
}
