//! Request and response types for the hospital API.
//!
//! These mirror the server's JSON. Unknown fields are ignored and most
//! optional fields default, so older servers keep decoding.

use medflow_client::Role;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Recommendations
// ─────────────────────────────────────────────────────────────────────────────

/// Review state of a treatment recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A treatment recommendation awaiting or past doctor review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub patient_id: String,
    /// Free-text recommendation.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status: RecommendationStatus,
    /// Who wrote it (nurse or anesthesiologist username).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Reason given on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Creation time (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Request to create a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecommendationRequest {
    pub patient_id: String,
    pub text: String,
}

/// Request body for rejecting a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRecommendationRequest {
    pub reason: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Patients and pain scores
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<String>,
}

/// A recorded visual-analogue-scale pain score (0-10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VasScore {
    pub id: String,
    pub patient_id: String,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<String>,
}

/// Request to record a pain score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitVasScoreRequest {
    pub patient_id: String,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SubmitVasScoreRequest {
    pub fn new(patient_id: impl Into<String>, score: u8) -> Self {
        Self {
            patient_id: patient_id.into(),
            score,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Administration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub role: Role,
    /// Whether the user still has to replace a temporary password.
    #[serde(default)]
    pub first_login: bool,
}

/// Request to create a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

/// A database backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    /// Creation time (ISO 8601).
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
