//! Admin dashboard API.

use medflow_cache::{CacheStore, Tag};
use medflow_client::RequestDescriptor;

use super::{actions, decode, kinds};
use crate::error::Result;
use crate::types::{Backup, CreateUserRequest, User};

/// Admin domain API client.
#[derive(Debug, Clone)]
pub struct AdminApi {
    store: CacheStore,
}

impl AdminApi {
    pub(crate) fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// List user accounts.
    pub async fn users(&self) -> Result<Vec<User>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get("admin/users"),
                &[Tag::kind(kinds::USER)],
            )
            .await?;
        decode("users", value)
    }

    /// Create a user account.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        let value = self
            .store
            .write(
                &RequestDescriptor::post("admin/users").with_json(&request)?,
                actions::CREATE_USER,
                &[Tag::kind(kinds::USER)],
            )
            .await?;
        decode("user", value)
    }

    /// List database backups.
    pub async fn backups(&self) -> Result<Vec<Backup>> {
        let value = self
            .store
            .read(
                &RequestDescriptor::get("admin/backups"),
                &[Tag::kind(kinds::BACKUP)],
            )
            .await?;
        decode("backups", value)
    }

    /// Start a database backup.
    pub async fn create_backup(&self) -> Result<Backup> {
        let value = self
            .store
            .write(
                &RequestDescriptor::post("admin/backups"),
                actions::CREATE_BACKUP,
                &[Tag::kind(kinds::BACKUP)],
            )
            .await?;
        decode("backup", value)
    }
}
