//! Notification service, the owner of the notification lifecycle.
//!
//! Re-validates every request before it reaches storage and translates
//! storage failures into [`AppError`] categories.

use chrono::{Duration, Utc};

use courier_common::error::AppError;
use courier_common::types::Notification;

use crate::storage::NotificationStorage;
use crate::store::StorageError;
use crate::validation::{check_id, check_notification, parse_status};

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound(e.to_string()),
            StorageError::NotAffected => AppError::NotAffected(e.to_string()),
            StorageError::InvalidTransition { .. } => AppError::Validation(e.to_string()),
            StorageError::MissingIdentifier
            | StorageError::Database(_)
            | StorageError::Cache(_)
            | StorageError::Queue(_)
            | StorageError::Codec(_) => AppError::Storage(e.to_string()),
        }
    }
}

pub struct NotificationService {
    storage: NotificationStorage,
    min_lead: Duration,
}

impl NotificationService {
    pub fn new(storage: NotificationStorage, min_lead: Duration) -> Self {
        Self { storage, min_lead }
    }

    pub fn min_lead(&self) -> Duration {
        self.min_lead
    }

    /// Create a notification and schedule its delivery. Returns the new id.
    pub async fn create(&self, n: Notification) -> Result<i64, AppError> {
        check_notification(&n, Utc::now(), self.min_lead).map_err(AppError::Validation)?;
        Ok(self.storage.create(n).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Notification, AppError> {
        check_id(id).map_err(AppError::Validation)?;
        Ok(self.storage.get(id).await?)
    }

    /// Set the status of `id` to `status` (`pending` or `complete`).
    pub async fn update_status(&self, status: &str, id: i64) -> Result<(), AppError> {
        let status = parse_status(status).map_err(AppError::Validation)?;
        check_id(id).map_err(AppError::Validation)?;
        Ok(self.storage.update_status(status, id).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        check_id(id).map_err(AppError::Validation)?;
        Ok(self.storage.delete(id).await?)
    }
}
