// Wave Gate
// Wave lifecycle (inactive -> active -> inactive) plus the bulk access flips
// that must land together with each lifecycle edge

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::wave::{CreateWaveRequest, NewWave, UpdateWaveRequest, Wave, WaveChanges};
use crate::store::{RecordStore, StoreError, WaveStore};

#[derive(Debug, Error)]
pub enum WaveError {
    #[error("Wave not found")]
    NotFound,

    #[error("Active waves cannot be modified")]
    ActiveWaveImmutable,

    #[error("start_position must not exceed end_position")]
    InvalidRange,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct WaveService {
    store: Arc<dyn RecordStore>,
}

impl WaveService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn require_wave(&self, wave_id: Uuid) -> Result<Wave, WaveError> {
        self.store
            .find_wave(wave_id)
            .await?
            .ok_or(WaveError::NotFound)
    }

    /// Create an inactive wave covering an inclusive rank range
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_wave(&self, request: CreateWaveRequest) -> Result<Wave, WaveError> {
        if request.start_position > request.end_position {
            return Err(WaveError::InvalidRange);
        }

        let wave = self
            .store
            .insert_wave(NewWave::inactive(
                request.name,
                request.description,
                request.start_position,
                request.end_position,
            ))
            .await?;

        info!("Wave {} created ({}..={})", wave.id, wave.start_position, wave.end_position);
        Ok(wave)
    }

    /// Edit an inactive wave. Active waves are immutable: their range backs
    /// live access grants, so they must be deactivated first.
    #[instrument(skip(self, request))]
    pub async fn update_wave(
        &self,
        wave_id: Uuid,
        request: UpdateWaveRequest,
    ) -> Result<Wave, WaveError> {
        let wave = self.require_wave(wave_id).await?;
        if wave.is_active {
            return Err(WaveError::ActiveWaveImmutable);
        }

        // Validate the range the wave would end up with
        let start = request.start_position.unwrap_or(wave.start_position);
        let end = request.end_position.unwrap_or(wave.end_position);
        if start > end {
            return Err(WaveError::InvalidRange);
        }

        let updated = self
            .store
            .update_wave(
                wave_id,
                WaveChanges {
                    name: request.name,
                    description: request.description,
                    start_position: request.start_position,
                    end_position: request.end_position,
                    updated_at: Some(Utc::now()),
                },
            )
            .await?;

        Ok(updated)
    }

    /// Activate a wave and grant access to every user in its range, in one
    /// transaction. Activating an already-active wave is a no-op.
    #[instrument(skip(self))]
    pub async fn activate_wave(&self, wave_id: Uuid) -> Result<u64, WaveError> {
        let wave = self.require_wave(wave_id).await?;
        if wave.is_active {
            return Ok(0);
        }

        let granted = self.store.activate_wave(wave_id, Utc::now()).await?;
        info!("Wave {} activated, {} users granted access", wave_id, granted);
        Ok(granted)
    }

    /// Deactivate a wave and revoke access from its attached users, in one
    /// transaction. Membership is kept so a re-activation restores the set.
    #[instrument(skip(self))]
    pub async fn deactivate_wave(&self, wave_id: Uuid) -> Result<u64, WaveError> {
        let wave = self.require_wave(wave_id).await?;
        if !wave.is_active {
            return Ok(0);
        }

        let revoked = self.store.deactivate_wave(wave_id).await?;
        info!("Wave {} deactivated, {} users revoked", wave_id, revoked);
        Ok(revoked)
    }

    /// Delete a wave. Users are detached (membership cleared, access
    /// revoked) first; if that cannot complete, the wave stays untouched.
    #[instrument(skip(self))]
    pub async fn delete_wave(&self, wave_id: Uuid) -> Result<u64, WaveError> {
        self.require_wave(wave_id).await?;
        let detached = self.store.delete_wave(wave_id).await?;
        info!("Wave {} deleted, {} users detached", wave_id, detached);
        Ok(detached)
    }

    pub async fn get_wave(&self, wave_id: Uuid) -> Result<Wave, WaveError> {
        self.require_wave(wave_id).await
    }

    pub async fn list_waves(&self) -> Result<Vec<Wave>, WaveError> {
        Ok(self.store.list_waves().await?)
    }

    /// Recompute wave membership for every user from current ranks.
    /// Idempotent: a second run against unchanged ranks changes nothing.
    #[instrument(skip(self))]
    pub async fn assign_users_to_waves(&self) -> Result<u64, WaveError> {
        let waves = self.store.list_waves().await?;
        let changed = self.store.assign_wave_membership(&waves).await?;
        info!("Wave assignment touched {} users", changed);
        Ok(changed)
    }
}
