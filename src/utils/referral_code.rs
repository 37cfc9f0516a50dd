// Referral code generation with collision detection
// Short uppercase-alphanumeric codes, retried against the store a bounded
// number of times before giving up

use rand::{thread_rng, Rng};
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::store::{RecordStore, StoreError, WaitlistStore};

/// Ambiguous glyphs (0/O, 1/I/L) are left out; codes end up in screenshots
/// and support tickets.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

const DEFAULT_CODE_LENGTH: usize = 8;
const DEFAULT_MAX_RETRIES: usize = 5;

#[derive(Debug, Error)]
pub enum ReferralCodeError {
    #[error("Failed to generate unique code after maximum retries")]
    MaxRetriesExceeded,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct ReferralCodeGenerator {
    store: Arc<dyn RecordStore>,
    length: usize,
    max_retries: usize,
}

impl ReferralCodeGenerator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            length: DEFAULT_CODE_LENGTH,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Generate a code no existing member holds
    #[instrument(skip(self))]
    pub async fn generate(&self) -> Result<String, ReferralCodeError> {
        for attempt in 1..=self.max_retries {
            let code = Self::random_code(self.length);
            if !self.store.referral_code_exists(&code).await? {
                return Ok(code);
            }
            warn!(
                "Referral code collision on attempt {}/{}",
                attempt, self.max_retries
            );
        }
        Err(ReferralCodeError::MaxRetriesExceeded)
    }

    /// Uniform random code over the unambiguous alphabet
    pub fn random_code(length: usize) -> String {
        let mut rng = thread_rng();
        (0..length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}
