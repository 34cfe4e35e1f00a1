//! User profile lookup for profile-substitution fills.

use crate::memory::KeyValueStore;
use async_trait::async_trait;
use cortex_common::error::StoreError;
use cortex_common::protocol::UserProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Store key holding the user profile document.
pub const PROFILE_KEY: &str = "cortex.user_profile";

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Profile for `persona`, or the default profile when `persona` is `None` or unknown.
    async fn profile(&self, persona: Option<&str>) -> Result<UserProfile, StoreError>;
}

/// Either a single profile or a default plus named personas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredProfiles {
    WithPersonas {
        #[serde(default)]
        default: UserProfile,
        personas: HashMap<String, UserProfile>,
    },
    Single(UserProfile),
}

impl StoredProfiles {
    pub fn select(self, persona: Option<&str>) -> UserProfile {
        match self {
            StoredProfiles::Single(p) => p,
            StoredProfiles::WithPersonas {
                default,
                mut personas,
            } => {
                let Some(name) = persona else {
                    return default;
                };
                let key = personas
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(name))
                    .cloned();
                match key.and_then(|k| personas.remove(&k)) {
                    Some(p) => p,
                    None => {
                        tracing::debug!(persona = name, "unknown persona, using default profile");
                        default
                    }
                }
            }
        }
    }
}

/// Reads the profile document from a `KeyValueStore` under `PROFILE_KEY`.
pub struct StoreProfileSource {
    store: Arc<dyn KeyValueStore>,
}

impl StoreProfileSource {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileSource for StoreProfileSource {
    async fn profile(&self, persona: Option<&str>) -> Result<UserProfile, StoreError> {
        let Some(value) = self.store.get(PROFILE_KEY).await? else {
            return Ok(UserProfile::default());
        };
        let stored: StoredProfiles = serde_json::from_value(value)?;
        Ok(stored.select(persona))
    }
}
