//! Profile service - completing the profile that unlocks account creation.
//!
//! # Update Flow
//!
//! 1. Trim and validate the submitted fields
//! 2. The user must exist
//! 3. The national ID must not belong to another user
//! 4. Insert or replace the profile
//!
//! The storage layer also enforces national ID uniqueness, so two users racing
//! for the same ID cannot both succeed.

use std::sync::{Arc, LazyLock};

use chrono::{Datelike, Utc};
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{Profile, UpdateProfileRequest},
    repository::{ProfileRepository, UserRepository},
};

/// Earliest accepted birth year.
pub const MIN_BIRTH_YEAR: i32 = 1900;

static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone number pattern is valid"));

/// Check a profile's fields. Gender and team are already constrained by their types.
pub fn validate_profile(profile: &Profile, current_year: i32) -> Result<(), AppError> {
    let required = [
        (&profile.display_name, "display name is required"),
        (&profile.phone_number, "phone number is required"),
        (&profile.national_id, "national ID is required"),
    ];
    if let Some((_, message)) = required.iter().find(|(value, _)| value.is_empty()) {
        return Err(AppError::InvalidRequest(message.to_string()));
    }

    if !PHONE_NUMBER.is_match(&profile.phone_number) {
        return Err(AppError::InvalidRequest(
            "invalid phone number format".to_string(),
        ));
    }

    if profile.birth_year > current_year {
        return Err(AppError::InvalidRequest(
            "birth year cannot be in the future".to_string(),
        ));
    }
    if profile.birth_year < MIN_BIRTH_YEAR {
        return Err(AppError::InvalidRequest(format!(
            "birth year must be {MIN_BIRTH_YEAR} or later"
        )));
    }

    Ok(())
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { users, profiles }
    }

    /// Build the service over a single store implementing both contracts.
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository + ProfileRepository + 'static,
    {
        let store = Arc::new(store);
        Self::new(store.clone(), store)
    }

    /// Create or replace the user's profile.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a missing or malformed field (checked before any lookup)
    /// - `UserNotFound` if the user does not exist
    /// - `NationalIdTaken` if another user registered the same national ID
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, AppError> {
        let profile = request.into_profile(user_id);
        validate_profile(&profile, Utc::now().year())?;

        self.users.get_by_id(user_id).await?;

        if self
            .profiles
            .national_id_taken(&profile.national_id, user_id)
            .await?
        {
            return Err(AppError::NationalIdTaken);
        }

        let profile = self.profiles.upsert(profile).await?;
        info!(%user_id, team = %profile.team, "profile updated");
        Ok(profile)
    }

    /// Fails with `ProfileIncomplete` if the user exists but has no profile yet.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.users.get_by_id(user_id).await?;
        self.profiles.get_by_user_id(user_id).await
    }
}
