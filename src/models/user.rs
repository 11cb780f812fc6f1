//! User and profile records.
//!
//! Registration and login live outside this crate. A user becomes eligible to
//! open accounts once a profile is on file, which `UpdateProfileRequest` creates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Other => "OTHER",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            "OTHER" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// Team the user works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    FrontEnd,
    BackEnd,
    Qa,
    Admin,
    Brse,
    Design,
    Others,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::FrontEnd => "FRONT_END",
            Team::BackEnd => "BACK_END",
            Team::Qa => "QA",
            Team::Admin => "ADMIN",
            Team::Brse => "BRSE",
            Team::Design => "DESIGN",
            Team::Others => "OTHERS",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FRONT_END" => Ok(Team::FrontEnd),
            "BACK_END" => Ok(Team::BackEnd),
            "QA" => Ok(Team::Qa),
            "ADMIN" => Ok(Team::Admin),
            "BRSE" => Ok(Team::Brse),
            "DESIGN" => Ok(Team::Design),
            "OTHERS" => Ok(Team::Others),
            other => Err(format!("unknown team: {other}")),
        }
    }
}

/// Personal data a user must supply before opening any account.
///
/// `national_id` is unique across users.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub phone_number: String,
    pub national_id: String,
    pub birth_year: i32,
    pub gender: Gender,
    pub team: Team,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a profile.
///
/// ```json
/// {
///   "display_name": "Nguyen Van A",
///   "avatar_url": null,
///   "phone_number": "+84901234567",
///   "national_id": "079090001234",
///   "birth_year": 1990,
///   "gender": "MALE",
///   "team": "BACK_END"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub phone_number: String,
    pub national_id: String,
    pub birth_year: i32,
    pub gender: Gender,
    pub team: Team,
}

impl UpdateProfileRequest {
    /// Build the profile to store. `created_at` is kept by the repository on update.
    pub fn into_profile(self, user_id: Uuid) -> Profile {
        let now = Utc::now();
        Profile {
            user_id,
            display_name: self.display_name.trim().to_string(),
            avatar_url: self.avatar_url.filter(|url| !url.trim().is_empty()),
            phone_number: self.phone_number.trim().to_string(),
            national_id: self.national_id.trim().to_string(),
            birth_year: self.birth_year,
            gender: self.gender,
            team: self.team,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub phone_number: String,
    pub national_id: String,
    pub birth_year: i32,
    pub gender: Gender,
    pub team: Team,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
            phone_number: profile.phone_number,
            national_id: profile.national_id,
            birth_year: profile.birth_year,
            gender: profile.gender,
            team: profile.team,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
