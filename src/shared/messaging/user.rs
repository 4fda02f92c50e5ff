//! User Identity
//!
//! Identity types for the two parties of a conversation. Users are owned by
//! the authentication collaborator; this module only carries what messaging
//! needs to know about them.
//!
//! Both ids are opaque to messaging but are assumed to be UUIDs on the wire.
//! A list entry carrying any other id is skipped by the API client rather
//! than failing the whole response.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Opaque pregnancy identifier; the scope every conversation lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PregnancyId(pub Uuid);

impl PregnancyId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PregnancyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for PregnancyId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Role of a portal user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Clinician,
}

impl Role {
    /// The role this user is allowed to message.
    pub fn counterpart(self) -> Role {
        match self {
            Role::Patient => Role::Clinician,
            Role::Clinician => Role::Patient,
        }
    }

    /// Query-string form used by the directory endpoint
    pub fn as_query(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Clinician => "clinician",
        }
    }

    /// Parse from string (env/config)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Some(Role::Patient),
            "clinician" => Some(Role::Clinician),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// The signed-in user, as handed over by the authentication collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
    /// Active pregnancy for patients; clinicians usually carry none and take
    /// the pregnancy from the selected patient contact.
    pub pregnancy_id: Option<PregnancyId>,
}

impl CurrentUser {
    pub fn patient(id: UserId, pregnancy_id: PregnancyId) -> Self {
        Self {
            id,
            role: Role::Patient,
            pregnancy_id: Some(pregnancy_id),
        }
    }

    pub fn clinician(id: UserId) -> Self {
        Self {
            id,
            role: Role::Clinician,
            pregnancy_id: None,
        }
    }
}
