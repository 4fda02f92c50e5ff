//! Contact Data Structure
//!
//! A contact is a role-complementary user the current user may message,
//! projected from the directory query. Contacts are not persisted locally.

use serde::{Deserialize, Serialize};

use super::user::{PregnancyId, Role, UserId};

/// Represents a counterpart in the messaging directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// The user ID of the contact
    pub user_id: UserId,
    /// Role of the contact
    pub role: Role,
    /// Optional display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Contact's email
    #[serde(default)]
    pub email: Option<String>,
    /// Pregnancy that relates this contact to the current user, when known
    #[serde(default)]
    pub pregnancy_id: Option<PregnancyId>,
}

impl Contact {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            display_name: None,
            email: None,
            pregnancy_id: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_pregnancy(mut self, pregnancy_id: PregnancyId) -> Self {
        self.pregnancy_id = Some(pregnancy_id);
        self
    }

    /// Get display name or fall back to email, then the raw id
    pub fn label(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.email.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.user_id.to_string())
    }

    /// Get avatar initial (first letter of the label)
    pub fn avatar_initial(&self) -> char {
        self.label()
            .chars()
            .next()
            .unwrap_or('?')
            .to_ascii_uppercase()
    }

    /// Case-insensitive match against display name and email
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [self.display_name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query))
    }
}
