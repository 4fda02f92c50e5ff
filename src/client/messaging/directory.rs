//! Contact Directory
//!
//! Resolves who the signed-in user may talk to. Patients see clinicians,
//! clinicians see patients that have an active pregnancy. A failed directory
//! query degrades to an empty list; "no contacts" is a normal state.

use std::collections::HashSet;

use crate::client::api::PortalApi;
use crate::shared::messaging::{Contact, CurrentUser, Role, UserId};

/// The counterpart list for one session, in directory order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
    /// Set once a load has completed, successfully or not
    loaded: bool,
    last_error: Option<String>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the backend for the current user's counterparts.
    ///
    /// Never fails: a backend error yields an empty directory with
    /// `last_error` set.
    pub async fn load<A>(api: &A, user: &CurrentUser) -> Self
    where
        A: PortalApi + ?Sized,
    {
        let role = user.role.counterpart();
        match api.list_contacts(role).await {
            Ok(raw) => {
                let contacts = scope_contacts(raw, user);
                tracing::debug!(count = contacts.len(), role = %role, "contact directory loaded");
                Self {
                    contacts,
                    loaded: true,
                    last_error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, role = %role, "contact directory unavailable, showing no contacts");
                Self {
                    contacts: Vec::new(),
                    loaded: true,
                    last_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Build a directory from an already fetched list.
    pub fn from_contacts(raw: Vec<Contact>, user: &CurrentUser) -> Self {
        Self {
            contacts: scope_contacts(raw, user),
            loaded: true,
            last_error: None,
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn first(&self) -> Option<&Contact> {
        self.contacts.first()
    }

    pub fn get(&self, user_id: UserId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.user_id == user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Get filtered contacts based on a search query
    pub fn filtered(&self, query: &str) -> Vec<&Contact> {
        self.contacts.iter().filter(|c| c.matches(query)).collect()
    }
}

/// Restrict a raw directory result to the contacts `user` may message.
fn scope_contacts(raw: Vec<Contact>, user: &CurrentUser) -> Vec<Contact> {
    let wanted = user.role.counterpart();
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|c| c.user_id != user.id)
        .filter(|c| c.role == wanted)
        // A clinician can only reach a patient through an active pregnancy.
        .filter(|c| wanted != Role::Patient || c.pregnancy_id.is_some())
        .filter(|c| seen.insert(c.user_id))
        .collect()
}
