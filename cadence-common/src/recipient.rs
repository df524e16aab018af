//! Recipient data model.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::email::EmailAddress;

/// A recipient as supplied by the upstream contact source, before
/// validation. The email is a raw string here; it only becomes an
/// [`EmailAddress`] once the validator accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientInput {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub custom_fields: AHashMap<String, String>,
}

impl RecipientInput {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            company: None,
            custom_fields: AHashMap::new(),
        }
    }

    /// Promote to a validated [`Recipient`] with a parsed address.
    #[must_use]
    pub fn into_recipient(self, email: EmailAddress) -> Recipient {
        Recipient {
            id: self.id,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.company,
            custom_fields: self.custom_fields,
        }
    }
}

/// A single message recipient.
///
/// Recipients are immutable once accepted into a campaign's sendable set;
/// the engine only ever reads them. The `id` is assigned by the upstream
/// contact system and is the key under which send results accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub email: EmailAddress,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    /// Arbitrary merge fields supplied by the recipient source.
    #[serde(default)]
    pub custom_fields: AHashMap<String, String>,
}

impl Recipient {
    /// Build a recipient with only an id and address; the optional
    /// personalization fields start empty.
    #[must_use]
    pub fn new(id: impl Into<String>, email: EmailAddress) -> Self {
        Self {
            id: id.into(),
            email,
            first_name: None,
            last_name: None,
            company: None,
            custom_fields: AHashMap::new(),
        }
    }

    /// Look up a merge value by placeholder key.
    ///
    /// Well-known keys (`firstName`, `lastName`, `company`, `email`) are
    /// resolved from the structured fields; everything else falls through
    /// to the custom-field map.
    #[must_use]
    pub fn merge_value(&self, key: &str) -> Option<&str> {
        match key {
            "firstName" => self.first_name.as_deref(),
            "lastName" => self.last_name.as_deref(),
            "company" => self.company.as_deref(),
            "email" => Some(self.email.as_str()),
            custom => self.custom_fields.get(custom).map(String::as_str),
        }
    }
}
