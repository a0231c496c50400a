//! Wire shapes for contacts-directory listings.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPerson {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DirectoryPerson {
    /// The address this person is keyed on locally. Directory entries list
    /// addresses in preference order; the first one wins.
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .iter()
            .map(|e| e.trim())
            .find(|e| !e.is_empty())
    }

    pub fn primary_phone(&self) -> Option<&str> {
        self.phone_numbers
            .iter()
            .map(|p| p.trim())
            .find(|p| !p.is_empty())
    }
}
