//! Dataset record types.
//!
//! The wire format mirrors the JSON produced by the listing harvester
//! (camelCase keys). Fields this pipeline does not interpret are carried
//! through a flattened map so a snapshot never drops data it did not
//! produce itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Contact details extracted from a company website.
///
/// `emails` and `phones` are sets: no duplicates, order not significant.
/// `BTreeSet` keeps snapshots deterministic for a given extraction result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    #[serde(default)]
    pub emails: BTreeSet<String>,
    #[serde(default)]
    pub phones: BTreeSet<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }
}

/// The person half of a record. Opaque to the pipeline, passed through
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_page: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_url: Option<String>,
    #[serde(default)]
    pub website: String,
    /// Present only after an enrichment attempt was persisted. Absent and
    /// empty are different states: absent means "never attempted" (still
    /// eligible), an empty value means "attempted, nothing found".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry in the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    #[serde(default)]
    pub person: Person,
    #[serde(default)]
    pub company: Company,
    /// One UTC timestamp appended per successful enrichment pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl_history: Option<Vec<DateTime<Utc>>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContactRecord {
    /// A record is eligible for enrichment iff it has a website to visit
    /// and no enrichment result has been persisted yet.
    pub fn is_eligible(&self) -> bool {
        !self.company.website.trim().is_empty() && self.company.contact_info.is_none()
    }

    /// Merge an enrichment result into the record. Only called with the
    /// final result of a completed attempt; partial results never land here.
    pub fn apply_enrichment(&mut self, info: ContactInfo, at: DateTime<Utc>) {
        self.company.contact_info = Some(info);
        self.crawl_history.get_or_insert_with(Vec::new).push(at);
    }
}
