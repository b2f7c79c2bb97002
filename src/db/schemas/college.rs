//! College document schema
//!
//! A college is an institutional tenant: it scopes exactly one primary
//! Lead Faculty (the `lead_faculty` back-reference) and a set of Faculty
//! and Students.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for colleges
pub const COLLEGE_COLLECTION: &str = "colleges";

/// College document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollegeDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,

    /// Campus location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// The college's current primary Lead Faculty, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_faculty: Option<ObjectId>,
}

impl CollegeDoc {
    /// Create a new college document
    pub fn new(name: String, location: Option<String>) -> Self {
        Self {
            id: None,
            metadata: Metadata::new(),
            name,
            location,
            lead_faculty: None,
        }
    }
}

impl IntoIndexes for CollegeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Succession queries resolve colleges by their lead
            (
                doc! { "leadFaculty": 1 },
                Some(
                    IndexOptions::builder()
                        .name("lead_faculty_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CollegeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
