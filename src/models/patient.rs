//! Patient identity
//!
//! A resolved patient identifier and the user -> patient link used to find it.

use std::fmt;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::error::InsightsError;

/// A resolved, non-empty patient identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    pub fn parse(raw: &str) -> Result<Self, InsightsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InsightsError::InvalidPatientId(
                "patient id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatientId {
    type Error = InsightsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

/// Link between an authenticated user and their patient record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientLink {
    pub user_id: String,
    pub patient_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PatientLink {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            patient_id: row.get("patient_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Find the link for a user. No link is a valid outcome, not an error.
    pub fn find_by_user(conn: &Connection, user_id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM patient_links WHERE user_id = ?1")?;
        Ok(stmt.query_row([user_id], Self::from_row).optional()?)
    }

    /// Set or replace the patient linked to a user (upsert)
    pub fn link(conn: &Connection, user_id: &str, patient_id: &PatientId) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO patient_links (user_id, patient_id)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                patient_id = excluded.patient_id,
                updated_at = datetime('now')
            "#,
            params![user_id, patient_id.as_str()],
        )?;

        Self::find_by_user(conn, user_id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// The linked patient id, if the stored value is usable
    pub fn patient_id(&self) -> Option<PatientId> {
        PatientId::parse(&self.patient_id).ok()
    }
}

/// Resolve the patient id for an authenticated user
pub fn resolve_patient(conn: &Connection, user_id: &str) -> DbResult<Option<PatientId>> {
    Ok(PatientLink::find_by_user(conn, user_id)?.and_then(|link| link.patient_id()))
}
