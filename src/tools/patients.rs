//! Patient identity tools
//!
//! Resolve and link the patient record behind an authenticated user.

use serde::Serialize;

use crate::db::Database;
use crate::models::{resolve_patient as resolve, PatientId, PatientLink};

#[derive(Debug, Serialize)]
pub struct ResolvePatientResponse {
    pub user_id: String,
    /// `None` when the user has no linked patient yet
    pub patient_id: Option<PatientId>,
}

#[derive(Debug, Serialize)]
pub struct LinkPatientResponse {
    pub success: bool,
    pub link: PatientLink,
}

pub fn resolve_patient(db: &Database, user_id: &str) -> Result<ResolvePatientResponse, String> {
    let user_id = require_user_id(user_id)?;
    let patient_id = db
        .with_conn(|conn| resolve(conn, user_id))
        .map_err(|e| e.to_string())?;

    Ok(ResolvePatientResponse {
        user_id: user_id.to_string(),
        patient_id,
    })
}

pub fn link_patient(db: &Database, user_id: &str, patient_id: &str) -> Result<LinkPatientResponse, String> {
    let user_id = require_user_id(user_id)?;
    let patient_id = PatientId::parse(patient_id).map_err(|e| e.to_string())?;

    let link = db
        .with_conn(|conn| PatientLink::link(conn, user_id, &patient_id))
        .map_err(|e| e.to_string())?;

    tracing::info!(user_id, patient_id = %patient_id, "Patient linked");
    Ok(LinkPatientResponse { success: true, link })
}

fn require_user_id(user_id: &str) -> Result<&str, String> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err("user_id must not be empty".to_string());
    }
    Ok(trimmed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("insights.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_unlinked_user_resolves_to_none() {
        let (_dir, db) = test_db();
        let response = resolve_patient(&db, "user-1").unwrap();
        assert_eq!(response.user_id, "user-1");
        assert!(response.patient_id.is_none());
    }

    #[test]
    fn test_link_then_resolve() {
        let (_dir, db) = test_db();
        link_patient(&db, "user-1", "patient-a").unwrap();
        let relinked = link_patient(&db, " user-1 ", "patient-b").unwrap();
        assert_eq!(relinked.link.patient_id, "patient-b");

        let response = resolve_patient(&db, "user-1").unwrap();
        assert_eq!(response.patient_id.unwrap().as_str(), "patient-b");
    }

    #[test]
    fn test_rejects_blank_ids() {
        let (_dir, db) = test_db();
        assert!(resolve_patient(&db, "  ").is_err());
        assert!(link_patient(&db, "user-1", "").is_err());
    }
}
