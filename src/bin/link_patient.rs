//! Utility to link a user to their patient record
//!
//! Usage: link-patient <user_id> <patient_id>

use health_insights::config::InsightsConfig;
use health_insights::db::Database;
use health_insights::models::{PatientId, PatientLink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (user_id, patient_id) = match (args.next(), args.next()) {
        (Some(user_id), Some(patient_id)) => (user_id, patient_id),
        _ => {
            eprintln!("Usage: link-patient <user_id> <patient_id>");
            std::process::exit(2);
        }
    };
    let patient_id = PatientId::parse(&patient_id)?;

    let config = InsightsConfig::from_env()?;
    println!("Database path: {}", config.database_path.display());
    let database = Database::open(&config.database_path)?;

    database.with_conn(|conn| {
        let link = PatientLink::link(conn, user_id.trim(), &patient_id)?;
        println!("Patient linked:");
        println!("  User: {}", link.user_id);
        println!("  Patient: {}", link.patient_id);
        println!("  Updated: {}", link.updated_at);
        Ok(())
    })?;

    Ok(())
}
