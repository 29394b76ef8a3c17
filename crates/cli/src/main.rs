use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use opal_core::{
    run_sweep, Author, CaregiverService, CoreConfig, PatientService, Registry,
    RelationshipFilter, RelationshipService, RelationshipTypeService,
};

#[derive(Parser)]
#[command(name = "opaladmin")]
#[command(about = "opaladmin patient-engagement administration CLI")]
struct Cli {
    /// Registry data directory (defaults to OPALADMIN_DATA_DIR or /opal_data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    ListPatients,
    /// List all caregivers
    ListCaregivers,
    /// List relationships, optionally filtered by status code (PEN, CON, ...)
    ListRelationships {
        #[arg(long)]
        status: Option<String>,
    },
    /// Create the predefined relationship types
    SeedTypes {
        /// Author name for the audit commit
        name: String,
        /// Author email for the audit commit
        email: String,
    },
    /// Run the expiry sweep once (for cron use)
    ExpireRelationships,
    /// Show the most recent audit log entries
    AuditLog {
        /// Number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("OPALADMIN_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/opal_data"));
    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let registry = Registry::open(cfg)?;

    match cli.command {
        Some(Commands::ListPatients) => {
            let patients = PatientService::new(registry).list()?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {} {}, DOB: {}",
                        patient.id, patient.first_name, patient.last_name, patient.date_of_birth
                    );
                }
            }
        }
        Some(Commands::ListCaregivers) => {
            let caregivers = CaregiverService::new(registry).list()?;
            if caregivers.is_empty() {
                println!("No caregivers found.");
            } else {
                for caregiver in caregivers {
                    println!(
                        "ID: {}, Username: {}, Name: {} {}",
                        caregiver.id,
                        caregiver.username,
                        caregiver.first_name,
                        caregiver.last_name
                    );
                }
            }
        }
        Some(Commands::ListRelationships { status }) => {
            let status = match status.as_deref() {
                Some(code) => Some(serde_status(code)?),
                None => None,
            };
            let relationships = RelationshipService::new(registry).list(RelationshipFilter {
                status,
                ..RelationshipFilter::default()
            })?;
            if relationships.is_empty() {
                println!("No relationships found.");
            } else {
                for relationship in relationships {
                    println!(
                        "ID: {}, Patient: {}, Caregiver: {}, Status: {}, Requested: {}",
                        relationship.id,
                        relationship.patient_id,
                        relationship.caregiver_id,
                        relationship.status,
                        relationship.request_date
                    );
                }
            }
        }
        Some(Commands::SeedTypes { name, email }) => {
            let author =
                Author::new(&name, &email).ok_or("invalid author name or email address")?;
            let created = RelationshipTypeService::new(registry).seed_defaults(&author)?;
            if created.is_empty() {
                println!("All predefined relationship types already exist.");
            } else {
                for relationship_type in created {
                    println!("Created: {} ({})", relationship_type.name, relationship_type.id);
                }
            }
        }
        Some(Commands::ExpireRelationships) => {
            let outcome = run_sweep(&registry, chrono::Utc::now())?;
            println!(
                "Expired {} relationship(s) and {} registration code(s).",
                outcome.relationships_expired, outcome.codes_expired
            );
        }
        Some(Commands::AuditLog { limit }) => {
            let entries = registry.audit_history(limit)?;
            if entries.is_empty() {
                println!("No audit entries yet.");
            } else {
                for entry in entries {
                    println!("{} {} <{}> {}", entry.time, entry.author_name, entry.author_email, entry.message);
                }
            }
        }
        None => {
            println!("Use 'opaladmin --help' for commands");
        }
    }

    Ok(())
}

fn serde_status(code: &str) -> Result<opal_core::RelationshipStatus, String> {
    match code {
        "PEN" => Ok(opal_core::RelationshipStatus::Pending),
        "CON" => Ok(opal_core::RelationshipStatus::Confirmed),
        "DEN" => Ok(opal_core::RelationshipStatus::Denied),
        "EXP" => Ok(opal_core::RelationshipStatus::Expired),
        "REV" => Ok(opal_core::RelationshipStatus::Revoked),
        other => Err(format!("unknown status code '{other}'")),
    }
}
