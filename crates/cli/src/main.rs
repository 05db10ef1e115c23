//! Administrative CLI for the CERA application-tracking system.
//!
//! Drives the core services directly against the local data directory; the
//! acting user is supplied on the command line since no session exists here.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use cera_core::{
    config::lock_wait_from_env_value, Actor, ApplicationService, ApplicationUuid, CategoryType,
    CoreConfig, EmailAddress, InvestigationType, NewApplication, NonEmptyText, Role,
    TransitionEvent, DEFAULT_APPLICATION_DATA_DIR, DEFAULT_CODIFICATION_PREFIX,
};

#[derive(Parser)]
#[command(name = "cera")]
#[command(about = "CERA ethics application tracking CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReviewAction {
    Approve,
    Reject,
    Incomplete,
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionAction {
    Approve,
    Reject,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliRole {
    Applicant,
    Reviewer,
    Manager,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::Applicant => Role::Applicant,
            CliRole::Reviewer => Role::Reviewer,
            CliRole::Manager => Role::Manager,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new application
    Create {
        /// Applicant user id
        owner_id: String,
        /// Applicant name
        name: String,
        /// Applicant email
        email: String,
        /// Project title
        project_title: String,
        /// Investigation type code (EI or EO)
        #[arg(long, default_value = "EO")]
        investigation_type: String,
        /// Category code (GE, SH or AN)
        #[arg(long, default_value = "GE")]
        category_type: String,
        /// Applicant metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Submit an application for review
    Submit {
        /// Application id
        application_id: String,
        /// Owner user id
        owner_id: String,
        /// Owner name
        name: String,
        /// Owner email
        email: String,
    },
    /// Delete an application (soft delete)
    Delete {
        /// Application id
        application_id: String,
        /// Owner user id
        owner_id: String,
        /// Owner name
        name: String,
        /// Owner email
        email: String,
    },
    /// Record a first-review outcome
    Review {
        /// Application id
        application_id: String,
        /// Outcome of the review
        action: ReviewAction,
        /// Reviewer user id
        reviewer_id: String,
        /// Reviewer name
        name: String,
        /// Reviewer email
        email: String,
        /// Review comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Record a final decision
    Decide {
        /// Application id
        application_id: String,
        /// Final decision
        action: DecisionAction,
        /// Manager user id
        manager_id: String,
        /// Manager name
        name: String,
        /// Manager email
        email: String,
        /// Decision comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show an application with its history and reviews
    Show {
        /// Application id
        application_id: String,
        /// Acting user id
        actor_id: String,
        /// Acting user name
        name: String,
        /// Acting user email
        email: String,
        /// Role to view as
        #[arg(long, value_enum, default_value = "manager")]
        role: CliRole,
    },
    /// List an owner's applications
    List {
        /// Owner user id
        owner_id: String,
    },
}

fn build_service() -> Result<ApplicationService, Box<dyn std::error::Error>> {
    let application_data_dir = std::env::var("APPLICATION_DATA_DIR")
        .unwrap_or_else(|_| DEFAULT_APPLICATION_DATA_DIR.into());
    let codification_prefix = std::env::var("CODIFICATION_PREFIX")
        .unwrap_or_else(|_| DEFAULT_CODIFICATION_PREFIX.into());
    let lock_wait = lock_wait_from_env_value(std::env::var("CERA_LOCK_WAIT_MS").ok())?;

    let data_dir = PathBuf::from(&application_data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let cfg = Arc::new(CoreConfig::new(data_dir, codification_prefix, lock_wait)?);
    Ok(ApplicationService::new(cfg))
}

fn build_actor(
    id: &str,
    name: &str,
    email: &str,
    role: Role,
) -> Result<Actor, Box<dyn std::error::Error>> {
    Ok(Actor {
        id: NonEmptyText::new(id)?,
        name: NonEmptyText::new(name)?,
        email: EmailAddress::parse(email)?,
        role,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let service = build_service()?;

    match cli.command {
        Commands::Create {
            owner_id,
            name,
            email,
            project_title,
            investigation_type,
            category_type,
            metadata,
        } => {
            let actor = build_actor(&owner_id, &name, &email, Role::Applicant)?;
            let metadata = match metadata {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };

            let created = service.create_application(
                &actor,
                NewApplication {
                    project_title: NonEmptyText::new(&project_title)?,
                    investigation_type: InvestigationType::from_str(&investigation_type)?,
                    category_type: CategoryType::from_str(&category_type)?,
                    metadata,
                },
            )?;

            println!("Created application {}", created.id);
            println!("Codification: {}", created.codification);
            println!("Sequential number: {}", created.sequential_number);
        }
        Commands::Submit {
            application_id,
            owner_id,
            name,
            email,
        } => {
            let actor = build_actor(&owner_id, &name, &email, Role::Applicant)?;
            let id = ApplicationUuid::parse(&application_id)?;
            let new_status =
                service.apply_transition(&id, TransitionEvent::Submit, &actor, None)?;
            println!("Application {} is now {}", id, new_status);
        }
        Commands::Delete {
            application_id,
            owner_id,
            name,
            email,
        } => {
            let actor = build_actor(&owner_id, &name, &email, Role::Applicant)?;
            let id = ApplicationUuid::parse(&application_id)?;
            let new_status =
                service.apply_transition(&id, TransitionEvent::Delete, &actor, None)?;
            println!("Application {} is now {}", id, new_status);
        }
        Commands::Review {
            application_id,
            action,
            reviewer_id,
            name,
            email,
            comment,
        } => {
            let actor = build_actor(&reviewer_id, &name, &email, Role::Reviewer)?;
            let id = ApplicationUuid::parse(&application_id)?;
            let event = match action {
                ReviewAction::Approve => TransitionEvent::Approve,
                ReviewAction::Reject => TransitionEvent::Reject,
                ReviewAction::Incomplete => TransitionEvent::MarkIncomplete,
            };
            let new_status = service.apply_transition(&id, event, &actor, comment)?;
            println!("Application {} is now {}", id, new_status);
        }
        Commands::Decide {
            application_id,
            action,
            manager_id,
            name,
            email,
            comment,
        } => {
            let actor = build_actor(&manager_id, &name, &email, Role::Manager)?;
            let id = ApplicationUuid::parse(&application_id)?;
            let event = match action {
                DecisionAction::Approve => TransitionEvent::FinalApprove,
                DecisionAction::Reject => TransitionEvent::FinalReject,
            };
            let new_status = service.apply_transition(&id, event, &actor, comment)?;
            println!("Application {} is now {}", id, new_status);
        }
        Commands::Show {
            application_id,
            actor_id,
            name,
            email,
            role,
        } => {
            let actor = build_actor(&actor_id, &name, &email, role.into())?;
            let id = ApplicationUuid::parse(&application_id)?;
            let dossier = service.get_application(&actor, &id)?;

            let application = &dossier.application;
            println!("Application: {}", application.id);
            println!("  Codification: {}", application.codification);
            println!("  Title: {}", application.project_title);
            println!(
                "  Classification: {} / {}",
                application.investigation_type, application.category_type
            );
            println!("  Owner: {}", application.owner);
            println!("  Status: {}", application.status);
            println!("  Created: {}", application.date_created);
            match &application.date_submitted {
                Some(date) => println!("  Submitted: {}", date),
                None => println!("  Submitted: never"),
            }

            println!("History:");
            for entry in &dossier.history {
                println!(
                    "  {} {} -> {} by {}{}",
                    entry.change_date,
                    entry.previous_status,
                    entry.new_status,
                    entry.changed_by,
                    entry
                        .comment
                        .as_deref()
                        .map(|c| format!(": {c}"))
                        .unwrap_or_default()
                );
            }

            if dossier.reviews.is_empty() {
                println!("Reviews: none");
            } else {
                println!("Reviews:");
                for review in &dossier.reviews {
                    println!(
                        "  {} -> {} by {}{}",
                        review.date_reviewed,
                        review.status,
                        review.reviewer_id,
                        review
                            .comment
                            .as_deref()
                            .map(|c| format!(": {c}"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        Commands::List { owner_id } => {
            let applications = service.list_for_owner(&owner_id);
            if applications.is_empty() {
                println!("No applications found.");
            } else {
                for application in applications {
                    println!(
                        "{}  {}  {}  {}",
                        application.id,
                        application.codification,
                        application.status,
                        application.project_title
                    );
                }
            }
        }
    }

    Ok(())
}
