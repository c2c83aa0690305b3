use clap::{Parser, Subcommand};
use referral_core::constants::DEFAULT_DATA_DIR;
use referral_core::filter::{sort_newest_first, ServiceMatch};
use referral_core::models::HeadOfService;
use referral_core::{
    AccountService, DirectoryService, EmailAddress, NonEmptyText, Priority, RecordId,
    ReferralPredicate, ReferralStatus, Registration, Role, Service, ServiceType, Storage,
    TokenService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "referrals")]
#[command(about = "Operator CLI for the referral tracking store")]
struct Cli {
    /// Document store directory
    #[arg(long, env = "REFERRALS_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a hospital service
    CreateService {
        /// Service name (unique, case-insensitive)
        name: String,
        /// Service type, e.g. CARDIOLOGIA
        #[arg(long = "type")]
        kind: String,
        /// Head of service name
        #[arg(long)]
        head_name: String,
        /// Head of service email (unique)
        #[arg(long)]
        head_email: String,
        /// Head of service phone
        #[arg(long)]
        head_phone: String,
        /// Free text description
        #[arg(long, default_value = "Hospital service")]
        description: String,
    },
    /// List hospital services
    ListServices,
    /// Create a user account; the only way to create an ADMIN
    CreateUser {
        name: String,
        email: String,
        password: String,
        /// Service the user belongs to
        service_id: String,
        /// MEDICO, JEFE_SERVICIO or ADMIN
        #[arg(long, default_value = "MEDICO")]
        role: String,
    },
    /// List referrals, newest first
    ListReferrals {
        /// PENDING, IN_PROGRESS, COMPLETED or CANCELLED
        #[arg(long)]
        status: Option<String>,
        /// LOW, MEDIUM, HIGH or URGENT
        #[arg(long)]
        priority: Option<String>,
        /// Only referrals sent or received by this service
        #[arg(long)]
        service_id: Option<String>,
        /// Only referrals for this medical record number
        #[arg(long)]
        mrn: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'referrals --help' for commands");
        return Ok(());
    };

    let storage = Storage::open(&cli.data_dir)?;

    match command {
        Commands::CreateService {
            name,
            kind,
            head_name,
            head_email,
            head_phone,
            description,
        } => {
            let service = Service::create(
                referral_core::NewService {
                    name: NonEmptyText::new(&name)?,
                    description: NonEmptyText::new(&description)?,
                    head_of_service: HeadOfService {
                        name: NonEmptyText::new(&head_name)?,
                        email: EmailAddress::parse(&head_email)?,
                        phone: NonEmptyText::new(&head_phone)?,
                    },
                    kind: ServiceType::parse(&kind)?,
                    active: None,
                },
                chrono::Utc::now(),
            );
            let service = storage.services.create(service)?;
            println!("Created service '{}' with ID: {}", service.name, service.id);
        }
        Commands::ListServices => {
            let services = DirectoryService::new(storage.services.clone()).list()?;
            if services.is_empty() {
                println!("No services found.");
            }
            for service in services {
                println!(
                    "ID: {}, Name: {}, Type: {}, Active: {}",
                    service.id,
                    service.name,
                    service.kind.as_str(),
                    service.active
                );
            }
        }
        Commands::CreateUser {
            name,
            email,
            password,
            service_id,
            role,
        } => {
            // Provisioning never issues tokens, so the signing key is throwaway.
            let secret = RecordId::new().to_string() + &RecordId::new().to_string();
            let tokens = Arc::new(TokenService::new(&secret, Duration::from_secs(60))?);
            let accounts =
                AccountService::new(storage.users.clone(), storage.services.clone(), tokens);
            let user = accounts.provision(Registration {
                name: NonEmptyText::new(&name)?,
                email: EmailAddress::parse(&email)?,
                password,
                service_id: RecordId::parse(&service_id)?,
                role: Some(Role::parse(&role)?),
            })?;
            println!(
                "Created {} '{}' with ID: {}",
                user.role.as_str(),
                user.email,
                user.id
            );
        }
        Commands::ListReferrals {
            status,
            priority,
            service_id,
            mrn,
        } => {
            let predicate = ReferralPredicate {
                status: status.as_deref().map(ReferralStatus::parse).transpose()?,
                priority: priority.as_deref().map(Priority::parse).transpose()?,
                service: match service_id {
                    Some(id) => ServiceMatch::Either(RecordId::parse(&id)?),
                    None => ServiceMatch::Any,
                },
                medical_record_number: mrn.map(|m| m.trim().to_string()),
            };
            let mut referrals = storage.referrals.find_many(&predicate)?;
            sort_newest_first(&mut referrals);
            if referrals.is_empty() {
                println!("No referrals found.");
            }
            for referral in referrals {
                println!(
                    "ID: {}, MRN: {}, Status: {}, Priority: {}, {} -> {}, Created: {}",
                    referral.id,
                    referral.patient.medical_record_number,
                    referral.status,
                    referral.priority,
                    referral.requesting_service_id,
                    referral.destination_service_id,
                    referral.created_at
                );
            }
        }
    }

    Ok(())
}
