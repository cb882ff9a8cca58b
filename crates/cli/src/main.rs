use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use klinik_core::constants::VIEW_PREFS_FILENAME;
use klinik_core::medicine::CatalogQuery;
use klinik_core::patient::PatientForm;
use klinik_core::prescription::{PrescribedMedicine, PrescriptionForm};
use klinik_core::projection::QueueBoard;
use klinik_core::queue::MoveDirection;
use klinik_core::refresh::watch_queue_board;
use klinik_core::view_prefs::ViewPrefs;
use klinik_core::{config, ClinicServices, CoreConfig, RecordId};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "klinik")]
#[command(about = "Klinik clinic queue CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for MoveDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => MoveDirection::Up,
            Direction::Down => MoveDirection::Down,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register a patient and join the queue
    Register {
        full_name: String,
        /// Date of birth (YYYY-MM-DD)
        date_of_birth: String,
        contact_number: String,
        reason_for_visit: String,
    },
    /// Show the public queue board
    Board,
    /// Show the admin dashboard
    Dashboard {
        /// Hide every entry created up to now (this terminal only)
        #[arg(long, conflicts_with = "restore")]
        clear: bool,
        /// Show hidden entries again
        #[arg(long)]
        restore: bool,
    },
    /// Call a waiting patient in for examination
    Approve { queue_entry_id: String },
    /// Mark an examined patient as done
    Done { queue_entry_id: String },
    /// Remove a queue entry
    Cancel { queue_entry_id: String },
    /// Renumber the active queue in the given order
    Reorder {
        #[arg(required = true)]
        queue_entry_ids: Vec<String>,
    },
    /// Swap an entry with its neighbour in the active queue
    Move {
        queue_entry_id: String,
        #[arg(value_enum)]
        direction: Direction,
    },
    /// List registered patients
    Patients,
    /// Write a prescription
    Prescribe {
        patient_id: String,
        diagnosis: String,
        /// Doctor notes (optional)
        #[arg(long)]
        notes: Option<String>,
        /// Medicine line as "name|dosage|frequency|duration" (repeatable)
        #[arg(long = "medicine")]
        medicines: Vec<String>,
    },
    /// Show pending prescriptions, newest first
    Pharmacy,
    /// Mark a prescription as dispensed
    Dispense { prescription_id: String },
    /// Search the medicine catalog
    Medicines {
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List catalog categories
    Categories,
    /// Install the default catalog into an empty store
    SeedCatalog,
    /// Place a medicine order
    Order {
        /// Cart line as "<medicine_id>:<quantity>" (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// List medicine orders
    Orders,
    /// Mark a medicine order as collected
    Collect { order_id: String },
    /// Check admin credentials (recorded in the login audit log)
    Login { username: String, password: String },
    /// Show the login audit log
    Logins,
    /// Print the queue board whenever it changes
    Watch,
}

fn parse_id(raw: &str) -> Result<RecordId, Box<dyn std::error::Error>> {
    Ok(RecordId::parse(raw)?)
}

fn parse_medicine_line(raw: &str) -> PrescribedMedicine {
    let mut parts = raw.split('|').map(|s| s.trim().to_string());
    PrescribedMedicine {
        medicine_name: parts.next().unwrap_or_default(),
        dosage: parts.next().unwrap_or_default(),
        frequency: parts.next().unwrap_or_default(),
        duration: parts.next().unwrap_or_default(),
    }
}

fn parse_cart_line(raw: &str) -> Result<(RecordId, u32), Box<dyn std::error::Error>> {
    let (id, quantity) = raw
        .split_once(':')
        .ok_or_else(|| format!("cart line '{raw}' must look like <medicine_id>:<quantity>"))?;
    Ok((parse_id(id.trim())?, quantity.trim().parse()?))
}

fn print_board(board: &QueueBoard) {
    if board.rows.is_empty() {
        println!("Queue is empty.");
        return;
    }
    for row in &board.rows {
        match row.estimated_wait {
            Some(wait) => println!(
                "#{:<3} {:<8} {:<15} ~{} min",
                row.queue_number, row.patient_initials, row.status_label, wait
            ),
            None => println!(
                "#{:<3} {:<8} {}",
                row.queue_number, row.patient_initials, row.status_label
            ),
        }
    }
    println!(
        "Waiting: {}, Being examined: {}, Next wait: {} min",
        board.summary.waiting, board.summary.being_examined, board.summary.next_wait
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let cfg = Arc::new(config::from_process_env()?);
    let services = ClinicServices::open(cfg.clone())?;

    run(command, &cfg, &services).await
}

/// Runs one subcommand. Any failure, including a rejected login, is returned so the process
/// exits non-zero.
async fn run(
    command: Commands,
    cfg: &CoreConfig,
    services: &ClinicServices,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Register {
            full_name,
            date_of_birth,
            contact_number,
            reason_for_visit,
        } => {
            let form = PatientForm {
                full_name,
                date_of_birth,
                contact_number,
                reason_for_visit,
            };
            let receipt = services.registration.register(&form)?;
            println!(
                "Registered patient {}. Queue number: {} (estimated wait {} min)",
                receipt.patient_id, receipt.queue_number, receipt.estimated_wait_time
            );
        }
        Commands::Board => print_board(&services.views.queue_board()?),
        Commands::Dashboard { clear, restore } => {
            let prefs_path = cfg.data_dir().join(VIEW_PREFS_FILENAME);
            let mut prefs = ViewPrefs::load(&prefs_path)?;
            if clear {
                prefs.clear(Utc::now());
                prefs.save(&prefs_path)?;
            } else if restore {
                prefs.restore();
                prefs.save(&prefs_path)?;
            }

            let dashboard = services.views.dashboard(&prefs)?;
            println!(
                "Waiting: {}, Being examined: {}, Done: {}",
                dashboard.counts.waiting, dashboard.counts.being_examined, dashboard.counts.done
            );
            for row in &dashboard.queue {
                let (name, contact) = row
                    .patient
                    .as_ref()
                    .map(|p| (p.full_name.as_str(), p.contact_number.as_str()))
                    .unwrap_or(("Unknown patient", "-"));
                println!(
                    "#{:<3} {:<15} {} ({}) [{}]",
                    row.queue_number, row.status_label, name, contact, row.queue_entry_id
                );
            }
            println!(
                "Prescriptions: {} pending, {} dispensed",
                dashboard.pending_prescriptions.len(),
                dashboard.dispensed_prescriptions.len()
            );
        }
        Commands::Approve { queue_entry_id } => {
            services.queue.approve(&parse_id(&queue_entry_id)?)?;
            println!("Called in {}", queue_entry_id);
        }
        Commands::Done { queue_entry_id } => {
            services.queue.mark_done(&parse_id(&queue_entry_id)?)?;
            println!("Marked {} as done", queue_entry_id);
        }
        Commands::Cancel { queue_entry_id } => {
            services.queue.cancel(&parse_id(&queue_entry_id)?)?;
            println!("Removed {}", queue_entry_id);
        }
        Commands::Reorder { queue_entry_ids } => {
            let ordered = queue_entry_ids
                .iter()
                .map(|raw| parse_id(raw))
                .collect::<Result<Vec<_>, _>>()?;
            services.queue.reorder(&ordered)?;
            println!("Renumbered {} entries", ordered.len());
        }
        Commands::Move {
            queue_entry_id,
            direction,
        } => {
            let ordering = services
                .queue
                .move_entry(&parse_id(&queue_entry_id)?, direction.into())?;
            for (i, id) in ordering.iter().enumerate() {
                println!("{}. {}", i + 1, id);
            }
        }
        Commands::Patients => {
            let patients = services.views.patients()?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!(
                    "ID: {}, Name: {}, Contact: {}, Registered: {}",
                    patient.id, patient.full_name, patient.contact_number, patient.created_at
                );
            }
        }
        Commands::Prescribe {
            patient_id,
            diagnosis,
            notes,
            medicines,
        } => {
            let form = PrescriptionForm {
                patient_id,
                diagnosis,
                doctor_notes: notes,
                medicines: medicines.iter().map(|m| parse_medicine_line(m)).collect(),
            };
            let prescription = services.prescriptions.create(form)?;
            println!("Created prescription {}", prescription.id);
        }
        Commands::Pharmacy => {
            let rows = services.views.pharmacy_worklist()?;
            if rows.is_empty() {
                println!("No pending prescriptions.");
            }
            for row in rows {
                println!(
                    "{} {} ({}): {}",
                    row.prescription.id,
                    row.patient_name,
                    row.contact_number.as_deref().unwrap_or("-"),
                    row.prescription.diagnosis
                );
                for line in &row.prescription.medicines {
                    println!(
                        "    {} {} {} {}",
                        line.medicine_name, line.dosage, line.frequency, line.duration
                    );
                }
            }
        }
        Commands::Dispense { prescription_id } => {
            services
                .prescriptions
                .dispense(&parse_id(&prescription_id)?)?;
            println!("Dispensed {}", prescription_id);
        }
        Commands::Medicines { text, category } => {
            let medicines = services.catalog.search(&CatalogQuery { text, category })?;
            for medicine in medicines {
                println!(
                    "{} {:<20} {:<12} {:>4} {}",
                    medicine.id,
                    medicine.name,
                    medicine.category,
                    medicine.price,
                    if medicine.in_stock { "" } else { "(out of stock)" }
                );
            }
        }
        Commands::Categories => {
            for category in services.catalog.categories()? {
                println!("{}", category);
            }
        }
        Commands::SeedCatalog => match services.catalog.seed_default_catalog()? {
            0 => println!("Catalog already populated."),
            n => println!("Seeded {} medicines.", n),
        },
        Commands::Order { items } => {
            let lines = items
                .iter()
                .map(|raw| parse_cart_line(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let cart = services.orders.build_cart(&lines)?;
            let receipt = services.orders.submit(&cart)?;
            println!(
                "Order #{} placed. Total: {}",
                receipt.order_number, receipt.total
            );
        }
        Commands::Orders => {
            for order in services.orders.list()? {
                println!(
                    "#{:<4} {} {:>5} {}",
                    order.order_number,
                    order.id,
                    order.total,
                    order.status.as_str()
                );
            }
        }
        Commands::Collect { order_id } => {
            services.orders.collect(&parse_id(&order_id)?)?;
            println!("Collected {}", order_id);
        }
        Commands::Login { username, password } => {
            services.auth.login(&username, &password)?;
            println!("Login successful.");
        }
        Commands::Logins => {
            for attempt in services.auth.attempts()? {
                println!(
                    "{} {:<12} {}",
                    attempt.login_time,
                    attempt.username,
                    attempt.outcome.as_str()
                );
            }
        }
        Commands::Watch => {
            let (mut board, task) = watch_queue_board(services.views.clone())?;
            print_board(&board.borrow_and_update());
            loop {
                tokio::select! {
                    changed = board.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        println!();
                        print_board(&board.borrow_and_update());
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            task.abort();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use klinik_core::backends::TreeBackend;
    use klinik_core::constants::{DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
    use klinik_core::login::LoginOutcome;

    #[test]
    fn test_medicine_line_fills_missing_parts() {
        let line = parse_medicine_line("Paracetamol | 500mg | 3x daily");
        assert_eq!(line.medicine_name, "Paracetamol");
        assert_eq!(line.dosage, "500mg");
        assert_eq!(line.frequency, "3x daily");
        assert!(line.duration.is_empty());
    }

    #[test]
    fn test_cart_line_parsing() {
        let id = RecordId::new();
        let (parsed, quantity) = parse_cart_line(&format!("{id}:3")).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(quantity, 3);

        assert!(parse_cart_line("no-separator").is_err());
        assert!(parse_cart_line(&format!("{id}:many")).is_err());
    }

    #[test]
    fn test_cli_parses_move() {
        let cli = Cli::try_parse_from(["klinik", "move", "abc", "up"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Move {
                direction: Direction::Up,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rejected_login_is_an_error() {
        let cfg = Arc::new(CoreConfig::default());
        let services = ClinicServices::new(cfg.clone(), Arc::new(TreeBackend::in_memory()));

        let rejected = Cli::try_parse_from(["klinik", "login", "admin", "wrong"]).unwrap();
        assert!(run(rejected.command.unwrap(), &cfg, &services).await.is_err());

        let accepted = Cli::try_parse_from([
            "klinik",
            "login",
            DEFAULT_ADMIN_USERNAME,
            DEFAULT_ADMIN_PASSWORD,
        ])
        .unwrap();
        assert!(run(accepted.command.unwrap(), &cfg, &services).await.is_ok());

        let outcomes: Vec<LoginOutcome> = services
            .auth
            .attempts()
            .unwrap()
            .into_iter()
            .map(|a| a.outcome)
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&LoginOutcome::Failed));
        assert!(outcomes.contains(&LoginOutcome::Success));
    }
}
