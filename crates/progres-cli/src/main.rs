use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use progres_cli::{format, load_year_records};
use progres_models::calculator::{Overrides, build_modules, compute_result};
use progres_session::{FileTokenStore, SessionError, SessionManager};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "progres-cli")]
#[command(about = "PROGRES CLI - Browse your academic records from the terminal", long_about = None)]
struct Cli {
    /// Gateway API root
    #[arg(long, env = "PROGRES_PORTAL_URL", default_value = "http://localhost:8080/api")]
    api_url: String,

    /// Where the session is kept between runs
    #[arg(long, env = "PROGRES_SESSION_FILE", default_value = ".progres-session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with your PROGRES credentials
    Login {
        /// Registration number (will be prompted if not provided)
        #[arg(short = 'u', long)]
        username: Option<String>,
    },
    /// Log out and revoke the session
    Logout,
    /// Show the current session
    Status,
    /// List your registration years
    Years,
    /// Show exam grades for a registration
    Grades {
        /// Card id of the registration (see `years`)
        card_id: String,
    },
    /// Show continuous-assessment grades for a registration
    CcGrades {
        card_id: String,
    },
    /// Compute the weighted average of a period
    Calculator {
        card_id: String,

        /// Period index within the year
        #[arg(short = 'p', long, default_value = "0")]
        period: usize,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let store = Arc::new(FileTokenStore::new(cli.session_file));
    let manager = match SessionManager::new(cli.api_url, store) {
        Ok(manager) => manager,
        Err(e) => exit_with("Error initializing session", e),
    };

    let result = match cli.command {
        Commands::Login { username } => handle_login(&manager, username).await,
        Commands::Logout => handle_logout(&manager).await,
        Commands::Status => handle_status(&manager).await,
        Commands::Years => handle_years(&manager).await,
        Commands::Grades { card_id } => handle_grades(&manager, &card_id).await,
        Commands::CcGrades { card_id } => handle_cc_grades(&manager, &card_id).await,
        Commands::Calculator { card_id, period } => {
            handle_calculator(&manager, &card_id, period).await
        }
    };

    if let Err(e) = result {
        exit_with("Error", e);
    }
}

fn exit_with(context: &str, error: SessionError) -> ! {
    eprintln!("\n❌ {}: {}", context, error);
    std::process::exit(1);
}

async fn require_session(manager: &SessionManager) -> Result<(), SessionError> {
    if manager.init().await? {
        Ok(())
    } else {
        Err(SessionError::NotAuthenticated)
    }
}

async fn handle_login(manager: &SessionManager, username: Option<String>) -> Result<(), SessionError> {
    let username = username.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Registration number")
            .interact_text()
            .expect("Failed to read username")
    });
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .expect("Failed to read password");

    let session = manager.login(&username, &password).await?;
    println!("\n✅ Logged in successfully!");
    println!("   UUID: {}", session.uuid.unwrap_or_default());
    Ok(())
}

async fn handle_logout(manager: &SessionManager) -> Result<(), SessionError> {
    manager.init().await?;
    manager.logout().await;
    println!("✅ Logged out");
    Ok(())
}

async fn handle_status(manager: &SessionManager) -> Result<(), SessionError> {
    manager.init().await?;
    let now = chrono::Utc::now().timestamp();
    println!("{}", format::session_status(&manager.session(), now));
    Ok(())
}

async fn handle_years(manager: &SessionManager) -> Result<(), SessionError> {
    require_session(manager).await?;
    let registrations = manager.registrations().await?;
    if registrations.is_empty() {
        println!("No registrations found.");
    }
    for registration in &registrations {
        println!("{}", format::registration_line(registration));
    }
    Ok(())
}

async fn handle_grades(manager: &SessionManager, card_id: &str) -> Result<(), SessionError> {
    require_session(manager).await?;
    let grades = manager.exam_grades(card_id).await?;
    if grades.is_empty() {
        println!("No exam grades published yet.");
    }
    for grade in &grades {
        println!("{}", format::exam_grade_line(grade));
    }
    Ok(())
}

async fn handle_cc_grades(manager: &SessionManager, card_id: &str) -> Result<(), SessionError> {
    require_session(manager).await?;
    let grades = manager.cc_grades(card_id).await?;
    if grades.is_empty() {
        println!("No continuous-assessment grades published yet.");
    }
    for grade in &grades {
        println!("{}", format::cc_grade_line(grade));
    }
    Ok(())
}

async fn handle_calculator(
    manager: &SessionManager,
    card_id: &str,
    period: usize,
) -> Result<(), SessionError> {
    require_session(manager).await?;
    let records = load_year_records(manager, card_id).await?;

    if let Some(label) = records
        .reports
        .get(period)
        .and_then(|report| report.periode_libelle_fr.as_deref())
    {
        println!("{} ({})\n", label, records.year);
    }

    let modules = build_modules(&records, period, &Overrides::default());
    if modules.is_empty() {
        println!("No modules found for period {period}.");
        return Ok(());
    }
    for module in &modules {
        println!("{}", format::module_line(module));
    }
    println!("\n{}", format::result_summary(&compute_result(&modules)));
    Ok(())
}
