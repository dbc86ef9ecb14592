use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use jobtrack_core::form::{ApplicationDraft, FieldErrors, RegistrationDraft};
use jobtrack_core::guard::{self, Access};
use jobtrack_core::records::{ApplicationRecord, Refresh};
use jobtrack_core::{
    resolve_data_dir, ClientConfig, ErrorKind, FileStorage, FilterCriteria, Jobtrack,
    RegisterError, Status, TransportError,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "jobtrack",
    about = "Jobtrack — track your job applications",
    version
)]
struct Cli {
    /// Base address of the Jobtrack API (default: $JOBTRACK_API_URL or http://127.0.0.1:8000/api/)
    #[arg(long, env = "JOBTRACK_API_URL", global = true)]
    api_url: Option<String>,
    /// Where the session is persisted (default: $JOBTRACK_DATA_DIR or the platform data dir)
    #[arg(long, env = "JOBTRACK_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Log level: error, warn, info, debug, verbose (default: $JOBTRACK_LOG_LEVEL or warn)
    #[arg(long, env = "JOBTRACK_LOG_LEVEL", global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "JOBTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Create an account (log in afterwards)
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBTRACK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password (defaults to --password)
        #[arg(long)]
        confirm_password: Option<String>,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "")]
        mobile: String,
    },
    /// List applications, optionally filtered
    List {
        #[arg(long)]
        status: Option<Status>,
        /// Matches company name or job title
        #[arg(long)]
        search: Option<String>,
    },
    /// Show counts across all applications
    Stats,
    /// Record a new application
    Add(ApplicationArgs),
    /// Change an existing application; omitted fields keep their value
    Update {
        id: String,
        #[command(flatten)]
        fields: ApplicationArgs,
    },
    /// Remove an application
    Delete { id: String },
    /// Exchange the stored refresh token for a new access token
    RefreshToken,
}

#[derive(Args)]
struct ApplicationArgs {
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    status: Option<Status>,
    /// YYYY-MM-DD (default: today for new applications)
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    salary: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    contact_person: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long)]
    contact_phone: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl ApplicationArgs {
    /// Overlay the given flags onto `draft`. An empty value clears the field.
    fn apply(self, draft: &mut ApplicationDraft) {
        let set = |slot: &mut String, value: Option<String>| {
            if let Some(v) = value {
                *slot = v;
            }
        };
        set(&mut draft.company_name, self.company);
        set(&mut draft.job_title, self.title);
        set(&mut draft.job_url, self.url);
        set(&mut draft.application_date, self.date);
        set(&mut draft.salary_range, self.salary);
        set(&mut draft.location, self.location);
        set(&mut draft.contact_person, self.contact_person);
        set(&mut draft.contact_email, self.contact_email);
        set(&mut draft.contact_phone, self.contact_phone);
        set(&mut draft.notes, self.notes);
        if let Some(status) = self.status {
            draft.status = status;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let raw = cli.log_level.clone().unwrap_or_else(|| "warn".into());
    let effective_log_level = if raw.eq_ignore_ascii_case("verbose") {
        "debug".to_owned()
    } else {
        raw
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = ClientConfig::default();
    if let Some(url) = cli.api_url {
        cfg = cfg.with_base_url(url);
    }
    if cli.data_dir.is_some() {
        cfg.data_dir = cli.data_dir;
    }

    let data_dir = resolve_data_dir(cfg.data_dir.as_ref())?;
    debug!(data_dir = %data_dir.display(), api = %cfg.base_url, "using data directory");
    let storage = Arc::new(FileStorage::open(&data_dir).context("open session storage")?);
    let jt = Jobtrack::new(&cfg, storage).context("build client")?;

    match cli.command {
        Commands::Login { username, password } => cmd_login(&jt, &username, &password).await,
        Commands::Logout => {
            jt.session.logout();
            println!("logged out");
            Ok(())
        }
        Commands::Whoami => cmd_whoami(&jt),
        Commands::Register {
            username,
            email,
            password,
            confirm_password,
            first_name,
            last_name,
            mobile,
        } => {
            let draft = RegistrationDraft {
                username,
                email,
                password2: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                first_name,
                last_name,
                mobile_number: mobile,
            };
            cmd_register(&jt, draft).await
        }
        Commands::List { status, search } => {
            require_session(&jt)?;
            let filter = FilterCriteria {
                status,
                search_term: search,
            };
            let records = jt
                .records
                .list(&filter)
                .await
                .map_err(|e| remote_failure(&jt, e, "Failed to fetch applications"))?;
            print_records(&records);
            Ok(())
        }
        Commands::Stats => {
            require_session(&jt)?;
            let stats = jt
                .records
                .statistics()
                .await
                .map_err(|e| remote_failure(&jt, e, "Failed to fetch statistics"))?;
            print_statistics(&stats);
            Ok(())
        }
        Commands::Add(fields) => cmd_add(&jt, fields).await,
        Commands::Update { id, fields } => cmd_update(&jt, &id, fields).await,
        Commands::Delete { id } => {
            require_session(&jt)?;
            jt.records
                .delete(&id)
                .await
                .map_err(|e| remote_failure(&jt, e, "Failed to delete application"))?;
            println!("deleted application {id}");
            after_mutation(&jt).await;
            Ok(())
        }
        Commands::RefreshToken => {
            require_session(&jt)?;
            jt.session
                .refresh_access_token()
                .await
                .context("refresh access token")?;
            println!("access token refreshed");
            Ok(())
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_login(jt: &Jobtrack, username: &str, password: &str) -> Result<()> {
    let identity = jt.session.login(username, password).await?;
    println!("logged in as {}", identity.username);
    Ok(())
}

fn cmd_whoami(jt: &Jobtrack) -> Result<()> {
    match guard::check(&jt.session) {
        Access::Granted(identity) => println!("{}", identity.username),
        Access::Denied => println!("not logged in"),
        Access::Deferred => println!("session still loading"),
    }
    Ok(())
}

async fn cmd_register(jt: &Jobtrack, draft: RegistrationDraft) -> Result<()> {
    let errors = draft.validate();
    if !errors.is_empty() {
        return Err(invalid_form(&errors));
    }
    match jt.session.register(&draft).await {
        Ok(()) => {
            println!("account created — run `jobtrack login --username {}`", draft.username);
            Ok(())
        }
        Err(RegisterError::Rejected(payload)) => {
            let mut errors = FieldErrors::new();
            errors.merge_server(&payload);
            if errors.is_empty() {
                bail!(RegisterError::FALLBACK);
            }
            Err(invalid_form(&errors))
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_add(jt: &Jobtrack, fields: ApplicationArgs) -> Result<()> {
    require_session(jt)?;
    let mut draft = ApplicationDraft::new(chrono::Local::now().date_naive());
    fields.apply(&mut draft);
    let payload = draft.into_payload().map_err(|e| invalid_form(&e))?;

    let record = jt
        .records
        .create(&payload)
        .await
        .map_err(|e| remote_failure(jt, e, "Failed to create application"))?;
    println!("created application {}", record.id_segment());
    after_mutation(jt).await;
    Ok(())
}

async fn cmd_update(jt: &Jobtrack, id: &str, fields: ApplicationArgs) -> Result<()> {
    require_session(jt)?;
    let records = jt
        .records
        .list(&FilterCriteria::default())
        .await
        .map_err(|e| remote_failure(jt, e, "Failed to fetch applications"))?;
    let Some(existing) = records.iter().find(|r| r.id_segment() == id) else {
        bail!("no application with id {id}");
    };

    let mut draft = ApplicationDraft::from_record(existing);
    fields.apply(&mut draft);
    let payload = draft.into_payload().map_err(|e| invalid_form(&e))?;

    jt.records
        .update(id, &payload)
        .await
        .map_err(|e| remote_failure(jt, e, "Failed to update application"))?;
    println!("updated application {id}");
    after_mutation(jt).await;
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require_session(jt: &Jobtrack) -> Result<()> {
    match guard::check(&jt.session) {
        Access::Granted(_) => Ok(()),
        Access::Denied | Access::Deferred => bail!("not logged in — run `jobtrack login`"),
    }
}

/// The server is the only source of truth, so mutations are followed by a
/// fresh list and statistics fetch.
async fn after_mutation(jt: &Jobtrack) {
    let Refresh {
        records,
        statistics,
    } = jt.records.refresh(&jt.records.filter()).await;
    match statistics {
        Ok(stats) => print_statistics(&stats),
        Err(e) => eprintln!("{}", e.describe("Failed to fetch statistics")),
    }
    if let Err(e) = records {
        eprintln!("{}", e.describe("Failed to fetch applications"));
    }
}

fn remote_failure(jt: &Jobtrack, err: TransportError, fallback: &str) -> anyhow::Error {
    if jt.session.handle_auth_failure(&err) {
        return anyhow::anyhow!("session invalid — run `jobtrack login` again");
    }
    match err.kind() {
        ErrorKind::Validation => {
            let mut errors = FieldErrors::new();
            if let Some(payload) = err.server_payload() {
                errors.merge_server(payload);
            }
            invalid_form(&errors)
        }
        _ => anyhow::anyhow!(err.describe(fallback)),
    }
}

fn invalid_form(errors: &FieldErrors) -> anyhow::Error {
    let lines: Vec<String> = errors
        .iter()
        .map(|(field, message)| format!("  {field}: {message}"))
        .collect();
    anyhow::anyhow!("please fix the following:\n{}", lines.join("\n"))
}

fn print_records(records: &[ApplicationRecord]) {
    if records.is_empty() {
        println!("no applications");
        return;
    }
    for r in records {
        println!(
            "{:>5}  {:<20}  {:<28}  {:<24}  {}",
            r.id_segment(),
            r.status.label(),
            r.company_name,
            r.job_title,
            r.application_date
        );
        if let Some(location) = &r.location {
            println!("       location: {location}");
        }
    }
}

fn print_statistics(stats: &jobtrack_core::StatisticsSnapshot) {
    println!(
        "total {}  applied {}  interviews {}  offers {}  rejected {}",
        stats.total,
        stats.count(Status::Applied),
        stats.interviews(),
        stats.count(Status::OfferReceived),
        stats.count(Status::Rejected)
    );
}
