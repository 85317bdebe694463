use std::path::PathBuf;
use std::sync::Arc;

use bilco::config::{ClientConfig, ConfigError, parse_base_url};
use bilco::diagnostics::{self, StatusClass};
use bilco::net::call_log::CallLogError;
use bilco::resources::{self, Approval, EmployeeUpdate, NewAccount, Resource};
use bilco::routes::{self, RouteDecision};
use bilco::session::{RegisterOutcome, SessionError, SessionState};
use bilco::storage::StorageError;
use bilco::{ApiClient, ApiError, FileStorage, RequestOptions, SessionManager};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    CallLog(#[from] CallLogError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid header '{0}'; expected NAME:VALUE")]
    InvalidHeader(String),
    #[error("not logged in; run `bilco login` first")]
    NotLoggedIn,
    #[error("no pending account with id '{0}'")]
    UnknownPendingAccount(String),
}

#[derive(Parser, Debug)]
#[command(name = "bilco", about = "Bilco maintenance backend admin CLI")]
struct Cli {
    /// Backend origin; overrides `BILCO_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Session/log storage file; overrides `BILCO_STATE_FILE`.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Call-log capacity; overrides `BILCO_LOG_CAPACITY`.
    #[arg(long)]
    log_capacity: Option<usize>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "BILCO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        username: String,
        #[arg(long, env = "BILCO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// Show where the current session may go for a UI route.
    Route {
        path: String,
    },
    Api(ApiCommand),
    Resource(ResourceCommand),
    Account(AccountCommand),
    Ticket(TicketCommand),
    Logs(LogsCommand),
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Args, Debug, Default)]
struct RawRequestArgs {
    /// Extra header as `NAME:VALUE`; repeatable.
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Get {
        path: String,
        #[command(flatten)]
        raw: RawRequestArgs,
    },
    Post {
        path: String,
        #[arg(long)]
        data: String,
        #[command(flatten)]
        raw: RawRequestArgs,
    },
    Put {
        path: String,
        #[arg(long)]
        data: String,
        #[command(flatten)]
        raw: RawRequestArgs,
    },
    Delete {
        path: String,
        #[command(flatten)]
        raw: RawRequestArgs,
    },
}

#[derive(Args, Debug)]
struct ResourceCommand {
    #[command(subcommand)]
    command: ResourceSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourceSubcommand {
    /// List the known resource names.
    Kinds,
    List {
        resource: Resource,
    },
    Create {
        resource: Resource,
        #[arg(long)]
        data: String,
    },
    Update {
        resource: Resource,
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        resource: Resource,
        id: String,
    },
}

#[derive(Args, Debug)]
struct AccountCommand {
    #[command(subcommand)]
    command: AccountSubcommand,
}

#[derive(Subcommand, Debug)]
enum AccountSubcommand {
    Pending,
    List,
    /// Approve a pending account, pre-filled from its pending record.
    Approve {
        account_id: String,
        #[arg(long)]
        permission_code: Option<i64>,
    },
    /// Reject a pending registration (deletes it).
    Reject {
        account_id: String,
    },
    Get {
        account_id: String,
    },
    Delete {
        account_id: String,
    },
    /// Create an already-approved account.
    Create(CreateAccountArgs),
    /// Update an employee's details by `maNV` (or `maND` when there is none).
    Update {
        employee_id: String,
        #[command(flatten)]
        details: EmployeeDetailsArgs,
    },
    Profile {
        #[arg(long)]
        data: String,
    },
}

#[derive(Args, Debug)]
struct CreateAccountArgs {
    username: String,
    #[arg(long, env = "BILCO_ACCOUNT_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value_t = 0)]
    employee_number: i64,
    #[arg(long, default_value_t = 0)]
    permission_code: i64,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    department: String,
    #[arg(long, default_value = "")]
    position: String,
}

impl CreateAccountArgs {
    fn into_account(self) -> NewAccount {
        let mut account = NewAccount::new(self.username, self.password);
        account.employee_number = self.employee_number;
        account.permission_code = self.permission_code;
        account.email = self.email;
        account.phone = self.phone;
        account.department = self.department;
        account.position = self.position;
        account
    }
}

#[derive(Args, Debug, Default)]
struct EmployeeDetailsArgs {
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    position: Option<String>,
}

impl From<EmployeeDetailsArgs> for EmployeeUpdate {
    fn from(args: EmployeeDetailsArgs) -> Self {
        Self {
            full_name: args.full_name,
            email: args.email,
            phone: args.phone,
            department: args.department,
            position: args.position,
        }
    }
}

#[derive(Args, Debug)]
struct TicketCommand {
    #[command(subcommand)]
    command: TicketSubcommand,
}

#[derive(Subcommand, Debug)]
enum TicketSubcommand {
    Approve {
        ticket_id: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    Reject {
        ticket_id: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Args, Debug)]
struct LogsCommand {
    #[command(subcommand)]
    command: LogsSubcommand,
}

#[derive(Subcommand, Debug)]
enum LogsSubcommand {
    /// Newest first.
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    Stats,
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let config = resolve_config(&cli)?;
    tracing::debug!(base_url = %config.base_url, state_file = %config.state_file.display(), "client config");
    let storage = Arc::new(FileStorage::open(&config.state_file)?);
    let api = ApiClient::new(&config, storage)?;
    let mut session = SessionManager::restore(api);

    match cli.command {
        Command::Login { username, password } => run_login(&mut session, &username, &password).await,
        Command::Register { username, password } => run_register(&session, &username, &password).await,
        Command::Logout => run_logout(&mut session),
        Command::Whoami => run_whoami(&session),
        Command::Route { path } => {
            run_route(&session, &path);
            Ok(())
        }
        Command::Api(api) => run_api(session.api(), api).await,
        Command::Resource(resource) => run_resource(&session, resource).await,
        Command::Account(account) => run_account(&session, account).await,
        Command::Ticket(ticket) => run_ticket(&session, ticket).await,
        Command::Logs(logs) => run_logs(session.api(), logs),
    }
}

/// Environment first, then explicit flags.
fn resolve_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = parse_base_url(base_url)?;
    }
    if let Some(state_file) = &cli.state_file {
        config.state_file.clone_from(state_file);
    }
    if let Some(capacity) = cli.log_capacity {
        config.log_capacity = capacity.max(1);
    }
    Ok(config)
}

async fn run_login(session: &mut SessionManager, username: &str, password: &str) -> Result<(), CliError> {
    let outcome = session.login(username, password).await?;
    println!(
        "logged in as {} ({}); landing: {}",
        outcome.session.username,
        outcome.session.role.as_str(),
        outcome.landing
    );
    Ok(())
}

async fn run_register(session: &SessionManager, username: &str, password: &str) -> Result<(), CliError> {
    match session.register(username, password).await? {
        RegisterOutcome::PendingApproval => {
            println!("registered {username}; the account is pending administrator approval");
        }
    }
    Ok(())
}

fn run_logout(session: &mut SessionManager) -> Result<(), CliError> {
    let next = session.logout()?;
    println!("logged out; next: {next}");
    Ok(())
}

fn run_whoami(session: &SessionManager) -> Result<(), CliError> {
    match session.state() {
        SessionState::Anonymous => println!("anonymous"),
        SessionState::Authenticated(current) => print_json(&serde_json::to_value(current)?)?,
    }
    Ok(())
}

fn run_route(session: &SessionManager, path: &str) {
    match routes::resolve(path, session.current()) {
        RouteDecision::Render => println!("render {}", routes::normalize(path)),
        RouteDecision::Redirect(_) => {
            println!("redirect {}", routes::landing(path, session.current()));
        }
    }
}

async fn run_api(api: &ApiClient, command: ApiCommand) -> Result<(), CliError> {
    let json: Value = match command.command {
        ApiSubcommand::Get { path, raw } => api.get(&path, request_options(&raw)?).await?,
        ApiSubcommand::Post { path, data, raw } => {
            let body = serde_json::from_str::<Value>(&data)?;
            api.post(&path, &body, request_options(&raw)?).await?
        }
        ApiSubcommand::Put { path, data, raw } => {
            let body = serde_json::from_str::<Value>(&data)?;
            api.put(&path, &body, request_options(&raw)?).await?
        }
        ApiSubcommand::Delete { path, raw } => api.delete(&path, request_options(&raw)?).await?,
    };
    print_json(&json)
}

async fn run_resource(session: &SessionManager, command: ResourceCommand) -> Result<(), CliError> {
    let api = session.api();
    let json = match command.command {
        ResourceSubcommand::Kinds => {
            for resource in Resource::ALL {
                println!("{:<20} {}", resource.slug(), resource.collection_path());
            }
            return Ok(());
        }
        ResourceSubcommand::List { resource } => resources::list(api, resource).await?,
        ResourceSubcommand::Create { resource, data } => {
            require_login(session)?;
            resources::create(api, resource, &serde_json::from_str(&data)?).await?
        }
        ResourceSubcommand::Update { resource, id, data } => {
            require_login(session)?;
            resources::update(api, resource, &id, &serde_json::from_str(&data)?).await?
        }
        ResourceSubcommand::Delete { resource, id } => {
            require_login(session)?;
            resources::delete(api, resource, &id).await?
        }
    };
    print_json(&json)
}

async fn run_account(session: &SessionManager, command: AccountCommand) -> Result<(), CliError> {
    require_login(session)?;
    let api = session.api();
    let json = match command.command {
        AccountSubcommand::Pending => resources::pending_accounts(api).await?,
        AccountSubcommand::List => resources::list_accounts(api).await?,
        AccountSubcommand::Approve { account_id, permission_code } => {
            let pending = resources::pending_accounts(api).await?;
            let approval = approval_for(&pending, &account_id, permission_code)?;
            resources::approve_account(api, &account_id, &approval).await?
        }
        AccountSubcommand::Reject { account_id } => resources::reject_account(api, &account_id).await?,
        AccountSubcommand::Get { account_id } => resources::get_account(api, &account_id).await?,
        AccountSubcommand::Delete { account_id } => resources::delete_account(api, &account_id).await?,
        AccountSubcommand::Create(args) => resources::create_account(api, &args.into_account()).await?,
        AccountSubcommand::Update { employee_id, details } => {
            resources::update_employee(api, &employee_id, &details.into()).await?
        }
        AccountSubcommand::Profile { data } => resources::update_profile(api, &serde_json::from_str(&data)?).await?,
    };
    print_json(&json)
}

async fn run_ticket(session: &SessionManager, command: TicketCommand) -> Result<(), CliError> {
    require_login(session)?;
    let api = session.api();
    let json = match command.command {
        TicketSubcommand::Approve { ticket_id, note } => resources::approve_ticket(api, &ticket_id, &note).await?,
        TicketSubcommand::Reject { ticket_id, reason } => resources::reject_ticket(api, &ticket_id, &reason).await?,
    };
    print_json(&json)
}

fn run_logs(api: &ApiClient, command: LogsCommand) -> Result<(), CliError> {
    let log = api.call_log();
    match command.command {
        LogsSubcommand::List { limit } => {
            let entries = log.entries()?;
            let ordered = diagnostics::newest_first(&entries);
            if ordered.is_empty() {
                println!("no calls recorded");
            }
            for entry in ordered.into_iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "{}  {:<6} {:<40} {} ({})  {:.0}ms",
                    entry.timestamp,
                    entry.method,
                    entry.path,
                    entry.status,
                    StatusClass::of(entry.status).color(),
                    entry.duration_ms
                );
            }
        }
        LogsSubcommand::Stats => {
            let summary = diagnostics::summarize(&log.entries()?);
            print_json(&serde_json::to_value(&summary)?)?;
        }
        LogsSubcommand::Clear => {
            log.clear()?;
            println!("call log cleared");
        }
    }
    Ok(())
}

/// Mutating commands are refused locally when no session exists; reads go
/// out regardless and let the server answer 401.
fn require_login(session: &SessionManager) -> Result<(), CliError> {
    if session.is_authenticated() { Ok(()) } else { Err(CliError::NotLoggedIn) }
}

/// Approval pre-filled from the pending record; unknown ids are refused
/// rather than approved with blank details.
fn approval_for(pending: &Value, account_id: &str, permission_code: Option<i64>) -> Result<Approval, CliError> {
    let record = find_pending(pending, account_id).ok_or_else(|| CliError::UnknownPendingAccount(account_id.to_owned()))?;
    let mut approval = Approval::from_pending(&record);
    if let Some(code) = permission_code {
        approval.permission_code = code;
    }
    Ok(approval)
}

fn find_pending(pending: &Value, account_id: &str) -> Option<Value> {
    pending.as_array()?.iter().find_map(|record| {
        let id = record.get("maND").and_then(bilco::net::types::scalar_text)?;
        (id == account_id).then(|| record.clone())
    })
}

fn request_options(raw: &RawRequestArgs) -> Result<RequestOptions, CliError> {
    raw.headers.iter().try_fold(RequestOptions::default(), |options, header| {
        let (name, value) = parse_header(header)?;
        Ok(options.header(name, value))
    })
}

fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    let (name, value) = raw.split_once(':').ok_or_else(|| CliError::InvalidHeader(raw.to_owned()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidHeader(raw.to_owned()));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
