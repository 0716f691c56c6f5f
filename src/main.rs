mod api;
mod commands;
mod config;
mod sample;
mod state;
mod stats;
mod status;

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use api::auth::{FileStore, KeychainStore};
use api::types::{
    parse_calendar_date, CreateProductRequest, ProductQuery, RegisterRequest, SortField,
    SortOrder, UpdateProductRequest, UserRole,
};
use api::{ApiClient, ApiError, CredentialStore, HttpTransport};
use config::{Config, CredentialBackend};
use state::AppState;
use stats::InventoryStats;

#[derive(Parser, Debug)]
#[command(name = "pharma-inventory", about = "Pharmaceutical inventory API client")]
struct Args {
    /// API base URL (overrides PHARMA_API_URL / VITE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where to keep the session tokens (overrides PHARMA_CREDENTIAL_STORE)
    #[arg(long, global = true, value_enum)]
    store: Option<StoreArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StoreArg {
    File,
    Keychain,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session tokens
    Login {
        email: String,
        #[arg(long, env = "PHARMA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in with it
    Register {
        nombre: String,
        email: String,
        #[arg(long, env = "PHARMA_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        role: Option<UserRole>,
    },
    /// End the session and forget the stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse and edit the product catalog
    #[command(subcommand)]
    Products(ProductsCommand),
    /// Inventory statistics
    #[command(subcommand)]
    Dashboard(DashboardCommand),
}

#[derive(Subcommand, Debug)]
enum ProductsCommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        sort_by: Option<SortArg>,
        /// Descending order (needs --sort-by)
        #[arg(long, requires = "sort_by")]
        desc: bool,
    },
    Get {
        id: String,
    },
    Create {
        nombre: String,
        #[arg(long)]
        precio: f64,
        #[arg(long, value_parser = parse_date_arg)]
        elaboracion: NaiveDate,
        #[arg(long, value_parser = parse_date_arg)]
        vencimiento: NaiveDate,
        #[arg(long, default_value = "")]
        descripcion: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        descripcion: Option<String>,
        #[arg(long)]
        precio: Option<f64>,
        #[arg(long, value_parser = parse_date_arg)]
        elaboracion: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        vencimiento: Option<NaiveDate>,
        #[arg(long)]
        image_url: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum DashboardCommand {
    /// Totals, average price, expired and expiring products
    Stats,
    /// Expired / expiring soon / valid counts
    Expiry,
    /// Both of the above
    Overview,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Nombre,
    Precio,
    FechaElaboracion,
    FechaVencimiento,
    CreatedAt,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Nombre => SortField::Nombre,
            SortArg::Precio => SortField::Precio,
            SortArg::FechaElaboracion => SortField::FechaElaboracion,
            SortArg::FechaVencimiento => SortField::FechaVencimiento,
            SortArg::CreatedAt => SortField::CreatedAt,
        }
    }
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got '{}'", raw))
}

fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(ref url) = args.api_url {
        config = config.with_api_url(url)?;
    }
    match args.store {
        Some(StoreArg::File) => config.credential_backend = CredentialBackend::File,
        Some(StoreArg::Keychain) => config.credential_backend = CredentialBackend::Keychain,
        None => {}
    }
    Ok(config)
}

fn build_state(config: &Config) -> AppState {
    let store: Arc<dyn CredentialStore> = match config.credential_backend {
        CredentialBackend::File => Arc::new(FileStore::new(config.credentials_path.clone())),
        CredentialBackend::Keychain => Arc::new(KeychainStore::new()),
    };
    let transport = HttpTransport::new(&config.api_base_url, config.request_timeout);
    AppState::new(ApiClient::new(transport, store))
}

fn print_json<V: Serialize>(value: &V) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable expiry lines on stderr, after the JSON.
fn print_expiry_notes(stats: &InventoryStats) {
    for product in &stats.expired_products_list {
        eprintln!("expired  {}", product.summary());
    }
    for product in &stats.expiring_products_list {
        eprintln!("expiring {}", product.summary());
    }
}

async fn run(state: &AppState, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Login { email, password } => {
            let user = commands::login(state, &email, &password).await?;
            print_json(&user)?;
        }
        Command::Register {
            nombre,
            email,
            password,
            role,
        } => {
            let request = RegisterRequest {
                nombre,
                email,
                password,
                role,
            };
            let user = commands::register(state, &request).await?;
            print_json(&user)?;
        }
        Command::Logout => {
            commands::logout(state).await;
            eprintln!("Signed out");
        }
        Command::Whoami => match commands::check_auth(state).await? {
            Some(user) => print_json(&user)?,
            None => return Err("Not signed in".into()),
        },
        Command::Products(cmd) => run_products(state, cmd).await?,
        Command::Dashboard(DashboardCommand::Stats) => {
            let stats = commands::fetch_stats(state, Utc::now()).await?;
            print_json(&stats)?;
            print_expiry_notes(&stats);
        }
        Command::Dashboard(DashboardCommand::Expiry) => {
            let status = commands::fetch_expiry_status(state, Utc::now()).await?;
            print_json(&status)?;
        }
        Command::Dashboard(DashboardCommand::Overview) => {
            let (stats, expiry) = commands::refresh_dashboard(state, Utc::now()).await?;
            print_json(&serde_json::json!({ "stats": stats, "expiryStatus": expiry }))?;
            print_expiry_notes(&stats);
        }
    }
    Ok(())
}

async fn run_products(
    state: &AppState,
    command: ProductsCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ProductsCommand::List {
            page,
            limit,
            search,
            sort_by,
            desc,
        } => {
            let query = ProductQuery {
                page,
                limit,
                search,
                sort_by: sort_by.map(SortField::from),
                order: sort_by.map(|_| if desc { SortOrder::Desc } else { SortOrder::Asc }),
            };
            let resp = commands::fetch_products(state, &query).await?;
            print_json(&resp)?;
        }
        ProductsCommand::Get { id } => {
            let product = commands::fetch_product(state, &id).await?;
            print_json(&product)?;
        }
        ProductsCommand::Create {
            nombre,
            precio,
            elaboracion,
            vencimiento,
            descripcion,
            image_url,
        } => {
            let request = CreateProductRequest {
                nombre,
                descripcion,
                precio,
                fecha_elaboracion: elaboracion,
                fecha_vencimiento: vencimiento,
                image_url,
            };
            let product = commands::create_product(state, &request).await?;
            print_json(&product)?;
        }
        ProductsCommand::Update {
            id,
            nombre,
            descripcion,
            precio,
            elaboracion,
            vencimiento,
            image_url,
        } => {
            let request = UpdateProductRequest {
                nombre,
                descripcion,
                precio,
                fecha_elaboracion: elaboracion,
                fecha_vencimiento: vencimiento,
                image_url,
            };
            let product = commands::update_product(state, &id, &request).await?;
            print_json(&product)?;
        }
        ProductsCommand::Delete { id } => {
            commands::delete_product(state, &id).await?;
            eprintln!("Deleted {}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    env_logger::init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Using API at {}", config.api_base_url);

    let state = build_state(&config);
    let result = run(&state, args.command).await;

    let status = state.current_status().await;
    log::debug!("Connection status: {}", status.label());
    if result.is_ok() && status.is_degraded() {
        if let Some(notice) = status.notice() {
            eprintln!("{}", notice);
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(api_err) = e.downcast_ref::<ApiError>() {
                for (field, message) in api_err.field_errors() {
                    eprintln!("  {}: {}", field, message);
                }
            }
            ExitCode::FAILURE
        }
    }
}
