//! Binary entry point for tenderscope.
//!
//! This binary provides the CLI over the tender database: user management,
//! bidder browsing, analytics, supplier search and offer tracking.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tenderscope::config::TenderscopeConfig;
use tenderscope::llm::{AnthropicClient, LlmProvider};
use tenderscope::models::{AnalysisKind, Metric, OfferId, Role, Session, TenderTable};
use tenderscope::observability::{self, LoggingConfig};
use tenderscope::search::{
    ConstrainedSearchEngine, FilterSetBuilder, Notifier, NotifyReport, SearchPolicy,
};
use tenderscope::services::{
    AnalyticsService, AuthService, BidderService, FinderOutcome, LogMailer, OfferService,
    RfqNotifier, SourcingRequest, SupplierFinder, render_csv,
};
use tenderscope::storage::{SqliteOfferStore, SqliteTenderStore, SqliteUserStore};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Tenderscope - procurement analytics and supplier search over tender records.
#[derive(Parser)]
#[command(name = "tenderscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Username to log in as.
    #[arg(short, long, global = true, env = "TENDERSCOPE_USER")]
    user: Option<String>,

    /// Password for --user.
    #[arg(long, global = true, env = "TENDERSCOPE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the database schema.
    Init,

    /// Load tender rows from a CSV file.
    Import {
        /// CSV file with a header row of tender columns.
        csv: PathBuf,
    },

    /// Manage users.
    User {
        /// User subcommand.
        #[command(subcommand)]
        action: UserAction,
    },

    /// List bidders, one page at a time.
    Bidders {
        /// Page number, starting at 1.
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Show every tender of one bidder.
    Tenders {
        /// Bidder name.
        bidder: String,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Yearly analytics.
    Analytics {
        /// Analysis: country-comparison, top-bidders or bidder-prices.
        #[arg(short, long, default_value = "country-comparison")]
        kind: String,

        /// Metric: count or total-price.
        #[arg(short, long, default_value = "count")]
        metric: String,

        /// Bidder country for bidder-prices.
        #[arg(long)]
        country: Option<String>,

        /// Output format: table or csv.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List bidder countries.
    Countries,

    /// Find suppliers for a sourcing request.
    Find {
        /// Free-text request, read by the LLM. Omit to use the filter flags.
        request: Option<String>,

        /// Country of the buying organization.
        #[arg(long)]
        buyer_country: Option<String>,

        /// Country of the supplier.
        #[arg(long)]
        bidder_country: Option<String>,

        /// Earliest tender year.
        #[arg(long)]
        year_min: Option<i32>,

        /// Latest tender year.
        #[arg(long)]
        year_max: Option<i32>,

        /// Maximum price in USD.
        #[arg(long)]
        max_price: Option<f64>,

        /// Substring to match in tender titles and descriptions.
        #[arg(long)]
        keywords: Option<String>,

        /// Send a request for quotation to every supplier found.
        #[arg(long)]
        notify: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Track offers.
    Offers {
        /// Offer subcommand.
        #[command(subcommand)]
        action: OfferAction,
    },
}

/// User subcommands.
#[derive(Subcommand)]
enum UserAction {
    /// Create a user or replace their password and role.
    Add {
        /// Username.
        username: String,

        /// Password for the new user.
        #[arg(long, env = "TENDERSCOPE_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,

        /// Role: admin or user.
        #[arg(long, default_value = "user")]
        role: String,

        /// Bidder visible to this user (repeatable).
        #[arg(long = "bidder")]
        bidders: Vec<String>,
    },
}

/// Offer subcommands.
#[derive(Subcommand)]
enum OfferAction {
    /// List your offers, newest first.
    List,

    /// Record a supplier's reply.
    Reply {
        /// Supplier email the request went to.
        #[arg(long)]
        email: String,

        /// File holding the reply text.
        #[arg(long)]
        file: PathBuf,
    },

    /// Accept a received offer.
    Accept {
        /// Offer ID.
        id: String,
    },
}

/// Stores and optional LLM shared by the commands.
struct App {
    config: TenderscopeConfig,
    tenders: Arc<SqliteTenderStore>,
    users: Arc<SqliteUserStore>,
    offers: Arc<SqliteOfferStore>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl App {
    fn open(config: TenderscopeConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let path = config.db_path.clone();
        let tenders = Arc::new(SqliteTenderStore::new(&path, config.tables.clone())?);
        let users = Arc::new(SqliteUserStore::new(&path)?);
        let offers = Arc::new(SqliteOfferStore::new(&path)?);
        let llm: Option<Arc<dyn LlmProvider>> = config
            .llm
            .api_key
            .is_some()
            .then(|| Arc::new(AnthropicClient::from_config(&config.llm)) as Arc<dyn LlmProvider>);
        Ok(Self {
            config,
            tenders,
            users,
            offers,
            llm,
        })
    }

    fn auth(&self) -> AuthService {
        AuthService::new(self.users.clone())
    }

    fn bidders(&self) -> BidderService {
        BidderService::new(self.tenders.clone(), self.config.page_size)
    }

    fn offer_service(&self) -> OfferService {
        let service = OfferService::new(self.offers.clone());
        match &self.llm {
            Some(llm) => service.with_llm(llm.clone()),
            None => service,
        }
    }

    fn finder(&self) -> SupplierFinder {
        let engine =
            ConstrainedSearchEngine::new(SearchPolicy::with_max_rows(self.config.search_max_rows));
        let finder = SupplierFinder::new(self.tenders.clone(), engine);
        match &self.llm {
            Some(llm) => finder.with_llm(llm.clone()),
            None => finder,
        }
    }
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    let config = match &cli.db {
        Some(db) => config.with_db_path(db),
        None => config,
    };

    if let Err(e) = observability::init(LoggingConfig::from_settings(&config.logging, cli.verbose))
    {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration.
fn load_config(path: Option<&Path>) -> Result<TenderscopeConfig, tenderscope::Error> {
    match path {
        Some(path) => TenderscopeConfig::load_from_file(path),
        None => TenderscopeConfig::load_default(),
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: TenderscopeConfig) -> CmdResult {
    let app = App::open(config)?;

    let session = match &cli.command {
        Commands::Init | Commands::Import { .. } | Commands::User { .. } => None,
        _ => Some(login(&app, cli.user.as_deref(), cli.password.as_deref())?),
    };

    match (cli.command, session) {
        (Commands::Init, _) => cmd_init(&app),
        (Commands::Import { csv }, _) => cmd_import(&app, &csv),
        (Commands::User { action }, _) => cmd_user(&app, action),
        (Commands::Bidders { page }, Some(session)) => cmd_bidders(&app, &session, page),
        (Commands::Tenders { bidder, json }, Some(_)) => cmd_tenders(&app, &bidder, json),
        (
            Commands::Analytics {
                kind,
                metric,
                country,
                format,
            },
            Some(_),
        ) => cmd_analytics(&app, &kind, &metric, country.as_deref(), &format),
        (Commands::Countries, Some(_)) => cmd_countries(&app),
        (
            Commands::Find {
                request,
                buyer_country,
                bidder_country,
                year_min,
                year_max,
                max_price,
                keywords,
                notify,
                json,
            },
            Some(session),
        ) => {
            let filters = FilterSetBuilder {
                buyer_country,
                bidder_country,
                year_min,
                year_max,
                max_price,
                keywords,
            };
            cmd_find(&app, &session, request, filters, notify, json)
        },
        (Commands::Offers { action }, Some(session)) => cmd_offers(&app, &session, action),
        (_, None) => Err("login required".into()),
    }
}

/// Logs in with the global credentials.
fn login(
    app: &App,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let user = user.ok_or("login required: pass --user or set TENDERSCOPE_USER")?;
    let password =
        password.ok_or("login required: pass --password or set TENDERSCOPE_PASSWORD")?;
    Ok(app.auth().login(user, password)?)
}

/// Init command.
fn cmd_init(app: &App) -> CmdResult {
    println!("Database ready at {}", app.config.db_path.display());
    println!("  Tender table: {}", app.config.tables.tender);
    println!("  Bidder table: {}", app.config.tables.bidder);
    Ok(())
}

/// Import command.
fn cmd_import(app: &App, csv: &Path) -> CmdResult {
    let file = std::fs::File::open(csv).map_err(|e| format!("{}: {e}", csv.display()))?;
    let rows = app.tenders.import_csv(file)?;
    println!("Imported {rows} tender rows from {}", csv.display());
    Ok(())
}

/// User command.
fn cmd_user(app: &App, action: UserAction) -> CmdResult {
    match action {
        UserAction::Add {
            username,
            new_password,
            role,
            bidders,
        } => {
            let role = Role::parse(&role);
            app.auth().add_user(&username, &new_password, role)?;
            let service = app.bidders();
            for bidder in &bidders {
                service.assign(&username, bidder)?;
            }
            println!("Saved user {username} ({role})");
            if !bidders.is_empty() {
                println!("  Bidders: {}", bidders.join(", "));
            }
            Ok(())
        },
    }
}

/// Bidders command.
fn cmd_bidders(app: &App, session: &Session, page: u32) -> CmdResult {
    let result = app.bidders().list_bidders(session, page)?;
    println!("Bidders, page {} ({} per page):", result.page, result.page_size);
    if result.bidders.is_empty() {
        println!("  (none)");
    }
    for name in &result.bidders {
        println!("  {name}");
    }
    Ok(())
}

/// Tenders command.
fn cmd_tenders(app: &App, bidder: &str, json: bool) -> CmdResult {
    let table = app.bidders().tender_details(bidder)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }
    if table.is_empty() {
        println!("No tenders for {bidder}");
        return Ok(());
    }
    print_table(&table);
    Ok(())
}

fn print_table(table: &TenderTable) {
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
}

/// Analytics command.
fn cmd_analytics(
    app: &App,
    kind: &str,
    metric: &str,
    country: Option<&str>,
    format: &str,
) -> CmdResult {
    let kind = AnalysisKind::parse(kind, country)?;
    let metric = Metric::parse(metric)?;
    let points = AnalyticsService::new(app.tenders.clone()).run(&kind, metric)?;

    match format.to_lowercase().as_str() {
        "csv" => print!("{}", render_csv(&points, metric)?),
        "table" => {
            println!("{:<6} {:<40} {:>18}", "Year", "Series", metric.label());
            for p in &points {
                let year = p.year.map(|y| y.to_string()).unwrap_or_default();
                println!("{year:<6} {:<40} {:>18.2}", p.series, p.value);
            }
            if points.is_empty() {
                println!("(no data)");
            }
        },
        other => return Err(format!("unknown format '{other}', expected table or csv").into()),
    }
    Ok(())
}

/// Countries command.
fn cmd_countries(app: &App) -> CmdResult {
    for country in AnalyticsService::new(app.tenders.clone()).bidder_countries()? {
        println!("{country}");
    }
    Ok(())
}

/// Find command.
fn cmd_find(
    app: &App,
    session: &Session,
    request: Option<String>,
    filters: FilterSetBuilder,
    notify: bool,
    json: bool,
) -> CmdResult {
    let request = match request {
        Some(_) if filters != FilterSetBuilder::default() => {
            return Err("pass either a free-text request or filter flags, not both".into());
        },
        Some(text) => SourcingRequest::Text(text),
        None => SourcingRequest::Filters(filters.build()?),
    };

    let FinderOutcome { filters, result } = app.finder().find(session, request)?;

    let report = if notify {
        let notifier = RfqNotifier::new(
            app.offers.clone(),
            Arc::new(LogMailer),
            app.config.mail.clone(),
        );
        Some(notifier.notify(&session.username, &result)?)
    } else {
        None
    };

    if json {
        let output = serde_json::json!({
            "filters": filters,
            "result": result,
            "notified": report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Filters: {filters}");
    println!(
        "Matched at step '{}' after {} queries",
        result.step.name(),
        result.queries_issued
    );
    if result.is_relaxed() {
        let dropped: Vec<&str> = result.dropped.iter().map(|d| d.as_str()).collect();
        println!("Relaxed: {}", dropped.join(", "));
    }
    if result.is_empty() {
        println!("No suppliers found.");
    } else {
        println!(
            "{:<32} {:<8} {:<32} {:>7} {:>14}",
            "Supplier", "Country", "Email", "Tenders", "Mean USD"
        );
        for row in &result.rows {
            let mean = row.mean_price.map(|p| format!("{p:.2}")).unwrap_or_default();
            println!(
                "{:<32} {:<8} {:<32} {:>7} {:>14}",
                row.supplier_name,
                row.supplier_country.as_deref().unwrap_or(""),
                row.contact_email.as_deref().unwrap_or(""),
                row.match_count,
                mean
            );
        }
    }
    if let Some(report) = report {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &NotifyReport) {
    print!("{}", render_report(report));
}

fn render_report(report: &NotifyReport) -> String {
    let mut out = String::from("Requests for quotation:\n");
    out.push_str(&format!("  Queued (logged): {}\n", report.requested.len()));
    out.push_str(&format!(
        "  Already pending: {}\n",
        report.already_pending.len()
    ));
    if !report.failed.is_empty() {
        out.push_str(&format!(
            "  Failed (will retry): {}\n",
            report.failed.join(", ")
        ));
    }
    if !report.skipped_no_contact.is_empty() {
        out.push_str(&format!(
            "  Skipped (no email): {}\n",
            report.skipped_no_contact.join(", ")
        ));
    }
    out
}

/// Offers command.
fn cmd_offers(app: &App, session: &Session, action: OfferAction) -> CmdResult {
    let service = app.offer_service();
    match action {
        OfferAction::List => {
            let offers = service.list(session)?;
            if offers.is_empty() {
                println!("No offers.");
            }
            for offer in offers {
                let price = offer
                    .terms
                    .as_ref()
                    .and_then(|t| {
                        t.unit_price.map(|p| {
                            format!("{p} {}", t.currency.as_deref().unwrap_or_default())
                        })
                    })
                    .unwrap_or_default();
                println!(
                    "{}  {:<14} {:<32} {:<32} {}",
                    offer.id, offer.status, offer.supplier_name, offer.supplier_email, price
                );
            }
        },
        OfferAction::Reply { email, file } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| format!("{}: {e}", file.display()))?;
            let offer = service.record_reply(session, &email, &text)?;
            println!("Offer {} is now {}", offer.id, offer.status);
            if let Some(terms) = &offer.terms {
                println!("{}", serde_json::to_string_pretty(terms)?);
            }
        },
        OfferAction::Accept { id } => {
            let offer = service.accept(session, &OfferId::new(id))?;
            println!("Offer {} is now {}", offer.id, offer.status);
        },
    }
    Ok(())
}
