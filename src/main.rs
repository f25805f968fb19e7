mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use commands::Output;
use ticketdesk::categorize::{
    Categorizer, CategorizerConfig, HttpCategorizer, DEFAULT_ENDPOINT, DEFAULT_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use ticketdesk::db::Database;
use ticketdesk::filter::FilterParams;
use ticketdesk::{ErrorKind, HelpDesk, TicketError};

#[derive(Parser)]
#[command(name = "ticketdesk")]
#[command(about = "Support-ticket tracker: file, triage, assign and resolve tickets")]
#[command(version)]
struct Cli {
    /// Id of the user performing the action
    #[arg(long = "as", global = true, env = "TICKETDESK_USER")]
    actor: Option<i64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    analyzer: AnalyzerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct AnalyzerArgs {
    /// Chat-completions endpoint used to categorize tickets
    #[arg(long, global = true, env = "TICKETDESK_ANALYZER_URL", default_value = DEFAULT_ENDPOINT)]
    analyzer_url: String,

    /// Model name sent to the categorization endpoint
    #[arg(long, global = true, env = "TICKETDESK_ANALYZER_MODEL", default_value = DEFAULT_MODEL)]
    analyzer_model: String,

    /// API key for the categorization endpoint
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true)]
    analyzer_api_key: Option<String>,

    /// Seconds to wait for the categorization endpoint
    #[arg(
        long,
        global = true,
        env = "TICKETDESK_ANALYZER_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    analyzer_timeout: u64,
}

impl AnalyzerArgs {
    fn config(&self) -> CategorizerConfig {
        CategorizerConfig {
            endpoint: self.analyzer_url.clone(),
            model: self.analyzer_model.clone(),
            api_key: self.analyzer_api_key.clone(),
            timeout_secs: self.analyzer_timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ticketdesk in the current directory
    Init {
        /// Skip creating the sample users and tickets
        #[arg(long)]
        no_seed: bool,
    },

    /// File a new ticket (reporters only)
    Create {
        /// Ticket title
        title: String,
        /// Ticket description
        #[arg(short, long)]
        description: String,
        /// Priority (low, medium, high, critical)
        #[arg(short, long, default_value = "medium")]
        priority: String,
    },

    /// List tickets visible to the caller
    List {
        /// Filter by status (open, in-progress, closed)
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by assigned admin id, or "unassigned"
        #[arg(short, long)]
        assigned_admin: Option<String>,
        /// Filter by reporter id
        #[arg(short, long)]
        reporter: Option<String>,
    },

    /// Show ticket details
    Show {
        /// Ticket ID
        id: i64,
    },

    /// Update status, assignment or priority (admins only)
    Update {
        /// Ticket ID
        id: i64,
        /// New status
        #[arg(short, long)]
        status: Option<String>,
        /// Assign to this admin id
        #[arg(long)]
        assign: Option<i64>,
        /// Clear the assignment
        #[arg(long)]
        unassign: bool,
        /// New priority
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Close a ticket
    Close {
        /// Ticket ID
        id: i64,
    },

    /// Reopen a ticket
    Reopen {
        /// Ticket ID
        id: i64,
    },

    /// Categorize a ticket with the AI service (admins only)
    Analyze {
        /// Ticket ID
        id: i64,
    },

    /// Ticket counts by status and priority
    Stats,

    /// Stats plus the most recent tickets
    Dashboard,

    /// List known users
    Users,

    /// Export visible tickets as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn init_tracing(verbose: bool, format: LogFormat) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("TICKETDESK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

fn find_db() -> Result<PathBuf> {
    let cwd = env::current_dir()?;
    commands::init::find_db_path(&cwd).context(
        "Not a ticketdesk directory (or any parent). Run 'ticketdesk init' first.",
    )
}

fn build_categorizer(args: &AnalyzerArgs) -> Result<Box<dyn Categorizer>> {
    let categorizer =
        HttpCategorizer::new(args.config()).context("Failed to set up categorizer")?;
    Ok(Box::new(categorizer))
}

fn open_desk(args: &AnalyzerArgs) -> Result<HelpDesk> {
    let db = Database::open(&find_db()?).context("Failed to open database")?;
    Ok(HelpDesk::new(db, build_categorizer(args)?))
}

fn require_actor(actor: Option<i64>) -> Result<i64> {
    actor.context("No acting user. Pass --as <USER_ID> or set TICKETDESK_USER")
}

fn run(cli: Cli) -> Result<()> {
    let out = if cli.json { Output::Json } else { Output::Text };

    match cli.command {
        Commands::Init { no_seed } => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd, !no_seed, build_categorizer(&cli.analyzer)?)
        }

        Commands::Create {
            title,
            description,
            priority,
        } => {
            let desk = open_desk(&cli.analyzer)?;
            let actor = require_actor(cli.actor)?;
            commands::create::run(&desk, actor, &title, &description, &priority, out)
        }

        Commands::List {
            status,
            priority,
            assigned_admin,
            reporter,
        } => {
            let desk = open_desk(&cli.analyzer)?;
            let actor = require_actor(cli.actor)?;
            let params = FilterParams {
                status,
                priority,
                assigned_admin,
                reporter,
            };
            commands::list::run(&desk, actor, &params, out)
        }

        Commands::Show { id } => {
            let desk = open_desk(&cli.analyzer)?;
            commands::show::run(&desk, require_actor(cli.actor)?, id, out)
        }

        Commands::Update {
            id,
            status,
            assign,
            unassign,
            priority,
        } => {
            let desk = open_desk(&cli.analyzer)?;
            let args = commands::update::UpdateArgs {
                status: status.as_deref(),
                assign,
                unassign,
                priority: priority.as_deref(),
            };
            commands::update::run(&desk, require_actor(cli.actor)?, id, &args, out)
        }

        Commands::Close { id } => {
            let desk = open_desk(&cli.analyzer)?;
            commands::status::close(&desk, require_actor(cli.actor)?, id, out)
        }

        Commands::Reopen { id } => {
            let desk = open_desk(&cli.analyzer)?;
            commands::status::reopen(&desk, require_actor(cli.actor)?, id, out)
        }

        Commands::Analyze { id } => {
            let desk = open_desk(&cli.analyzer)?;
            commands::analyze::run(&desk, require_actor(cli.actor)?, id, out)
        }

        Commands::Stats => {
            let desk = open_desk(&cli.analyzer)?;
            commands::stats::run(&desk, require_actor(cli.actor)?, out)
        }

        Commands::Dashboard => {
            let desk = open_desk(&cli.analyzer)?;
            commands::stats::dashboard(&desk, require_actor(cli.actor)?, out)
        }

        Commands::Users => {
            let desk = open_desk(&cli.analyzer)?;
            commands::users::run(&desk, out)
        }

        Commands::Export { output } => {
            let desk = open_desk(&cli.analyzer)?;
            commands::export::run_json(&desk, require_actor(cli.actor)?, output.as_deref())
        }
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::ValidationError => 2,
        ErrorKind::Unauthorized => 3,
        ErrorKind::NotFound => 4,
        ErrorKind::AnalysisFailed => 5,
        ErrorKind::StorageError => 1,
    }
}

fn report(err: &anyhow::Error, json: bool) -> ExitCode {
    let (kind, code) = match err.downcast_ref::<TicketError>() {
        Some(e) => (e.kind().as_str(), exit_code(e.kind())),
        None => ("error", 1),
    };

    if json {
        let body = serde_json::json!({ "kind": kind, "message": format!("{:#}", err) });
        eprintln!("{}", body);
    } else {
        eprintln!("error[{}]: {:#}", kind, err);
    }
    ExitCode::from(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = init_tracing(cli.verbose, cli.log_format) {
        eprintln!("{:#}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e, json),
    }
}
