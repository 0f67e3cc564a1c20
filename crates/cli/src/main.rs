//! bi-dashboard CLI: headless host for the BI dashboard core.

mod commands;
mod state;

use std::path::PathBuf;

use bi_dashboard_core::models::chart::ChartKind;
use bi_dashboard_core::models::report::{Frequency, ReportFormat};
use bi_dashboard_core::models::settings::DashboardVariant;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bi-dashboard")]
#[command(about = "Fetch, chart and export sales data from the BI dashboard API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Encrypted client-state file (session, bookmarks, settings)
    #[arg(long, env = "BI_DASHBOARD_STATE", default_value = "dashboard.bids", global = true)]
    state: PathBuf,

    /// Password protecting the client-state file
    #[arg(long, env = "BI_DASHBOARD_STATE_PASSWORD", hide_env_values = true, global = true)]
    state_password: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the dashboard variant (sales | pp)
    #[arg(long, global = true)]
    variant: Option<DashboardVariant>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Product/store selection shared by the data commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only this product ("" for all)
    #[arg(long)]
    pub product: Option<String>,

    /// Only this store ("" for all)
    #[arg(long)]
    pub store: Option<String>,

    /// Start from a saved bookmark; --product/--store still override it
    #[arg(long)]
    pub bookmark: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and keep the session token in the state file
    Login {
        /// Account name (omit with --oauth)
        #[arg(required_unless_present = "oauth")]
        username: Option<String>,

        /// Account password
        #[arg(long, env = "BI_DASHBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Credential issued by the external identity provider
        #[arg(long, conflicts_with = "username")]
        oauth: Option<String>,
    },

    /// Drop the stored session token
    Logout,

    /// Show who the stored session belongs to
    Whoami,

    /// List the products and stores accepted by --product/--store
    Catalog,

    /// Fetch records and write every visible chart as SVG
    Render {
        /// Output directory
        #[arg(short, long, default_value = "charts")]
        out: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Drill the treemap into these nodes, in order
        #[arg(long = "drill")]
        drill: Vec<String>,
    },

    /// Fetch records and export the filtered view
    Export {
        /// pdf | xlsx | csv | png
        format: ReportFormat,

        /// Output file (defaults to dashboard.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chart to rasterize for png exports
        #[arg(long)]
        chart: Option<ChartKind>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print record totals of the filtered view
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Manage named bookmarks
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// Export and email a report
    Email {
        recipient: String,

        #[arg(short, long, default_value = "")]
        message: String,

        /// Attachment formats
        #[arg(short, long = "format", default_value = "pdf")]
        formats: Vec<ReportFormat>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Schedule a recurring report
    Schedule {
        /// daily | weekly | monthly
        frequency: Frequency,

        /// Send time, HH:MM
        time: String,

        /// pdf | xlsx
        format: ReportFormat,

        recipient: String,
    },

    /// Re-fetch and re-render on an interval until interrupted
    Watch {
        #[arg(short, long, default_value = "charts")]
        out: PathBuf,

        /// Seconds between fetches (defaults to the configured refresh interval)
        #[arg(short, long)]
        interval: Option<u64>,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Subcommand)]
pub enum BookmarkAction {
    /// List bookmarks of the active variant
    List,

    /// Save a selection under a new name
    Save {
        name: String,

        #[arg(long, default_value = "")]
        product: String,

        #[arg(long, default_value = "")]
        store: String,

        /// Charts to hide
        #[arg(long = "hide")]
        hidden: Vec<ChartKind>,
    },

    Rename { from: String, to: String },

    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let store = state::StateFile::new(cli.state, cli.state_password);
    let mut dashboard = store.open(cli.api_url.as_deref(), cli.variant)?;

    match cli.command {
        Commands::Login {
            username,
            password,
            oauth,
        } => commands::login(&mut dashboard, username, password, oauth).await?,
        Commands::Logout => dashboard.logout(),
        Commands::Whoami => commands::whoami(&dashboard),
        Commands::Catalog => commands::catalog(&mut dashboard).await?,
        Commands::Render { out, filter, drill } => {
            commands::render(&mut dashboard, &out, &filter, &drill).await?;
        }
        Commands::Export {
            format,
            output,
            chart,
            filter,
        } => commands::export(&mut dashboard, format, output, chart, &filter).await?,
        Commands::Summary { filter } => commands::summary(&mut dashboard, &filter).await?,
        Commands::Bookmark { action } => commands::bookmark(&mut dashboard, action)?,
        Commands::Email {
            recipient,
            message,
            formats,
            filter,
        } => commands::email(&mut dashboard, &recipient, &message, &formats, &filter).await?,
        Commands::Schedule {
            frequency,
            time,
            format,
            recipient,
        } => {
            dashboard
                .schedule_report(frequency, &time, format, &recipient)
                .await?;
            println!("Scheduled a {format:?} report to {recipient} at {time} ({frequency:?})");
        }
        Commands::Watch {
            out,
            interval,
            filter,
        } => commands::watch(&mut dashboard, &out, interval, &filter).await?,
    }

    store.save_if_dirty(&mut dashboard)?;
    Ok(())
}
