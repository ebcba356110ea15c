//! Helpdesk back-office CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helpdesk_lib::{
    admin::RemoteClientRegistration,
    commands,
    config::AppConfig,
    csv_format::CsvTable,
    importer::DiagramFolder,
    init_tracing, AppState,
};

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(about = "IT helpdesk back office: document import and Microsoft 365 sync")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "helpdesk.toml")]
    config: PathBuf,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract network data from a document and print the preview as JSON
    Extract {
        file: PathBuf,

        /// MIME type reported by the uploader
        #[arg(short, long, default_value = "")]
        mime: String,
    },

    /// Extract a document and import diagrams, servers and network devices
    Import {
        file: PathBuf,

        #[arg(short, long, default_value = "")]
        mime: String,

        /// nymbis-cloud, company-network or cloud-networks
        #[arg(short, long, default_value = "company-network")]
        folder: String,
    },

    /// Mirror Intune devices, Entra users and licenses from Microsoft Graph
    SyncM365,

    /// Store the Graph client secret in the OS keyring
    SetGraphSecret { secret: String },

    /// Write an inventory table as CSV to stdout
    ExportCsv {
        /// servers or network-devices
        table: String,

        /// Print the header and an example row only
        #[arg(long)]
        template: bool,
    },

    /// Load inventory rows from a CSV file
    ImportCsv { table: String, file: PathBuf },

    /// Remote support agents
    Clients {
        #[command(subcommand)]
        action: ClientAction,
    },
}

#[derive(Subcommand)]
enum ClientAction {
    Register {
        #[arg(long)]
        token: String,
        #[arg(long)]
        hostname: String,
        #[arg(long)]
        os: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        agent_version: Option<String>,
    },
    Heartbeat {
        #[arg(long)]
        token: String,
    },
    List,
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    init_tracing(&config.logging.level);

    match cli.command {
        Commands::Extract { file, mime } => {
            let data = commands::documents::extract_document(&file.to_string_lossy(), &mime).await?;
            print_json(&data)?;
        }
        Commands::Import { file, mime, folder } => {
            let folder: DiagramFolder = folder.parse()?;
            let state = AppState::open(config).await?;
            let report =
                commands::documents::import_document(&state, &file.to_string_lossy(), &mime, folder).await?;
            print_json(&report)?;
        }
        Commands::SyncM365 => {
            let state = AppState::open(config).await?;
            let report = commands::sync::sync_m365(&state).await?;
            print_json(&report)?;
        }
        Commands::SetGraphSecret { secret } => {
            commands::settings::set_graph_secret(&secret).await?;
            println!("stored");
        }
        Commands::ExportCsv { table, template } => {
            let table: CsvTable = table.parse()?;
            if template {
                print!("{}", table.template());
            } else {
                let state = AppState::open(config).await?;
                print!("{}", commands::inventory::export_csv(&state, table).await?);
            }
        }
        Commands::ImportCsv { table, file } => {
            let table: CsvTable = table.parse()?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let state = AppState::open(config).await?;
            let response = commands::inventory::import_csv(&state, table, &text).await?;
            print_json(&response)?;
        }
        Commands::Clients { action } => {
            let state = AppState::open(config).await?;
            match action {
                ClientAction::Register {
                    token,
                    hostname,
                    os,
                    ip,
                    agent_version,
                } => {
                    let registration = RemoteClientRegistration {
                        token,
                        hostname,
                        os,
                        ip_address: ip,
                        agent_version,
                    };
                    print_json(&commands::clients::register_client(&state, registration).await?)?;
                }
                ClientAction::Heartbeat { token } => {
                    print_json(&commands::clients::heartbeat(&state, &token).await?)?;
                }
                ClientAction::List => {
                    print_json(&commands::clients::list_clients(&state).await?)?;
                }
            }
        }
    }
    Ok(())
}
