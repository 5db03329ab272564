use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use plano_agents::{AgentConfig, RegulationAgent};
use plano_core::QueryRequest;
use plano_observability::{init_tracing, AppMetrics};
use plano_retrieval::load_data_dir;
use plano_storage::{SqliteStore, Store};

#[derive(Debug, Parser)]
#[command(name = "plano")]
#[command(about = "Plano Diretor regulation assistant")]
struct Cli {
    #[arg(long, env = "PLANO_DATA_ROOT", default_value = "data")]
    data_root: PathBuf,

    #[arg(long, env = "PLANO_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Ask {
        question: String,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    Chat {
        #[arg(long)]
        model: Option<String>,
    },
    Classify {
        question: String,
    },
    Entities {
        #[command(subcommand)]
        command: EntitiesCommand,
    },
    /// Loads the data root into the SQLite database given by --database-url.
    Import,
}

#[derive(Debug, Subcommand)]
enum EntitiesCommand {
    List,
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("plano_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Import => import(&cli.data_root, cli.database_url.as_deref()).await,
        command => {
            let agent = build_agent(&cli.data_root, cli.database_url.as_deref()).await?;
            run_command(agent, command).await
        }
    }
}

async fn run_command(agent: RegulationAgent<Store>, command: Command) -> Result<()> {
    match command {
        Command::Ask {
            question,
            session,
            model,
        } => {
            let envelope = agent
                .answer(QueryRequest {
                    query: Some(question),
                    message: None,
                    session_id: session,
                    model,
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Chat { model } => run_chat(agent, model).await?,
        Command::Classify { question } => {
            let classification = agent.classify(&question);
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Command::Entities { command } => match command {
            EntitiesCommand::List => {
                let entities = agent.entities();
                println!("{}", serde_json::to_string_pretty(entities.names())?);
            }
            EntitiesCommand::Refresh => {
                let count = agent.refresh_entities().await?;
                println!("{}", serde_json::json!({ "entities": count }));
            }
        },
        Command::Import => bail!("import runs without an agent"),
    }

    Ok(())
}

async fn import(data_root: &Path, database_url: Option<&str>) -> Result<()> {
    let database_url = database_url.context("import needs --database-url or PLANO_DATABASE_URL")?;
    let dataset = load_data_dir(data_root)
        .with_context(|| format!("failed loading regulation data from {}", data_root.display()))?;

    let store = SqliteStore::connect(database_url).await?;
    store.insert_dataset(&dataset).await?;

    println!(
        "{}",
        serde_json::json!({
            "zoning": dataset.zoning.len(),
            "chunks": dataset.chunks.len(),
            "sections": dataset.sections.len(),
            "hazards": dataset.hazards.len(),
        })
    );
    Ok(())
}

async fn run_chat(agent: RegulationAgent<Store>, model: Option<String>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Plano Diretor chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let envelope = agent
            .answer(QueryRequest {
                query: None,
                message: Some(message.to_string()),
                session_id: session_id.clone(),
                model: model.clone(),
            })
            .await;

        if session_id.is_none() && !envelope.metadata.session_id.is_empty() {
            session_id = Some(envelope.metadata.session_id.clone());
        }

        println!("\n{}\n", envelope.text);
        println!(
            "(confiança {:.2}, estratégia {}, {} ms)\n",
            envelope.confidence,
            envelope.metadata.strategy_used.as_deref().unwrap_or("nenhuma"),
            envelope.execution_time_ms
        );
    }

    Ok(())
}

async fn build_agent(data_root: &Path, database_url: Option<&str>) -> Result<RegulationAgent<Store>> {
    let metrics = AppMetrics::shared();

    let store = match database_url {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => {
            let dataset = load_data_dir(data_root).with_context(|| {
                format!("failed loading regulation data from {}", data_root.display())
            })?;
            Store::memory(dataset)
        }
    };

    RegulationAgent::bootstrap(Arc::new(store), metrics, AgentConfig::from_env()).await
}
