use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use qrgraph::config::OutputFormat;
use qrgraph::db::{Db, migrate};
use qrgraph::{audit, Config, DateRange, GraphRequest, KnowledgeGraphService};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "qrgraph")]
#[command(about = "Discover and render the relationship graph of NCe / MRBe / 8D quality records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the relationship graph for one or more seed records
    Graph {
        /// Seed record id (repeatable, or comma-separated)
        #[arg(short, long = "seed", value_delimiter = ',', required = true)]
        seeds: Vec<String>,

        /// Earliest opened date (YYYY-MM-DD), inclusive
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Latest opened date (YYYY-MM-DD), inclusive
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Restrict NCe records to these part revisions (repeatable)
        #[arg(short, long = "revision", value_delimiter = ',')]
        revisions: Vec<String>,

        /// Output format; defaults to output.format from config.toml
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Write the JSON payload to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the most recent graph builds from the run log
    Runs {
        /// Number of runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Apply migrations and verify the database schema
    Verify,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Tree,
    Json,
    Both,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Tree => OutputFormat::Tree,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Both => OutputFormat::Both,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.store.log_level.as_str())
    ).init();

    let db = Db::new(config.db_path()).with_query_timeout(config.query_timeout());
    let migrations_dir = resolve_migrations_dir();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    match cli.command.unwrap_or(Command::Verify) {
        Command::Graph { seeds, from, to, revisions, format, output } => {
            let mut request = GraphRequest::new(&seeds).with_part_revisions(&revisions);
            if let (Some(from), Some(to)) = (from, to) {
                request = request.with_date_range(DateRange::new(from, to)?);
            }
            let format = format.map(OutputFormat::from).unwrap_or(config.output.format);
            run_graph(db, &config, request, format, output.as_deref()).await?;
        }
        Command::Runs { limit } => {
            show_recent_runs(&db, limit).await?;
        }
        Command::Verify => {
            verify_database_schema(&db).await?;
        }
    }

    Ok(())
}

/// `./migrations` when run from a checkout, else the crate's own directory
fn resolve_migrations_dir() -> PathBuf {
    let local = Path::new("migrations");
    if local.is_dir() {
        local.to_path_buf()
    } else {
        migrate::bundled_migrations_dir()
    }
}

async fn run_graph(
    db: Db,
    config: &Config,
    request: GraphRequest,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    log::info!("Building graph for seeds: {:?}", request.seeds());

    let service = KnowledgeGraphService::new(db, &config.graph);
    let result = service.run(request).await?;

    if matches!(format, OutputFormat::Tree | OutputFormat::Both) {
        print!("{}", result.tree);
    }

    if matches!(format, OutputFormat::Json | OutputFormat::Both) {
        let json = if config.output.pretty_json {
            serde_json::to_string_pretty(&result.graph)?
        } else {
            serde_json::to_string(&result.graph)?
        };
        match output {
            Some(path) => {
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                log::info!("Wrote knowledge graph to {}", path.display());
            }
            None => {
                if format == OutputFormat::Both {
                    println!();
                }
                println!("{}", json);
            }
        }
    }

    log::info!(
        "{} visited, {} node(s), {} edge(s), {} root(s)",
        result.stats.visited,
        result.stats.nodes,
        result.stats.edges,
        result.stats.roots
    );
    Ok(())
}

async fn show_recent_runs(db: &Db, limit: usize) -> Result<()> {
    let runs = db
        .with_connection(move |conn| audit::recent_runs(conn, limit))
        .await?;

    if runs.is_empty() {
        println!("No graph runs recorded");
        return Ok(());
    }

    for run in runs {
        let status = match &run.error_message {
            None => "ok".to_string(),
            Some(e) => format!("failed: {}", e),
        };
        println!(
            "{}  {}  seeds={}  nodes={} edges={}  {}ms  {}",
            run.timestamp, run.run_id, run.seeds_json, run.node_count, run.edge_count, run.latency_ms, status
        );
    }
    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use qrgraph::error::QrgraphError;

    db.with_connection(|conn| {
        let names = |kind: &str| -> std::result::Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")?;
            let rows = stmt.query_map([kind], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            Ok(rows)
        };

        let tables = names("table")?;
        let expected_tables = ["nce_records", "mrbe_records", "eightd_records", "attachments", "graph_runs", "schema_migrations"];
        let mut all_tables_exist = true;
        for table in &expected_tables {
            if tables.iter().any(|t| t == table) {
                log::debug!("✓ Table exists: {}", table);
            } else {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            }
        }
        if !all_tables_exist {
            return Err(QrgraphError::Config("Not all required tables exist".to_string()));
        }

        let views = names("view")?;
        for view in qrgraph::RecordSource::ALL.map(|s| s.view_name()) {
            if !views.iter().any(|v| v == view) {
                return Err(QrgraphError::Config(format!("Traversal view '{}' does not exist", view)));
            }
            log::debug!("✓ View exists: {}", view);
        }

        if !tables.iter().any(|t| t == "attachments_fts") {
            log::warn!("FTS5 table 'attachments_fts' missing; attachment enrichment will return no hits");
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("✓ {} migrations applied", applied.len());

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(QrgraphError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
