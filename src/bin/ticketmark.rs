//! ticketmark CLI: run the reconciliation engine over a document snapshot.
//!
//! Usage:
//!   ticketmark extract <TEXT>...
//!   ticketmark annotate <TREE.json> [--statuses MAP.json] [--url URL]
//!   ticketmark diagnose <TREE.json>

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use ticketmark::{
    Document, EngineConfig, Identifier, NodeSpec, PageActivation, ReconciliationEngine,
    ResolvedStatus, StaticResolver, StatusCache,
};

#[derive(Parser)]
#[command(
    name = "ticketmark",
    version,
    about = "Ticket status annotations for build listings"
)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identifier extracted from each text
    Extract {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Run one full pass over a document and print the annotated markup
    Annotate {
        /// JSON array of node specs forming the page body
        tree: PathBuf,
        /// JSON object mapping identifiers to statuses
        #[arg(long)]
        statuses: Option<PathBuf>,
        /// Page address; decides activation and build context
        #[arg(long)]
        url: Option<String>,
    },
    /// List identifier occurrences and annotations in a document
    Diagnose {
        /// JSON array of node specs forming the page body
        tree: PathBuf,
    },
}

fn setup_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();
}

fn load_document(path: &Path) -> Result<Document, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let specs: Vec<NodeSpec> = serde_json::from_str(&json)
        .map_err(|e| format!("invalid tree in '{}': {}", path.display(), e))?;
    Document::from_specs(&specs).map_err(|e| format!("cannot build tree: {}", e))
}

fn load_statuses(path: Option<&Path>) -> Result<StaticResolver, String> {
    let Some(path) = path else {
        return Ok(StaticResolver::new());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let statuses: HashMap<Identifier, ResolvedStatus> = serde_json::from_str(&json)
        .map_err(|e| format!("invalid statuses in '{}': {}", path.display(), e))?;
    Ok(statuses.into_iter().collect())
}

fn engine_for(
    config: &EngineConfig,
    document: Document,
    resolver: StaticResolver,
) -> Result<ReconciliationEngine, String> {
    let freshness = config.freshness().map_err(|e| e.to_string())?;
    ReconciliationEngine::new(
        config,
        Arc::new(Mutex::new(document)),
        Arc::new(resolver),
        Arc::new(StatusCache::new(freshness)),
    )
    .map_err(|e| e.to_string())
}

fn cmd_extract(config: &EngineConfig, texts: &[String]) -> i32 {
    let extractor = match config.extractor() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    for text in texts {
        match extractor.extract(text) {
            Some(id) => println!("{}\t{}", id, text),
            None => println!("-\t{}", text),
        }
    }
    0
}

async fn cmd_annotate(
    config: &EngineConfig,
    tree: &Path,
    statuses: Option<&Path>,
    url: Option<&str>,
) -> i32 {
    let activation = PageActivation::new(config.activation.clone());
    if let Some(url) = url {
        if !activation.is_active_href(url) {
            eprintln!("Error: '{}' is not a page the engine activates on", url);
            return 1;
        }
    }

    let engine = match load_document(tree)
        .and_then(|doc| Ok((doc, load_statuses(statuses)?)))
        .and_then(|(doc, resolver)| engine_for(config, doc, resolver))
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    engine.set_build_page(url.is_some_and(|url| activation.is_build_page_href(url)));

    let report = engine.full_pass().await;
    {
        let doc = engine.lock();
        for child in doc.element_children(doc.body()) {
            print!("{}", doc.to_markup(child));
        }
    }
    match serde_json::to_string(&report) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => eprintln!("Warning: cannot encode pass report: {}", e),
    }
    if report.errors > 0 {
        1
    } else {
        0
    }
}

fn cmd_diagnose(config: &EngineConfig, tree: &Path) -> i32 {
    let engine = match load_document(tree)
        .and_then(|doc| engine_for(config, doc, StaticResolver::new()))
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let diagnosis = engine.diagnose();
    if diagnosis.occurrences.is_empty() {
        println!("No identifiers found.");
        return 0;
    }
    println!("{:<16}  {:>5}", "IDENTIFIER", "COUNT");
    println!("{}", "-".repeat(23));
    for (id, count) in &diagnosis.occurrences {
        println!("{:<16}  {:>5}", id, count);
    }
    if !diagnosis.annotations.is_empty() {
        println!();
        for (id, valid) in &diagnosis.annotations {
            println!("annotation {:<16}  {}", id, if *valid { "valid" } else { "orphaned" });
        }
    }
    0
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let config = match EngineConfig::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Extract { texts } => cmd_extract(&config, &texts),
        Commands::Annotate { tree, statuses, url } => {
            cmd_annotate(&config, &tree, statuses.as_deref(), url.as_deref()).await
        }
        Commands::Diagnose { tree } => cmd_diagnose(&config, &tree),
    };
    std::process::exit(code);
}
