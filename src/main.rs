//! # Code Assistant CLI (`cassist`)
//!
//! Loads code from a wiki page, runs it through up to three chained AI
//! transformations, and reports the impact of the result.
//!
//! ## Usage
//!
//! ```bash
//! cassist --config ./config/cassist.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cassist spaces` | List spaces from the backend |
//! | `cassist pages <space>` | List page titles in a space |
//! | `cassist show <space> <page>` | Print a page's code and summary |
//! | `cassist run <space> <page>` | Run the transformation pipeline |
//! | `cassist impact <space> <page> --candidate <file>` | Analyze a local candidate |
//! | `cassist catalog` | List AI actions, languages, and export formats |
//! | `cassist serve` | Start the HTTP service |
//! | `cassist completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Convert to Rust, then apply an action
//! cassist run ENG "Parser" --language rust --action "Optimize Performance"
//!
//! # Modify, analyze impact, and export as PDF
//! cassist run ENG "Parser" --instruction "Add logging" --impact --export pdf
//!
//! # Write the result back to the page named in a macro URL
//! cassist run ENG "Parser" --instruction "Add logging" \
//!     --save-url "https://wiki.example.com/display?spaceKey=ENG&pageTitle=Parser"
//! ```

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use code_assistant::catalog::catalog;
use code_assistant::client::HttpBackend;
use code_assistant::config::{self, Config};
use code_assistant::export::write_export;
use code_assistant::session::{PageRef, Session};
use code_assistant::{logging, server};
use code_assistant_core::{
    impact, service, DirectoryService, ExportFormat, ImpactReport, OutputSlot, PipelineOutputs,
    PipelineSelection,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Code Assistant: chained AI code transformations with impact analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cassist.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "cassist", about = "Chained AI code transformations over wiki pages", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cassist.toml")]
    config: PathBuf,

    /// Log debug output to stderr. `RUST_LOG` takes precedence.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List spaces from the backend directory.
    Spaces,

    /// List page titles in a space.
    Pages { space: String },

    /// Print a page's code and summary.
    Show { space: String, page: String },

    /// Run the transformation pipeline against a page.
    ///
    /// Stages run in fixed order: convert, modify, then AI action. At least
    /// one of `--language`, `--instruction`, or `--action` is required.
    Run {
        space: String,
        page: String,

        /// Free-text modification instruction.
        #[arg(long, short)]
        instruction: Option<String>,

        /// Target language for conversion (see `cassist catalog`).
        #[arg(long, short)]
        language: Option<String>,

        /// AI action name, e.g. "Refactor Structure".
        #[arg(long, short)]
        action: Option<String>,

        /// Analyze the impact of the result.
        #[arg(long)]
        impact: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Export the result in this format (markdown, pdf, docx, txt).
        #[arg(long, value_name = "FORMAT")]
        export: Option<ExportFormat>,

        /// File name for the export, without extension.
        #[arg(long, requires = "export")]
        filename: Option<String>,

        /// Save the result back to the loaded page.
        #[arg(long, conflicts_with = "save_url")]
        save: bool,

        /// Save the result to the page named in this URL's query string.
        #[arg(long, value_name = "URL")]
        save_url: Option<String>,
    },

    /// Analyze a local candidate file against a page's code.
    Impact {
        space: String,
        page: String,

        /// File holding the changed code.
        #[arg(long)]
        candidate: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List AI actions, target languages, and export formats.
    Catalog {
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP service on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions { shell: clap_complete::Shell },
}

#[derive(Serialize)]
struct RunReport<'a> {
    outputs: &'a PipelineOutputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    impact: Option<&'a ImpactReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<&'a PageRef>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Commands that don't require config
    match &cli.command {
        Commands::Catalog { json } => {
            print_catalog(*json)?;
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "cassist", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Spaces => {
            let backend = HttpBackend::new(&cfg.backend)?;
            for space in backend.list_spaces().await? {
                println!("{}\t{}", space.key, space.name);
            }
        }
        Commands::Pages { space } => {
            let backend = HttpBackend::new(&cfg.backend)?;
            for page in backend.list_pages(&space).await? {
                println!("{}", page);
            }
        }
        Commands::Show { space, page } => {
            let backend = HttpBackend::new(&cfg.backend)?;
            let doc = service::load_document(&backend, &space, &page).await?;
            if !doc.summary.is_empty() {
                println!("# {}\n\n{}\n", doc.page_title, doc.summary);
            }
            println!("{}", doc.original_code);
        }
        Commands::Run {
            space,
            page,
            instruction,
            language,
            action,
            impact,
            json,
            export,
            filename,
            save,
            save_url,
        } => {
            let selection = PipelineSelection::new(
                instruction.unwrap_or_default(),
                language.unwrap_or_default(),
                action.unwrap_or_default(),
            );
            let target = match save_url {
                Some(url) => Some(Some(PageRef::from_page_url(&url)?)),
                None if save => Some(None),
                None => None,
            };
            run_pipeline(&cfg, &space, &page, &selection, impact, json, export, filename, target)
                .await?;
        }
        Commands::Impact {
            space,
            page,
            candidate,
            json,
        } => {
            let candidate = std::fs::read_to_string(&candidate)
                .with_context(|| format!("Failed to read candidate: {}", candidate.display()))?;
            let backend = HttpBackend::new(&cfg.backend)?;
            let doc = service::load_document(&backend, &space, &page).await?;
            let report =
                impact::analyze(&backend, &doc.original_code, &candidate, &space, &page).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_impact(&report);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Catalog { .. } | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

/// Loads the page, runs the pipeline, then the optional impact, export,
/// and save steps in that order.
#[allow(clippy::too_many_arguments)]
async fn run_pipeline(
    cfg: &Config,
    space: &str,
    page: &str,
    selection: &PipelineSelection,
    with_impact: bool,
    json: bool,
    export: Option<ExportFormat>,
    filename: Option<String>,
    save: Option<Option<PageRef>>,
) -> anyhow::Result<()> {
    let session = Session::new(Arc::new(HttpBackend::new(&cfg.backend)?));
    session.load_page(space, page).await?;
    let outputs = session.run(selection).await?;

    let report = if with_impact {
        Some(session.analyze_impact().await?)
    } else {
        None
    };

    let exported = match export {
        Some(format) => {
            let name = filename.unwrap_or_else(|| cfg.export.default_filename.clone());
            let file = session.export(format, &name).await?;
            Some(write_export(&cfg.export.output_dir, &file)?)
        }
        None => None,
    };

    let saved = match save {
        Some(target) => Some(session.save(target).await?),
        None => None,
    };

    if json {
        let out = RunReport {
            outputs: &outputs,
            impact: report.as_ref(),
            exported,
            saved: saved.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_outputs(&outputs);
    if let Some(report) = &report {
        print_impact(report);
    }
    if let Some(path) = exported {
        println!("Exported to {}", path.display());
    }
    if let Some(target) = saved {
        println!("Saved to {} / {}", target.space_key, target.page_title);
    }
    Ok(())
}

fn slot_title(slot: OutputSlot) -> &'static str {
    match slot {
        OutputSlot::AiAction => "AI action",
        OutputSlot::Modification => "Modification",
        OutputSlot::Conversion => "Conversion",
        OutputSlot::Processed => "Processed",
    }
}

fn print_outputs(outputs: &PipelineOutputs) {
    for slot in outputs.populated() {
        println!("== {} ==\n{}\n", slot_title(slot), outputs.get(slot));
    }
}

fn print_impact(report: &ImpactReport) {
    let m = &report.metrics;
    println!("== Impact ==");
    println!(
        "+{} -{} lines, {} file, {}% changed",
        m.lines_added, m.lines_removed, m.files_changed, m.percentage_changed
    );
    println!("Risk: {} (score {})", report.risk.level, report.risk.score);
    for factor in &report.risk.factors {
        println!("  - {}", factor);
    }
    println!("\n{}", report.diff_text());
    println!("\n{}", report.summary);
    if !report.recommendations.is_empty() {
        println!("\nRecommendations:\n{}", report.recommendations);
    }
}

fn print_catalog(json: bool) -> anyhow::Result<()> {
    let c = catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&c)?);
        return Ok(());
    }
    println!("AI actions:");
    for action in &c.actions {
        println!("  {}", action);
    }
    println!("Target languages:");
    for lang in &c.languages {
        println!("  {}", lang);
    }
    println!("Export formats:");
    for f in &c.formats {
        println!("  {:<10} {}", f.value, f.label);
    }
    Ok(())
}
