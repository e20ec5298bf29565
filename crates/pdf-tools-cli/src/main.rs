use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_compose::{AssembleOptions, Assembler, Manifest, PageCount};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdft", about = "PDF tools CLI", version)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a PDF from page data laid over manifest templates
    Compose {
        /// Manifest JSON describing fonts and templates
        #[arg(short, long)]
        manifest: PathBuf,

        /// Page data JSON (array of {template, locations})
        #[arg(short, long)]
        pages: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Pad the document with blank pages up to this many pages
        #[arg(long)]
        number_of_pages: Option<usize>,

        /// Fail when the document would grow past this many pages
        #[arg(long)]
        page_limit: Option<usize>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compose {
            manifest,
            pages,
            output,
            number_of_pages,
            page_limit,
        } => {
            let registry = Manifest::load(&manifest)
                .await
                .with_context(|| format!("loading manifest {}", manifest.display()))?
                .into_registry()
                .await?;
            let pages = pdf_compose::load_pages(&pages)
                .await
                .with_context(|| format!("loading page data {}", pages.display()))?;
            log::debug!("loaded {} page data entries", pages.len());

            let mut options = AssembleOptions::default();
            if let Some(count) = number_of_pages {
                options = options.with_number_of_pages(PageCount::Fixed(count));
            }
            if let Some(limit) = page_limit {
                options = options.with_page_limit(limit);
            }

            let size = pdf_compose::compose_to_file(
                &Assembler::default(),
                &output,
                &pages,
                &registry,
                &options,
            )
            .await?;

            println!("Composition Summary:");
            println!("  Page data entries: {}", pages.len());
            println!("  Templates: {}", registry.template_names().count());
            println!("  Output size: {} bytes", size);
            println!("Composed → {}", output.display());
        }
    }

    Ok(())
}
