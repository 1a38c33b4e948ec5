mod logger;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use logger::ConsoleLogger;
use proxy_fetch::FetchOptions;
use proxy_fetch::deck::{DeckSource, load_batch_file};
use proxy_runtime::{
    BoardFilter, FormatMode, GenerateRequest, JobManager, JobStatus, PaperSize, PreviewRequest,
    SheetOptions,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mtgp", about = "Print-ready proxy sheets from MTG decklists", version)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate PDFs for one or more decks (Archidekt URLs or CSV files)
    Generate {
        /// Deck sources; more than one makes a batch run
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,

        /// Deck name, overriding the source's (single deck only)
        #[arg(long)]
        deckname: Option<String>,

        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Generate PDFs for every deck listed in a batch file
    Batch {
        /// One `url[|custom name]` per line, `#` comments
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the planned pages as JSON without downloading any images
    Preview {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,

        /// Layout mode
        #[arg(long, default_value = "single", value_enum)]
        format: FormatArg,

        #[command(flatten)]
        boards: BoardArgs,

        /// Image cache directory, checked for known back faces
        #[arg(long, default_value = "card_images")]
        cache_dir: PathBuf,
    },
}

#[derive(Args)]
struct SheetArgs {
    /// Sheet options JSON; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective sheet options to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Layout mode
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Gap between cards in mm
    #[arg(long)]
    padding_mm: Option<f32>,

    /// Cut line color (#RRGGBB)
    #[arg(long)]
    cut_line_color: Option<String>,

    /// Cut line thickness in mm
    #[arg(long)]
    cut_line_thickness: Option<f32>,

    /// Omit the page footer
    #[arg(long)]
    no_footer: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    boards: BoardArgs,

    /// Back image for cards without one (double-sided layouts)
    #[arg(long)]
    default_back_image: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Image cache directory
    #[arg(long, default_value = "card_images")]
    cache_dir: PathBuf,

    /// Delete images downloaded by this run when it finishes
    #[arg(long)]
    purge_new: bool,

    /// Show statistics only, don't download images or generate PDFs
    #[arg(long)]
    stats_only: bool,
}

#[derive(Args)]
struct BoardArgs {
    /// Include sideboard cards
    #[arg(long)]
    include_sideboard: bool,

    /// Include maybeboard cards
    #[arg(long)]
    include_maybeboard: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Single,
    Double,
    Both,
    Smart,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    Letter,
    A4,
    Legal,
}

impl From<FormatArg> for FormatMode {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Single => Self::Single,
            FormatArg::Double => Self::Double,
            FormatArg::Both => Self::Both,
            FormatArg::Smart => Self::Smart,
        }
    }
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::Letter => Self::Letter,
            PaperArg::A4 => Self::A4,
            PaperArg::Legal => Self::Legal,
        }
    }
}

impl From<&BoardArgs> for BoardFilter {
    fn from(args: &BoardArgs) -> Self {
        Self {
            include_sideboard: args.include_sideboard,
            include_maybeboard: args.include_maybeboard,
        }
    }
}

impl SheetArgs {
    async fn resolve(&self) -> Result<SheetOptions> {
        let mut options = match &self.config {
            Some(path) => SheetOptions::load(path)
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => SheetOptions::default(),
        };

        if let Some(format) = self.format {
            options.format = format.into();
        }
        if let Some(paper) = self.paper {
            options.paper_size = paper.into();
        }
        if let Some(padding) = self.padding_mm {
            options.padding_mm = padding;
        }
        if let Some(color) = &self.cut_line_color {
            options.cut_line_color = color.clone();
        }
        if let Some(thickness) = self.cut_line_thickness {
            options.cut_line_thickness_mm = thickness;
        }
        if self.no_footer {
            options.show_footer = false;
        }
        options.validate()?;

        if let Some(path) = &self.save_config {
            options.save(path).await?;
            println!("Saved sheet options → {}", path.display());
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = ConsoleLogger::new(1000, level);
    logger.clone().init()?;

    match cli.command {
        Commands::Generate {
            inputs,
            deckname,
            sheet,
            run,
        } => {
            let mut sources = parse_inputs(&inputs)?;
            if let Some(name) = deckname {
                match sources.as_mut_slice() {
                    [source] => set_custom_name(source, name),
                    _ => bail!("--deckname needs exactly one deck"),
                }
            }
            let batch = sources.len() > 1;
            run_generate(sources, batch, &sheet, &run, &logger).await?;
        }

        Commands::Batch { file, sheet, run } => {
            let sources = load_batch_file(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            if sources.is_empty() {
                bail!("No decks listed in {}", file.display());
            }
            // A batch file always makes a batch run, even with one deck
            run_generate(sources, true, &sheet, &run, &logger).await?;
        }

        Commands::Preview {
            inputs,
            format,
            boards,
            cache_dir,
        } => {
            let manager = manager(&cache_dir, PathBuf::from("output")).await?;
            let request = PreviewRequest {
                sources: parse_inputs(&inputs)?,
                format: format.into(),
                boards: (&boards).into(),
            };
            for preview in manager.start_preview(&request).await? {
                println!("{}", preview.to_json()?);
            }
        }
    }

    Ok(())
}

fn parse_inputs(inputs: &[String]) -> Result<Vec<DeckSource>> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in inputs {
        match DeckSource::parse_line(input) {
            Some(source) => sources.push(source?),
            None => bail!("Not a deck source: '{input}'"),
        }
    }
    Ok(sources)
}

fn set_custom_name(source: &mut DeckSource, name: String) {
    match source {
        DeckSource::Archidekt { custom_name, .. } | DeckSource::Csv { custom_name, .. } => {
            *custom_name = Some(name)
        }
    }
}

async fn manager(cache_dir: &std::path::Path, output_dir: PathBuf) -> Result<JobManager> {
    let options = FetchOptions {
        cache_dir: cache_dir.to_path_buf(),
        ..Default::default()
    };
    let fetcher = options.build().await?;
    Ok(JobManager::new(fetcher, output_dir))
}

async fn run_generate(
    sources: Vec<DeckSource>,
    batch: bool,
    sheet: &SheetArgs,
    run: &RunArgs,
    logger: &ConsoleLogger,
) -> Result<()> {
    let options = sheet.resolve().await?;
    let manager = manager(&run.cache_dir, run.output_dir.clone()).await?;

    if run.stats_only {
        return print_stats(&manager, sources, &options, run).await;
    }

    let mut request = GenerateRequest::new(sources);
    request.batch = batch;
    request.sheet = options;
    request.boards = (&run.boards).into();
    request.default_back = run.default_back_image.clone();
    request.purge_new = run.purge_new;

    let id = manager.start_generate(request);
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut last_progress = None;
    let snapshot = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted; stopping after the current deck");
                manager.cancel(id)?;
            }
            _ = ticker.tick() => {
                let Some(snapshot) = manager.get_status(id) else {
                    bail!("Job {id} disappeared");
                };
                if last_progress != Some(snapshot.progress) {
                    log::debug!("Progress: {}%", snapshot.progress);
                    last_progress = Some(snapshot.progress);
                }
                if snapshot.status.is_finished() {
                    break snapshot;
                }
            }
        }
    };

    println!();
    println!("Output files:");
    for file in &snapshot.files {
        println!("  {}", file.display());
    }
    let warnings = logger.warning_count();
    if warnings > 0 {
        println!("{warnings} warning(s), see log above");
    }

    match snapshot.status {
        JobStatus::Completed => Ok(()),
        JobStatus::Cancelled => {
            println!("Cancelled");
            Ok(())
        }
        _ => bail!(
            "Generation failed: {}",
            snapshot.error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

/// Page counts from the preview plan; back faces are only known from the
/// deck source or the cache at this point
async fn print_stats(
    manager: &JobManager,
    sources: Vec<DeckSource>,
    options: &SheetOptions,
    run: &RunArgs,
) -> Result<()> {
    let request = PreviewRequest {
        sources,
        format: options.format,
        boards: (&run.boards).into(),
    };
    let previews = manager.start_preview(&request).await?;

    println!("Layout Statistics:");
    for preview in &previews {
        println!("  {}:", preview.name);
        for batch in &preview.batches {
            let filled: usize = batch
                .pages
                .iter()
                .map(|page| page.cards.iter().filter(|card| !card.is_empty()).count())
                .sum();
            println!(
                "    {}: {} page(s), {} filled slot(s)",
                batch.label,
                batch.pages.len(),
                filled
            );
        }
    }
    let pages: usize = previews.iter().map(|p| p.page_count()).sum();
    println!("  Total pages: {pages}");
    Ok(())
}
