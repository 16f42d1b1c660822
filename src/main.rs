use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use playlist_telemetry::cli_style::{self, colors, get_styles, TableBuilder};
use playlist_telemetry::config::{AppConfig, CliConfig, FileConfig};
use playlist_telemetry::pipeline::{FallbackMode, RowOrder, TableCache};
use playlist_telemetry::summary::{self, TableSummary};
use playlist_telemetry::{export, metrics, run_pipeline_with_cache, PipelineOutput, Provenance};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(styles=get_styles(), version = env!("APP_VERSION"), about = "Playlist audio-feature telemetry")]
struct CliArgs {
    /// Path to a TOML config file. Its values override command-line flags.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip the banner.
    #[clap(long, global = true)]
    pub no_banner: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the acquisition pipeline and print a report.
    Fetch(FetchArgs),
    /// Summarize a previously exported or offline CSV table.
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Streaming API client id.
    #[clap(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Streaming API client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Source candidate, tried in the given order. Use `search:<query>` for a
    /// free-text search. Repeatable.
    #[clap(long = "source")]
    pub sources: Vec<String>,

    /// Track ids per audio-feature request (1-100).
    #[clap(long)]
    pub batch_size: Option<usize>,

    /// Collection entries to read (1-100).
    #[clap(long)]
    pub page_size: Option<usize>,

    /// Row order of the result table.
    #[clap(long, value_enum)]
    pub row_order: Option<RowOrder>,

    /// Retries for a failing feature batch.
    #[clap(long)]
    pub max_retries: Option<u32>,

    /// Seconds a live result stays cached.
    #[clap(long)]
    pub cache_ttl_secs: Option<u64>,

    /// What to serve when live data is unavailable.
    #[clap(long, value_enum)]
    pub fallback: Option<FallbackMode>,

    /// Offline CSV dataset for the `dataset` fallback.
    #[clap(long)]
    pub dataset: Option<PathBuf>,

    /// Rows in a synthetic fallback table.
    #[clap(long)]
    pub synthetic_rows: Option<usize>,

    /// Seed for the synthetic fallback table.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Base URL of the streaming API.
    #[clap(long)]
    pub api_base_url: Option<String>,

    /// URL of the token endpoint.
    #[clap(long)]
    pub token_url: Option<String>,

    /// Per-request timeout in seconds.
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Write the table as CSV.
    #[clap(long)]
    pub csv: Option<PathBuf>,

    /// Write the table and run metadata as JSON.
    #[clap(long)]
    pub json: Option<PathBuf>,

    /// Rows shown in the preview table.
    #[clap(long, default_value_t = 10)]
    pub preview: usize,

    /// Bins of the BPM histogram.
    #[clap(long, default_value_t = summary::DEFAULT_BPM_BINS)]
    pub bpm_bins: usize,

    /// Print Prometheus metrics after the run.
    #[clap(long)]
    pub print_metrics: bool,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// CSV table to summarize.
    pub csv: PathBuf,

    /// Bins of the BPM histogram.
    #[clap(long, default_value_t = summary::DEFAULT_BPM_BINS)]
    pub bpm_bins: usize,
}

impl FetchArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            sources: self.sources.clone(),
            batch_size: self.batch_size,
            page_size: self.page_size,
            row_order: self.row_order,
            max_retries: self.max_retries,
            cache_ttl_secs: self.cache_ttl_secs,
            fallback_mode: self.fallback,
            dataset_path: self.dataset.clone(),
            synthetic_rows: self.synthetic_rows,
            seed: self.seed,
            api_base_url: self.api_base_url.clone(),
            token_url: self.token_url.clone(),
            request_timeout_secs: self.timeout_secs,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    metrics::init_metrics();

    if !cli_args.no_banner {
        cli_style::print_banner();
    }

    let result = match &cli_args.command {
        Command::Fetch(args) => fetch(cli_args.config.as_ref(), args),
        Command::Summarize(args) => summarize_file(args),
    };
    if let Err(e) = result {
        cli_style::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn fetch(config_path: Option<&PathBuf>, args: &FetchArgs) -> Result<()> {
    let file_config = match config_path {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&args.to_cli_config(), file_config)?;

    // Only configuration errors come back, everything else degrades
    let cache = Arc::new(TableCache::for_settings(&config.pipeline));
    let output =
        run_pipeline_with_cache(&config, Some(cache)).context("Cannot run the pipeline")?;

    print_run_report(&output, args.preview);
    print_summary(&summary::summarize_with_bins(&output.table, args.bpm_bins));

    if let Some(path) = &args.csv {
        export::write_csv(&output.table, path)?;
        cli_style::print_success(&format!(
            "Wrote {} rows to {}",
            output.table.len(),
            path.display()
        ));
    }
    if let Some(path) = &args.json {
        export::write_json(&output, path)?;
        cli_style::print_success(&format!("Wrote JSON export to {}", path.display()));
    }

    if args.print_metrics {
        cli_style::print_section_header("Metrics");
        print!("{}", metrics::render());
        cli_style::print_section_footer();
    }
    Ok(())
}

fn summarize_file(args: &SummarizeArgs) -> Result<()> {
    let table = export::read_csv(&args.csv)?;
    cli_style::print_section_header("Dataset");
    cli_style::print_key_value("File", &args.csv.display().to_string());
    cli_style::print_key_value("Rows", &table.len().to_string());
    cli_style::print_section_footer();

    print_summary(&summary::summarize_with_bins(&table, args.bpm_bins));
    Ok(())
}

fn print_run_report(output: &PipelineOutput, preview: usize) {
    cli_style::print_section_header("Run");
    match output.provenance {
        Provenance::Live => {
            cli_style::print_key_value_highlight("Provenance", "live", colors::GREEN)
        }
        Provenance::Fallback => {
            cli_style::print_key_value_highlight("Provenance", "fallback", colors::ORANGE)
        }
    }
    if let Some(collection) = &output.collection {
        cli_style::print_key_value(
            "Collection",
            &format!("{} ({})", collection.name, collection.id),
        );
    }
    if let Some(fallback) = &output.fallback {
        cli_style::print_key_value("Fallback source", fallback.origin.as_str());
        cli_style::print_warning(&fallback.reason);
    }

    let stats = &output.stats;
    cli_style::print_key_value("Entries received", &stats.entries_received.to_string());
    cli_style::print_key_value("Usable items", &stats.items_kept.to_string());
    cli_style::print_key_value(
        "Feature batches",
        &format!(
            "{} issued, {} failed",
            stats.batches_issued, stats.failed_batches
        ),
    );
    if stats.from_cache {
        cli_style::print_key_value("Cache", "hit");
    }
    cli_style::print_key_value("Rows", &output.table.len().to_string());
    cli_style::print_key_value("Generated", &output.generated_at.to_rfc3339());
    cli_style::print_section_footer();

    if preview == 0 {
        return;
    }
    let mut table = TableBuilder::new(vec![
        "Track", "Artist", "Year", "BPM", "Pop", "Energy", "Dance", "Valence",
    ]);
    for row in output.table.iter().take(preview) {
        table.add_row(vec![
            cli_style::truncate(&row.track, 32),
            cli_style::truncate(&row.artist, 20),
            row.year.clone(),
            row.bpm.to_string(),
            row.popularity.to_string(),
            format!("{:.2}", row.energy),
            format!("{:.2}", row.danceability),
            format!("{:.2}", row.valence),
        ]);
    }
    table.print();
    if output.table.len() > preview {
        cli_style::print_empty_list(&format!(
            "{} more rows not shown",
            output.table.len() - preview
        ));
    }
}

fn print_summary(summary: &TableSummary) {
    cli_style::print_section_header("BPM (Tempo)");
    let max = summary
        .bpm_histogram
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0);
    for bin in summary.bpm_histogram.iter().filter(|b| b.count > 0) {
        let label = format!("{:>5.1}-{:<5.1}", bin.lower, bin.upper);
        cli_style::print_bar(&label, 12, bin.count, max, colors::GREEN);
    }
    cli_style::print_section_footer();

    cli_style::print_section_header("Evolution (Year)");
    if summary.years.is_empty() {
        cli_style::print_empty_list("No release years");
    }
    let max = summary.years.iter().map(|(_, c)| *c).max().unwrap_or(0);
    for (year, count) in &summary.years {
        cli_style::print_bar(year, 6, *count, max, colors::PURPLE);
    }
    cli_style::print_section_footer();

    cli_style::print_section_header("Top Artists");
    if summary.top_artists.is_empty() {
        cli_style::print_empty_list("No artists");
    }
    let max = summary.top_artists.first().map(|(_, c)| *c).unwrap_or(0);
    let width = summary
        .top_artists
        .iter()
        .map(|(a, _)| a.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);
    for (artist, count) in &summary.top_artists {
        cli_style::print_bar(
            &cli_style::truncate(artist, 24),
            width,
            *count,
            max,
            colors::CYAN,
        );
    }
    cli_style::print_section_footer();

    cli_style::print_section_header("Mood Map");
    let mood = &summary.mood;
    cli_style::print_key_value("Happy / energetic", &mood.happy_energetic.to_string());
    cli_style::print_key_value("Dark / energetic", &mood.dark_energetic.to_string());
    cli_style::print_key_value("Happy / calm", &mood.happy_calm.to_string());
    cli_style::print_key_value("Sad / calm", &mood.sad_calm.to_string());
    let means = &summary.means;
    cli_style::print_key_value(
        "Means",
        &format!(
            "BPM {:.1}, energy {:.2}, danceability {:.2}, valence {:.2}, acousticness {:.2}",
            means.bpm, means.energy, means.danceability, means.valence, means.acousticness
        ),
    );
    cli_style::print_section_footer();
}
