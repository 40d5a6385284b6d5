use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use osdr_downloader::api::OsdrHttpClient;
use osdr_downloader::app::{App, ProgressSink, RunOptions};
use osdr_downloader::config::ConfigLoader;
use osdr_downloader::domain::{FilterSpec, OsdAccession};
use osdr_downloader::error::OsdrError;
use osdr_downloader::layout::OutputLayout;
use osdr_downloader::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "osdr-dl")]
#[command(about = "Download files from the NASA Open Science Data Repository (OSDR)")]
#[command(version, author)]
struct Cli {
    /// OSD accession number (e.g. OSD-101)
    #[arg(long = "osd", value_name = "OSD-N")]
    osd: String,

    /// Measurement type (e.g. "transcription profiling")
    #[arg(long)]
    measurement: Option<String>,

    /// Technology type (e.g. "RNA Sequencing (RNA-Seq)"); requires --measurement
    #[arg(long)]
    tech: Option<String>,

    /// Only include files with this extension (e.g. fastq.gz)
    #[arg(long)]
    ext: Option<String>,

    /// Exclude files with this extension
    #[arg(long = "exclude-ext")]
    exclude_ext: Option<String>,

    /// Output directory (default: osdr_downloads_<OSD-N>)
    #[arg(long)]
    out: Option<Utf8PathBuf>,

    /// List files without downloading
    #[arg(long)]
    list: bool,

    /// Only GeneLab processed files
    #[arg(long)]
    processed_only: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Path to an osdr-dl.json config file
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        if let Some(OsdrError::Connectivity(_)) = report.downcast_ref::<OsdrError>() {
            eprintln!("Cannot connect to OSDR API. Please check your internet connection.");
        }
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let accession: OsdAccession = cli.osd.parse()?;
    let spec = FilterSpec::new(
        accession.clone(),
        cli.measurement,
        cli.tech,
        cli.ext,
        cli.exclude_ext,
    )?
    .with_processed_only(cli.processed_only);

    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let root = cli
        .out
        .unwrap_or_else(|| OutputLayout::default_root(&accession));
    let layout = OutputLayout::new(root, settings.processed_dir_name.clone());
    let client = OsdrHttpClient::new(settings.clone())?;
    let app = App::new(client, settings, layout);

    let options = RunOptions {
        list_only: cli.list,
    };
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Console => &ConsoleOutput,
        OutputMode::Json => &JsonOutput,
    };
    if matches!(output_mode, OutputMode::Console) {
        println!("Starting OSDR download for {accession}");
        if cli.list {
            println!("List mode: files will not be downloaded");
        } else {
            println!("Output directory: {}", app.layout().root());
        }
    }

    let report = app.run(&spec, options, sink)?;

    match output_mode {
        OutputMode::Console => ConsoleOutput::print_summary(&report).into_diagnostic()?,
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
    }
    Ok(())
}
