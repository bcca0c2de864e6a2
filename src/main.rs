//! rfaudit CLI - WCAG contrast and language audits over captured pages

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rfaudit::audit::contrast::contrast_ratio;
use rfaudit::audit::language::RecordedClassifier;
use rfaudit::rendering::capture_rendered_page;
use rfaudit::rendering::snapshot::SnapshotRenderer;
use rfaudit::report::{render, OutputFormat};
use rfaudit::{AuditConfig, Auditor, CaptureConfig, RenderState, Rgb};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Audit rendered pages for WCAG 1.4.11, 3.1.1 and 3.1.2
#[derive(Parser)]
#[command(name = "rfaudit")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a captured page bundle
    Analyze {
        /// Bundle manifest (JSON)
        bundle: PathBuf,

        /// Render states to audit (defaults to every state in the bundle)
        #[arg(long, value_delimiter = ',')]
        states: Vec<RenderState>,

        /// Recorded classifier output: JSON object of text -> detections
        #[arg(long)]
        detections: Option<PathBuf>,

        /// Audit thresholds (JSON, partial allowed)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Print the contrast ratio between two hex colors
    Contrast {
        /// Foreground, e.g. `#1a73e8`
        foreground: String,
        /// Background, e.g. `#ffffff`
        background: String,
    },
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("rfaudit=debug")
    } else {
        EnvFilter::new("rfaudit=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// One-line verdict against the default component threshold
fn describe_contrast(fg: Rgb, bg: Rgb) -> String {
    let required = AuditConfig::default().min_component_contrast;
    let ratio = contrast_ratio(fg, bg);
    let verdict = if ratio >= required { "meets" } else { "fails" };
    format!(
        "{} on {}: {:.2}:1 ({} {}:1 for UI components)",
        fg, bg, ratio, verdict, required
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            bundle,
            states,
            detections,
            config,
            format,
            output,
            verbose,
        } => {
            init_logging(verbose);

            let audit_config = match config {
                Some(path) => AuditConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => AuditConfig::default(),
            };

            let renderer = SnapshotRenderer::open(&bundle)
                .with_context(|| format!("Failed to open bundle {}", bundle.display()))?;
            let states = if states.is_empty() { renderer.states() } else { states };
            let url = renderer.url().to_string();

            let page = capture_rendered_page(Arc::new(renderer), &url, &states, &CaptureConfig::default())
                .await
                .context("Capture failed")?;

            let mut auditor = Auditor::new(audit_config)?;
            if let Some(path) = detections {
                let classifier = RecordedClassifier::from_file(&path)
                    .with_context(|| format!("Failed to load detections {}", path.display()))?;
                auditor = auditor.with_classifier(Arc::new(classifier));
            }

            let report = auditor.analyze(&page);
            let rendered = render(&report, format.into())?;

            if let Some(path) = output {
                std::fs::write(&path, &rendered)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                eprintln!("Report written to {}", path.display());
            } else {
                println!("{}", rendered);
            }

            if report.has_failures() {
                std::process::exit(1);
            }
        }

        Commands::Contrast { foreground, background } => {
            let fg = Rgb::from_hex(&foreground).with_context(|| format!("Invalid color: {}", foreground))?;
            let bg = Rgb::from_hex(&background).with_context(|| format!("Invalid color: {}", background))?;
            println!("{}", describe_contrast(fg, bg));
        }
    }

    Ok(())
}
