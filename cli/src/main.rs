use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dietlog_core::capture::CaptureState;
use dietlog_core::{
    fingerprint_file, AnalyzerConfig, CaptureConfig, CaptureCoordinator, CaptureDraft,
    CaptureOutcome, DataDir, DietEntry, DietEntryStore, FileImageSource, FoodvisorClient,
    ImageSizeReducer, JpegTransform, PickSource,
};

#[derive(Parser)]
#[command(name = "dietlog")]
#[command(about = "Photograph meals and keep an analyzed diet log", long_about = None)]
struct Cli {
    /// Data directory (default: $DIETLOG_DATA_DIR or ~/.dietlog)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a meal photo: compress, analyze and store it
    Capture {
        /// Title for the entry
        #[arg(long)]
        title: String,
        /// Path to the photo
        #[arg(long)]
        image: PathBuf,
        /// When the meal was eaten, RFC 3339 (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// List stored diet entries
    List,
    /// Print the fingerprint of a file
    Fingerprint {
        /// File to hash
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data = cli.data_dir.map(DataDir::new).unwrap_or_else(DataDir::from_env);
    tracing::debug!(data_dir = %data.root().display(), "using data directory");

    match cli.command {
        Commands::Capture { title, image, date } => {
            capture(&data, title, image, date.as_deref()).await?;
        }
        Commands::List => {
            list(&data)?;
        }
        Commands::Fingerprint { path } => {
            let (fingerprint, _) = fingerprint_file(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            println!("{}", fingerprint);
        }
    }

    Ok(())
}

async fn capture(data: &DataDir, title: String, image: PathBuf, date: Option<&str>) -> Result<()> {
    let captured_at = match date {
        Some(date) => DateTime::parse_from_rfc3339(date)
            .with_context(|| format!("Invalid date: {}", date))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let config = CaptureConfig::from_env(data)?;
    let analyzer = FoodvisorClient::new(AnalyzerConfig::from_env()?)?;
    tracing::debug!(url = analyzer.url(), "using analysis endpoint");
    let store = DietEntryStore::open(data.store_path())
        .with_context(|| format!("Failed to open {}", data.store_path().display()))?;
    let transform = JpegTransform::new(data.work_dir())
        .with_context(|| format!("Failed to create {}", data.work_dir().display()))?;

    let mut coordinator = CaptureCoordinator::new(
        ImageSizeReducer::new(transform),
        Arc::new(analyzer),
        store,
        config,
    );

    coordinator
        .select_image(&FileImageSource::new(&image), PickSource::Library)
        .await?;
    if coordinator.state() == &CaptureState::Idle {
        bail!("No image selected");
    }

    let outcome = coordinator
        .submit(CaptureDraft::new(title).with_captured_at(captured_at))
        .await?;

    match &outcome {
        CaptureOutcome::Created(entry) => {
            println!("Created entry {}", entry.id);
            print_entry(entry);
        }
        CaptureOutcome::Replayed(entry) => {
            println!("Already analyzed, showing saved entry {}", entry.id);
            print_entry(entry);
        }
    }

    Ok(())
}

fn list(data: &DataDir) -> Result<()> {
    let store = DietEntryStore::open(data.store_path())
        .with_context(|| format!("Failed to open {}", data.store_path().display()))?;

    if store.is_empty() {
        println!("No entries in {}", data.store_path().display());
        return Ok(());
    }

    for entry in store.all() {
        let food = entry
            .analysis
            .primary()
            .map(|f| format!("{} ({:.0}%)", f.display_name, f.confidence_percent()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {:<24}  {}",
            entry.captured_at.format("%Y-%m-%d %H:%M"),
            entry.id,
            entry.title,
            food
        );
    }
    println!("\n{} entries", store.len());

    Ok(())
}

fn print_entry(entry: &DietEntry) {
    println!("  title:       {}", entry.title);
    println!("  captured at: {}", entry.captured_at.to_rfc3339());
    println!("  image:       {}", entry.image_location.display());
    println!("  fingerprint: {}", entry.fingerprint);

    for food in &entry.analysis.foods {
        println!(
            "  {} ({:.0}% confident)",
            food.display_name,
            food.confidence_percent()
        );
        if let Some(quantity) = food.quantity {
            println!("    quantity: {}g", quantity);
        }
        if let Some(gi) = food.glycemic_index {
            println!("    glycemic index: {}", gi);
        }
        for nutrient in &food.top_nutrients {
            println!("    {}: {}", nutrient.name, nutrient.quantity);
        }
    }
}
