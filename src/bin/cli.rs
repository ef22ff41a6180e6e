//! textlens CLI
//!
//! Runs the two-stage OCR pipeline over a local image and prints the
//! detected words.
//!
//! ```bash
//! textlens ocr --file photo.jpg --models-dir models
//! textlens ocr --file photo.jpg --det-arch db-resnet50 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use textlens::core::{DetectionArch, PipelineConfig, RecognitionArch};
use textlens::pipeline::{OcrSession, RunStatus};
use textlens::utils::UploadedFile;
use tracing::info;

#[derive(Parser)]
#[command(name = "textlens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect and transcribe text in a local image", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single image
    Ocr {
        /// Local image file to analyze
        #[arg(long, conflicts_with = "data_uri")]
        file: Option<PathBuf>,

        /// Image as a data URI (base64 or percent-encoded)
        #[arg(long, conflicts_with = "file")]
        data_uri: Option<String>,

        /// Directory holding the serialized model graphs
        #[arg(long = "models-dir", default_value = "models", env = "TEXTLENS_MODELS_DIR")]
        models_dir: PathBuf,

        /// Text detection architecture
        #[arg(long = "det-arch", value_enum, default_value_t = DetArchArg::DbMobilenetV2)]
        det_arch: DetArchArg,

        /// Text recognition architecture
        #[arg(long = "rec-arch", value_enum, default_value_t = RecArchArg::CrnnVgg16Bn)]
        rec_arch: RecArchArg,

        /// Output format (json, text, pretty)
        #[arg(long, default_value = "pretty")]
        output: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DetArchArg {
    DbMobilenetV2,
    DbResnet50,
}

impl From<DetArchArg> for DetectionArch {
    fn from(arg: DetArchArg) -> Self {
        match arg {
            DetArchArg::DbMobilenetV2 => DetectionArch::DbMobilenetV2,
            DetArchArg::DbResnet50 => DetectionArch::DbResnet50,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RecArchArg {
    CrnnVgg16Bn,
    CrnnMobilenetV2,
}

impl From<RecArchArg> for RecognitionArch {
    fn from(arg: RecArchArg) -> Self {
        match arg {
            RecArchArg::CrnnVgg16Bn => RecognitionArch::CrnnVgg16Bn,
            RecArchArg::CrnnMobilenetV2 => RecognitionArch::CrnnMobilenetV2,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    textlens::utils::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ocr {
            file,
            data_uri,
            models_dir,
            det_arch,
            rec_arch,
            output,
        } => {
            let upload = if let Some(file) = file {
                info!("analyzing file: {}", file.display());
                UploadedFile::from_path(&file)?
            } else if let Some(uri) = data_uri {
                info!("analyzing data URI payload");
                UploadedFile::from_data_uri(&uri)?
            } else {
                eprintln!("Error: either --file or --data-uri must be provided");
                std::process::exit(1);
            };

            let session = OcrSession::new(
                models_dir,
                det_arch.into(),
                rec_arch.into(),
                PipelineConfig::default(),
            );
            session.load_models().await;

            match session.analyze(&upload).await? {
                RunStatus::Completed(summary) => {
                    for failure in &summary.batch_errors {
                        eprintln!(
                            "warning: recognition batch {} failed: {}",
                            failure.batch_index, failure.error
                        );
                    }
                    print_results(&session, &output)?;
                }
                RunStatus::ModelUnavailable => {
                    eprintln!("Error: models are not loaded; check --models-dir");
                    std::process::exit(1);
                }
                RunStatus::Superseded => {
                    // Single run per invocation; nothing can supersede it.
                    unreachable!("single-run session cannot be superseded");
                }
            }
        }
    }

    Ok(())
}

fn print_results(
    session: &OcrSession,
    format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let words = session.words();
    let shapes = session.shapes();

    match format {
        "json" => {
            let document = serde_json::json!({
                "words": words,
                "shapes": shapes,
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        "text" => {
            for word in &words {
                println!("{}", word.text);
            }
        }
        _ => {
            println!("\n=== OCR Results ===");
            println!("Words found: {}", words.len());
            if words.is_empty() {
                println!("No words found.");
            } else {
                for word in &words {
                    let shape = shapes.iter().find(|shape| shape.id == word.id);
                    let position = shape
                        .map(|shape| {
                            let tl = shape.corners[0];
                            let br = shape.corners[2];
                            format!(
                                "[{:.3}, {:.3}] - [{:.3}, {:.3}]",
                                tl[0], tl[1], br[0], br[1]
                            )
                        })
                        .unwrap_or_else(|| "<no shape>".to_string());
                    println!("[{}] \"{}\" {}", word.id, word.text, position);
                }
            }
        }
    }

    Ok(())
}
