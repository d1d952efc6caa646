use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use harf::{
    compare_letters, diacritics, Drawing, EvaluatorConfig, FixedRecognizer, GlyphRenderer,
    NullRecognizer, RasterBitmap, RecognitionEngine, RecognitionResult, TextRecognizer,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harf")]
#[command(about = "Harf - grade hand-drawn Arabic letters against a reference glyph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a drawing against the expected letter
    Evaluate(EvaluateArgs),

    /// Score recognized text against the expected letter
    Compare {
        recognized: String,
        expected: String,
    },

    /// Describe the diacritics found in TEXT, or list all of them
    Diacritics { text: Option<String> },
}

#[derive(clap::Args)]
struct EvaluateArgs {
    /// Strokes as JSON: {"strokes": [[{"x": .., "y": ..}, ...], ...]}
    #[arg(long)]
    strokes: PathBuf,

    /// Expected letter
    #[arg(long)]
    letter: String,

    /// Reference glyph image; rendered from --font when omitted
    #[arg(long, required_unless_present = "font")]
    reference: Option<PathBuf>,

    /// Font used to render the reference glyph
    #[arg(long)]
    font: Option<PathBuf>,

    /// Text already recognized from the drawing
    #[arg(long)]
    recognized: Option<String>,

    /// Evaluator configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to recognition model (ONNX)
    #[cfg(feature = "onnx")]
    #[arg(long, requires = "dict", conflicts_with = "recognized")]
    rec_model: Option<PathBuf>,

    /// Path to dictionary file
    #[cfg(feature = "onnx")]
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// JSON output with full details
    Json,
    /// Human-readable summary
    Text,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Evaluate(args) => evaluate(args).await?,
        Command::Compare {
            recognized,
            expected,
        } => {
            let score = compare_letters(Some(&recognized), &expected);
            println!("{score:.2}");
        }
        Command::Diacritics { text } => {
            let infos = match text {
                Some(text) => diacritics::diacritics_in(&text),
                None => diacritics::all().iter().collect(),
            };
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
    }

    Ok(())
}

async fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EvaluatorConfig::from_json_file(path)?,
        None => EvaluatorConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.strokes)?;
    let parsed: Drawing = serde_json::from_str(&raw)?;
    let drawing = Drawing::from_strokes(parsed.strokes().to_vec());
    tracing::info!(
        strokes = drawing.strokes().len(),
        points = drawing.point_count(),
        "loaded drawing"
    );

    let side = config.raster.canvas_size;
    let user = drawing.rasterize(side, side, &config.raster);
    let reference = match (&args.reference, &args.font) {
        (Some(path), _) => RasterBitmap::open(path)?,
        (None, Some(font)) => {
            GlyphRenderer::from_file(font, config.raster.glyph_scale)?.render(&args.letter, side, side)
        }
        (None, None) => return Err("either --reference or --font is required".into()),
    };

    let recognizer = build_recognizer(&args)?;
    let engine = RecognitionEngine::new(recognizer, &config);
    let result = engine.evaluate(user, reference, &args.letter).await?;

    print_result(&result, args.format)?;
    Ok(())
}

fn build_recognizer(args: &EvaluateArgs) -> Result<Arc<dyn TextRecognizer>, Box<dyn std::error::Error>> {
    #[cfg(feature = "onnx")]
    {
        if let (Some(model), Some(dict)) = (&args.rec_model, &args.dict) {
            let mut cfg = harf::RecConfig::ppv5(model.clone());
            cfg.rec_keys_path = Some(dict.clone());
            return Ok(Arc::new(harf::OnnxRecognizer::new(cfg)?));
        }
    }

    Ok(match &args.recognized {
        Some(text) => Arc::new(FixedRecognizer::new(Some(text.clone()))),
        None => Arc::new(NullRecognizer),
    })
}

fn print_result(result: &RecognitionResult, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Text => {
            let shape = &result.shape_analysis;
            println!("score:       {:.3}", result.score);
            println!(
                "recognized:  {} (text score {:.2})",
                result.recognized_text.as_deref().unwrap_or("-"),
                result.text_score
            );
            println!("shape:       {:.3}", shape.combined_score());
            println!("  coverage:  {:.3}", shape.stroke_coverage());
            println!("  overflow:  {:.3}", shape.overflow_penalty());
            println!("  bbox:      {:.3}", shape.bounding_box_match());
        }
    }
    Ok(())
}
