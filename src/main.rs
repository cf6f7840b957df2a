use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sheetpress::layout::{LayoutCalculator, LayoutConfig};
use sheetpress::matching::{InstrumentKeywordSet, PredictorConfig};
use sheetpress::ocr::bridge::DEFAULT_PSM;
use sheetpress::ocr::OcrConfig;
use sheetpress::parser::{PageRange, PdfReader};
use sheetpress::pipeline::{
    export_run, generate_button_sheet, load_images, DetectionConfig, DetectionPipeline,
};

#[derive(Parser, Debug)]
#[command(name = "sheetpress")]
#[command(version, about = "Sheet-music part detection and button-sheet PDF layout", long_about = None)]
struct Cli {
    /// Log pipeline stages (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect instrument parts in a sheet-music PDF
    Detect {
        /// Input PDF file path
        input: PathBuf,

        /// YAML mapping of instrument name to keyword phrases
        #[arg(short, long)]
        keywords: PathBuf,

        /// Root directory for bounding-box images and predictions
        #[arg(short, long, default_value = "bounding_boxes")]
        output: PathBuf,

        /// Pages to scan, e.g. "2" or "1-4"
        #[arg(short, long, default_value = "1-")]
        pages: PageRange,

        /// Rendering DPI for OCR
        #[arg(long, default_value_t = 100)]
        dpi: u32,

        /// Word list biasing OCR towards instrument names
        #[arg(long)]
        user_words: Option<PathBuf>,

        /// Tesseract page segmentation mode
        #[arg(long, default_value_t = DEFAULT_PSM)]
        psm: u8,

        /// Tesseract language(s)
        #[arg(long, default_value = "eng")]
        lang: String,

        /// Tesseract OCR engine mode (1 = LSTM only)
        #[arg(long)]
        oem: Option<u8>,

        /// Directory holding the tesseract language data
        #[arg(long)]
        tessdata_dir: Option<PathBuf>,

        /// Tesseract binary
        #[arg(long, default_value = "tesseract")]
        tesseract: PathBuf,

        /// Similarity a keyword match must exceed
        #[arg(long, default_value_t = PredictorConfig::default().similarity_threshold)]
        threshold: f64,

        /// Matched blocks above which a page is a full score
        #[arg(long, default_value_t = PredictorConfig::default().max_part_blocks)]
        max_part_blocks: usize,
    },

    /// Build a printable PDF of circular buttons from images
    Buttons {
        /// Source images
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output PDF path
        #[arg(short, long, default_value = "buttons.pdf")]
        output: PathBuf,

        /// YAML layout configuration; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Copies of each image
        #[arg(short = 'n', long)]
        num_of_each: Option<u32>,

        /// Visible diameter of each button in mm
        #[arg(long)]
        diameter: Option<f64>,

        /// Output DPI
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// Show information about a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,
    },

    /// Copy a page range of a PDF into a new file
    Split {
        input: PathBuf,

        /// Pages to keep, e.g. "3-5"
        #[arg(short, long)]
        pages: PageRange,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Detect {
            input,
            keywords,
            output,
            pages,
            dpi,
            user_words,
            psm,
            lang,
            oem,
            tessdata_dir,
            tesseract,
            threshold,
            max_part_blocks,
        } => {
            let mut config = DetectionConfig::new(input);
            config.pages = pages;
            config.dpi = dpi;
            config.ocr = OcrConfig {
                binary: tesseract,
                lang,
                psm,
                oem,
                tessdata_dir,
                user_words,
            };
            config.predictor = PredictorConfig {
                similarity_threshold: threshold,
                max_part_blocks,
            };
            detect(config, keywords, output)
        }
        Commands::Buttons {
            images,
            output,
            config,
            num_of_each,
            diameter,
            dpi,
        } => {
            let mut layout = match config {
                Some(path) => LayoutConfig::from_yaml_file(&path)
                    .with_context(|| format!("failed to read layout config {}", path.display()))?,
                None => LayoutConfig::default(),
            };
            if let Some(n) = num_of_each {
                layout.repeat_count = n;
            }
            if let Some(d) = diameter {
                layout = layout.with_diameter(d);
            }
            if let Some(dpi) = dpi {
                layout.dpi = dpi;
            }
            buttons(images, output, layout)
        }
        Commands::Info { input } => show_info(input),
        Commands::Split {
            input,
            pages,
            output,
        } => split(input, pages, output),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn detect(config: DetectionConfig, keywords: PathBuf, output: PathBuf) -> Result<()> {
    if !config.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", config.input.display());
    }

    let keyword_set = InstrumentKeywordSet::from_yaml_file(&keywords)
        .with_context(|| format!("failed to load keywords from {}", keywords.display()))?;

    println!("[*] Processing: {}", config.input.display());
    println!("[*] Pages: {}", config.pages);
    println!("[*] Instruments: {}", keyword_set.len());

    let pipeline = DetectionPipeline::from_config(&config);
    let run = pipeline.run(&config, &keyword_set)?;
    let dir = export_run(&run, &output)?;

    for part in &run.detections.parts {
        let instruments: Vec<&str> = part.instruments.iter().map(String::as_str).collect();
        println!(
            "  pages {}: {} -> {}",
            part.pages,
            part.name,
            instruments.join(", ")
        );
    }
    println!("\n[✓] Done! Results saved to: {}", dir.display());
    Ok(())
}

fn buttons(images: Vec<PathBuf>, output: PathBuf, layout: LayoutConfig) -> Result<()> {
    let sources = load_images(&images)?;
    let geometry = LayoutCalculator::new(layout.clone()).compute(sources.len())?;

    println!("[*] Images: {} x {}", sources.len(), layout.repeat_count);
    println!(
        "[*] Grid: {} x {} per page, {} page(s)",
        geometry.columns, geometry.rows, geometry.total_pages
    );

    let pdf = generate_button_sheet(&sources, &layout)?;
    fs::write(&output, pdf).with_context(|| format!("failed to write {}", output.display()))?;

    println!("[✓] Done! PDF saved to: {}", output.display());
    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    let reader = PdfReader::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;
    let page_count = reader.page_count()?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", page_count);

    Ok(())
}

fn split(input: PathBuf, pages: PageRange, output: PathBuf) -> Result<()> {
    let reader = PdfReader::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;
    let bytes = reader.extract_pages(pages)?;
    fs::write(&output, bytes).with_context(|| format!("failed to write {}", output.display()))?;

    println!("[✓] Pages {} of {} saved to: {}", pages, input.display(), output.display());
    Ok(())
}
