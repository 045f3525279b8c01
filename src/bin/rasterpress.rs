//! rasterpress CLI - analyze, encode and batch-compress raw pixel files.
//!
//! Input images are headerless 8-bit RGB or RGBA pixel dumps; the encoded
//! streams are rasterpress's own container.

use clap::{Parser, Subcommand, ValueEnum};
use rasterpress::orchestrator::submit_batch_blocking;
use rasterpress::stream_reader::peek_header;
use rasterpress::{
    BatchJob, CompressionTier, EncodePlan, JobError, OrchestratorConfig, PixelBuffer, Preferences,
    TargetFormat,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Adaptive raster image compression
#[derive(Parser)]
#[command(name = "rasterpress")]
#[command(author = "rasterpress-rs contributors")]
#[command(version)]
#[command(about = "Content-aware image compression with lossy and lossless codecs", long_about = None)]
#[command(after_help = "EXAMPLES:
    rasterpress analyze -i photo.rgba -w 640 -H 480
    rasterpress encode -i photo.rgba -o photo.rpx -w 640 -H 480 -q 0.85
    rasterpress encode -i logo.rgb -o logo.rpx -w 128 -H 128 -n 3 -f lossless
    rasterpress decode -i photo.rpx -o photo.ppm -f ppm
    rasterpress batch -i a.rgba b.rgba c.rgba -o out/ -w 256 -H 256 --workers 4
    rasterpress info -i photo.rpx

Set RUST_LOG=rasterpress=debug for per-job tracing.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print content statistics for a raw pixel file
    #[command(visible_alias = "a")]
    Analyze {
        #[arg(short, long, help = "Path to raw pixel data file")]
        input: PathBuf,

        #[arg(short, long)]
        width: u32,

        #[arg(short = 'H', long)]
        height: u32,

        /// Channels per pixel in the input (3=RGB, 4=RGBA)
        #[arg(short = 'n', long, default_value = "4")]
        channels: u32,
    },

    /// Analyze, choose a codec and encode a raw pixel file
    ///
    /// The codec is picked from the content statistics unless --format
    /// forces one.
    #[command(visible_alias = "e")]
    Encode {
        #[arg(short, long, help = "Path to raw pixel data file")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the encoded output file")]
        output: PathBuf,

        #[arg(short, long)]
        width: u32,

        #[arg(short = 'H', long)]
        height: u32,

        /// Channels per pixel in the input (3=RGB, 4=RGBA)
        #[arg(short = 'n', long, default_value = "4")]
        channels: u32,

        #[arg(short, long, default_value = "auto", value_enum)]
        format: Format,

        /// Quality in [0, 1]
        #[arg(short, long)]
        quality: Option<f32>,

        #[arg(short, long, default_value = "balanced", value_enum)]
        tier: Tier,
    },

    /// Decode a stream to raw RGBA or PPM
    #[command(visible_alias = "d")]
    Decode {
        #[arg(short, long, help = "Path to the encoded stream")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the output file")]
        output: PathBuf,

        /// Output format: raw (RGBA pixels) or ppm (Portable PixMap, alpha dropped)
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,
    },

    /// Encode many raw pixel files of the same size concurrently
    #[command(visible_alias = "b")]
    Batch {
        #[arg(short, long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        /// Directory receiving one `.rpx` file per input
        #[arg(short, long)]
        output_dir: PathBuf,

        #[arg(short, long)]
        width: u32,

        #[arg(short = 'H', long)]
        height: u32,

        #[arg(short = 'n', long, default_value = "4")]
        channels: u32,

        #[arg(short, long, default_value = "auto", value_enum)]
        format: Format,

        #[arg(short, long)]
        quality: Option<f32>,

        #[arg(short, long, default_value = "balanced", value_enum)]
        tier: Tier,

        /// JSON file with orchestrator settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overrides the worker count from the config
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Display stream header information
    #[command(visible_alias = "i")]
    Info {
        #[arg(short, long, help = "Path to the encoded stream")]
        input: PathBuf,
    },

    /// List codec families and their options
    #[command(visible_alias = "l")]
    List,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Raw RGBA pixel data
    Raw,
    /// Portable PixMap (P6)
    Ppm,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Pick from content statistics
    Auto,
    /// Transform-quantize
    Lossy,
    /// Filter-entropy
    Lossless,
}

impl From<Format> for TargetFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Auto => TargetFormat::Auto,
            Format::Lossy => TargetFormat::Lossy,
            Format::Lossless => TargetFormat::Lossless,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Tier {
    Fast,
    Balanced,
    Maximum,
}

impl From<Tier> for CompressionTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Fast => CompressionTier::Fast,
            Tier::Balanced => CompressionTier::Balanced,
            Tier::Maximum => CompressionTier::Maximum,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            width,
            height,
            channels,
        } => analyze_image(&input, width, height, channels),
        Commands::Encode {
            input,
            output,
            width,
            height,
            channels,
            format,
            quality,
            tier,
        } => {
            let preferences = preferences(format, quality, tier);
            encode_image(&input, &output, width, height, channels, &preferences)
        }
        Commands::Decode {
            input,
            output,
            format,
        } => decode_image(&input, &output, &format),
        Commands::Batch {
            inputs,
            output_dir,
            width,
            height,
            channels,
            format,
            quality,
            tier,
            config,
            workers,
        } => {
            let preferences = preferences(format, quality, tier);
            batch_encode(
                &inputs,
                &output_dir,
                width,
                height,
                channels,
                &preferences,
                config.as_deref(),
                workers,
            )
        }
        Commands::Info { input } => show_info(&input),
        Commands::List => list_codecs(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn preferences(format: Format, quality: Option<f32>, tier: Tier) -> Preferences {
    Preferences {
        format: format.into(),
        quality,
        tier: tier.into(),
    }
}

fn analyze_image(
    input: &Path,
    width: u32,
    height: u32,
    channels: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let buffer = read_pixels(input, width, height, channels)?;
    let stats = rasterpress::analyze(&buffer);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn encode_image(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    channels: u32,
    preferences: &Preferences,
) -> Result<(), Box<dyn std::error::Error>> {
    let buffer = read_pixels(input, width, height, channels)?;
    let plan = rasterpress::select_strategy(&rasterpress::analyze(&buffer), preferences);
    let result = rasterpress::encode(&buffer, &plan)?;
    fs::write(output, &result.data)?;

    let raw = buffer.data().len();
    println!(
        "✓ Encoded {}x{} image to {:?} using {} at quality {:.2}",
        width,
        height,
        output,
        result.family.name(),
        result.quality
    );
    println!(
        "  Size:          {} -> {} bytes ({:.1}%)",
        raw,
        result.len(),
        100.0 * result.len() as f64 / raw as f64
    );
    if !result.optimizations.is_empty() {
        println!("  Optimizations: {:?}", result.optimizations);
    }
    Ok(())
}

fn decode_image(
    input: &Path,
    output: &Path,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let buffer = rasterpress::decode(&data)?;

    match format {
        OutputFormat::Raw => fs::write(output, buffer.data())?,
        OutputFormat::Ppm => write_ppm(output, &buffer)?,
    }

    println!(
        "✓ Decoded {}x{} image to {:?}",
        buffer.width(),
        buffer.height(),
        output
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn batch_encode(
    inputs: &[PathBuf],
    output_dir: &Path,
    width: u32,
    height: u32,
    channels: u32,
    preferences: &Preferences,
    config_path: Option<&Path>,
    workers: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => serde_json::from_str::<OrchestratorConfig>(&fs::read_to_string(path)?)?,
        None => OrchestratorConfig::default(),
    };
    if let Some(workers) = workers {
        config = config.with_worker_count(workers);
    }

    let mut jobs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let buffer = read_pixels(input, width, height, channels)?;
        let plan: EncodePlan =
            rasterpress::select_strategy(&rasterpress::analyze(&buffer), preferences);
        jobs.push(BatchJob::new(Arc::new(buffer), plan));
    }

    fs::create_dir_all(output_dir)?;
    let (outcomes, stats) = submit_batch_blocking(jobs, config)?;

    let mut failed = 0;
    for (input, outcome) in inputs.iter().zip(&outcomes) {
        match outcome {
            Ok(result) => {
                let name = input.file_stem().unwrap_or(input.as_os_str());
                let output = output_dir.join(name).with_extension("rpx");
                fs::write(&output, &result.data)?;
                println!(
                    "✓ {:?} -> {:?} ({}, {} bytes)",
                    input,
                    output,
                    result.family.name(),
                    result.len()
                );
            }
            Err(err) => {
                failed += 1;
                println!("✗ {:?}: {}", input, describe_failure(err));
            }
        }
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    if failed > 0 {
        return Err(format!("{} of {} jobs failed", failed, inputs.len()).into());
    }
    Ok(())
}

fn describe_failure(err: &JobError) -> String {
    match err {
        JobError::Failed {
            fallback: Some(fallback),
            source,
            ..
        } => format!("{} (fallback: {})", source, fallback),
        other => other.to_string(),
    }
}

fn show_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    use rasterpress::constants::{FLAG_ALPHA, FLAG_CHROMA_SUBSAMPLING, FLAG_PALETTE, FLAG_PROGRESSIVE};

    let data = fs::read(input)?;
    let header = peek_header(&data)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();
    println!("Codec:      {}", header.family.name());
    println!("Dimensions: {}x{}", header.width, header.height);
    let yes_no = |flag| if header.has_flag(flag) { "Yes" } else { "No" };
    println!("Alpha:      {}", yes_no(FLAG_ALPHA));
    if header.family.is_lossless() {
        println!("Palette:    {}", yes_no(FLAG_PALETTE));
    } else {
        println!("Subsampled: {}", yes_no(FLAG_CHROMA_SUBSAMPLING));
        println!("Progressive: {}", yes_no(FLAG_PROGRESSIVE));
    }
    Ok(())
}

fn list_codecs() -> Result<(), Box<dyn std::error::Error>> {
    println!("Codec Families:");
    println!();
    println!("  Transform-quantize (lossy)");
    println!("    Pipeline: YCbCr, 8x8 DCT, quality-scaled quantization, run-length coding");
    println!("    Options:  chroma subsampling (4:2:0), progressive bands, alpha plane");
    println!("    Encode:   ✓  Decode: ✓");
    println!();
    println!("  Filter-entropy (lossless)");
    println!("    Pipeline: palette reduction, scanline prediction, deflate");
    println!("    Options:  adaptive or fixed filters, compression level 0-9");
    println!("    Encode:   ✓  Decode: ✓");
    println!();
    println!("Tiers: fast, balanced, maximum");
    Ok(())
}

// Internal helpers

fn read_pixels(
    input: &Path,
    width: u32,
    height: u32,
    channels: u32,
) -> Result<PixelBuffer, Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let buffer = match channels {
        3 => PixelBuffer::from_rgb(width, height, &data)?,
        4 => PixelBuffer::new(width, height, data)?,
        n => return Err(format!("unsupported channel count {}", n).into()),
    };
    Ok(buffer)
}

fn write_ppm(path: &Path, buffer: &PixelBuffer) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    let mut file = fs::File::create(path)?;
    writeln!(file, "P6")?;
    writeln!(file, "{} {}", buffer.width(), buffer.height())?;
    writeln!(file, "255")?;
    let rgb: Vec<u8> = buffer.pixels().flat_map(|[r, g, b, _]| [r, g, b]).collect();
    file.write_all(&rgb)?;
    Ok(())
}
