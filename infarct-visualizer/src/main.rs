use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageBuffer, Rgba, RgbaImage};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use infarct_common::{read_archive, FieldSnapshot};
use log::{debug, info, warn, LevelFilter};
use palette::{LinSrgb, Mix, Srgb};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about = "Renders infarct snapshot archives as heat maps", long_about = None)]
struct Args {
    /// Input snapshot archive (.bin, .json or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Field to render
    #[arg(short, long, value_enum, default_value_t = FieldChoice::Infarct)]
    field: FieldChoice,

    /// Directory for the PNG frames
    #[arg(short, long, default_value = "frames")]
    output_dir: PathBuf,

    /// Pixels per grid site along each axis
    #[arg(long, default_value_t = 8)]
    scale: u32,

    /// Value mapped to the top of the colour scale (values are clamped)
    #[arg(long, default_value_t = 1.0)]
    vmax: f64,

    /// Also write an animated GIF of all frames
    #[arg(long)]
    gif: Option<PathBuf>,

    /// Delay between GIF frames in milliseconds
    #[arg(long, default_value_t = 200)]
    frame_delay_ms: u32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FieldChoice {
    Infarct,
    Toxin,
    Perfusion,
}

impl FieldChoice {
    fn name(self) -> &'static str {
        match self {
            FieldChoice::Infarct => "infarct",
            FieldChoice::Toxin => "toxin",
            FieldChoice::Perfusion => "perfusion",
        }
    }

    fn values(self, snapshot: &FieldSnapshot) -> Option<&[f64]> {
        match self {
            FieldChoice::Infarct => Some(&snapshot.infarct),
            FieldChoice::Toxin => Some(&snapshot.toxin),
            FieldChoice::Perfusion => snapshot.perfusion.as_deref(),
        }
    }
}

// Anchor colours of a viridis-like scale, evenly spaced over [0, 1].
const COLOR_STOPS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Maps `t` in [0, 1] onto the colour scale, interpolating in linear RGB.
fn colormap(t: f64) -> Rgba<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) as f32 } else { 0.0 };
    let segments = (COLOR_STOPS.len() - 1) as f32;
    let pos = t * segments;
    let k = (pos.floor() as usize).min(COLOR_STOPS.len() - 2);
    let frac = pos - k as f32;

    let linear = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = linear(COLOR_STOPS[k]).mix(linear(COLOR_STOPS[k + 1]), frac);
    let rgb: Srgb<u8> = Srgb::<f32>::from_linear(mixed).into_format();
    Rgba([rgb.red, rgb.green, rgb.blue, 255])
}

/// Renders one field as an image with row `i` drawn top to bottom and column `j` left to right.
fn render_field(values: &[f64], nx: usize, ny: usize, scale: u32, vmax: f64) -> RgbaImage {
    let scale = scale.max(1);
    let width = ny as u32 * scale;
    let height = nx as u32 * scale;
    ImageBuffer::from_fn(width, height, |x, y| {
        let i = (y / scale) as usize;
        let j = (x / scale) as usize;
        colormap(values[i * ny + j] / vmax)
    })
}

fn write_gif(path: &Path, frames: Vec<RgbaImage>, delay_ms: u32) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create GIF file: {}", path.display()))?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;
    let delay = Delay::from_numer_denom_ms(delay_ms, 1);
    encoder
        .encode_frames(frames.into_iter().map(|image| Frame::from_parts(image, 0, 0, delay)))
        .context("Failed to encode GIF frames")?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logger
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    info!("Starting Infarct Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Rendering field: {}", args.field.name());

    if !(args.vmax > 0.0) {
        bail!("--vmax must be positive (got {})", args.vmax);
    }

    let archive = read_archive(&args.input)?;
    let (nx, ny) = (archive.nx, archive.ny);
    info!("Found {} snapshots of a {}x{} grid.", archive.snapshots.len(), nx, ny);
    if archive.snapshots.is_empty() {
        warn!("Input file contains no snapshots. Exiting.");
        return Ok(());
    }

    for snapshot in &archive.snapshots {
        match args.field.values(snapshot) {
            Some(values) if values.len() == nx * ny => {}
            Some(values) => bail!(
                "Snapshot at iteration {} has {} values, expected {}",
                snapshot.iteration,
                values.len(),
                nx * ny
            ),
            None => bail!(
                "Snapshot at iteration {} has no {} field; rerun with save_perfusion_in_snapshot = true",
                snapshot.iteration,
                args.field.name()
            ),
        }
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", args.output_dir.display()))?;

    // Set up progress bar
    let progress_bar = ProgressBar::new(archive.snapshots.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let field = args.field;
    let frames: Vec<RgbaImage> = archive
        .snapshots
        .par_iter()
        .progress_with(progress_bar.clone())
        .map(|snapshot| -> Result<RgbaImage> {
            let values = field.values(snapshot).unwrap_or_default();
            let image = render_field(values, nx, ny, args.scale, args.vmax);
            let path = args
                .output_dir
                .join(format!("{}_{:05}.png", field.name(), snapshot.iteration));
            image
                .save(&path)
                .with_context(|| format!("Failed to write frame {}", path.display()))?;
            debug!("Wrote {} ({:.1} min)", path.display(), snapshot.time_min);
            Ok(image)
        })
        .collect::<Result<_>>()?;
    progress_bar.finish_with_message("Frames written");

    info!(
        "Rendered {} frames in {:.2?} to {}",
        frames.len(),
        start_time.elapsed(),
        args.output_dir.display()
    );

    if let Some(gif_path) = &args.gif {
        info!("Encoding GIF...");
        write_gif(gif_path, frames, args.frame_delay_ms)?;
        info!("Animation saved to: {}", gif_path.display());
    }

    Ok(())
}

// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use infarct_common::{write_archive, FieldStats, OutputFormat, SnapshotArchive};

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("infarct_visualizer_{}_{}", std::process::id(), name))
    }

    fn snapshot(iteration: u32, infarct: Vec<f64>) -> FieldSnapshot {
        let toxin = vec![0.0; infarct.len()];
        FieldSnapshot {
            iteration,
            time_min: iteration as f64 * 5.0,
            stats: FieldStats::from_fields(&infarct, &toxin),
            infarct,
            toxin,
            perfusion: None,
        }
    }

    fn assert_near(actual: Rgba<u8>, expected: [u8; 3]) {
        for c in 0..3 {
            assert!(actual[c].abs_diff(expected[c]) <= 1, "{:?} vs {:?}", actual, expected);
        }
        assert_eq!(actual[3], 255);
    }

    #[test]
    fn colormap_hits_stops_and_clamps() {
        assert_near(colormap(0.0), [68, 1, 84]);
        assert_near(colormap(0.5), [33, 145, 140]);
        assert_near(colormap(1.0), [253, 231, 37]);
        assert_eq!(colormap(-3.0), colormap(0.0));
        assert_eq!(colormap(7.0), colormap(1.0));
        assert_eq!(colormap(f64::NAN), colormap(0.0));
    }

    #[test]
    fn render_places_rows_vertically() {
        // 2 rows x 3 columns, only site (1, 2) set.
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let image = render_field(&values, 2, 3, 4, 1.0);
        assert_eq!(image.dimensions(), (12, 8));
        assert_eq!(*image.get_pixel(11, 7), colormap(1.0));
        assert_eq!(*image.get_pixel(8, 4), colormap(1.0));
        assert_eq!(*image.get_pixel(7, 7), colormap(0.0));
        assert_eq!(*image.get_pixel(11, 3), colormap(0.0));
    }

    #[test]
    fn renders_frames_and_gif_from_json_archive() {
        let dir = temp_dir("frames");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("run_snapshots.json");
        let archive = SnapshotArchive {
            nx: 3,
            ny: 3,
            outer_step_min: 5.0,
            snapshots: vec![snapshot(0, vec![0.0; 9]), snapshot(1, vec![0.5; 9])],
        };
        write_archive(&archive, &input, OutputFormat::Json).unwrap();

        let gif = dir.join("infarct.gif");
        let args = Args {
            input,
            field: FieldChoice::Infarct,
            output_dir: dir.join("png"),
            scale: 2,
            vmax: 1.0,
            gif: Some(gif.clone()),
            frame_delay_ms: 100,
        };
        run_with_args(args).unwrap();

        assert!(dir.join("png").join("infarct_00000.png").exists());
        assert!(dir.join("png").join("infarct_00001.png").exists());
        assert!(fs::metadata(&gif).unwrap().len() > 0);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_perfusion_is_reported() {
        let dir = temp_dir("perfusion");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("run_snapshots.json");
        let archive = SnapshotArchive { nx: 1, ny: 1, outer_step_min: 5.0, snapshots: vec![snapshot(0, vec![0.0])] };
        write_archive(&archive, &input, OutputFormat::Json).unwrap();

        let args = Args {
            input,
            field: FieldChoice::Perfusion,
            output_dir: dir.join("png"),
            scale: 1,
            vmax: 1.0,
            gif: None,
            frame_delay_ms: 100,
        };
        let err = run_with_args(args).unwrap_err();
        assert!(err.to_string().contains("no perfusion field"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn renders_toxin_from_messagepack_archive() {
        let dir = temp_dir("msgpack");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("run_snapshots.msgpack");
        let mut snap = snapshot(4, vec![0.2; 4]);
        snap.toxin = vec![0.0, 0.1, 0.4, 0.9];
        let archive = SnapshotArchive { nx: 2, ny: 2, outer_step_min: 5.0, snapshots: vec![snap] };
        write_archive(&archive, &input, OutputFormat::Messagepack).unwrap();

        let args = Args {
            input,
            field: FieldChoice::Toxin,
            output_dir: dir.join("png"),
            scale: 3,
            vmax: 1.0,
            gif: None,
            frame_delay_ms: 100,
        };
        run_with_args(args).unwrap();

        let frame = image::open(dir.join("png").join("toxin_00004.png")).unwrap().to_rgba8();
        assert_eq!(frame.dimensions(), (6, 6));
        assert_eq!(*frame.get_pixel(0, 0), colormap(0.0));
        assert_eq!(*frame.get_pixel(5, 5), colormap(0.9));
        fs::remove_dir_all(&dir).ok();
    }
}
