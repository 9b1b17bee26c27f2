//! Spectrogram rendering with plotters
//!
//! Layout: heat map on the left (log-frequency vertical axis, time in seconds
//! horizontally), colour bar on the right with `%+2.0f dB` tick labels.
//! The frame is drawn into an in-memory RGB buffer and encoded as PNG.
//!
//! Text needs a font registered with plotters. One is loaded once per process
//! from the configured path or a well-known system location; without one the
//! image is drawn without title, ticks or labels.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::spectrum::Spectrogram;

/// Width reserved for the colour bar and its labels
const COLORBAR_WIDTH: u32 = 110;

const TITLE: &str = "Power spectrogram";

/// Fonts tried when no label font is configured
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Magma colour map anchors, evenly spaced from 0.0 to 1.0
const MAGMA: [(u8, u8, u8); 9] = [
    (0, 0, 4),
    (28, 16, 68),
    (79, 18, 123),
    (129, 37, 129),
    (181, 54, 122),
    (229, 80, 100),
    (251, 135, 97),
    (254, 194, 135),
    (252, 253, 191),
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Nothing to draw: {0}")]
    Empty(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Image size and font settings
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub label_font: Option<PathBuf>,
}

impl From<&specview_common::config::SpectrogramConfig> for RenderOptions {
    fn from(config: &specview_common::config::SpectrogramConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            label_font: config.label_font.clone(),
        }
    }
}

/// Encoded PNG plus what went into it
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Title, ticks and labels were drawn
    pub annotated: bool,
    /// Colour scale limits in dB
    pub db_range: (f32, f32),
}

/// Map a value in [0, 1] onto the magma colour map
pub fn magma(t: f32) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (MAGMA.len() - 1) as f32;
    let index = (scaled.floor() as usize).min(MAGMA.len() - 2);
    let frac = scaled - index as f32;
    let (r0, g0, b0) = MAGMA[index];
    let (r1, g1, b1) = MAGMA[index + 1];
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * frac).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Colour bar tick label, printf `%+2.0f dB`
pub fn format_db(value: f32) -> String {
    let rounded = value.round();
    // Avoid "-0 dB"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:+2.0} dB", rounded)
}

fn format_hz(freq: f64) -> String {
    if freq >= 1000.0 {
        format!("{}k", (freq / 100.0).round() / 10.0)
    } else {
        format!("{}", freq.round())
    }
}

/// Register a label font with plotters once per process
///
/// Returns whether a font is available.
pub fn ensure_label_font(configured: Option<&Path>) -> bool {
    static FONT_READY: OnceLock<bool> = OnceLock::new();
    *FONT_READY.get_or_init(|| {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            // plotters keeps registered fonts for the life of the process
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match plotters::style::register_font("sans-serif", FontStyle::Normal, bytes) {
                Ok(()) => {
                    info!("Using label font {}", path.display());
                    return true;
                }
                Err(_) => warn!("Ignoring unreadable font {}", path.display()),
            }
        }
        warn!("No label font found; spectrograms will be rendered without text");
        false
    })
}

/// Colour scale limits, widened when the matrix is flat
fn color_limits(spectrogram: &Spectrogram) -> (f32, f32) {
    let (min, max) = spectrogram.db_range();
    if max > min {
        (min, max)
    } else {
        (max - 1.0, max)
    }
}

/// Render the spectrogram into PNG bytes
pub fn render_png(
    spectrogram: &Spectrogram,
    options: &RenderOptions,
) -> Result<RenderedImage, RenderError> {
    if spectrogram.n_frames() == 0 || spectrogram.n_bins() < 3 {
        return Err(RenderError::Empty(format!(
            "{} bins x {} frames",
            spectrogram.n_bins(),
            spectrogram.n_frames()
        )));
    }
    if options.width <= COLORBAR_WIDTH || options.height == 0 {
        return Err(RenderError::Draw(format!(
            "image {}x{} too small",
            options.width, options.height
        )));
    }

    let annotated = ensure_label_font(options.label_font.as_deref());
    let limits = color_limits(spectrogram);
    let (width, height) = (options.width, options.height);

    let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let (plot_area, bar_area) = root.split_horizontally((width - COLORBAR_WIDTH) as i32);

        if annotated {
            draw_annotated(&plot_area, &bar_area, spectrogram, limits)?;
        } else {
            let heat = plot_area.margin(10, 10, 10, 10);
            draw_heatmap(&heat, spectrogram, limits)?;
            let bar = bar_area.margin(10, 10, 20, 60);
            draw_gradient(&bar, limits)?;
        }

        root.present().map_err(draw_err)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Encode("pixel buffer size mismatch".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    debug!(
        "Rendered {}x{} spectrogram ({} bins x {} frames, annotated: {})",
        width,
        height,
        spectrogram.n_bins(),
        spectrogram.n_frames(),
        annotated
    );

    Ok(RenderedImage {
        png: png.into_inner(),
        width,
        height,
        annotated,
        db_range: limits,
    })
}

fn draw_annotated<DB: DrawingBackend>(
    plot_area: &DrawingArea<DB, Shift>,
    bar_area: &DrawingArea<DB, Shift>,
    spectrogram: &Spectrogram,
    (vmin, vmax): (f32, f32),
) -> Result<(), RenderError> {
    // Matches the caption font size
    const CAPTION_SIZE: i32 = 24;
    const MARGIN: i32 = 10;
    const X_LABEL_AREA: i32 = 40;

    let f_min = spectrogram.bin_frequency(1);
    let f_max = spectrogram.max_frequency();
    let duration = spectrogram.duration_secs();

    let mut chart = ChartBuilder::on(plot_area)
        .caption(TITLE, ("sans-serif", 24).into_font())
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..duration, (f_min..f_max).log_scale())
        .map_err(draw_err)?;

    draw_heatmap(
        &chart.plotting_area().strip_coord_spec(),
        spectrogram,
        (vmin, vmax),
    )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Time (s)")
        .x_label_formatter(&|t| format!("{:.1}", t))
        .y_label_formatter(&|f| format_hz(*f))
        .label_style(("sans-serif", 13).into_font())
        .draw()
        .map_err(draw_err)?;

    // Align the bar with the heat map: skip the caption, keep the same bottom area
    let mut bar = ChartBuilder::on(bar_area)
        .margin(MARGIN)
        .margin_top(MARGIN + CAPTION_SIZE + MARGIN)
        .margin_right(5)
        .x_label_area_size(X_LABEL_AREA)
        .right_y_label_area_size(60)
        .build_cartesian_2d(0f32..1f32, vmin..vmax)
        .map_err(draw_err)?;

    draw_gradient(&bar.plotting_area().strip_coord_spec(), (vmin, vmax))?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(8)
        .y_label_formatter(&|v| format_db(*v))
        .label_style(("sans-serif", 13).into_font())
        .draw()
        .map_err(draw_err)?;

    Ok(())
}

/// Paint one pixel per cell of the area, rows on a log-frequency scale
fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    spectrogram: &Spectrogram,
    (vmin, vmax): (f32, f32),
) -> Result<(), RenderError> {
    let (w, h) = area.dim_in_pixel();
    if w == 0 || h == 0 {
        return Err(RenderError::Draw("plot area has no pixels".to_string()));
    }

    let log_min = spectrogram.bin_frequency(1).ln();
    let log_max = spectrogram.max_frequency().ln();
    let span = vmax - vmin;

    // Row 0 is the top of the image, the highest frequency
    let row_bins: Vec<usize> = (0..h)
        .map(|y| {
            let frac = 1.0 - (y as f64 + 0.5) / h as f64;
            let freq = (log_min + frac * (log_max - log_min)).exp();
            spectrogram.bin_for_frequency(freq).max(1)
        })
        .collect();

    let n_frames = spectrogram.n_frames();
    let col_frames: Vec<usize> = (0..w)
        .map(|x| ((x as usize * n_frames) / w as usize).min(n_frames - 1))
        .collect();

    for (x, &frame) in col_frames.iter().enumerate() {
        for (y, &bin) in row_bins.iter().enumerate() {
            let value = spectrogram.db[(bin, frame)];
            let color = magma((value - vmin) / span);
            area.draw_pixel((x as i32, y as i32), &color)
                .map_err(draw_err)?;
        }
    }
    Ok(())
}

/// Vertical colour gradient, `vmax` at the top
fn draw_gradient<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    (vmin, vmax): (f32, f32),
) -> Result<(), RenderError> {
    let (w, h) = area.dim_in_pixel();
    if w == 0 || h == 0 {
        return Err(RenderError::Draw("colour bar has no pixels".to_string()));
    }
    let width = w.min(24) as i32;
    for y in 0..h {
        let t = 1.0 - (y as f32 + 0.5) / h as f32;
        let color = magma(t);
        area.draw(&Rectangle::new(
            [(0, y as i32), (width, y as i32 + 1)],
            color.filled(),
        ))
        .map_err(draw_err)?;
    }
    debug!("Colour bar spans {:+.1} dB to {:+.1} dB", vmin, vmax);
    Ok(())
}
