//! Invitation links and their QR codes.

use std::io::Cursor;

use image::{imageops, DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::render::svg;
use qrcode::QrCode;
use reqwest::Url;

use crate::errors::AppError;
use crate::models::canonical_code;

/// Smallest rendered edge in pixels, quiet zone included.
const MIN_DIMENSION: u32 = 400;

/// Light border around the PNG symbol, in modules.
const PNG_MARGIN_MODULES: u32 = 2;

/// Downloadable QR artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrFormat {
    #[default]
    Png,
    Svg,
}

impl QrFormat {
    /// Parse a `?format=` value; `None` for anything unsupported.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "png" => Some(QrFormat::Png),
            "svg" => Some(QrFormat::Svg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            QrFormat::Png => "png",
            QrFormat::Svg => "svg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            QrFormat::Png => "image/png",
            QrFormat::Svg => "image/svg+xml",
        }
    }
}

/// Link that opens the landing page personalized for `code`.
///
/// `origin` is scheme + host (+ port); `path` is the landing page path.
pub fn invitation_url(origin: &str, path: &str, code: &str) -> Result<String, AppError> {
    let origin = origin.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut url = Url::parse(&format!("{origin}/{path}"))
        .map_err(|e| AppError::Internal(format!("Invalid public origin {origin:?}: {e}")))?;
    url.query_pairs_mut()
        .clear()
        .append_pair("dept", &canonical_code(code));
    Ok(url.into())
}

/// Name of the downloadable QR artifact for `code`.
pub fn qr_filename(code: &str, format: QrFormat) -> String {
    format!(
        "DOTTECH-{}-invitation.{}",
        canonical_code(code),
        format.extension()
    )
}

/// Render `url` in the requested format.
pub fn render(url: &str, format: QrFormat) -> Result<Vec<u8>, AppError> {
    match format {
        QrFormat::Png => render_png(url),
        QrFormat::Svg => render_svg(url).map(String::into_bytes),
    }
}

/// Render `url` as a standalone SVG QR code.
pub fn render_svg(url: &str) -> Result<String, AppError> {
    let code = QrCode::new(url.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Render `url` as a grayscale PNG, black on white, with a two-module margin.
pub fn render_png(url: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::new(url.as_bytes())?;
    let (scale, edge) = png_layout(code.width() as u32);

    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(scale, scale)
        .build();

    let offset = i64::from(PNG_MARGIN_MODULES * scale);
    let mut canvas = GrayImage::from_pixel(edge, edge, Luma([255]));
    imageops::overlay(&mut canvas, &symbol, offset, offset);

    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(canvas).write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Pixels per module and total edge for a symbol `modules` wide.
fn png_layout(modules: u32) -> (u32, u32) {
    let span = modules + 2 * PNG_MARGIN_MODULES;
    let scale = MIN_DIMENSION.div_ceil(span).max(1);
    (scale, span * scale)
}
