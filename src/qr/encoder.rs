use image::{Rgba, RgbaImage};
use qrcode::types::QrError;
use thiserror::Error;

use crate::qr::Bitmap;
use crate::qr::capability::{capability, is_loaded};
use crate::qr::settings::{EcLevel, MAX_SIZE, RenderSettings};

/// Shown in place of an empty input so the encoder always gets some text.
pub const PLACEHOLDER: &str = "Enter text to generate QR code";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("could not encode text: {0}")]
    Data(#[from] QrError),

    #[error("{modules} modules do not fit in {size} pixels")]
    TooDense { modules: u32, size: u32 },

    #[error("image size {size} is not between 1 and {max} pixels")]
    InvalidSize { size: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub text: String,
    pub size: u32,
    pub level: EcLevel,
    pub background: Rgba<u8>,
    pub foreground: Rgba<u8>,
}

impl RenderRequest {
    /// The request for a given input, substituting the placeholder for
    /// empty input.
    pub fn for_input(input: &str, settings: &RenderSettings) -> Self {
        let text = if input.is_empty() { PLACEHOLDER } else { input };

        RenderRequest {
            text: text.to_string(),
            size: settings.size,
            level: settings.level,
            background: settings.background,
            foreground: settings.foreground,
        }
    }
}

// Turns a render request into pixels. Implementations must be deterministic
// and must not hand out partially drawn bitmaps on failure.
pub trait Encoder {
    fn encode(&self, request: &RenderRequest) -> Result<Bitmap, EncodeError>;
}

/// Rasterizes the shared capability's module matrix onto an exact
/// `size x size` bitmap.
///
/// Each module gets `size / modules` pixels and the matrix is centered,
/// so any leftover pixels become an even background border.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrcodeEncoder;

impl Encoder for QrcodeEncoder {
    fn encode(&self, request: &RenderRequest) -> Result<Bitmap, EncodeError> {
        if request.size == 0 || request.size > MAX_SIZE {
            return Err(EncodeError::InvalidSize {
                size: request.size,
                max: MAX_SIZE,
            });
        }

        if !is_loaded() {
            tracing::debug!("loading qr encoder capability on first use");
        }

        let matrix = capability().matrix(&request.text, request.level)?;
        let modules = matrix.width() as u32;
        let module_px = request.size / modules;
        if module_px == 0 {
            return Err(EncodeError::TooDense {
                modules,
                size: request.size,
            });
        }

        let offset = (request.size - module_px * modules) / 2;
        let mut bitmap = RgbaImage::from_pixel(request.size, request.size, request.background);
        for (x, y, pixel) in bitmap.enumerate_pixels_mut() {
            if x < offset || y < offset {
                continue;
            }

            let (mx, my) = ((x - offset) / module_px, (y - offset) / module_px);
            if mx < modules && my < modules && matrix.is_dark(mx as usize, my as usize) {
                *pixel = request.foreground;
            }
        }

        tracing::debug!(
            size = request.size,
            modules,
            module_px,
            level = ?request.level,
            "encoded qr code"
        );

        Ok(bitmap)
    }
}
