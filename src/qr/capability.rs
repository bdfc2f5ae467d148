// Process-wide handle on the QR matrix generator. Matrix generation is
// delegated to the `qrcode` crate; the handle is set up on first use.

use qrcode::render::unicode;
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use std::sync::OnceLock;

use crate::qr::settings::EcLevel;

static CAPABILITY: OnceLock<Capability> = OnceLock::new();

#[derive(Debug)]
pub struct Capability;

/// The shared capability, initialized exactly once.
pub fn capability() -> &'static Capability {
    CAPABILITY.get_or_init(|| {
        tracing::debug!("qr encoder capability loaded");
        Capability
    })
}

pub fn is_loaded() -> bool {
    CAPABILITY.get().is_some()
}

impl Capability {
    pub fn matrix(&self, text: &str, level: EcLevel) -> Result<Matrix, QrError> {
        let code = QrCode::with_error_correction_level(text, level.into())?;
        Ok(Matrix { code })
    }
}

/// Square grid of QR modules, without a quiet zone.
pub struct Matrix {
    code: QrCode,
}

impl Matrix {
    /// Number of modules along one side.
    pub fn width(&self) -> usize {
        self.code.width()
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.code[(x, y)] == Color::Dark
    }

    // Two modules per character cell, so the code stays roughly square
    // in a terminal.
    pub fn to_terminal(&self) -> String {
        self.code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Dark)
            .light_color(unicode::Dense1x2::Light)
            .build()
    }
}
