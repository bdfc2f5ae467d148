use clap::{Args, ValueEnum};
use csscolorparser::Color;
use image::Rgba;
use serde::Serialize;
use std::path::PathBuf;

pub const DEFAULT_SIZE: u32 = 300;
pub const MAX_SIZE: u32 = 4096;
pub const DEFAULT_LOGO_RATIO: f32 = 0.3;

/// QR error correction level, from the most data capacity (L) to the most
/// damage tolerance (H).
#[derive(ValueEnum, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        }
    }
}

/// Everything that shapes a render apart from the text itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub size: u32,
    pub level: EcLevel,
    pub background: Rgba<u8>,
    pub foreground: Rgba<u8>,
    pub logo: Option<PathBuf>,
    pub logo_ratio: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            size: DEFAULT_SIZE,
            level: EcLevel::M,
            background: Rgba([255, 255, 255, 255]),
            foreground: Rgba([0, 0, 0, 255]),
            logo: None,
            logo_ratio: DEFAULT_LOGO_RATIO,
        }
    }
}

// Render flags shared by every tool that produces an image.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Width and height of the generated image in pixels
    #[arg(
        long,
        default_value_t = DEFAULT_SIZE,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_SIZE))
    )]
    pub size: u32,

    /// Error correction level
    #[arg(long, value_enum, ignore_case = true, default_value_t = EcLevel::M)]
    pub level: EcLevel,

    /// Background color (any CSS color)
    #[arg(long, default_value = "white")]
    pub background: Color,

    /// Foreground color (any CSS color)
    #[arg(long, default_value = "black")]
    pub foreground: Color,

    /// Image drawn in the center of the QR code
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Size of the logo relative to the QR code (0 < ratio <= 1)
    #[arg(long, default_value_t = DEFAULT_LOGO_RATIO, value_parser = parse_ratio)]
    pub logo_ratio: f32,
}

impl From<&RenderArgs> for RenderSettings {
    fn from(args: &RenderArgs) -> Self {
        RenderSettings {
            size: args.size,
            level: args.level,
            background: Rgba(args.background.to_rgba8()),
            foreground: Rgba(args.foreground.to_rgba8()),
            logo: args.logo.clone(),
            logo_ratio: args.logo_ratio,
        }
    }
}

fn parse_ratio(s: &str) -> Result<f32, String> {
    let ratio: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("{s:?} is not a number"))?;

    if ratio > 0.0 && ratio <= 1.0 {
        Ok(ratio)
    } else {
        Err("Ratio must be greater than 0 and at most 1".to_string())
    }
}
