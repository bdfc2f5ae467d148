pub mod capability;
pub mod controller;
pub mod encoder;
pub mod export;
pub mod logo;
pub mod settings;

/// A rendered QR code image.
pub type Bitmap = image::RgbaImage;
