// A logo is loaded at most once, usually on a background thread, and then
// reused for every render. Until it arrives renders show the bare code.

use image::DynamicImage;
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use thiserror::Error;

use crate::qr::Bitmap;
use crate::qr::settings::DEFAULT_LOGO_RATIO;

#[derive(Debug, Error)]
pub enum LogoLoadError {
    #[error("could not load logo {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("logo loader for {} stopped before finishing", .0.display())]
    Disconnected(PathBuf),
}

/// Draws a logo over the center of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoCompositor {
    ratio: f32,
}

impl Default for LogoCompositor {
    fn default() -> Self {
        LogoCompositor::new(DEFAULT_LOGO_RATIO)
    }
}

impl LogoCompositor {
    pub fn new(ratio: f32) -> Self {
        LogoCompositor { ratio }
    }

    /// The centered square the logo occupies, as `(x, y, side)`.
    pub fn region(&self, width: u32, height: u32) -> (u32, u32, u32) {
        let side = (width.min(height) as f32 * self.ratio) as u32;
        ((width - side) / 2, (height - side) / 2, side)
    }

    /// Returns `bitmap` with the logo scaled into the center region. The
    /// region's pixels are replaced, not blended.
    pub fn overlay(&self, mut bitmap: Bitmap, logo: Option<&DynamicImage>) -> Bitmap {
        let Some(logo) = logo else {
            return bitmap;
        };

        let (x, y, side) = self.region(bitmap.width(), bitmap.height());
        if side == 0 {
            return bitmap;
        }

        let scaled = imageops::resize(logo, side, side, FilterType::Triangle);
        imageops::replace(&mut bitmap, &scaled, i64::from(x), i64::from(y));
        bitmap
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage, LogoLoadError> {
    image::open(path).map_err(|source| LogoLoadError::Image {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default)]
pub enum LogoSlot {
    #[default]
    Absent,
    Loading {
        path: PathBuf,
        receiver: Receiver<Result<DynamicImage, LogoLoadError>>,
    },
    Ready(DynamicImage),
    Failed,
}

impl LogoSlot {
    /// Start loading `path` on a background thread.
    pub fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker_path = path.clone();
        thread::spawn(move || {
            // The receiver may be gone if the form already exited.
            let _ = sender.send(load_image(&worker_path));
        });

        tracing::debug!(path = %path.display(), "loading logo");
        LogoSlot::Loading { path, receiver }
    }

    /// Load `path` on the current thread.
    pub fn load(path: &Path) -> Self {
        Self::settle(load_image(path))
    }

    fn settle(result: Result<DynamicImage, LogoLoadError>) -> Self {
        match result {
            Ok(image) => {
                tracing::debug!(
                    width = image.width(),
                    height = image.height(),
                    "logo loaded"
                );
                LogoSlot::Ready(image)
            }
            Err(err) => {
                tracing::error!(%err, "logo failed to load");
                LogoSlot::Failed
            }
        }
    }

    /// Checks on a pending load without blocking. Returns true when the
    /// logo became ready during this call.
    pub fn poll(&mut self) -> bool {
        let LogoSlot::Loading { path, receiver } = self else {
            return false;
        };

        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(LogoLoadError::Disconnected(path.clone())),
        };

        *self = Self::settle(result);
        matches!(self, LogoSlot::Ready(_))
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        match self {
            LogoSlot::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LogoSlot::Loading { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::time::{Duration, Instant};

    fn white(size: u32) -> Bitmap {
        RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]))
    }

    fn red_logo() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])))
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qrgen-logo-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_overlay_without_logo_is_noop() {
        let bitmap = white(300);
        let result = LogoCompositor::default().overlay(bitmap.clone(), None);
        assert_eq!(result.as_raw(), bitmap.as_raw());
    }

    #[test]
    fn test_region_is_centered() {
        assert_eq!(LogoCompositor::default().region(300, 300), (105, 105, 90));
        assert_eq!(LogoCompositor::new(0.5).region(100, 100), (25, 25, 50));
    }

    #[test]
    fn test_overlay_overwrites_center() {
        let result = LogoCompositor::default().overlay(white(300), Some(&red_logo()));
        let red = Rgba([255, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);

        assert_eq!(*result.get_pixel(105, 105), red);
        assert_eq!(*result.get_pixel(194, 194), red);
        assert_eq!(*result.get_pixel(104, 150), white);
        assert_eq!(*result.get_pixel(195, 150), white);
    }

    #[test]
    fn test_overlay_does_not_blend() {
        let transparent =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 30, Rgba([0, 0, 255, 0])));
        let result = LogoCompositor::default().overlay(white(100), Some(&transparent));
        // Blending would have left the opaque white background.
        assert_eq!(result.get_pixel(50, 50)[3], 0);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let slot = LogoSlot::load(Path::new("/definitely/not/here.png"));
        assert!(matches!(slot, LogoSlot::Failed));
        assert!(slot.image().is_none());
    }

    #[test]
    fn test_spawned_load_becomes_ready() {
        let path = temp_dir("spawn").join("logo.png");
        red_logo().save(&path).unwrap();

        let mut slot = LogoSlot::spawn(path);
        assert!(slot.is_loading());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !slot.poll() {
            assert!(Instant::now() < deadline, "logo never loaded");
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(slot.image().unwrap().width(), 8);
        // Once settled, polling again is a no-op.
        assert!(!slot.poll());
    }

    #[test]
    fn test_spawned_load_failure() {
        let mut slot = LogoSlot::spawn(PathBuf::from("/definitely/not/here.png"));

        let deadline = Instant::now() + Duration::from_secs(5);
        while slot.is_loading() {
            assert!(Instant::now() < deadline, "logo load never settled");
            slot.poll();
            thread::sleep(Duration::from_millis(5));
        }

        assert!(matches!(slot, LogoSlot::Failed));
    }
}
