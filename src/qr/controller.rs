// Every text change bumps a render generation and queues a job for it.
// Jobs and results from an older generation are dropped, so the surface
// ends up showing the most recently requested text.

use image::RgbaImage;
use std::collections::VecDeque;

use crate::qr::Bitmap;
use crate::qr::encoder::{EncodeError, Encoder, QrcodeEncoder, RenderRequest};
use crate::qr::logo::{LogoCompositor, LogoSlot};
use crate::qr::settings::{MAX_SIZE, RenderSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
}

/// What happened to an encode result handed to [`RenderController::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Applied,
    Stale,
    Failed,
}

#[derive(Debug)]
struct RenderJob {
    generation: u64,
    request: RenderRequest,
}

pub struct RenderController<E = QrcodeEncoder> {
    encoder: E,
    settings: RenderSettings,
    compositor: LogoCompositor,
    logo: LogoSlot,

    input: String,
    generation: u64,
    queue: VecDeque<RenderJob>,

    // Generation whose pixels are on the surface.
    committed: u64,
    failure: Option<EncodeError>,

    // Bare code of the committed generation, kept while the logo is still
    // loading so it can be composited once it arrives.
    pending_base: Option<(u64, Bitmap)>,

    surface: Bitmap,
}

impl RenderController<QrcodeEncoder> {
    pub fn from_settings(settings: RenderSettings) -> Self {
        RenderController::new(QrcodeEncoder, settings)
    }
}

impl<E: Encoder> RenderController<E> {
    /// Creates a controller with a blank surface and the placeholder render
    /// queued.
    pub fn new(encoder: E, settings: RenderSettings) -> Self {
        // Oversized settings fail to encode; the blank surface stays allocatable.
        let side = settings.size.min(MAX_SIZE);
        let surface = RgbaImage::from_pixel(side, side, settings.background);
        let compositor = LogoCompositor::new(settings.logo_ratio);

        let mut controller = RenderController {
            encoder,
            settings,
            compositor,
            logo: LogoSlot::Absent,
            input: String::new(),
            generation: 0,
            queue: VecDeque::new(),
            committed: 0,
            failure: None,
            pending_base: None,
            surface,
        };

        controller.enqueue();
        controller
    }

    pub fn with_logo(mut self, logo: LogoSlot) -> Self {
        self.logo = logo;
        self
    }

    pub fn text(&self) -> &str {
        &self.input
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    #[cfg(test)]
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn logo(&self) -> &LogoSlot {
        &self.logo
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current surface.
    pub fn bitmap(&self) -> &Bitmap {
        &self.surface
    }

    /// Why the latest render failed, if it did.
    pub fn failure(&self) -> Option<&EncodeError> {
        self.failure.as_ref()
    }

    pub fn state(&self) -> RenderState {
        if self.queue.is_empty() {
            RenderState::Idle
        } else {
            RenderState::Rendering
        }
    }

    /// The request the current input renders with.
    pub fn request(&self) -> RenderRequest {
        RenderRequest::for_input(&self.input, &self.settings)
    }

    /// Export needs real input and a surface that shows it.
    pub fn can_export(&self) -> bool {
        !self.input.is_empty()
            && self.state() == RenderState::Idle
            && self.committed == self.generation
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> u64 {
        self.input = text.into();
        self.enqueue()
    }

    pub fn clear(&mut self) -> u64 {
        self.set_text(String::new())
    }

    fn enqueue(&mut self) -> u64 {
        self.generation += 1;
        self.failure = None;

        let request = self.request();
        tracing::trace!(generation = self.generation, text = %request.text, "render queued");
        self.queue.push_back(RenderJob {
            generation: self.generation,
            request,
        });

        self.generation
    }

    /// Runs queued renders and picks up a finished logo load. Returns true
    /// if the surface changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;

        while let Some(job) = self.queue.pop_front() {
            if job.generation != self.generation {
                tracing::debug!(
                    generation = job.generation,
                    current = self.generation,
                    "skipping stale render"
                );
                continue;
            }

            let result = self.encoder.encode(&job.request);
            changed |= self.complete(job.generation, result) == Commit::Applied;
        }

        if self.logo.poll() {
            changed |= self.composite_pending();
        }
        if !self.logo.is_loading() {
            self.pending_base = None;
        }

        changed
    }

    /// Commits the result of rendering `generation`.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<Bitmap, EncodeError>,
    ) -> Commit {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "dropping stale result");
            return Commit::Stale;
        }

        let bitmap = match result {
            Ok(bitmap) => bitmap,
            Err(err) => {
                tracing::error!(%err, generation, "qr code generation failed");
                self.failure = Some(err);
                return Commit::Failed;
            }
        };

        self.pending_base = if self.logo.is_loading() {
            Some((generation, bitmap.clone()))
        } else {
            None
        };

        let composed = self.compositor.overlay(bitmap, self.logo.image());
        self.draw(&composed);
        self.committed = generation;
        Commit::Applied
    }

    fn composite_pending(&mut self) -> bool {
        let Some((generation, base)) = self.pending_base.take() else {
            return false;
        };

        if generation != self.generation {
            return false;
        }

        let composed = self.compositor.overlay(base, self.logo.image());
        self.draw(&composed);
        true
    }

    // The surface is reused; only a size change forces a new allocation.
    fn draw(&mut self, bitmap: &Bitmap) {
        if self.surface.dimensions() == bitmap.dimensions() {
            self.surface.copy_from_slice(bitmap.as_raw());
        } else {
            self.surface = bitmap.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::encoder::PLACEHOLDER;
    use crate::qr::logo::LogoLoadError;
    use image::{DynamicImage, Rgba};
    use std::cell::RefCell;
    use std::sync::mpsc;

    // Wraps the real encoder and remembers every request it saw.
    #[derive(Default)]
    struct RecordingEncoder {
        requests: RefCell<Vec<RenderRequest>>,
    }

    impl Encoder for RecordingEncoder {
        fn encode(&self, request: &RenderRequest) -> Result<Bitmap, EncodeError> {
            self.requests.borrow_mut().push(request.clone());
            QrcodeEncoder.encode(request)
        }
    }

    // Fails for one specific text.
    struct FlakyEncoder(&'static str);

    impl Encoder for FlakyEncoder {
        fn encode(&self, request: &RenderRequest) -> Result<Bitmap, EncodeError> {
            if request.text == self.0 {
                Err(EncodeError::TooDense {
                    modules: 177,
                    size: request.size,
                })
            } else {
                QrcodeEncoder.encode(request)
            }
        }
    }

    fn controller() -> RenderController<RecordingEncoder> {
        let mut controller =
            RenderController::new(RecordingEncoder::default(), RenderSettings::default());
        controller.pump();
        controller
    }

    fn loading_slot() -> (
        mpsc::Sender<Result<DynamicImage, LogoLoadError>>,
        LogoSlot,
    ) {
        let (sender, receiver) = mpsc::channel();
        let slot = LogoSlot::Loading {
            path: "logo.png".into(),
            receiver,
        };
        (sender, slot)
    }

    fn red_logo() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])))
    }

    fn encoded(text: &str) -> Bitmap {
        QrcodeEncoder
            .encode(&RenderRequest::for_input(text, &RenderSettings::default()))
            .unwrap()
    }

    #[test]
    fn test_initial_render_is_placeholder() {
        let controller = controller();
        let requests = controller.encoder().requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, PLACEHOLDER);
        assert_eq!(controller.bitmap().as_raw(), encoded("").as_raw());
        assert!(!controller.can_export());
    }

    #[test]
    fn test_github_scenario() {
        let mut controller = controller();
        controller.set_text("https://github.com");
        assert_eq!(controller.state(), RenderState::Rendering);
        assert!(!controller.can_export());

        assert!(controller.pump());
        assert_eq!(controller.state(), RenderState::Idle);

        let requests = controller.encoder().requests.borrow();
        let last = requests.last().unwrap();
        assert_eq!(last.text, "https://github.com");
        assert_eq!(last.size, 300);
        assert_eq!(last.level, crate::qr::settings::EcLevel::M);
        assert_eq!(last.background, Rgba([255, 255, 255, 255]));
        assert_eq!(last.foreground, Rgba([0, 0, 0, 255]));

        assert_eq!(controller.bitmap().dimensions(), (300, 300));
        assert_eq!(
            controller.bitmap().as_raw(),
            encoded("https://github.com").as_raw()
        );
        assert!(controller.can_export());
    }

    #[test]
    fn test_clear_after_text() {
        let mut controller = controller();
        controller.set_text("hello");
        controller.pump();
        assert!(controller.can_export());

        controller.clear();
        controller.pump();
        assert_eq!(controller.text(), "");
        assert_eq!(controller.request().text, PLACEHOLDER);
        assert_eq!(
            controller.encoder().requests.borrow().last().unwrap().text,
            PLACEHOLDER
        );
        assert!(!controller.can_export());
    }

    #[test]
    fn test_last_requested_wins() {
        let mut controller = controller();
        controller.set_text("first");
        controller.set_text("second");
        controller.set_text("third");
        controller.pump();

        // Only the latest job reached the encoder.
        let requests = controller.encoder().requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].text, "third");
        assert_eq!(controller.bitmap().as_raw(), encoded("third").as_raw());
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let mut controller = controller();
        let old = controller.set_text("old");
        let new = controller.set_text("new");

        assert_eq!(controller.complete(old, Ok(encoded("old"))), Commit::Stale);
        assert_eq!(controller.complete(new, Ok(encoded("new"))), Commit::Applied);
        assert_eq!(controller.complete(old, Ok(encoded("old"))), Commit::Stale);
        assert_eq!(controller.bitmap().as_raw(), encoded("new").as_raw());
    }

    #[test]
    fn test_same_text_twice_is_identical() {
        let mut controller = controller();
        controller.set_text("repeat");
        controller.pump();
        let first = controller.bitmap().clone();

        controller.set_text("repeat");
        controller.pump();
        assert_eq!(controller.bitmap().as_raw(), first.as_raw());
    }

    #[test]
    fn test_failure_keeps_previous_bitmap() {
        let mut controller =
            RenderController::new(FlakyEncoder("broken"), RenderSettings::default());
        controller.set_text("fine");
        controller.pump();
        let before = controller.bitmap().clone();

        controller.set_text("broken");
        assert!(!controller.pump());
        assert_eq!(controller.bitmap().as_raw(), before.as_raw());
        assert!(matches!(
            controller.failure(),
            Some(EncodeError::TooDense { .. })
        ));

        // The surface still shows "fine", so it must not be exported as "broken".
        assert!(!controller.can_export());

        controller.set_text("fine again");
        controller.pump();
        assert!(controller.failure().is_none());
        assert!(controller.can_export());
    }

    #[test]
    fn test_ready_logo_is_composited() {
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let mut controller = RenderController::from_settings(RenderSettings::default())
            .with_logo(LogoSlot::Ready(logo));
        controller.set_text("hello");
        controller.pump();

        assert_eq!(*controller.bitmap().get_pixel(150, 150), Rgba([255, 0, 0, 255]));
        assert_eq!(*controller.bitmap().get_pixel(3, 3), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_failed_logo_leaves_bare_code() {
        let mut controller =
            RenderController::from_settings(RenderSettings::default()).with_logo(LogoSlot::Failed);
        controller.set_text("hello");
        controller.pump();
        assert_eq!(controller.bitmap().as_raw(), encoded("hello").as_raw());
    }

    #[test]
    fn test_logo_pops_in_after_load() {
        let (sender, slot) = loading_slot();
        let mut controller =
            RenderController::from_settings(RenderSettings::default()).with_logo(slot);
        controller.set_text("hello");
        controller.pump();
        assert_eq!(controller.bitmap().as_raw(), encoded("hello").as_raw());

        sender.send(Ok(red_logo())).unwrap();

        assert!(controller.pump());
        assert_eq!(*controller.bitmap().get_pixel(150, 150), Rgba([255, 0, 0, 255]));

        // Later renders use the cached logo directly.
        controller.set_text("world");
        controller.pump();
        assert_eq!(*controller.bitmap().get_pixel(150, 150), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_logo_does_not_pop_in_over_failed_render() {
        let (sender, slot) = loading_slot();
        let mut controller =
            RenderController::new(FlakyEncoder("broken"), RenderSettings::default())
                .with_logo(slot);
        controller.set_text("good");
        controller.pump();
        let before = controller.bitmap().clone();

        controller.set_text("broken");
        assert!(!controller.pump());

        // The bare "good" code must not be re-drawn under the "broken" input.
        sender.send(Ok(red_logo())).unwrap();
        assert!(!controller.pump());
        assert_eq!(controller.bitmap().as_raw(), before.as_raw());
        assert!(controller.logo().image().is_some());
        assert!(!controller.can_export());
    }

    #[test]
    fn test_pending_base_released_when_logo_fails() {
        let (sender, slot) = loading_slot();
        let mut controller =
            RenderController::from_settings(RenderSettings::default()).with_logo(slot);
        controller.set_text("hello");
        controller.pump();
        assert!(controller.pending_base.is_some());

        sender
            .send(Err(LogoLoadError::Disconnected("logo.png".into())))
            .unwrap();
        assert!(!controller.pump());
        assert!(matches!(controller.logo(), LogoSlot::Failed));
        assert!(controller.pending_base.is_none());
        assert_eq!(controller.bitmap().as_raw(), encoded("hello").as_raw());
    }

    #[test]
    fn test_pending_base_released_when_loader_disappears() {
        let (sender, slot) = loading_slot();
        let mut controller =
            RenderController::from_settings(RenderSettings::default()).with_logo(slot);
        controller.set_text("hello");
        controller.pump();

        drop(sender);
        controller.pump();
        assert!(!controller.logo().is_loading());
        assert!(controller.pending_base.is_none());
    }

    #[test]
    fn test_oversized_settings_fail_without_allocating() {
        let settings = RenderSettings {
            size: u32::MAX,
            ..RenderSettings::default()
        };
        let mut controller = RenderController::from_settings(settings);
        assert_eq!(controller.bitmap().dimensions(), (MAX_SIZE, MAX_SIZE));

        controller.set_text("hello");
        assert!(!controller.pump());
        assert!(matches!(
            controller.failure(),
            Some(EncodeError::InvalidSize { size: u32::MAX, .. })
        ));
        assert!(!controller.can_export());
    }
}
