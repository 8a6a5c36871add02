use eframe::egui::{self, ColorImage};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Decoded background image at full resolution.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pixels: RgbaImage,
}

impl LoadedImage {
    pub fn size_vec2(&self) -> egui::Vec2 {
        egui::vec2(self.width as f32, self.height as f32)
    }

    /// Texture data no larger than `max_side` on either axis (the GPU limit
    /// reported by egui). The template keeps the original dimensions.
    pub fn into_color_image(self, max_side: usize) -> ColorImage {
        let max_side = u32::try_from(max_side).unwrap_or(u32::MAX).max(1);
        let pixels = if self.width > max_side || self.height > max_side {
            log::info!(
                "downscaling {}x{} image to fit texture limit {max_side}",
                self.width,
                self.height
            );
            DynamicImage::ImageRgba8(self.pixels)
                .thumbnail(max_side, max_side)
                .to_rgba8()
        } else {
            self.pixels
        };
        let size = [pixels.width() as usize, pixels.height() as usize];
        ColorImage::from_rgba_unmultiplied(size, &pixels.into_raw())
    }
}

pub type ImageLoadResult = (PathBuf, LoadedImage);
pub type ImageLoadResponse = Result<ImageLoadResult, String>;

pub fn load_image(path: &Path) -> Result<LoadedImage, String> {
    let bytes =
        fs::read(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    decode_image(&bytes, Some(path))
}

/// Decodes an in-memory image. `path` is only a format hint.
pub fn decode_image(bytes: &[u8], path: Option<&Path>) -> Result<LoadedImage, String> {
    let format = image::guess_format(bytes)
        .or_else(|err| match path {
            Some(path) => ImageFormat::from_path(path),
            None => Err(err),
        })
        .map_err(|err| format!("Failed to determine image format: {err}"))?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|err| format!("Failed to decode image: {err}"))?;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err("Image has no pixels".to_string());
    }
    Ok(LoadedImage {
        width,
        height,
        pixels: image.into_rgba8(),
    })
}

/// Decodes images on a background thread so the UI never blocks on I/O.
pub struct ImageLoader {
    tx: Sender<PathBuf>,
    rx: Receiver<ImageLoadResponse>,
    pending: usize,
    _worker: thread::JoinHandle<()>,
}

impl ImageLoader {
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<PathBuf>();
        let (response_tx, response_rx) = mpsc::channel::<ImageLoadResponse>();
        let worker = thread::spawn(move || {
            // Exits once the loader (and with it the request sender) is dropped.
            while let Ok(path) = request_rx.recv() {
                let response = load_image(&path).map(|loaded| (path, loaded));
                if response_tx.send(response).is_err() {
                    break;
                }
            }
        });
        Self {
            tx: request_tx,
            rx: response_rx,
            pending: 0,
            _worker: worker,
        }
    }

    pub fn request(&mut self, path: PathBuf) -> Result<(), String> {
        log::debug!("queueing image load for {}", path.display());
        self.tx
            .send(path)
            .map_err(|_| "Image loader thread has stopped".to_string())?;
        self.pending += 1;
        Ok(())
    }

    /// Returns a finished load, if any.
    pub fn poll(&mut self) -> Option<ImageLoadResponse> {
        let response = self.rx.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(response)
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}
