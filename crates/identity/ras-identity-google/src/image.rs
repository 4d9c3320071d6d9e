//! Sized profile image URLs.

use crate::config::{ImageAspect, ImageSize};
use url::Url;

const PHOTO_MARKER: &str = "/photo.jpg";

/// Rewrites Google profile picture URLs to request a specific size and crop.
pub struct ImageUrlBuilder {
    size: Option<ImageSize>,
    aspect: ImageAspect,
}

impl ImageUrlBuilder {
    pub fn new(size: Option<ImageSize>, aspect: ImageAspect) -> Self {
        Self { size, aspect }
    }

    fn sizing_requested(&self) -> bool {
        self.size.is_some() || self.aspect == ImageAspect::Square
    }

    /// Path segment placed before the photo file, e.g. `/s50` or `/w40-h30-c`.
    fn size_segment(&self) -> String {
        let mut tokens = Vec::new();
        match self.size {
            Some(ImageSize::Pixels(pixels)) => tokens.push(format!("s{pixels}")),
            Some(ImageSize::Dimensions { width, height }) => {
                if let Some(width) = width {
                    tokens.push(format!("w{width}"));
                }
                if let Some(height) = height {
                    tokens.push(format!("h{height}"));
                }
            }
            None => {}
        }
        if self.aspect == ImageAspect::Square {
            tokens.push("c".to_string());
        }
        format!("/{}", tokens.join("-"))
    }

    pub fn build(&self, picture: Option<&str>) -> Option<String> {
        let picture = picture?.replace("https:https", "https");

        let Ok(mut url) = Url::parse(&picture) else {
            return Some(picture);
        };

        if self.sizing_requested() {
            if let Some(index) = url.path().find(PHOTO_MARKER) {
                let mut path = url.path().to_string();
                path.insert_str(index, &self.size_segment());
                while path.contains("//") {
                    path = path.replace("//", "/");
                }
                url.set_path(&path);
            }
        }

        Some(url.to_string())
    }
}
