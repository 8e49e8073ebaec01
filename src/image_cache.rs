//! Campaign thumbnails: download, flatten to opaque RGB, re-encode as JPEG and
//! store under a file name derived from the campaign identifier.
//!
//! The target file is replaced atomically (temp file + rename), so a failed
//! download or conversion leaves any earlier thumbnail untouched.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{HeraldError, Result};

pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Backdrop for transparent pixels.
const BACKDROP: [u8; 3] = [255, 255, 255];

static SAFE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").unwrap());

/// Image fetch port: raw bytes for a URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(HeraldError::Transport(format!("image fetch returned HTTP {status}")));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// File stem for an identifier: the identifier itself when it is path-safe,
/// otherwise its SHA-256 in hex.
pub fn cache_key(identifier: &str) -> String {
    if SAFE_KEY.is_match(identifier) {
        identifier.to_string()
    } else {
        format!("{:x}", Sha256::digest(identifier.as_bytes()))
    }
}

pub struct ImageCache {
    fetcher: Arc<dyn ImageFetcher>,
    dir: PathBuf,
    quality: u8,
}

impl ImageCache {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            fetcher,
            dir: dir.into(),
            quality,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{THUMBNAIL_EXTENSION}", cache_key(identifier)))
    }

    /// Fetch, normalize and store the thumbnail. `None` on any failure.
    pub async fn materialize(&self, url: &str, identifier: &str) -> Option<PathBuf> {
        tracing::debug!(%identifier, %url, "downloading campaign image");
        match self.try_materialize(url, identifier).await {
            Ok(path) => {
                tracing::debug!(%identifier, path = %path.display(), "saved campaign image");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(%identifier, %url, error = %e, "campaign image unavailable");
                counter!("image_cache_failures_total").increment(1);
                None
            }
        }
    }

    async fn try_materialize(&self, url: &str, identifier: &str) -> Result<PathBuf> {
        let bytes = self.fetcher.fetch(url).await?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let dir = self.dir.clone();
        let target = self.path_for(identifier);
        let quality = self.quality;
        let dest = target.clone();
        tokio::task::spawn_blocking(move || {
            let encoded = encode_thumbnail(&bytes, quality)?;
            write_atomic(&dir, &dest, &encoded)
        })
        .await
        .map_err(|e| HeraldError::Io(std::io::Error::other(e)))??;

        Ok(target)
    }
}

/// Decode any supported format and re-encode as opaque JPEG.
pub fn encode_thumbnail(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let rgb = flatten_to_rgb(img);
    let mut out = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder.encode_image(&rgb)?;
    }
    Ok(out)
}

fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = u32::from(a);
        let blend = |c: u8, bg: u8| -> u8 {
            ((u32::from(c) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
        };
        out.put_pixel(
            x,
            y,
            Rgb([
                blend(r, BACKDROP[0]),
                blend(g, BACKDROP[1]),
                blend(b, BACKDROP[2]),
            ]),
        );
    }
    out
}

fn write_atomic(dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| HeraldError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 0])));
        let rgb = flatten_to_rgb(img);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn opaque_pixels_are_unchanged() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_to_rgb(img).get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn half_alpha_blends_with_backdrop() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let px = flatten_to_rgb(img).get_pixel(0, 0).0;
        assert_eq!(px, [127, 127, 127]);
    }

    #[test]
    fn cache_key_hashes_unsafe_identifiers() {
        assert_eq!(cache_key("0xAbC_12-3"), "0xAbC_12-3");
        let hashed = cache_key("../etc/passwd");
        assert_eq!(hashed.len(), 64);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, cache_key("../etc/passwd"));
        assert_ne!(cache_key(""), "");
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = encode_thumbnail(b"definitely not an image", 85).unwrap_err();
        assert!(matches!(err, HeraldError::Decode(_)));
    }
}
