// tests/image_cache.rs
use async_trait::async_trait;
use campaign_herald::error::{HeraldError, Result};
use campaign_herald::image_cache::{ImageCache, ImageFetcher};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

enum Reply {
    Bytes(Vec<u8>),
    Status(u16),
}

struct MapFetcher(HashMap<&'static str, Reply>);

#[async_trait]
impl ImageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match self.0.get(url) {
            Some(Reply::Bytes(b)) => Ok(b.clone()),
            Some(Reply::Status(s)) => Err(HeraldError::Transport(format!("HTTP {s}"))),
            None => Err(HeraldError::Transport("connection refused".into())),
        }
    }
}

fn png(w: u32, h: u32, px: Rgba<u8>) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, px))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn cache(dir: &std::path::Path, replies: Vec<(&'static str, Reply)>) -> ImageCache {
    let fetcher = MapFetcher(replies.into_iter().collect());
    ImageCache::new(Arc::new(fetcher), dir.join("images"), 85)
}

#[tokio::test]
async fn stores_an_opaque_jpeg_keyed_by_identifier() {
    let tmp = tempfile::tempdir().unwrap();
    let c = cache(
        tmp.path(),
        vec![("https://img/a.png", Reply::Bytes(png(8, 8, Rgba([0, 0, 255, 0]))))],
    );

    let path = c.materialize("https://img/a.png", "X").await.expect("stored");
    assert_eq!(path, tmp.path().join("images").join("X.jpg"));

    let stored = image::open(&path).unwrap();
    assert!(!stored.color().has_alpha());
    let px = stored.to_rgb8().get_pixel(4, 4).0;
    assert!(px.iter().all(|c| *c > 240), "transparent should flatten to white, got {px:?}");
}

#[tokio::test]
async fn same_identifier_overwrites_instead_of_duplicating() {
    let tmp = tempfile::tempdir().unwrap();
    let c = cache(
        tmp.path(),
        vec![
            ("https://img/small.png", Reply::Bytes(png(4, 4, Rgba([1, 2, 3, 255])))),
            ("https://img/big.png", Reply::Bytes(png(16, 16, Rgba([1, 2, 3, 255])))),
        ],
    );

    let first = c.materialize("https://img/small.png", "X").await.unwrap();
    let second = c.materialize("https://img/big.png", "X").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(image::open(&second).unwrap().width(), 16);

    let files: Vec<_> = std::fs::read_dir(c.dir()).unwrap().flatten().collect();
    assert_eq!(files.len(), 1, "temp files must not linger");
}

#[tokio::test]
async fn http_404_yields_none() {
    let tmp = tempfile::tempdir().unwrap();
    let c = cache(tmp.path(), vec![("https://img/missing.png", Reply::Status(404))]);
    assert!(c.materialize("https://img/missing.png", "X").await.is_none());
    assert!(!c.path_for("X").exists());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_file() {
    let tmp = tempfile::tempdir().unwrap();
    let c = cache(
        tmp.path(),
        vec![
            ("https://img/ok.png", Reply::Bytes(png(4, 4, Rgba([9, 9, 9, 255])))),
            ("https://img/garbage", Reply::Bytes(b"<html>nope</html>".to_vec())),
        ],
    );

    let path = c.materialize("https://img/ok.png", "X").await.unwrap();
    let before = std::fs::read(&path).unwrap();

    assert!(c.materialize("https://img/garbage", "X").await.is_none());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}
