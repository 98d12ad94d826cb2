//! Slide buffer integration tests.
//!
//! These run the real producer with `ImageScaler` over image files on disk
//! or served by the fake catalog.

use std::sync::Arc;
use std::time::Duration;

use rapidshow::error::{BufferError, ProducerError, SourceError};
use rapidshow::frame::{Dimensions, ImageScaler};
use rapidshow::source::{
    CatalogQuery, FilesystemSource, HttpCatalogClient, RemoteCatalogSource, Resolution,
};
use rapidshow::{BufferConfig, SlideBuffer};

use super::test_utils::{
    wait_for_len, write_colored_png, write_jpeg, write_png, CatalogServer, FakeCatalog, FakeProbe,
};

const DISPLAY: Dimensions = Dimensions::new(16, 9);

fn assert_covers_display(width: u32, height: u32) {
    assert!(width >= DISPLAY.width && height >= DISPLAY.height);
    assert!(width == DISPLAY.width || height == DISPLAY.height);
}

fn image_dir() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    write_png(tmp.path(), "landscape.png", 40, 30);
    write_png(tmp.path(), "portrait.png", 30, 40);
    write_jpeg(tmp.path(), "wide.jpg", 64, 16);
    tmp
}

#[tokio::test]
async fn test_producer_scales_real_images() {
    let dir = image_dir();
    let source = FilesystemSource::new(&[dir.path().display().to_string()]).unwrap();
    let buffer = Arc::new(SlideBuffer::new(
        BufferConfig::count_bound(8, 4),
        FakeProbe::new(0.0),
    ));

    assert_eq!(buffer.fill_ratio(), 0.0);
    assert_eq!(buffer.sample().unwrap_err(), BufferError::Empty);

    let producer = buffer.start(source, ImageScaler::new(DISPLAY));
    wait_for_len(&buffer, 4).await;
    assert_eq!(buffer.fill_ratio(), 1.0);

    for _ in 0..20 {
        let frame = buffer.sample().unwrap();
        assert_covers_display(frame.width(), frame.height());
        assert_eq!(frame.byte_size(), (frame.width() * frame.height() * 4) as usize);
    }

    producer.stop().await.unwrap();
    assert!(buffer.len() <= 8);
}

#[tokio::test]
async fn test_broken_files_are_skipped() {
    let dir = image_dir();
    std::fs::write(dir.path().join("corrupt.png"), b"definitely not a png").unwrap();

    let source = FilesystemSource::new(&[dir.path().display().to_string()]).unwrap();
    assert_eq!(source.len(), 4);

    let buffer = Arc::new(SlideBuffer::new(
        BufferConfig::count_bound(10, 10),
        FakeProbe::new(0.0),
    ));
    let producer = buffer.start(source, ImageScaler::new(DISPLAY));
    wait_for_len(&buffer, 10).await;

    producer.stop().await.unwrap();
    // The corrupt file never makes it into the buffer
    for _ in 0..20 {
        let frame = buffer.sample().unwrap();
        assert_covers_display(frame.width(), frame.height());
    }
}

/// One distinct solid color per file, so every frame can be traced back to its source
const FILE_COLORS: [[u8; 3]; 4] = [[250, 0, 0], [0, 250, 0], [0, 0, 250], [120, 120, 0]];

fn colored_image_dir() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let sizes = [(40, 30), (30, 40), (64, 16), (16, 9)];
    for (i, (color, (w, h))) in FILE_COLORS.iter().zip(sizes).enumerate() {
        write_colored_png(tmp.path(), &format!("{i}.png"), w, h, *color);
    }
    tmp
}

/// Index of the source file whose color this frame carries.
fn source_color_of(frame: &rapidshow::Frame) -> Option<usize> {
    let pixel = frame
        .pixels()
        .get_pixel(frame.width() / 2, frame.height() / 2);
    FILE_COLORS.iter().position(|color| {
        color
            .iter()
            .zip(pixel.0.iter())
            .all(|(expected, actual)| expected.abs_diff(*actual) <= 2)
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sampling_while_producing() {
    let dir = colored_image_dir();
    let source = FilesystemSource::new(&[dir.path().display().to_string()]).unwrap();
    let buffer = Arc::new(SlideBuffer::new(
        BufferConfig::count_bound(5, 5),
        FakeProbe::new(0.0),
    ));

    let producer = buffer.start(source, ImageScaler::new(DISPLAY));
    wait_for_len(&buffer, 5).await;

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            tokio::task::spawn_blocking(move || {
                for _ in 0..250 {
                    let frame = buffer.sample().unwrap();
                    assert_covers_display(frame.width(), frame.height());
                    assert!(
                        source_color_of(&frame).is_some(),
                        "sampled frame does not come from any source file"
                    );
                    assert!(buffer.len() <= 5);
                    assert_eq!(buffer.fill_ratio(), 1.0);
                }
            })
        })
        .collect();

    for reader in readers {
        reader.await.unwrap();
    }

    producer.stop().await.unwrap();
    let stats = buffer.stats();
    assert_eq!(stats.len, 5);
    assert_eq!(stats.inserted, stats.evicted + 5);
}

#[tokio::test]
async fn test_memory_ceiling_evicts_every_insertion() {
    let dir = image_dir();
    let source = FilesystemSource::new(&[dir.path().display().to_string()]).unwrap();
    let probe = FakeProbe::new(0.9);
    let buffer = Arc::new(SlideBuffer::new(
        BufferConfig::memory_bound(0.5, 25),
        probe.clone(),
    ));

    // Already over the ceiling: nothing to wait for
    assert_eq!(buffer.fill_ratio(), 1.0);

    let producer = buffer.start(source, ImageScaler::new(DISPLAY));
    for _ in 0..200 {
        if buffer.stats().inserted >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    producer.stop().await.unwrap();

    let stats = buffer.stats();
    assert!(stats.inserted >= 3);
    assert_eq!(stats.evicted, stats.inserted);
    assert_eq!(buffer.sample().unwrap_err(), BufferError::Empty);

    // Below the ceiling the buffer grows again
    probe.set(0.1);
    assert_eq!(buffer.fill_ratio(), 0.0);
}

#[tokio::test]
async fn test_remote_source_feeds_buffer_and_cleans_up() {
    let server = CatalogServer::start(
        FakeCatalog::new(vec![vec!["1.png", "2.png"], vec!["3.png"]]).with_all_images(),
    )
    .await;

    let client = HttpCatalogClient::new(&server.endpoint(), Duration::from_secs(5)).unwrap();
    let source = RemoteCatalogSource::new(
        client,
        CatalogQuery::new(vec!["sky".to_string()], Resolution::Sampled),
    )
    .unwrap();
    let scratch = source.scratch_dir().to_path_buf();

    let buffer = Arc::new(SlideBuffer::new(
        BufferConfig::count_bound(10, 6),
        FakeProbe::new(0.0),
    ));
    let producer = buffer.start(source, ImageScaler::new(DISPLAY));

    // Only three images exist; replay fills the rest
    wait_for_len(&buffer, 6).await;
    assert_eq!(server.catalog.queries().len(), 2);
    assert_eq!(server.catalog.download_count(), 3);

    producer.stop().await.unwrap();
    assert!(!scratch.exists());
}

#[tokio::test]
async fn test_empty_catalog_stops_producer() {
    let server = CatalogServer::start(FakeCatalog::new(vec![])).await;

    let client = HttpCatalogClient::new(&server.endpoint(), Duration::from_secs(5)).unwrap();
    let source = RemoteCatalogSource::new(
        client,
        CatalogQuery::new(vec!["nothing".to_string()], Resolution::Full),
    )
    .unwrap();

    let buffer = Arc::new(SlideBuffer::new(BufferConfig::default(), FakeProbe::new(0.0)));
    let producer = buffer.start(source, ImageScaler::new(DISPLAY));

    let result = tokio::time::timeout(Duration::from_secs(5), producer.wait())
        .await
        .expect("Producer should exit on its own");
    assert!(matches!(
        result,
        Err(ProducerError::Source(SourceError::NoImagesAvailable))
    ));
    assert!(buffer.is_empty());
}
