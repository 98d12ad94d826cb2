//! Source integration tests.
//!
//! Filesystem expansion against a real directory tree, and the remote
//! catalog source driven through `HttpCatalogClient` against a local fake
//! catalog server.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use rapidshow::error::{FetchError, SourceError};
use rapidshow::source::{
    CatalogQuery, CursorState, FilesystemSource, HttpCatalogClient, ImageSource,
    RemoteCatalogSource, Resolution,
};

use super::test_utils::{png_bytes, write_jpeg, write_png, CatalogServer, FakeCatalog};

// =============================================================================
// Filesystem Source
// =============================================================================

#[tokio::test]
async fn test_filesystem_directory_and_glob_mix() {
    let tmp = tempfile::tempdir().unwrap();
    let photos = tmp.path().join("photos");
    let extra = tmp.path().join("extra");
    std::fs::create_dir_all(photos.join("nested")).unwrap();
    std::fs::create_dir_all(&extra).unwrap();

    let a = write_png(&photos, "a.png", 4, 4);
    let b = write_jpeg(&photos, "b.JPG", 4, 4);
    std::fs::write(photos.join("notes.txt"), "not an image").unwrap();
    write_png(&photos.join("nested"), "deep.png", 4, 4);
    let c = write_png(&extra, "c.png", 4, 4);
    write_jpeg(&extra, "d.jpg", 4, 4);

    let patterns = vec![
        photos.display().to_string(),
        format!("{}/*.png", extra.display()),
    ];
    let mut source = FilesystemSource::new(&patterns).unwrap();

    let expected: HashSet<PathBuf> = [a, b, c].into_iter().collect();
    let found: HashSet<PathBuf> = source.images().iter().cloned().collect();
    assert_eq!(found, expected);

    for _ in 0..50 {
        let location = source.find_image().await.unwrap();
        assert!(expected.contains(location.path()));
        assert!(location.url().is_none());
    }
}

#[tokio::test]
async fn test_filesystem_single_image_always_returned() {
    let tmp = tempfile::tempdir().unwrap();
    let only = write_png(tmp.path(), "only.png", 2, 2);

    let mut source = FilesystemSource::new(&[only.display().to_string()]).unwrap();
    for _ in 0..10 {
        assert_eq!(source.find_image().await.unwrap().path(), only.as_path());
    }
}

#[test]
fn test_filesystem_nothing_matches() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("readme.md"), "# hi").unwrap();

    let patterns = vec![
        tmp.path().display().to_string(),
        format!("{}/*.gif", tmp.path().display()),
        tmp.path().join("missing").display().to_string(),
    ];
    let result = FilesystemSource::new(&patterns);
    assert!(matches!(result, Err(SourceError::Empty)));
}

// =============================================================================
// Remote Catalog Source over HTTP
// =============================================================================

fn client_for(server: &CatalogServer) -> HttpCatalogClient {
    HttpCatalogClient::new(&server.endpoint(), Duration::from_secs(5)).unwrap()
}

fn query(resolution: Resolution) -> CatalogQuery {
    CatalogQuery::new(vec!["sky".to_string(), "clouds".to_string()], resolution)
}

#[tokio::test]
async fn test_remote_drains_pages_then_replays() {
    let server = CatalogServer::start(
        FakeCatalog::new(vec![vec!["1.png", "2.png", "3.png"], vec!["4.png", "5.png"]])
            .with_all_images(),
    )
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let mut source =
        RemoteCatalogSource::new_in(client_for(&server), query(Resolution::Sampled), tmp.path())
            .unwrap();

    let mut served = Vec::new();
    for _ in 0..5 {
        let location = source.find_image().await.unwrap();
        assert!(location.path().starts_with(source.scratch_dir()));
        assert!(location.path().exists());
        let url = location.url().unwrap().to_string();
        assert!(url.contains("/samples/"), "expected sample url, got {}", url);
        served.push(url);
    }

    let names: Vec<&str> = served
        .iter()
        .map(|u| u.rsplit('/').next().unwrap())
        .collect();
    assert_eq!(names, vec!["1.png", "2.png", "3.png", "4.png", "5.png"]);
    assert_eq!(source.cursor().state(), CursorState::Replaying);

    // Two queries: pid=0 and pid=1, both with the joined tags
    let queries = server.catalog.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].get("pid").map(String::as_str), Some("0"));
    assert_eq!(queries[1].get("pid").map(String::as_str), Some("1"));
    assert_eq!(queries[0].get("tags").map(String::as_str), Some("sky clouds"));
    assert_eq!(queries[0].get("page").map(String::as_str), Some("dapi"));

    let downloads = server.catalog.download_count();
    let sixth = source.find_image().await.unwrap();
    let seventh = source.find_image().await.unwrap();
    assert_eq!(sixth.url(), Some(served[0].as_str()));
    assert_eq!(seventh.url(), Some(served[1].as_str()));

    // Replays come from disk only
    assert_eq!(server.catalog.download_count(), downloads);
    assert_eq!(server.catalog.queries().len(), 2);

    let scratch = source.scratch_dir().to_path_buf();
    source.close().unwrap();
    assert!(!scratch.exists());
}

#[tokio::test]
async fn test_remote_full_resolution_urls() {
    let server =
        CatalogServer::start(FakeCatalog::new(vec![vec!["big.png"]]).with_all_images()).await;

    let mut source = RemoteCatalogSource::new(client_for(&server), query(Resolution::Full)).unwrap();
    let location = source.find_image().await.unwrap();
    assert!(location.url().unwrap().ends_with("/images/big.png"));

    let bytes = std::fs::read(location.path()).unwrap();
    assert!(image::load_from_memory(&bytes).is_ok());
}

#[tokio::test]
async fn test_remote_missing_image_is_dropped() {
    let server = CatalogServer::start(
        FakeCatalog::new(vec![vec!["a.png", "gone.png", "b.png"]])
            .with_image("a.png", png_bytes(4, 4, [1, 2, 3]))
            .with_image("b.png", png_bytes(4, 4, [4, 5, 6])),
    )
    .await;

    let mut source =
        RemoteCatalogSource::new(client_for(&server), query(Resolution::Full)).unwrap();

    assert!(source.find_image().await.unwrap().url().unwrap().ends_with("a.png"));

    let err = source.find_image().await.unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(
        err,
        SourceError::Fetch(FetchError::Status { status: 404, .. })
    ));

    assert!(source.find_image().await.unwrap().url().unwrap().ends_with("b.png"));

    // Only the two successful downloads are replayed
    let replayed: Vec<String> = {
        let mut urls = Vec::new();
        for _ in 0..4 {
            urls.push(source.find_image().await.unwrap().url().unwrap().to_string());
        }
        urls
    };
    assert!(replayed[0].ends_with("a.png"));
    assert!(replayed[1].ends_with("b.png"));
    assert!(replayed[2].ends_with("a.png"));
    assert!(replayed[3].ends_with("b.png"));
    assert_eq!(source.cursor().served().len(), 2);
}

#[tokio::test]
async fn test_remote_empty_catalog_is_fatal() {
    let server = CatalogServer::start(FakeCatalog::new(vec![])).await;

    let mut source =
        RemoteCatalogSource::new(client_for(&server), query(Resolution::Sampled)).unwrap();

    let err = source.find_image().await.unwrap_err();
    assert!(matches!(err, SourceError::NoImagesAvailable));
    assert!(err.is_fatal());

    // Exhausted: no further queries
    let _ = source.find_image().await;
    assert_eq!(server.catalog.queries().len(), 1);
}

#[tokio::test]
async fn test_remote_bad_endpoint_is_retried() {
    let server =
        CatalogServer::start(FakeCatalog::new(vec![vec!["x.png"]]).with_all_images()).await;

    let client = HttpCatalogClient::new(&server.missing_endpoint(), Duration::from_secs(5)).unwrap();
    let mut source = RemoteCatalogSource::new(client, query(Resolution::Sampled)).unwrap();

    for _ in 0..2 {
        let err = source.find_image().await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, SourceError::Fetch(FetchError::Status { status: 404, .. })));
    }
    assert_eq!(source.cursor().page_index(), 0);
    assert_eq!(source.cursor().state(), CursorState::Fetching);
}

#[tokio::test]
async fn test_remote_connection_refused() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpCatalogClient::new(
        &format!("http://{}/index.php", addr),
        Duration::from_secs(2),
    )
    .unwrap();
    let mut source = RemoteCatalogSource::new(client, query(Resolution::Sampled)).unwrap();

    let err = source.find_image().await.unwrap_err();
    assert!(matches!(err, SourceError::Fetch(FetchError::Connection(_))));
    assert!(!err.is_fatal());
}

#[test]
fn test_invalid_endpoint_rejected() {
    let result = HttpCatalogClient::new("not a url", Duration::from_secs(1));
    assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
}
