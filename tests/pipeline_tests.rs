mod common;

use common::*;
use figma_squeeze::config::StorageConfig;
use figma_squeeze::{ExportError, ExportPipeline, ExportRequest, PipelineReport, UploadDispatcher};
use mockito::{Matcher, Server};

const UPLOADED_URL: &str = "https://cdn.example.com/asset";

async fn mock_upload_ok(server: &mut Server, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/upload")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"code":0,"data":{{"url":"{}"}}}}"#, UPLOADED_URL))
        .expect(hits)
        .create_async()
        .await
}

async fn mock_children(server: &mut Server, parent: &str, children: &[(&str, &str)]) -> mockito::Mock {
    server
        .mock("GET", format!("/files/{}/nodes", FILE_KEY).as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ids".into(), parent.into()),
            Matcher::UrlEncoded("depth".into(), "1".into()),
        ]))
        .match_header("X-Figma-Token", "test-token")
        .with_status(200)
        .with_body(children_body(parent, children))
        .create_async()
        .await
}

async fn mock_svg(server: &mut Server, path: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_body(SVG_BODY)
        .create_async()
        .await
}

fn names(report: &PipelineReport) -> (Vec<&str>, Vec<&str>) {
    (
        report.successful_uploads.iter().map(|e| e.name.as_str()).collect(),
        report.failed_uploads.iter().map(|e| e.name.as_str()).collect(),
    )
}

#[tokio::test]
async fn test_empty_url_is_reported_and_valid_url_is_uploaded() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[("1:2", "Icon/Home"), ("1:3", "Logo")]).await;
    let images = server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ids".into(), "1:2,1:3".into()),
            Matcher::UrlEncoded("format".into(), "svg".into()),
            Matcher::UrlEncoded("scale".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(images_body(&[
            ("1:2", Some(format!("{}/render/home.svg", server.url()))),
            ("1:3", Some(String::new())),
        ]))
        .create_async()
        .await;
    mock_svg(&mut server, "/render/home.svg").await;
    let upload = mock_upload_ok(&mut server, 1).await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:1", "svg", 2.0, 0.85, true).unwrap();
    let report = pipeline.run(&request).await.unwrap();

    images.assert_async().await;
    upload.assert_async().await;

    let (ok, failed) = names(&report);
    assert_eq!(ok, vec!["Icon_Home.svg"]);
    assert_eq!(report.successful_uploads[0].url, UPLOADED_URL);
    assert_eq!(failed, vec!["Logo.svg"]);
    assert!(report.failed_uploads[0].error.contains("1:3"));

    assert!(temp_dir.path().join("staging").join("Icon_Home.svg").exists());
    assert!(!temp_dir.path().join("staging").join("Logo.svg").exists());
}

#[tokio::test]
async fn test_no_children_stops_before_rendering() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[]).await;
    let images = server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:1", "png", 1.0, 0.85, true).unwrap();
    let result = pipeline.run(&request).await;

    images.assert_async().await;
    assert!(matches!(result, Err(ExportError::NoChildren)));
}

#[tokio::test]
async fn test_download_failures_are_isolated() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[("1:2", "A"), ("1:3", "B"), ("1:4", "C")]).await;
    server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(images_body(&[
            ("1:2", Some(format!("{}/render/a.svg", server.url()))),
            ("1:3", Some(format!("{}/render/b.svg", server.url()))),
            ("1:4", Some(format!("{}/render/c.svg", server.url()))),
        ]))
        .create_async()
        .await;
    mock_svg(&mut server, "/render/a.svg").await;
    let broken = server
        .mock("GET", "/render/b.svg")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;
    mock_svg(&mut server, "/render/c.svg").await;
    let upload = mock_upload_ok(&mut server, 2).await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 1);
    let request = ExportRequest::new(FILE_KEY, "1:1", "svg", 1.0, 0.85, true).unwrap();
    let report = pipeline.run(&request).await.unwrap();

    broken.assert_async().await;
    upload.assert_async().await;

    let (ok, failed) = names(&report);
    assert_eq!(ok, vec!["A.svg", "C.svg"]);
    assert_eq!(failed, vec!["B.svg"]);
    assert!(report.failed_uploads[0].error.starts_with("Download failed"));
    assert!(report.failed_uploads[0].error.contains("503"));
}

#[tokio::test]
async fn test_upload_rejection_is_reported_per_file() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[("1:2", "Badge")]).await;
    server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(images_body(&[(
            "1:2",
            Some(format!("{}/render/badge.svg", server.url())),
        )]))
        .create_async()
        .await;
    mock_svg(&mut server, "/render/badge.svg").await;
    server
        .mock("POST", "/upload")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"code":1,"message":"quota exceeded"}"#)
        .create_async()
        .await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:1", "svg", 1.0, 0.85, true).unwrap();
    let report = pipeline.run(&request).await.unwrap();

    assert!(report.successful_uploads.is_empty());
    assert_eq!(report.failed_uploads.len(), 1);
    assert_eq!(report.failed_uploads[0].name, "Badge.svg");
    assert!(report.failed_uploads[0].error.contains("quota exceeded"));
}

#[tokio::test]
async fn test_nodes_only_falls_back_to_generated_names() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    // Name lookup fails; the export continues with generated filenames
    server
        .mock("GET", format!("/files/{}/nodes", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::UrlEncoded("ids".into(), "1:2".into()))
        .with_status(200)
        .with_body(images_body(&[(
            "1:2",
            Some(format!("{}/render/x.svg", server.url())),
        )]))
        .create_async()
        .await;
    mock_svg(&mut server, "/render/x.svg").await;
    mock_upload_ok(&mut server, 1).await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:2", "svg", 1.0, 0.85, false).unwrap();
    let report = pipeline.run(&request).await.unwrap();

    assert_eq!(report.successful_uploads.len(), 1);
    let name = &report.successful_uploads[0].name;
    assert!(name.starts_with("figma_export_1_2_"), "{}", name);
    assert!(name.ends_with("_1.svg"), "{}", name);
}

#[tokio::test]
async fn test_stage_errors_abort_the_run() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    server
        .mock("GET", format!("/files/{}/nodes", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"status":403,"err":"Invalid token"}"#)
        .create_async()
        .await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:1", "png", 1.0, 0.85, true).unwrap();
    let err = pipeline.run(&request).await.unwrap_err();

    assert!(matches!(err, ExportError::Auth(Some(ref d)) if d == "Invalid token"));
}

#[tokio::test]
async fn test_empty_image_map_is_an_error() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[("1:2", "A")]).await;
    server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"err":null,"images":{}}"#)
        .create_async()
        .await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:1", "png", 1.0, 0.85, true).unwrap();
    let result = pipeline.run(&request).await;

    assert!(matches!(result, Err(ExportError::NoImages)));
}

#[tokio::test]
async fn test_staging_directory_is_reset_each_run() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();
    let staging = temp_dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    std::fs::write(staging.join("stale.png"), b"left over").unwrap();

    mock_children(&mut server, "1:1", &[]).await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:1", "png", 1.0, 0.85, true).unwrap();
    let _ = pipeline.run(&request).await;

    assert!(staging.is_dir());
    assert!(!staging.join("stale.png").exists());
}

#[tokio::test]
async fn test_concurrent_runs_do_not_interleave() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[("1:2", "Star")]).await;
    mock_children(&mut server, "2:1", &[("2:2", "Moon")]).await;
    for (id, file) in [("1:2", "star.svg"), ("2:2", "moon.svg")] {
        server
            .mock("GET", format!("/images/{}", FILE_KEY).as_str())
            .match_query(Matcher::UrlEncoded("ids".into(), id.into()))
            .with_status(200)
            .with_body(images_body(&[(
                id,
                Some(format!("{}/render/{}", server.url(), file)),
            )]))
            .create_async()
            .await;
        mock_svg(&mut server, &format!("/render/{}", file)).await;
    }
    mock_upload_ok(&mut server, 2).await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let star = ExportRequest::new(FILE_KEY, "1:1", "svg", 1.0, 0.85, true).unwrap();
    let moon = ExportRequest::new(FILE_KEY, "2:1", "svg", 1.0, 0.85, true).unwrap();
    // The run lock is fair and `join!` polls the star run first
    let (first, second) = tokio::join!(pipeline.run(&star), pipeline.run(&moon));

    assert_eq!(names(&first.unwrap()).0, vec!["Star.svg"]);
    assert_eq!(names(&second.unwrap()).0, vec!["Moon.svg"]);

    // The second run reset staging, so only its file is left behind
    let staging = temp_dir.path().join("staging");
    let mut left: Vec<String> = std::fs::read_dir(&staging)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["Moon.svg"]);
}

#[tokio::test]
async fn test_nodes_missing_from_render_response_are_reported() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    server
        .mock("GET", format!("/files/{}/nodes", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::UrlEncoded("ids".into(), "1:2,9:9".into()))
        .with_status(200)
        .with_body(images_body(&[(
            "1:2",
            Some(format!("{}/render/x.svg", server.url())),
        )]))
        .create_async()
        .await;
    mock_svg(&mut server, "/render/x.svg").await;
    let upload = mock_upload_ok(&mut server, 1).await;

    let pipeline = test_pipeline(&server.url(), temp_dir.path(), 0);
    let request = ExportRequest::new(FILE_KEY, "1:2,9:9", "svg", 1.0, 0.85, false).unwrap();
    let report = pipeline.run(&request).await.unwrap();

    upload.assert_async().await;
    assert_eq!(report.successful_uploads.len() + report.failed_uploads.len(), 2);
    assert_eq!(report.successful_uploads.len(), 1);
    let missing = &report.failed_uploads[0];
    assert!(missing.error.contains("9:9"), "{}", missing.error);
    assert!(missing.name.starts_with("figma_export_9_9_"), "{}", missing.name);
    assert!(missing.name.ends_with("_2.svg"), "{}", missing.name);
}

#[tokio::test]
async fn test_upload_timeout_comes_from_pipeline_config() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();

    mock_children(&mut server, "1:1", &[("1:2", "Slow")]).await;
    server
        .mock("GET", format!("/images/{}", FILE_KEY).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(images_body(&[(
            "1:2",
            Some(format!("{}/render/slow.svg", server.url())),
        )]))
        .create_async()
        .await;
    mock_svg(&mut server, "/render/slow.svg").await;
    server
        .mock("POST", "/upload")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body_from_request(|_| {
            std::thread::sleep(std::time::Duration::from_millis(1500));
            br#"{"code":0,"data":{"url":"https://cdn.example.com/late"}}"#.to_vec()
        })
        .create_async()
        .await;

    let mut config = test_pipeline_config(temp_dir.path(), 0);
    config.upload_timeout = std::time::Duration::from_millis(200);
    let pipeline = ExportPipeline::from_storage_config(
        &test_figma_config(&server.url()),
        &signed_storage_config(&server.url()),
        &config,
    )
    .unwrap();
    let request = ExportRequest::new(FILE_KEY, "1:1", "svg", 1.0, 0.85, true).unwrap();
    let report = pipeline.run(&request).await.unwrap();

    assert!(report.successful_uploads.is_empty());
    assert_eq!(report.failed_uploads[0].name, "Slow.svg");
    assert!(
        report.failed_uploads[0].error.contains("timed out"),
        "{}",
        report.failed_uploads[0].error
    );
}

#[test]
fn test_pipeline_requires_a_configured_provider() {
    let temp_dir = create_temp_directory();
    let result = ExportPipeline::from_storage_config(
        &test_figma_config("http://127.0.0.1:9"),
        &StorageConfig::default(),
        &test_pipeline_config(temp_dir.path(), 0),
    );
    assert!(matches!(result, Err(ExportError::UploadConfig(_))));
}

#[test]
fn test_invalid_request_never_reaches_the_network() {
    // Validation happens while building the request, before any pipeline call
    assert!(matches!(
        ExportRequest::new(FILE_KEY, "1:1", "png", 4.5, 0.85, true),
        Err(ExportError::Validation(_))
    ));
    assert!(matches!(
        ExportRequest::new(FILE_KEY, "", "png", 1.0, 0.85, true),
        Err(ExportError::Validation(_))
    ));
}

#[tokio::test]
async fn test_upload_folder_concurrently() {
    let mut server = Server::new_async().await;
    let temp_dir = create_temp_directory();
    create_test_image_files(temp_dir.path());
    let upload = mock_upload_ok(&mut server, 3).await;

    let dispatcher = UploadDispatcher::new(signed_provider(&server.url()));
    let summary = dispatcher.upload_folder(temp_dir.path()).await.unwrap();

    upload.assert_async().await;
    assert!(summary.success);
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.successful_count, 3);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(summary.total_size, 3 * b"fake image data".len() as u64);
}

#[tokio::test]
async fn test_upload_empty_folder_is_success() {
    let server = Server::new_async().await;
    let temp_dir = create_temp_directory();
    std::fs::write(temp_dir.path().join("notes.txt"), b"text").unwrap();

    let dispatcher = UploadDispatcher::new(signed_provider(&server.url()));
    let summary = dispatcher.upload_folder(temp_dir.path()).await.unwrap();

    assert!(summary.success);
    assert_eq!(summary.total_files, 0);
    assert!(summary.successful_uploads.is_empty());
}
