// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests driving the engine through its public facade.

use std::time::Duration;

use blattwerk_engine::{
    EngineConfig, ErrorKind, Job, JobId, JobParams, JobStatus, Service, Upload,
};
use blattwerk_core::types::{ChangeKind, CompareReport, CompressMode, SizeUnit, TextFormat};
use tempfile::TempDir;

mod util {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Build a PDF where each entry of `pages` becomes a page of text lines.
    pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for lines in pages {
            let mut operations = Vec::new();
            for (index, line) in lines.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new(
                    "Td",
                    vec![72.into(), Object::Integer(720 - 16 * index as i64)],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {},
                content.encode().expect("encode content stream"),
            )));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("serialise test pdf");
        out
    }

    /// Single-page PDF embedding one DCT-encoded (JPEG) image XObject.
    pub fn pdf_with_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
        let rgb = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128])
        });
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode_image(&image::DynamicImage::ImageRgb8(rgb))
            .expect("encode jpeg");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )));
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        });

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(width as i64),
                        0.into(),
                        0.into(),
                        Object::Integer(height as i64),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("serialise test pdf");
        out
    }
}

fn pdf_upload(name: &str, pages: &[&[&str]]) -> Upload {
    Upload {
        filename: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        data: util::pdf_with_pages(pages),
    }
}

fn start(configure: impl FnOnce(&mut EngineConfig)) -> (Service, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = EngineConfig {
        data_dir: dir.path().join("jobs"),
        ..EngineConfig::default()
    };
    configure(&mut config);
    let service = Service::new(config).expect("start engine");
    (service, dir)
}

async fn wait_terminal(service: &Service, id: JobId) -> Job {
    for _ in 0..500 {
        let job = service.status(id).await.expect("status");
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state", id);
}

#[tokio::test]
async fn merge_runs_to_completion() {
    let (service, _dir) = start(|_| {});

    let id = service
        .submit(
            JobParams::Merge,
            vec![
                pdf_upload("contract.pdf", &[&["alpha"]]),
                pdf_upload("annex.pdf", &[&["beta"], &["gamma"]]),
            ],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_filename.as_deref(), Some("contract_merge.pdf"));
    assert_eq!(job.input_hashes.len(), 2);

    let output = service.fetch_output(id).await.expect("fetch");
    assert_eq!(output.filename, "contract_merge.pdf");
    let merged = lopdf::Document::load_mem(&output.data).expect("valid pdf");
    assert_eq!(merged.get_pages().len(), 3);
}

#[tokio::test]
async fn every_submission_gets_a_distinct_id() {
    let (service, _dir) = start(|_| {});

    let mut ids = Vec::new();
    for _ in 0..5 {
        let id = service
            .submit(
                JobParams::Extract { pages: vec![1] },
                vec![pdf_upload("doc.pdf", &[&["x"], &["y"]])],
            )
            .await
            .expect("submit");
        ids.push(id);
    }
    ids.sort_by_key(|id| id.to_string());
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn rejected_submission_leaves_no_job() {
    let (service, _dir) = start(|_| {});

    let err = service
        .submit(JobParams::Merge, vec![pdf_upload("only.pdf", &[&["x"]])])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.job_count().await, 0);
}

#[tokio::test]
async fn compress_with_unreachable_target_keeps_smallest_and_warns() {
    let (service, _dir) = start(|_| {});

    // A text-only PDF can never shrink to 0.1 KB.
    let id = service
        .submit(
            JobParams::Compress {
                mode: CompressMode::FileSize { desired_size: 0.1, unit: SizeUnit::Kb },
                grayscale: false,
            },
            vec![pdf_upload("report.pdf", &[&["some", "content"], &["more"]])],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let report = job.report.expect("compression report");
    assert!(report["warning"].is_string());
    assert_eq!(report["target_bytes"], 102);
    assert!(report["attempts"].as_u64().expect("attempts") >= 1);

    let output = service.fetch_output(id).await.expect("fetch");
    lopdf::Document::load_mem(&output.data).expect("output is a valid pdf");
}

#[tokio::test]
async fn compress_reaches_an_achievable_size_target() {
    let (service, _dir) = start(|_| {});

    // A high-quality JPEG gives image re-encoding real room: half the
    // original size is reachable within the level domain.
    let data = util::pdf_with_jpeg(256, 256, 95);
    let desired_kb = (data.len() / 2) as f64 / 1024.0;

    let id = service
        .submit(
            JobParams::Compress {
                mode: CompressMode::FileSize { desired_size: desired_kb, unit: SizeUnit::Kb },
                grayscale: false,
            },
            vec![Upload {
                filename: "photos.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                data,
            }],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let report = job.report.expect("compression report");
    assert!(report["warning"].is_null(), "unexpected warning: {}", report);
    let target = report["target_bytes"].as_u64().expect("target");

    // Default tolerance is 5%: the served output must land at or below
    // target * 1.05.
    let output = service.fetch_output(id).await.expect("fetch");
    let upper = (target as f64 * 1.05).floor() as u64;
    assert!(
        output.data.len() as u64 <= upper,
        "output is {} bytes, above the {} byte bound",
        output.data.len(),
        upper
    );
    lopdf::Document::load_mem(&output.data).expect("output is a valid pdf");
}

#[tokio::test]
async fn compress_quality_mode_produces_valid_pdf() {
    let (service, _dir) = start(|_| {});

    let id = service
        .submit(
            JobParams::Compress {
                mode: CompressMode::Quality { level: 7 },
                grayscale: false,
            },
            vec![pdf_upload("scan.pdf", &[&["page"]])],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_filename.as_deref(), Some("scan_compress.pdf"));

    let report = job.report.expect("compression report");
    assert_eq!(report["level"], 7);
    assert!(report["warning"].is_null());
}

#[tokio::test]
async fn compare_reports_the_added_paragraph() {
    let (service, _dir) = start(|_| {});

    let id = service
        .submit(
            JobParams::Compare,
            vec![
                pdf_upload("v1.pdf", &[&["intro"], &["body"]]),
                pdf_upload("v2.pdf", &[&["intro"], &["body", "new paragraph"]]),
            ],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_filename.as_deref(), Some("v1_compare.json"));

    let output = service.fetch_output(id).await.expect("fetch");
    assert_eq!(output.media_type, "application/json");
    let report: CompareReport = serde_json::from_slice(&output.data).expect("report json");
    assert_eq!(report.total, 1);
    assert_eq!(report.changes[0].page, 2);
    assert_eq!(report.changes[0].kind, ChangeKind::Addition);
    assert_eq!(report.changes[0].text, "new paragraph");

    // The structured report is also on the record.
    let record = service.compare_report(id).await.expect("report");
    assert_eq!(record["total"], 1);

    // The unmodified originals stay available for side-by-side rendering.
    let left = service.compare_left(id).await.expect("left");
    assert_eq!(left.filename, "v1.pdf");
    assert_eq!(left.media_type, "application/pdf");
    let right = service.compare_right(id).await.expect("right");
    assert_eq!(right.filename, "v2.pdf");
    let original = lopdf::Document::load_mem(&right.data).expect("valid pdf");
    assert_eq!(original.get_pages().len(), 2);
}

#[tokio::test]
async fn text_extraction_renders_markdown_headings() {
    let (service, _dir) = start(|_| {});

    let id = service
        .submit(
            JobParams::PdfToText { format: TextFormat::Markdown },
            vec![pdf_upload("notes.pdf", &[&["alpha"], &["beta"]])],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_filename.as_deref(), Some("notes_text.md"));

    let output = service.fetch_output(id).await.expect("fetch");
    let text = String::from_utf8(output.data).expect("utf8");
    assert!(text.contains("## Page 1"));
    assert!(text.contains("alpha"));
    assert!(text.contains("## Page 2"));
}

#[tokio::test]
async fn transform_timeout_fails_the_job() {
    let (service, _dir) = start(|config| {
        config.transform_timeout = Duration::ZERO;
    });

    let id = service
        .submit(
            JobParams::Rotate { pages: vec![1], angle: 90 },
            vec![pdf_upload("doc.pdf", &[&["x"]])],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::Timeout));
    assert!(job.error.is_some());
}

#[tokio::test]
async fn missing_office_converter_is_a_dependency_failure() {
    let (service, _dir) = start(|config| {
        config.office_converter = "blattwerk-no-such-converter".to_string();
    });

    let id = service
        .submit(
            JobParams::OfficeToPdf,
            vec![Upload {
                filename: "memo.docx".to_string(),
                content_type: None,
                data: b"not really a docx, the converter never runs".to_vec(),
            }],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::Dependency));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_office_conversion_discards_the_intermediate_pdf() {
    use std::os::unix::fs::PermissionsExt;

    // A converter that writes its output file and then reports failure.
    let script_dir = tempfile::tempdir().expect("tempdir");
    let script = script_dir.path().join("fake-soffice");
    std::fs::write(
        &script,
        "#!/bin/sh\nprintf 'broken' > \"$5/input_0.pdf\"\necho 'conversion exploded' >&2\nexit 3\n",
    )
    .expect("write script");
    let mut perms = std::fs::metadata(&script).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).expect("chmod");

    let (service, dir) = start(|config| {
        config.office_converter = script.to_string_lossy().into_owned();
    });

    let id = service
        .submit(
            JobParams::OfficeToPdf,
            vec![Upload {
                filename: "memo.docx".to_string(),
                content_type: None,
                data: b"bytes".to_vec(),
            }],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::Transform));
    assert!(
        job.error.as_deref().is_some_and(|e| e.contains("conversion exploded")),
        "converter stderr should reach the job record: {:?}",
        job.error
    );

    // The half-written converter output is gone; the input survives.
    let job_dir = dir.path().join("jobs").join(id.to_string());
    assert!(!job_dir.join("input_0.pdf").exists());
    assert!(job_dir.join("input_0.docx").exists());
}

#[tokio::test]
async fn reaper_respects_leases_then_removes_everything() {
    let (service, dir) = start(|config| {
        config.retention = Duration::ZERO;
        // Long interval: reaping in this test is driven explicitly.
        config.reap_interval = Duration::from_secs(3600);
    });

    let id = service
        .submit(
            JobParams::Extract { pages: vec![1] },
            vec![pdf_upload("doc.pdf", &[&["x"], &["y"]])],
        )
        .await
        .expect("submit");
    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let job_dir = dir.path().join("jobs").join(id.to_string());
    assert!(job_dir.exists());

    // While the output handle is alive the job is leased and survives.
    let output = service.fetch_output(id).await.expect("fetch");
    assert_eq!(service.reap_now().await, 0);
    assert!(service.status(id).await.is_ok());

    drop(output);
    assert_eq!(service.reap_now().await, 1);
    let err = service.status(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!job_dir.exists());
}

#[tokio::test]
async fn fetch_on_unknown_or_failed_job_is_not_found() {
    let (service, _dir) = start(|config| {
        config.office_converter = "blattwerk-no-such-converter".to_string();
    });

    // Unknown job.
    let err = service.fetch_output(JobId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // A failed job has no output to find either: the caller sees the same
    // not-found kind as for an unknown or reaped id.
    let id = service
        .submit(
            JobParams::OfficeToPdf,
            vec![Upload {
                filename: "memo.docx".to_string(),
                content_type: None,
                data: b"bytes".to_vec(),
            }],
        )
        .await
        .expect("submit");
    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    let err = service.fetch_output(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn compare_inputs_are_not_found_without_completion() {
    // Zero timeout: the comparison reliably fails, never completes.
    let (service, _dir) = start(|config| {
        config.transform_timeout = Duration::ZERO;
    });

    let id = service
        .submit(
            JobParams::Compare,
            vec![
                pdf_upload("v1.pdf", &[&["a"]]),
                pdf_upload("v2.pdf", &[&["b"]]),
            ],
        )
        .await
        .expect("submit");

    let job = wait_terminal(&service, id).await;
    assert_eq!(job.status, JobStatus::Failed);

    // A job that never completed has no comparison result to find.
    let err = service.compare_left(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.compare_report(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn document_info_is_synchronous_and_creates_no_job() {
    let (service, _dir) = start(|_| {});

    let info = service
        .document_info(&pdf_upload("doc.pdf", &[&["a"], &["b"], &["c"]]))
        .expect("inspect");
    assert_eq!(info.page_count, 3);
    assert!(!info.encrypted);
    assert_eq!(service.job_count().await, 0);
}
