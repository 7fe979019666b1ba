//! Exception translation and warning delivery through image reads

#![cfg(feature = "bundled")]

mod common;

use std::sync::{Arc, Mutex};

use magick_interop::{
    CancellationToken, Error, ExceptionKind, MagickImage, MagickImageCollection, ReadSettings,
    Severity, Unstoppable,
};
use pretty_assertions::assert_eq;

#[test]
fn test_corrupt_jpeg_raises_error_with_ordered_warnings() {
    let err = MagickImage::read(&common::invalid_jpeg()).unwrap_err();
    let exception = err.as_magick().expect("native error");

    assert!(exception.is_error());
    assert_eq!(exception.severity, Severity::CORRUPT_IMAGE_ERROR);
    assert_eq!(exception.severity.kind(), ExceptionKind::CorruptImage);
    assert_eq!(exception.message, "Invalid SOS parameters for sequential JPEG");

    // Emission order is part of the contract
    let related: Vec<_> = exception.related.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        related,
        vec![
            "Corrupt JPEG data: 3 extraneous bytes before marker 0xdb",
            "Corrupt JPEG data: 2 extraneous bytes before marker 0xda",
        ]
    );
    assert!(exception.related.iter().all(|e| e.is_warning()));
}

#[test]
fn test_error_display_and_json() {
    let err = MagickImage::read(&common::invalid_jpeg()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "CorruptImageError: Invalid SOS parameters for sequential JPEG"
    );

    let json: serde_json::Value =
        serde_json::from_str(&err.as_magick().unwrap().to_json().unwrap()).unwrap();
    assert_eq!(json["severity"], 425);
    assert_eq!(json["related"][1]["severity"], 325);
}

#[test]
fn test_not_a_jpeg_has_no_related() {
    let mut data = vec![0x00, 0x01];
    data.extend_from_slice(b"not an image");
    let settings = ReadSettings::new().with_format("jpeg");
    let err = MagickImage::read_blob(&data, &settings).unwrap_err();
    let exception = err.as_magick().unwrap();
    assert_eq!(exception.severity, Severity::CORRUPT_IMAGE_ERROR);
    assert!(exception.message.starts_with("Not a JPEG file"));
    assert!(exception.related.is_empty());
}

#[test]
fn test_warning_does_not_abort_read() {
    let image = MagickImage::read(&common::jpeg_without_eoi()).unwrap();
    assert_eq!((image.width(), image.height()), (16, 8));

    let warnings = image.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::CORRUPT_IMAGE_WARNING);
    assert_eq!(warnings[0].message, "Premature end of JPEG file");
    assert!(image.take_warnings().is_empty());
}

#[test]
fn test_handler_receives_warnings_instead_of_collecting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-eoi.jpg");
    std::fs::write(&path, common::jpeg_without_eoi()).unwrap();

    let mut collection = MagickImageCollection::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_handler = Arc::clone(&seen);
    collection.on_warning(move |w| seen_by_handler.lock().unwrap().push(w.message.clone()));

    collection
        .append_files(&[&path, &path], &ReadSettings::new(), &CancellationToken::new())
        .unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["Premature end of JPEG file", "Premature end of JPEG file"]
    );
    assert!(collection.take_warnings().is_empty());
}

#[test]
fn test_every_warning_of_one_read_is_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two-warnings.jpg");
    std::fs::write(&path, common::jpeg_with_two_warnings()).unwrap();

    let mut collection = MagickImageCollection::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_handler = Arc::clone(&seen);
    collection.on_warning(move |w| seen_by_handler.lock().unwrap().push(w.message.clone()));
    collection.append_files(&[&path], &ReadSettings::new(), &Unstoppable).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "Corrupt JPEG data: 2 extraneous bytes before marker 0xc0",
            "Premature end of JPEG file",
        ]
    );

    let image = MagickImage::read(&common::jpeg_with_two_warnings()).unwrap();
    let warnings = image.take_warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.related.is_empty()));
}

#[test]
fn test_handler_registered_before_read_sees_read_warnings() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_handler = Arc::clone(&seen);
    let image = MagickImage::read_blob_with_handler(
        &common::jpeg_with_two_warnings(),
        &ReadSettings::new(),
        move |w| seen_by_handler.lock().unwrap().push(w.message.clone()),
    )
    .unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert!(image.take_warnings().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-eoi.jpg");
    std::fs::write(&path, common::jpeg_without_eoi()).unwrap();
    let seen_by_handler = Arc::clone(&seen);
    let image = MagickImage::read_file_with_handler(&path, &ReadSettings::new(), move |w| {
        seen_by_handler.lock().unwrap().push(w.message.clone())
    })
    .unwrap();
    assert_eq!(
        seen.lock().unwrap().last().map(String::as_str),
        Some("Premature end of JPEG file")
    );
    assert!(image.take_warnings().is_empty());
}

#[test]
fn test_two_warnings_lead_a_later_error_flat() {
    let dir = tempfile::tempdir().unwrap();
    let warn = dir.path().join("two-warnings.jpg");
    let fail = dir.path().join("invalid.jpg");
    std::fs::write(&warn, common::jpeg_with_two_warnings()).unwrap();
    std::fs::write(&fail, common::invalid_jpeg()).unwrap();

    let err = MagickImageCollection::read_files(&[&warn, &fail], &ReadSettings::new(), &Unstoppable)
        .unwrap_err();
    let related = &err.as_magick().unwrap().related;
    assert_eq!(related.len(), 4);
    assert_eq!(
        related[0].message,
        "Corrupt JPEG data: 2 extraneous bytes before marker 0xc0"
    );
    assert_eq!(related[1].message, "Premature end of JPEG file");
    assert!(related.iter().all(|e| e.related.is_empty()));
}

#[test]
fn test_earlier_warnings_lead_a_later_error() {
    let dir = tempfile::tempdir().unwrap();
    let warn = dir.path().join("no-eoi.jpg");
    let fail = dir.path().join("invalid.jpg");
    std::fs::write(&warn, common::jpeg_without_eoi()).unwrap();
    std::fs::write(&fail, common::invalid_jpeg()).unwrap();

    let err = MagickImageCollection::read_files(
        &[&warn, &fail],
        &ReadSettings::new(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    let related: Vec<_> = err
        .as_magick()
        .unwrap()
        .related
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        related,
        vec![
            "Premature end of JPEG file",
            "Corrupt JPEG data: 3 extraneous bytes before marker 0xdb",
            "Corrupt JPEG data: 2 extraneous bytes before marker 0xda",
        ]
    );
}

#[test]
fn test_pnm_trailing_data_warns() {
    let mut data = common::ppm(1, 1, [9, 9, 9]);
    data.extend_from_slice(b"\x00\x01");
    let image = MagickImage::read(&data).unwrap();
    let warnings = image.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].is_warning());
}

#[test]
fn test_truncated_pnm_is_error() {
    let mut data = common::ppm(4, 4, [9, 9, 9]);
    data.truncate(data.len() - 5);
    let err = MagickImage::read(&data).unwrap_err();
    assert_eq!(err.as_magick().unwrap().severity, Severity::CORRUPT_IMAGE_ERROR);
    assert_eq!(err.as_magick().unwrap().message, "insufficient image data in file");
}

#[test]
fn test_rejected_before_native_call() {
    let err = MagickImage::read_file("bad\0name.ppm", &ReadSettings::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}
