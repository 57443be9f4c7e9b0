//! Container extension checks.

use secondsight::{SUPPORTED_FORMATS, SecondSightError, ensure_supported, is_supported_video_format};

#[test]
fn every_listed_format_is_accepted() {
    for extension in SUPPORTED_FORMATS {
        let name = format!("clip{extension}");
        assert!(is_supported_video_format(&name), "{name}");
    }
}

#[test]
fn extension_match_ignores_case() {
    assert!(is_supported_video_format("HOLIDAY.MOV"));
    assert!(is_supported_video_format("dir.with.dots/clip.Mkv"));
}

#[test]
fn unknown_or_missing_extension() {
    assert!(!is_supported_video_format("clip.webm"));
    assert!(!is_supported_video_format("clip.mp4.txt"));
    assert!(!is_supported_video_format("clip"));
}

#[test]
fn ensure_supported_names_the_extension() {
    assert!(ensure_supported("a.m4v").is_ok());

    match ensure_supported("a.WEBM") {
        Err(SecondSightError::UnsupportedFormat(extension)) => assert_eq!(extension, ".webm"),
        other => panic!("unexpected {other:?}"),
    }
    match ensure_supported("no_extension") {
        Err(SecondSightError::UnsupportedFormat(extension)) => assert_eq!(extension, "(none)"),
        other => panic!("unexpected {other:?}"),
    }
}
