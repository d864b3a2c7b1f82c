//! End-to-end behavior of the filesystem safety gate and its envelope wire
//! shape.

use shepherd_core::envelope::ErrorKind;
use shepherd_core::ops;

#[test]
fn fresh_directory_produces_ok_envelope_with_resolved_path() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("empty").join("dir");

    let envelope = ops::prepare_clone(&target.to_string_lossy(), true);
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["ok"], serde_json::json!(true));
    let resolved = value["data"]["resolved_path"].as_str().unwrap();
    assert!(resolved.ends_with("empty/dir") || resolved.ends_with("empty\\dir"));
    assert_eq!(value["data"]["writable"], serde_json::json!(true));
    assert_eq!(value["data"]["total_entries"], serde_json::json!(0));
}

#[test]
fn inserting_a_file_flips_the_result_to_not_empty() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("workdir");

    assert!(ops::prepare_clone(&target.to_string_lossy(), true).is_ok());

    std::fs::write(target.join("surprise.txt"), b"contents").unwrap();

    let envelope = ops::prepare_clone(&target.to_string_lossy(), true);
    let error = envelope.error().expect("must be the failure branch");
    assert_eq!(error.code, ErrorKind::NotEmpty);

    let preview = error.details["entries_preview"].as_array().unwrap();
    assert!(preview.iter().any(|name| name == "surprise.txt"));
    assert_eq!(error.details["total_entries"], serde_json::json!(1));
}

#[test]
fn gate_never_deletes_preexisting_entries() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("occupied");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep.txt"), b"precious").unwrap();

    let envelope = ops::prepare_clone(&target.to_string_lossy(), true);
    assert!(!envelope.is_ok());

    // The rejected directory is untouched.
    let contents = std::fs::read_to_string(target.join("keep.txt")).unwrap();
    assert_eq!(contents, "precious");
}

#[test]
fn not_empty_envelope_round_trips_through_json() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("f"), b"").unwrap();

    let envelope = ops::prepare_clone(&temp.path().to_string_lossy(), true);
    let wire = serde_json::to_string(&envelope).unwrap();

    // The failure branch deserializes back into an equal record.
    let parsed: shepherd_core::Envelope<serde_json::Value> =
        serde_json::from_str(&wire).unwrap();
    assert!(!parsed.is_ok());
    assert_eq!(parsed.error().unwrap().code, ErrorKind::NotEmpty);
}
