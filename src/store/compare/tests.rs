use super::*;
use crate::store::{errors::StoreErrorKind, sidecar::ManifestSlice};
use std::collections::BTreeMap;
use tempfile::{TempDir, tempdir};

fn write_manifest(root: &Path, compare_id: &str, body: &str) -> PathBuf {
    let dir = root.join(COMPARE_DIR).join(compare_id);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(RUNTIME_FILE);
    fs::write(&path, body).unwrap();
    path
}

fn seeded() -> (TempDir, CompareStore) {
    let temp = tempdir().unwrap();
    let run_dir = temp.path().join("1700000000");
    fs::create_dir_all(&run_dir).unwrap();
    fs::write(run_dir.join(RUNTIME_FILE), r#"{"model":"tree","name":"baseline"}"#).unwrap();

    write_manifest(
        temp.path(),
        "1700001000",
        r#"{"compare_id":"1700001000","dataset":"Iris","mask":20,"impute":true,"name":null,
            "models":[{"runId":"1700000000","model":"tree"},{"runId":"1700000100","model":"forest"}]}"#,
    );
    write_manifest(
        temp.path(),
        "1700002000",
        r#"{"compare_id":"1700002000","dataset":"Income","mask":0,"impute":false,"name":"wide",
            "models":[{"runId":"1700000200","model":"gradient"}]}"#,
    );
    write_manifest(
        temp.path(),
        "1700003000",
        r#"{"dataset":"Iris","sequence":true,
            "models":{"10":{"models":[{"runId":"1700000100","model":"forest"},{"runId":"1700000000","model":"tree"}]},
                      "0":{"models":[{"runId":"1700000000","model":"tree","name":"old"}]}}}"#,
    );
    let store = CompareStore::new(temp.path());
    (temp, store)
}

#[test]
fn list_sorts_filters_and_enriches_names() {
    let (_temp, store) = seeded();
    let all = store.list(None).unwrap();
    let ids = all.iter().map(|run| run.compare_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, ["1700003000", "1700002000", "1700001000"]);

    let iris = store.list(Some(DatasetId::Iris)).unwrap();
    assert_eq!(iris.len(), 2);
    let flat = &iris[1];
    assert_eq!(flat.mask, 20);
    assert!(flat.impute);
    assert_eq!(flat.name, None);
    assert_eq!(flat.models[0].name.as_deref(), Some("baseline"));
    assert_eq!(flat.models[1].name, None);

    let income = store.list(Some(DatasetId::Income)).unwrap();
    assert_eq!(income[0].name.as_deref(), Some("wide"));
}

#[test]
fn sequence_refs_are_unique_in_mask_order() {
    let (_temp, store) = seeded();
    let runs = store.list(None).unwrap();
    let sequence = &runs[0];
    assert!(sequence.sequence);
    let refs = sequence
        .models
        .iter()
        .map(|model| (model.run_id.as_str(), model.name.as_deref()))
        .collect::<Vec<_>>();
    assert_eq!(
        refs,
        [("1700000000", Some("baseline")), ("1700000100", None)]
    );
}

#[test]
fn corrupt_and_missing_manifests_are_skipped() {
    let (temp, store) = seeded();
    write_manifest(temp.path(), "1700004000", "{ broken");
    write_manifest(temp.path(), "1700005000", r#"{"dataset":"Mnist","models":[]}"#);
    fs::create_dir_all(temp.path().join(COMPARE_DIR).join("1700006000")).unwrap();
    fs::create_dir_all(temp.path().join(COMPARE_DIR).join("notes")).unwrap();
    assert_eq!(store.list(None).unwrap().len(), 3);
}

#[test]
fn missing_compare_dir_lists_nothing() {
    let temp = tempdir().unwrap();
    let store = CompareStore::new(temp.path());
    assert!(store.list(None).unwrap().is_empty());
}

#[test]
fn rename_sets_and_clears_manifest_name() {
    let (temp, store) = seeded();
    let applied = store.rename("1700001000", Some("iris sweep")).unwrap();
    assert_eq!(applied.as_deref(), Some("iris_sweep"));
    let manifest = sidecar::read_compare_manifest(
        &temp
            .path()
            .join(COMPARE_DIR)
            .join("1700001000")
            .join(RUNTIME_FILE),
    )
    .unwrap();
    assert_eq!(manifest.name.as_deref(), Some("iris_sweep"));
    assert_eq!(manifest.mask, 20);

    assert_eq!(store.rename("1700001000", Some("")).unwrap(), None);
    assert_eq!(store.rename("1700002000", None).unwrap(), None);
    let listed = store.list(None).unwrap();
    assert!(listed.iter().all(|run| run.name.is_none()));
}

#[test]
fn rename_and_delete_report_failures() {
    let (temp, store) = seeded();
    let err = store.rename("abc", Some("x")).unwrap_err();
    assert_eq!(err.public_message(), "Invalid compare ID format");
    let err = store.rename("1700001000", Some("a/b")).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::InvalidName);
    let err = store.rename("1799999999", Some("x")).unwrap_err();
    assert_eq!(err.public_message(), "Compare run not found");

    fs::create_dir_all(temp.path().join(COMPARE_DIR).join("1700007000")).unwrap();
    let err = store.rename("1700007000", Some("x")).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
    assert_eq!(err.public_message(), "runtime.json not found");

    let err = store.delete("1799999999").unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
    store.delete("1700002000").unwrap();
    assert_eq!(store.list(None).unwrap().len(), 2);
}

#[test]
fn record_writes_only_when_absent() {
    let (temp, store) = seeded();
    let manifest = CompareManifest {
        compare_id: Some("1700008000".into()),
        dataset: DatasetId::Income,
        mask: 30,
        impute: true,
        sequence: false,
        name: None,
        models: ManifestModels::Flat(vec![ManifestModel {
            run_id: "1700000200".into(),
            model: ModelKind::Gradient,
            name: None,
        }]),
    };
    let id = RecordId::parse("1700008000").unwrap();
    assert!(store.record(&id, &manifest).unwrap());
    assert!(!store.record(&id, &manifest).unwrap());

    let existing = RecordId::parse("1700001000").unwrap();
    assert!(!store.record(&existing, &manifest).unwrap());
    let kept = sidecar::read_compare_manifest(
        &temp
            .path()
            .join(COMPARE_DIR)
            .join("1700001000")
            .join(RUNTIME_FILE),
    )
    .unwrap();
    assert_eq!(kept.dataset, DatasetId::Iris);

    let listed = store.list(Some(DatasetId::Income)).unwrap();
    assert_eq!(listed[0].compare_id, "1700008000");
    assert_eq!(listed[0].mask, 30);
}

#[test]
fn unique_refs_orders_masks_numerically() {
    let model = |run_id: &str| ManifestModel {
        run_id: run_id.into(),
        model: ModelKind::Tree,
        name: None,
    };
    let mut slices = BTreeMap::new();
    slices.insert(
        "100".to_string(),
        ManifestSlice {
            models: vec![model("1700000003")],
        },
    );
    slices.insert(
        "20".to_string(),
        ManifestSlice {
            models: vec![model("1700000002"), model("1700000001")],
        },
    );
    slices.insert(
        "0".to_string(),
        ManifestSlice {
            models: vec![model("1700000001")],
        },
    );
    let models = ManifestModels::ByMask(slices);
    let ids = unique_refs(&models)
        .into_iter()
        .map(|model| model.run_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["1700000001", "1700000002", "1700000003"]);
}

#[test]
fn images_use_compare_prefix() {
    let (temp, store) = seeded();
    fs::write(
        temp.path()
            .join(COMPARE_DIR)
            .join("1700001000")
            .join("accuracy.png"),
        b"",
    )
    .unwrap();
    assert_eq!(
        store.images("1700001000"),
        vec!["/output/compare/1700001000/accuracy.png"]
    );
    assert!(store.images("bad").is_empty());
}
