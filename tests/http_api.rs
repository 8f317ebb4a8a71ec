mod support;

use std::fs;

use axum::http::StatusCode;
use serde_json::json;
use support::panel::Panel;

fn seeded() -> Panel {
    let panel = Panel::new();
    panel.make_run("1700000000", "tree_Iris_0950000.id");
    panel.make_run("1700000100", "forest_Iris_0973333_best_forest.id");
    panel.make_run("1700000200", "gradient_Income_0850000.id");
    panel
}

#[tokio::test]
async fn health_reports_ok() {
    let panel = Panel::new();
    let (status, body) = panel.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn history_lists_and_filters_runs() {
    let panel = seeded();
    let (status, body) = panel.get("/history").await;
    assert_eq!(status, StatusCode::OK);
    let runs = body["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0]["runId"], "1700000200");
    assert_eq!(runs[1]["name"], "best_forest");

    let (_, body) = panel.get("/history?model=tree&dataset=Iris").await;
    assert_eq!(body["runs"].as_array().unwrap().len(), 1);

    let (status, body) = panel.get("/history?model=svm").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runs"], json!([]));
}

#[tokio::test]
async fn history_of_missing_root_is_empty() {
    let panel = Panel::new();
    fs::remove_dir_all(&panel.output).unwrap();
    let (status, body) = panel.get("/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runs"], json!([]));
}

#[tokio::test]
async fn delete_maps_store_errors_to_statuses() {
    let panel = seeded();
    let (status, body) = panel.delete("/history/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid run ID format");

    let (status, body) = panel.delete("/history/9999999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Run not found");

    let (status, body) = panel.delete("/history/1700000000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(!panel.output_path("1700000000").exists());
}

#[tokio::test]
async fn rename_updates_identity_and_rejects_bad_names() {
    let panel = seeded();
    let (status, body) = panel
        .post("/rename", json!({"runId": "1700000000", "name": "my tree"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "my_tree");
    assert!(
        panel
            .output_path("1700000000/tree_Iris_0950000_my_tree.id")
            .is_file()
    );

    let (status, _) = panel
        .post("/rename", json!({"runId": "1700000000", "name": "bad/name"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = panel.post_raw("/rename", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PARAMS");
}

#[tokio::test]
async fn images_and_artifacts_are_served() {
    let panel = seeded();
    fs::write(panel.output_path("1700000000/tree.png"), b"png").unwrap();
    let (_, body) = panel.get("/images?runId=1700000000").await;
    assert_eq!(body["images"], json!(["/output/1700000000/tree.png"]));

    let (status, bytes) = panel.get_bytes("/output/1700000000/tree.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"png");

    let (_, body) = panel.get("/images?runId=../etc").await;
    assert_eq!(body["images"], json!([]));
}

#[tokio::test]
async fn compare_runs_script_and_records_manifest() {
    let panel = seeded();
    let artifact_dir = panel.output_path("compare/1700009000");
    panel.write_script(
        "compare.py",
        &format!(
            "mkdir -p '{dir}'\ntouch '{dir}/accuracy.png'\necho \"comparing $*\"\n\
             echo '{{\"success\": true, \"compareId\": \"1700009000\", \"models\": [\
             {{\"runId\": \"1700000000\", \"model\": \"tree\", \"columns\": [1], \
             \"trainAccuracy\": 0.95, \"compareAccuracy\": 0.9}}]}}'\n",
            dir = artifact_dir.display()
        ),
    );

    let (status, body) = panel
        .post(
            "/compare",
            json!({"dataset": "Iris", "models": ["1700000000"], "mask": 20, "impute": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["compareId"], "1700009000");
    assert_eq!(
        body["data"]["images"],
        json!(["/output/compare/1700009000/accuracy.png"])
    );
    assert_eq!(body["data"]["models"][0]["compareAccuracy"], 0.9);

    let (_, body) = panel.get("/compare/history?dataset=Iris").await;
    let runs = body["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["mask"], 20);
    assert_eq!(runs[0]["impute"], true);
    assert_eq!(runs[0]["models"][0]["runId"], "1700000000");

    let (_, body) = panel.get("/compare/history?dataset=Income").await;
    assert_eq!(body["runs"], json!([]));

    let (status, body) = panel
        .post(
            "/compare/rename",
            json!({"compareId": "1700009000", "name": "masked"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "masked");

    let (status, _) = panel.delete("/compare/history/1700009000").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = panel.delete("/compare/history/1700009000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Compare run not found");
}

#[tokio::test]
async fn compare_failures_are_structured() {
    let panel = seeded();
    let (status, body) = panel
        .post("/compare", json!({"dataset": "Iris", "models": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PARAMS");

    let (status, body) = panel
        .post("/compare", json!({"dataset": "Iris", "models": ["1700000000"]}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "SCRIPT_NOT_FOUND");

    panel.write_script(
        "compare.py",
        "echo '{\"success\": false, \"error\": {\"message\": \"Mask too large\"}}'\n",
    );
    let (status, body) = panel
        .post("/compare", json!({"dataset": "Iris", "models": ["1700000000"]}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "SCRIPT_EXECUTION_ERROR");
    assert_eq!(body["error"]["message"], "Mask too large");
    assert_eq!(body["error"]["details"], "Unknown error");

    panel.write_script("compare.py", "echo 'nothing to report'\n");
    let (_, body) = panel
        .post("/compare", json!({"dataset": "Iris", "models": ["1700000000"]}))
        .await;
    assert_eq!(body["error"]["message"], "No JSON output from compare script");
}

#[tokio::test]
async fn out_of_range_mask_is_rejected_before_any_script_runs() {
    let panel = seeded();
    panel.write_script("compare.py", "touch compare-started\n");
    panel.write_script("train-tree.py", "touch train-started\n");

    let (status, body) = panel
        .post(
            "/compare",
            json!({"dataset": "Iris", "models": ["1700000000"], "mask": 250, "impute": true}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PARAMS");
    assert_eq!(body["error"]["message"], "mask must be between 0 and 100, got 250");

    let (status, body) = panel
        .post(
            "/train",
            json!({"dataset": "Iris", "model": "tree", "datasetParams": {"mask": 101}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PARAMS");

    assert!(!panel.scripts.join("compare-started").exists());
    assert!(!panel.scripts.join("train-started").exists());
}

#[tokio::test]
async fn train_normalizes_script_output() {
    let panel = Panel::new();
    panel.write_script(
        "train-tree.py",
        "echo 'fitting'\n\
         echo '{\"accuracy\": 0.9, \"classification_report\": {\
         \"setosa\": {\"precision\": 1.0, \"recall\": 1.0, \"f1-score\": 1.0, \"support\": 10},\
         \"accuracy\": 0.9,\
         \"macro avg\": {\"precision\": 0.9, \"recall\": 0.9, \"f1-score\": 0.9, \"support\": 30},\
         \"weighted avg\": {\"precision\": 0.9, \"recall\": 0.9, \"f1-score\": 0.9, \"support\": 30}}}'\n",
    );
    let (status, body) = panel
        .post(
            "/train",
            json!({"dataset": "Iris", "model": "tree", "datasetParams": {"mask": 0}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["accuracy"], 0.9);

    let (status, body) = panel
        .post("/train", json!({"dataset": "Iris", "model": "svm"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Unknown model: svm");
}
