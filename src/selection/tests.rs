use super::*;

fn run(run_id: &str, model: ModelKind, dataset: DatasetId, name: Option<&str>) -> HistoryEntry {
    HistoryEntry {
        run_id: run_id.to_string(),
        model,
        dataset,
        accuracy: 0.9,
        timestamp: run_id.parse().unwrap(),
        name: name.map(str::to_string),
    }
}

fn empty_slots<S: KeyValueStore>(model: &SelectionModel<S>) -> usize {
    model.entries().iter().filter(|entry| entry.is_empty()).count()
}

fn fresh() -> SelectionModel<MemoryKv> {
    SelectionModel::load(MemoryKv::new(), DatasetId::Iris)
}

#[test]
fn fresh_selection_has_one_empty_slot() {
    let model = fresh();
    assert_eq!(model.entries().len(), 1);
    assert_eq!(empty_slots(&model), 1);
    assert!(!model.can_compare());
}

#[test]
fn every_mutation_keeps_exactly_one_empty_slot() {
    let mut model = fresh();
    let first = model.entries()[0].id.clone();
    model.update_model_type(&first, Some(ModelKind::Tree));
    assert_eq!(empty_slots(&model), 1);

    model.update_model_run(&first, Some("1700000000".into()));
    assert_eq!(model.entries().len(), 2);
    assert_eq!(empty_slots(&model), 1);

    let second = model.entries()[1].id.clone();
    model.update_model_run(&second, Some("1700000100".into()));
    assert_eq!(empty_slots(&model), 1);
    assert_eq!(model.entries().len(), 3);

    // Clearing a filled slot leaves it as the single empty one.
    model.update_model_type(&first, Some(ModelKind::Forest));
    assert_eq!(empty_slots(&model), 1);
    assert_eq!(model.entries()[0].id, first);
    assert_eq!(model.selected_run_ids(), ["1700000100"]);

    model.remove_model(&first);
    assert_eq!(empty_slots(&model), 1);
    assert_eq!(model.selected_run_ids(), ["1700000100"]);

    let last_empty = model
        .entries()
        .iter()
        .find(|entry| entry.is_empty())
        .unwrap()
        .id
        .clone();
    model.remove_model(&last_empty);
    assert_eq!(empty_slots(&model), 1);
    assert!(!model.remove_model("no-such-slot"));
    assert!(!model.update_model_run("no-such-slot", None));
}

#[test]
fn add_model_is_idempotent_and_appends_after_filled_slots() {
    let mut model = fresh();
    assert!(model.add_model("1700000000", ModelKind::Tree));
    assert!(model.add_model("1700000100", ModelKind::Forest));
    assert!(!model.add_model("1700000000", ModelKind::Tree));
    assert_eq!(model.selected_run_ids(), ["1700000000", "1700000100"]);
    assert_eq!(model.entries().len(), 3);
    assert!(model.entries().last().unwrap().is_empty());
    assert!(model.can_compare());
}

#[test]
fn duplicates_block_comparison() {
    let mut model = fresh();
    model.add_model("1700000000", ModelKind::Tree);
    let empty = model
        .entries()
        .iter()
        .find(|entry| entry.is_empty())
        .unwrap()
        .id
        .clone();
    model.update_model_run(&empty, Some("1700000000".into()));
    assert_eq!(model.duplicate_run_ids(), ["1700000000"]);
    assert!(!model.can_compare());
    assert_eq!(empty_slots(&model), 1);
}

#[test]
fn add_all_models_orders_by_kind_then_named_first() {
    let history = [
        run("1700000005", ModelKind::Tree, DatasetId::Iris, None),
        run("1700000004", ModelKind::Forest, DatasetId::Iris, None),
        run("1700000003", ModelKind::Tree, DatasetId::Iris, Some("zeta")),
        run("1700000002", ModelKind::Tree, DatasetId::Iris, Some("alpha")),
        run("1700000001", ModelKind::Tree, DatasetId::Iris, None),
        run("1700000009", ModelKind::Gradient, DatasetId::Income, None),
    ];
    let mut model = fresh();
    model.add_model("1700000099", ModelKind::HistGradient);
    model.add_all_models(&history);
    assert_eq!(
        model.selected_run_ids(),
        [
            "1700000004",
            "1700000002",
            "1700000003",
            "1700000001",
            "1700000005"
        ]
    );
    assert_eq!(empty_slots(&model), 1);
}

#[test]
fn clear_and_replace_reset_the_list() {
    let mut model = fresh();
    model.add_model("1700000000", ModelKind::Tree);
    model.clear_all_models();
    assert_eq!(model.entries().len(), 1);
    assert_eq!(empty_slots(&model), 1);

    model.replace_with([
        ("1700000001".to_string(), ModelKind::Tree),
        ("1700000002".to_string(), ModelKind::Forest),
        ("1700000001".to_string(), ModelKind::Tree),
    ]);
    assert_eq!(model.selected_run_ids(), ["1700000001", "1700000002"]);
    assert_eq!(empty_slots(&model), 1);
}

#[test]
fn selection_and_params_persist_per_dataset() {
    let mut model = fresh();
    model.add_model("1700000000", ModelKind::Tree);
    model.set_params(|params| {
        params.mask = 30;
        params.impute = true;
    });

    model.switch_dataset(DatasetId::Income);
    assert!(!model.can_compare());
    assert_eq!(model.params(), &CompareParams::default());
    model.add_model("1700000200", ModelKind::Gradient);

    model.switch_dataset(DatasetId::Iris);
    assert_eq!(model.selected_run_ids(), ["1700000000"]);
    assert_eq!(model.params().mask, 30);

    let reloaded = SelectionModel::load(model.store().clone(), DatasetId::Income);
    assert_eq!(reloaded.selected_run_ids(), ["1700000200"]);

    model.reset_params();
    assert_eq!(model.params(), &CompareParams::default());
}

#[test]
fn cached_state_is_normalized_on_load() {
    let mut kv = MemoryKv::new();
    kv.set(
        "compare_models_Iris",
        r#"[{"id":"a","modelType":"tree","runId":"1700000000"},
            {"id":"b","modelType":null,"runId":null},
            {"id":"c","modelType":null,"runId":null}]"#
            .to_string(),
    )
    .unwrap();
    kv.set("compare_params_Iris", r#"{"mask":20}"#.to_string())
        .unwrap();
    kv.set("compare_models_Income", "garbage".to_string()).unwrap();

    let model = SelectionModel::load(kv.clone(), DatasetId::Iris);
    let ids = model
        .entries()
        .iter()
        .map(|entry| entry.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["a", "c"]);
    assert_eq!(model.params().mask, 20);
    assert!(!model.params().sequence);

    let income = SelectionModel::load(kv, DatasetId::Income);
    assert_eq!(income.entries().len(), 1);
}
