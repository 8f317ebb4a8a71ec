//! Terminal client that edits the compare selection and runs comparisons
//! against a running dtrees server.

use std::path::PathBuf;

use dtrees::{
    catalog::DatasetId,
    identity,
    logging::{self, LogOptions},
    orchestrator::{CompareResult, HttpBackend, Orchestrator},
    selection::{JsonFileKv, MAX_MASK, SelectionModel},
};

const DEFAULT_SERVER: &str = "http://127.0.0.1:3000";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(LogOptions {
        prefix: "dtrees-compare",
        console: false,
    }) {
        eprintln!("Logging disabled: {err}");
    }
    let kv = match &options.store_path {
        Some(path) => JsonFileKv::open(path),
        None => JsonFileKv::open_default(),
    }
    .map_err(|err| format!("Failed to open selection cache: {err}"))?;
    let selection = SelectionModel::load(kv, options.dataset);
    let mut orchestrator = Orchestrator::new(selection, HttpBackend::new(&options.server));

    match options.command {
        Command::List => print_selection(&orchestrator),
        Command::History => {
            let count = orchestrator
                .refresh_history()
                .map_err(|err| format!("Failed to load history: {}", err.message))?;
            for run in orchestrator.history() {
                println!(
                    "{}  {:<14} {:>7.2}%  {}",
                    run.run_id,
                    run.model.as_str(),
                    run.accuracy * 100.0,
                    run.name.as_deref().map(identity::display_name).unwrap_or_default()
                );
            }
            println!("{count} run(s).");
        }
        Command::Add(run_id) => {
            orchestrator
                .refresh_history()
                .map_err(|err| format!("Failed to load history: {}", err.message))?;
            let model = orchestrator
                .history()
                .iter()
                .find(|run| run.run_id == run_id)
                .map(|run| run.model)
                .ok_or_else(|| format!("Run {run_id} not found for {}", options.dataset))?;
            if !orchestrator.selection_mut().add_model(&run_id, model) {
                return Err(format!("Run {run_id} is already selected"));
            }
            print_selection(&orchestrator);
        }
        Command::AddAll => {
            orchestrator
                .refresh_history()
                .map_err(|err| format!("Failed to load history: {}", err.message))?;
            orchestrator.add_all_models();
            print_selection(&orchestrator);
        }
        Command::Remove(slot) => {
            let id = slot_id(&orchestrator, &slot)?;
            if !orchestrator.selection_mut().remove_model(&id) {
                return Err(format!("Slot {slot} cannot be removed"));
            }
            print_selection(&orchestrator);
        }
        Command::Clear => {
            orchestrator.selection_mut().clear_all_models();
            print_selection(&orchestrator);
        }
        Command::Params(assignments) => {
            for assignment in &assignments {
                apply_param(&mut orchestrator, assignment)?;
            }
            print_selection(&orchestrator);
        }
        Command::ResetParams => {
            orchestrator.selection_mut().reset_params();
            print_selection(&orchestrator);
        }
        Command::Run => {
            let duplicates = orchestrator.selection().duplicate_run_ids();
            if !duplicates.is_empty() {
                return Err(format!("Duplicate runs selected: {}", duplicates.join(", ")));
            }
            if !orchestrator.run_compare() {
                return Err("Select at least one run first".to_string());
            }
            if let Some(err) = orchestrator.error() {
                let mut message = format!("{}: {}", err.code, err.message);
                if let Some(details) = &err.details {
                    message.push_str(&format!("\n{details}"));
                }
                return Err(message);
            }
            if let Some(result) = orchestrator.result() {
                print_result(result, options.server.trim_end_matches('/'));
            }
        }
    }
    Ok(())
}

type Client = Orchestrator<JsonFileKv, HttpBackend>;

fn print_selection(orchestrator: &Client) {
    let selection = orchestrator.selection();
    println!("Dataset: {}", selection.dataset());
    for (idx, slot) in selection.entries().iter().enumerate() {
        let model = slot.model_type.map(|model| model.as_str()).unwrap_or("-");
        let run = slot.run_id.as_deref().unwrap_or("(empty)");
        println!("  {:>2}. {:<14} {}", idx + 1, model, run);
    }
    let params = selection.params();
    println!(
        "mask={} impute={} sequence={}",
        params.mask, params.impute, params.sequence
    );
    let duplicates = selection.duplicate_run_ids();
    if !duplicates.is_empty() {
        println!("Duplicates: {}", duplicates.join(", "));
    }
}

fn print_result(result: &CompareResult, server: &str) {
    println!("Comparison {}", result.compare_id());
    match result {
        CompareResult::Flat { models, .. } => {
            for model in models {
                println!(
                    "  {} {:<14} train {:>6.2}%  compare {:>6.2}%",
                    model.run_id,
                    model.model.as_str(),
                    model.train_accuracy * 100.0,
                    model.compare_accuracy * 100.0
                );
            }
        }
        CompareResult::Sequence { results, .. } => {
            let mut masks = results.keys().collect::<Vec<_>>();
            masks.sort_by_key(|mask| mask.parse::<u32>().unwrap_or(u32::MAX));
            for mask in masks {
                println!("  mask {mask}%");
                for point in &results[mask].models {
                    println!(
                        "    {} {:<14} {:>6.2}%",
                        point.run_id,
                        point.model.as_str(),
                        point.accuracy * 100.0
                    );
                }
            }
        }
    }
    for image in result.images() {
        println!("  {server}{image}");
    }
}

/// Resolve a 1-based slot number or a slot id.
fn slot_id(orchestrator: &Client, slot: &str) -> Result<String, String> {
    let entries = orchestrator.selection().entries();
    if let Ok(number) = slot.parse::<usize>()
        && let Some(entry) = number.checked_sub(1).and_then(|idx| entries.get(idx))
    {
        return Ok(entry.id.clone());
    }
    entries
        .iter()
        .find(|entry| entry.id == slot)
        .map(|entry| entry.id.clone())
        .ok_or_else(|| format!("No slot {slot}"))
}

fn apply_param(orchestrator: &mut Client, assignment: &str) -> Result<(), String> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Expected key=value, got {assignment}"))?;
    match key {
        "mask" => {
            let mask = value
                .parse::<u32>()
                .ok()
                .filter(|mask| *mask <= MAX_MASK)
                .ok_or_else(|| format!("mask must be between 0 and {MAX_MASK}, got {value}"))?;
            orchestrator.selection_mut().set_params(|params| params.mask = mask);
        }
        "impute" => {
            let impute = parse_bool(value)?;
            orchestrator
                .selection_mut()
                .set_params(|params| params.impute = impute);
        }
        "sequence" => {
            let sequence = parse_bool(value)?;
            orchestrator
                .selection_mut()
                .set_params(|params| params.sequence = sequence);
        }
        other => return Err(format!("Unknown parameter: {other}")),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("Expected a boolean, got {other}")),
    }
}

enum Command {
    List,
    History,
    Add(String),
    AddAll,
    Remove(String),
    Clear,
    Params(Vec<String>),
    ResetParams,
    Run,
}

struct Options {
    server: String,
    dataset: DatasetId,
    store_path: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut server = DEFAULT_SERVER.to_string();
    let mut dataset = DatasetId::Iris;
    let mut store_path = None;
    let mut rest = Vec::new();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--server" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--server requires a value".to_string())?;
                server = value.to_string();
            }
            "--dataset" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = value.parse().map_err(|err| format!("{err}"))?;
            }
            "--store" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--store requires a value".to_string())?;
                store_path = Some(PathBuf::from(value));
            }
            _ => rest.push(args[idx].clone()),
        }
        idx += 1;
    }

    let mut rest = rest.into_iter();
    let command = match rest.next().as_deref() {
        None | Some("list") => Command::List,
        Some("history") => Command::History,
        Some("add") => Command::Add(
            rest.next()
                .ok_or_else(|| "add requires a run ID".to_string())?,
        ),
        Some("add-all") => Command::AddAll,
        Some("remove") => Command::Remove(
            rest.next()
                .ok_or_else(|| "remove requires a slot".to_string())?,
        ),
        Some("clear") => Command::Clear,
        Some("params") => Command::Params(rest.by_ref().collect()),
        Some("reset-params") => Command::ResetParams,
        Some("run") => Command::Run,
        Some(unknown) => {
            return Err(format!("Unknown command: {unknown}\n\n{}", help_text()));
        }
    };
    if let Some(extra) = rest.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }
    Ok(Some(Options {
        server,
        dataset,
        store_path,
        command,
    }))
}

fn help_text() -> String {
    [
        "dtrees-compare",
        "",
        "Edits the compare selection and runs comparisons on a dtrees server.",
        "",
        "Usage:",
        "  dtrees-compare [options] <command>",
        "",
        "Commands:",
        "  list                      Show the selection (default).",
        "  history                   List training runs of the dataset.",
        "  add <runId>               Select a run.",
        "  add-all                   Select every run of the dataset.",
        "  remove <slot>             Remove a slot by number or id.",
        "  clear                     Drop every selected run.",
        "  params key=value...       Set mask=<0-100>, impute=<bool>, sequence=<bool>.",
        "  reset-params              Restore default parameters.",
        "  run                       Compare the selected runs.",
        "",
        "Options:",
        "  --server <url>    Panel server (default http://127.0.0.1:3000).",
        "  --dataset <name>  Iris or Income (default Iris).",
        "  --store <path>    Selection cache file (defaults to the app data location).",
    ]
    .join("\n")
}
