//! Entry point for the dtrees panel server.

use std::path::PathBuf;

use dtrees::{
    config,
    logging::{self, LogOptions},
    server,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(LogOptions {
        prefix: "dtrees",
        console: true,
    }) {
        eprintln!("Logging disabled: {err}");
    }

    let mut settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| format!("Failed to load config: {err}"))?;
    if let Some(bind) = options.bind {
        settings.bind_addr = bind;
    }
    if let Some(output) = options.output_root {
        settings.output_root = output;
    }
    if options.write_config {
        match &options.config_path {
            Some(path) => config::save_to_path(&settings, path),
            None => config::save(&settings),
        }
        .map_err(|err| format!("Failed to write config: {err}"))?;
        println!("Config written.");
        return Ok(());
    }

    server::serve(&settings, settings.socket_addr())
        .await
        .map_err(|err| format!("Server error: {err}"))
}

#[derive(Default)]
struct Options {
    config_path: Option<PathBuf>,
    bind: Option<String>,
    output_root: Option<PathBuf>,
    write_config: bool,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--bind" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bind requires a value".to_string())?;
                options.bind = Some(value.to_string());
            }
            "--output" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--output requires a value".to_string())?;
                options.output_root = Some(PathBuf::from(value));
            }
            "--write-config" => options.write_config = true,
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "dtrees",
        "",
        "Serves the training and comparison panel.",
        "",
        "Usage:",
        "  dtrees [--config <path>] [--bind <addr>] [--output <dir>] [--write-config]",
        "",
        "Options:",
        "  --config <path>   Config file (defaults to config.toml in the app data location).",
        "  --bind <addr>     Listen address, e.g. 127.0.0.1:3000.",
        "  --output <dir>    Root directory of training and compare artifacts.",
        "  --write-config    Save the effective settings to the config file and exit.",
    ]
    .join("\n")
}
