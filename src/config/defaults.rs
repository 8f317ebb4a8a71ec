use std::path::PathBuf;

pub(super) const MIN_TIMEOUT_SECS: u64 = 1;

pub(super) fn default_output_root() -> PathBuf {
    PathBuf::from("public").join("output")
}

pub(super) fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

pub(super) fn default_scripts_dir() -> PathBuf {
    PathBuf::from("..")
}

pub(super) fn default_interpreter() -> String {
    "python".to_string()
}

pub(super) fn default_interpreter_args() -> Vec<String> {
    vec!["-W".to_string(), "ignore".to_string()]
}

pub(super) fn default_train_timeout_secs() -> u64 {
    300
}

pub(super) fn default_compare_timeout_secs() -> u64 {
    600
}
