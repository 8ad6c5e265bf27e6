use std::path::PathBuf;

/// Arguments for the parse command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct ParseArgs {
    /// Compiler log to analyze
    pub log_file: PathBuf,

    /// Output path for the JSON report (None = derived from the log file name)
    pub output: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,

    /// Write compact JSON instead of pretty-printed
    pub compact: bool,
}
