use clap::Parser;

/// Builds per-leader demographic favorability reports from survey extracts.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the survey cycle: the input
    /// extracts, the report settings and the leaders to run.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path, 'stdout' or empty) If specified, the run summary will be
    /// written in JSON format to the given location instead of the standard
    /// output. The per-leader files still go to the configured directory.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided,
    /// demotrend will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
