use clap::{Parser, Subcommand};

/// Live election results: shows, records and synchronizes the results of every seat.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON configuration: where the shared document lives, where to keep the local
    /// backup and who may change the results.
    #[clap(short, long, value_parser, default_value = "livetally.json")]
    pub config: String,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Loads the latest results and prints the summary of every seat.
    Show {
        /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
        /// location.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference file containing a summary in JSON format. If provided, livetally will
        /// check that the summary matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Records the results of one center.
    Enter {
        #[clap(long, value_parser)]
        seat: String,
        #[clap(long, value_parser)]
        center: u32,
        /// (candidate id=votes, repeated) The votes of each candidate. Candidates not listed get zero votes.
        #[clap(long, value_parser)]
        vote: Vec<String>,
        #[clap(long, value_parser, default_value_t = 0, allow_hyphen_values = true)]
        invalid: i64,
        #[clap(short, long, value_parser)]
        user: Option<String>,
        #[clap(short, long, value_parser)]
        password: Option<String>,
    },
    /// Puts back the built-in dataset, with nothing reported.
    Reset {
        #[clap(short, long, value_parser)]
        user: Option<String>,
        #[clap(short, long, value_parser)]
        password: Option<String>,
    },
    /// Keeps refreshing the results and prints the sync status until Ctrl-C.
    Watch,
}
