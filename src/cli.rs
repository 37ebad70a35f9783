use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "termexam", version, about = "Take timed exams from the terminal")]
pub struct Cli {
    /// Config file [default: platform config dir]
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Exam service base URL [env: TERMEXAM_BASE_URL]
    #[arg(long, global = true, value_name = "url")]
    pub base_url: Option<String>,

    /// Bearer token sent with every request [env: TERMEXAM_TOKEN]
    #[arg(long, global = true, value_name = "token")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start or resume an exam attempt
    Take {
        /// Exam identifier
        exam_id: String,
    },
    /// List published exams and where you stand on each
    Exams,
    /// List your results
    Results,
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}
