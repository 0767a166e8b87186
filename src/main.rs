//! # nh3harvest
//!
//! Command-line front end for the ammonia/amine data harvest.
//!
//! ## Usage
//!
//! ```bash
//! # Merge hourly logs into one master table
//! nh3harvest merge -i logs/ -s 06-02-2022_0900 -e 06-02-2022_2200 -o out/
//!
//! # Reduce a master table (window read from its file name)
//! nh3harvest reduce out/NH306-02-2022_0900-06-02-2022_2200.txt -o out/
//!
//! # Both stages, settings from a config file
//! nh3harvest -v run -i logs/ --config nh3harvest.toml -o out/
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
