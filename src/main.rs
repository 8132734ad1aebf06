use clap::Parser;
use modstore::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    run(Cli::parse())
}
