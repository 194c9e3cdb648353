use anyhow::Result;
use clap::Parser;
use hashbench::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
