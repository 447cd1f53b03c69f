use anyhow::Result;
use gcouple::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    gcouple::logging::init(cli.common.verbose)?;
    cli.execute()
}
