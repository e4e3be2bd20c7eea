use clap::Parser;
use goose_listen::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = goose_listen::app::run(cli) {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code().unwrap_or(1));
    }
}
