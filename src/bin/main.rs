use clap::Parser;

use slowion::{Cli, Config};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_filter())
        .init();

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("slowion: {e}");
            std::process::exit(1);
        }
    };

    log::info!(
        "slowion {}: {} position(s), {} channel(s) each, {} iteration(s)",
        env!("CARGO_PKG_VERSION"),
        config.opt.npos,
        config.opt.nchan,
        config.derived.iterations
    );

    if let Err(e) = slowion::runtime::run(config) {
        eprintln!("slowion: {e}");
        std::process::exit(1);
    }
}
