//! Entry point: parses CLI options, loads configuration, and starts one engine per
//! configured instrument plus the phase/tick loop. Grounded in
//! `original_source/project/app/src/main.cpp`'s parse-then-run shape: CLI failures and
//! `--help`/`--version` are handled before any engine is constructed.

mod app;
mod cli;
mod config;
mod logging;
mod mapping;

use app::App;
use cli::CommandOptions;
use std::sync::Arc;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let options = match CommandOptions::parse(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("failed to process arguments: {error}");
            eprintln!("{}", cli::help_message());
            std::process::exit(1);
        }
    };

    if options.help_requested {
        println!("{}", cli::help_message());
        return;
    }

    if options.version_requested {
        println!("venue {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    run(options);
}

fn run(options: CommandOptions) {
    let config_path = options
        .config_file_path
        .as_deref()
        .expect("config file path is a required option once help/version are ruled out");

    logging::init_logging();

    let config = match config::load(config_path) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(path = config_path, %error, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let worker_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let app = match App::build(config, worker_threads) {
        Ok(app) => app,
        Err(error) => {
            tracing::error!(%error, "failed to build application");
            std::process::exit(1);
        }
    };

    if let Err(error) = app.recover() {
        tracing::error!(%error, "failed to recover persisted state");
        std::process::exit(1);
    }

    let app = Arc::new(app);
    tracing::info!(
        instance_prefix = options.instance_prefix.as_deref().unwrap_or(""),
        instance_id = options.instance_id.as_deref().unwrap_or(""),
        instruments = app.repository.len(),
        "starting venue"
    );

    app.start();

    // No portable, dependency-free way to await a termination signal; the process
    // runs until killed externally. `App::persist` is exposed for callers (tests,
    // an eventual admin surface) that want an explicit snapshot instead.
    loop {
        std::thread::park();
    }
}
