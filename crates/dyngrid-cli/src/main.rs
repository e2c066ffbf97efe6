// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use dyngrid_api::Client;
use dyngrid_app::{AppCommand, AppState, LayoutStorage, MemoryLayoutStorage, TabSession};
use dyngrid_db::Store;
use env_logger::{Env, Target};
use runtime::ApiRuntime;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `dyngrid --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_path = init_logging(&config)?;
    log::info!(
        "dyngrid starting; backend {}, layout store {}, log {}",
        config.base_url(),
        db_path.display(),
        log_path.display()
    );

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    if options.demo {
        let runtime = ApiRuntime::new(client, MemoryLayoutStorage::new());
        return launch(runtime, TabSession::default(), &config, &options);
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or DYNGRID_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    for entry in store.entries("grid_")? {
        log::debug!(
            "stored {} ({} bytes, sha256 {}, updated {})",
            entry.key,
            entry.size_bytes,
            entry.sha256,
            entry.updated_at
        );
    }
    let session = store.load_session()?;
    launch(ApiRuntime::new(client, store), session, &config, &options)
}

fn launch<S: LayoutStorage>(
    mut runtime: ApiRuntime<S>,
    session: TabSession,
    config: &Config,
    options: &CliOptions,
) -> Result<()> {
    let table = resolve_table(options.table.as_deref(), &session, config.default_table())?;
    let mut state = AppState::from_session(&session, &table);
    if options.table.is_some() && state.active_table() != table {
        state.dispatch(AppCommand::OpenTable(table.clone()));
    }

    if options.check_only {
        let fields = dyngrid_tui::GridRuntime::load_fields(&mut runtime, state.active_table())
            .with_context(|| format!("check backend for table {}", state.active_table()))?;
        log::info!(
            "check passed: {} reports {} fields",
            state.active_table(),
            fields.len()
        );
        return Ok(());
    }

    dyngrid_tui::run_app(&mut state, &mut runtime, config.ui_options())
}

/// `--table` wins, then the restored session, then `[ui].default_table`.
fn resolve_table(
    flag: Option<&str>,
    session: &TabSession,
    configured: Option<&str>,
) -> Result<String> {
    let restored = session
        .tabs
        .iter()
        .any(|tab| tab.tag == session.active)
        .then_some(session.active.as_str());
    flag.map(str::trim)
        .filter(|table| !table.is_empty())
        .or(restored)
        .or(configured)
        .map(str::to_owned)
        .ok_or_else(|| {
            anyhow!("no table to open -- pass --table <name> or set [ui].default_table in the config")
        })
}

/// Routes log output to a file; the terminal belongs to the TUI.
fn init_logging(config: &Config) -> Result<PathBuf> {
    let path = config.log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                path.display()
            )
        })?;
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_secs()
        .try_init()
        .context("initialize logging")?;
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    table: Option<String>,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        table: None,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--table" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--table requires a table name"))?;
                options.table = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("dyngrid: terminal client for a dynamic grid backend");
    println!("  --config <path>          Use a specific config path");
    println!("  --table <name>           Open this table (adds a tab if needed)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved layout database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Keep layout state in memory only");
    println!("  --check                  Validate config, database and backend, then exit");
    println!("  --help                   Show this help");
}
