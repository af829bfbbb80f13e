use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use wpaste_core::{PasteService, SweepReport};
use wpaste_server::{ServerConfig, WpasteServer};
use wpaste_store::EntryStore;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Sweep(args) => cmd_sweep(args).map(|_| ()),
        Command::Compact(args) => cmd_compact(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => {
            ServerConfig::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(ServerConfig::default()),
    }
}

fn resolve(args: &StoreArgs) -> anyhow::Result<ServerConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<EntryStore>> {
    let path = config.journal_path();
    let store = EntryStore::open(&path, config.sync_mode)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(store))
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = resolve(&args.store)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let server = WpasteServer::open(config.clone())?;
    println!(
        "{} wpaste on {} (data: {}, {} entries)",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        config.data_dir.display(),
        server.service().store().len(),
    );

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server.serve())?;
    println!("{} Stopped.", "✓".green());
    Ok(())
}

fn cmd_sweep(args: StoreArgs) -> anyhow::Result<SweepReport> {
    let config = resolve(&args)?;
    let service = PasteService::new(open_store(&config)?, config.paste.clone())?;
    let report = service.sweeper().sweep_once()?;

    println!(
        "{} Sweep: {} scanned, {} purged",
        "✓".green().bold(),
        report.scanned,
        report.purged.to_string().bold(),
    );
    if report.corrupt > 0 {
        println!(
            "  {} {} undecodable entries left in place",
            "warning:".yellow().bold(),
            report.corrupt
        );
    }
    Ok(report)
}

fn cmd_compact(args: StoreArgs) -> anyhow::Result<()> {
    let config = resolve(&args)?;
    let path = config.journal_path();
    let before = journal_len(&path);
    let store = open_store(&config)?;
    store.compact()?;
    let after = journal_len(&path);

    println!(
        "{} Compacted {}: {} entries, {} -> {} bytes",
        "✓".green().bold(),
        path.display(),
        store.len(),
        before,
        after.to_string().bold(),
    );
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn journal_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
