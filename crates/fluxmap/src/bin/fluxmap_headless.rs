use std::env;
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::info;

use fluxmap::{
    collect_region_nodes, format_clock, format_offset, Dashboard, DashboardConfig, FetchLoop,
    HttpTrafficFeed,
};

const ENGINE_TURN_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct CliOptions {
    config_path: Option<String>,
    url: Option<String>,
    interval_ms: Option<u64>,
    offset_secs: u64,
    once: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw_args: Vec<String> = env::args().skip(1).collect();
    if raw_args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return;
    }

    let options = match parse_options(raw_args.iter().map(|arg| arg.as_str())) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            print_help();
            process::exit(1);
        }
    };

    if let Err(err) = run_headless(options) {
        eprintln!("fluxmap_headless failed: {err}");
        process::exit(1);
    }
}

fn run_headless(options: CliOptions) -> Result<(), String> {
    let mut config = match (&options.url, &options.config_path) {
        (Some(url), _) => DashboardConfig::new(url.clone()),
        (None, Some(path)) => {
            DashboardConfig::from_config_file(Path::new(path)).map_err(|err| err.to_string())?
        }
        (None, None) => DashboardConfig::from_default_sources().map_err(|err| err.to_string())?,
    };
    if let Some(interval_ms) = options.interval_ms {
        config.poll_interval_ms = interval_ms;
    }

    let offset_ms = options.offset_secs.saturating_mul(1000);
    if offset_ms > config.max_replay_offset_ms() {
        return Err(format!(
            "--offset exceeds the replayable window of {} seconds",
            config.max_replay_offset_secs
        ));
    }

    // A fetch that outlives its poll slot is already stale.
    let feed = HttpTrafficFeed::new(config.update_url.clone(), config.poll_interval())
        .map_err(|err| format!("failed to build http feed: {err}"))?;

    let mut dashboard = Dashboard::new(config.clone());
    if offset_ms > 0 {
        dashboard.change_offset(offset_ms);
    }
    dashboard.attach_poll(FetchLoop::spawn(feed, config.poll_interval()));

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|err| format!("failed to install signal handler: {err}"))?;

    println!("fluxmap headless monitor ready.");
    println!("- update url: {}", config.update_url);
    println!("- poll interval: {}ms", config.poll_interval_ms);
    if offset_ms > 0 {
        println!("- replay offset: {}", format_offset(offset_ms));
    }
    println!("Press Ctrl+C to stop.");

    while running.load(Ordering::SeqCst) {
        let events = dashboard.run_once(Duration::from_millis(ENGINE_TURN_MS));
        if events.traffic_changed {
            log_traffic_summary(&dashboard);
            if options.once {
                break;
            }
        }
    }

    Ok(())
}

fn log_traffic_summary(dashboard: &Dashboard) {
    let store = dashboard.traffic();
    let snapshot = store.traffic();
    let regions = collect_region_nodes(snapshot);
    info!(
        "{}: {} regions, {} nodes, {} connections (server time {}, history for {} regions)",
        snapshot.name,
        regions.len(),
        snapshot.nodes.len(),
        snapshot.connections.len(),
        format_clock(store.last_updated_server_time()),
        store.region_names().len(),
    );
}

fn parse_options<'a>(args: impl Iterator<Item = &'a str>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.peekable();

    while let Some(arg) = iter.next() {
        match arg {
            "--config" => {
                options.config_path = Some(parse_required_value(&mut iter, "--config")?);
            }
            "--url" => {
                options.url = Some(parse_required_value(&mut iter, "--url")?);
            }
            "--interval-ms" => {
                let raw = parse_required_value(&mut iter, "--interval-ms")?;
                options.interval_ms = Some(
                    raw.parse::<u64>()
                        .ok()
                        .filter(|value| *value > 0)
                        .ok_or_else(|| "--interval-ms requires a positive integer".to_string())?,
                );
            }
            "--offset" => {
                let raw = parse_required_value(&mut iter, "--offset")?;
                options.offset_secs = raw
                    .parse::<u64>()
                    .map_err(|_| "--offset requires whole seconds".to_string())?;
            }
            "--once" => {
                options.once = true;
            }
            _ => return Err(format!("unknown option: {arg}")),
        }
    }

    Ok(options)
}

fn parse_required_value<'a, I>(
    iter: &mut std::iter::Peekable<I>,
    flag: &str,
) -> Result<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let Some(value) = iter.next() else {
        return Err(format!("{flag} requires a value"));
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{flag} requires a non-empty value"));
    }
    Ok(value.to_string())
}

fn print_help() {
    println!(
        "Usage: fluxmap_headless [options]\n\n\
Polls a traffic endpoint and logs graph updates without a renderer.\n\n\
Options:\n\
  --config <path>       read configuration from a TOML file (default: fluxmap.toml if present)\n\
  --url <url>           traffic endpoint, overriding config and environment\n\
  --interval-ms <n>     poll interval in milliseconds\n\
  --offset <secs>       start replaying this many seconds in the past\n\
  --once                exit after the first traffic update\n\
  -h, --help            show help"
    );
}
