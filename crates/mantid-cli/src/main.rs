//! `mantid-ads`: inspect saved workspace histories and exercise the data service

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mantid_ads::{AdsConfig, AnalysisDataService, HiddenFilter, NameOrder};
use mantid_history::{
    AlgorithmHistory, Direction, HistoryView, NexusFile, NexusGroup, PropertyHistory, WorkspaceHistory,
};
use mantid_workspace::{DataWorkspace, Workspace, WorkspaceGroup};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ENTRY_CLASS: &str = "NXentry";
const ENTRY_PREFIX: &str = "mantid_workspace_";

fn cli() -> Command {
    Command::new("mantid-ads")
        .version(mantid_ads::VERSION)
        .about("Analysis Data Service and workspace history tools")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with data service settings"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs and reports as JSON"),
        )
        .subcommand(
            Command::new("show")
                .about("Print the histories stored in a saved file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File written by `demo` or any history writer"),
                )
                .arg(
                    Arg::new("entry")
                        .long("entry")
                        .help("Only show this top-level entry"),
                )
                .arg(
                    Arg::new("unroll")
                        .long("unroll")
                        .action(ArgAction::SetTrue)
                        .help("Expand child algorithms"),
                )
                .arg(
                    Arg::new("since")
                        .long("since")
                        .value_parser(parse_date)
                        .help("Only algorithms started at or after this RFC 3339 time"),
                )
                .arg(
                    Arg::new("until")
                        .long("until")
                        .value_parser(parse_date)
                        .requires("since")
                        .help("Only algorithms started at or before this RFC 3339 time"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Register a small set of workspaces and save their histories")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to write the histories"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Hammer one data service from many threads")
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Number of worker threads"),
                )
                .arg(
                    Arg::new("ops")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(usize))
                        .help("Operations per worker"),
                ),
        )
}

fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("invalid time '{text}': {e}"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<AdsConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => AdsConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(AdsConfig::new()),
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let json = matches.get_flag("json");
    init_tracing(json);
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("show", args)) => show(args, json),
        Some(("demo", args)) => {
            let Some(output) = args.get_one::<PathBuf>("output") else {
                bail!("--output is required");
            };
            demo(config, output, json)
        }
        Some(("stress", args)) => {
            let threads = args.get_one::<usize>("threads").copied().unwrap_or(8);
            let ops = args.get_one::<usize>("ops").copied().unwrap_or(10_000);
            stress(config, threads, ops, json)
        }
        _ => Ok(()),
    }
}

fn show(args: &ArgMatches, json: bool) -> Result<()> {
    let Some(path) = args.get_one::<PathBuf>("file") else {
        bail!("no file given");
    };
    let file = NexusFile::open(path).with_context(|| format!("opening {}", path.display()))?;

    let entries: Vec<(String, &NexusGroup)> = match args.get_one::<String>("entry") {
        Some(name) => {
            let Some(group) = file.root().open_group(name) else {
                bail!("{} has no entry '{name}'", path.display());
            };
            vec![(name.clone(), group)]
        }
        None => file
            .root()
            .groups
            .iter()
            .filter(|(_, group)| group.class == ENTRY_CLASS)
            .map(|(name, group)| (name.clone(), group))
            .collect(),
    };
    if entries.is_empty() {
        warn!(path = %path.display(), "no workspace entries found");
    }

    let mut reports = Vec::new();
    for (name, entry) in entries {
        let mut history = WorkspaceHistory::new();
        history.load_nexus(entry);

        let mut view = history.create_view();
        if args.get_flag("unroll") {
            view.unroll_all();
        }
        if let Some(since) = args.get_one::<DateTime<Utc>>("since") {
            match args.get_one::<DateTime<Utc>>("until") {
                Some(until) => view.filter_between_exec_date(*since, *until),
                None => view.filter_since(*since),
            }
        }

        if json {
            reports.push(view_report(&name, &history, &view));
        } else {
            println!("{name}");
            println!("{}", history.environment());
            print_view(&view);
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

fn print_view(view: &HistoryView) {
    for item in view.algorithms() {
        let record = item.algorithm_history();
        let marker = match (item.child_count(), item.is_unrolled()) {
            (0, _) => ' ',
            (_, true) => '-',
            (_, false) => '+',
        };
        println!(
            "{indent}{marker} {name} v{version}  {date}  {duration:.3}s",
            indent = "  ".repeat(item.depth()),
            name = record.name(),
            version = record.version(),
            date = record.execution_date().format("%Y-%m-%d %H:%M:%S"),
            duration = record.execution_duration(),
        );
    }
}

fn view_report(name: &str, history: &WorkspaceHistory, view: &HistoryView) -> serde_json::Value {
    let algorithms: Vec<serde_json::Value> = view
        .algorithms()
        .iter()
        .map(|item| {
            let record = item.algorithm_history();
            let properties: serde_json::Map<String, serde_json::Value> = record
                .properties()
                .iter()
                .map(|p| (p.name().to_string(), serde_json::Value::from(p.value())))
                .collect();
            serde_json::json!({
                "name": record.name(),
                "version": record.version(),
                "depth": item.depth(),
                "execution_date": record.execution_date().to_rfc3339(),
                "duration_seconds": record.execution_duration(),
                "children": item.child_count(),
                "properties": properties,
            })
        })
        .collect();
    serde_json::json!({
        "entry": name,
        "records": history.size(),
        "environment": history.environment(),
        "algorithms": algorithms,
    })
}

fn demo(config: AdsConfig, output: &Path, json: bool) -> Result<()> {
    let ads = AnalysisDataService::new(config);
    let start = Utc::now();

    let raw: Arc<dyn Workspace> = Arc::new(DataWorkspace::new(vec![1.0, 2.0, 3.0]));
    raw.record_algorithm(
        AlgorithmHistory::new("Load", 1, start, 0.8).with_property(PropertyHistory::new(
            "Filename",
            "INTER00013460.nxs",
            "str",
            false,
            Direction::Input,
        )),
    );
    ads.add("raw", Arc::clone(&raw))?;

    let scaled: Arc<dyn Workspace> = Arc::new(DataWorkspace::new(vec![2.0, 4.0, 6.0]));
    mantid_workspace::merge_history_from(&*scaled, &*raw);
    let mut scale = AlgorithmHistory::new("Scale", 1, Utc::now(), 0.05)
        .with_property(PropertyHistory::new("InputWorkspace", "raw", "str", false, Direction::Input))
        .with_property(PropertyHistory::new("Factor", "2", "dbl", false, Direction::Input))
        .with_property(PropertyHistory::new("OutputWorkspace", "scaled", "str", false, Direction::Output));
    scale.add_child_history(AlgorithmHistory::new("Multiply", 1, Utc::now(), 0.01));
    scaled.record_algorithm(scale);
    ads.add_or_replace("scaled", Arc::clone(&scaled))?;

    let group = Arc::new(WorkspaceGroup::with_members(vec![
        Arc::clone(&raw),
        Arc::clone(&scaled),
    ]));
    ads.add("mygroup", group as Arc<dyn Workspace>)?;

    let names = ads.object_names(NameOrder::Sorted, HiddenFilter::Auto);
    let top: Vec<String> = ads.top_level_items().into_keys().collect();

    let mut file = NexusFile::new();
    let mut saved = Vec::new();
    for (index, name) in names.iter().enumerate() {
        let ws = ads.retrieve(name)?;
        if ws.as_group().is_some() {
            continue;
        }
        let entry = file
            .root_mut()
            .make_group(format!("{ENTRY_PREFIX}{}", index + 1), ENTRY_CLASS);
        entry.write_data("workspace_name", name.as_str());
        ws.history().save_nexus(entry);
        saved.push(name.clone());
    }
    file.save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), workspaces = saved.len(), "saved histories");

    if json {
        let report = serde_json::json!({
            "registered": names,
            "top_level": top,
            "saved": saved,
            "output": output.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Registered: {}", names.join(", "));
        println!("Top level:  {}", top.join(", "));
        println!("Saved {} histories to {}", saved.len(), output.display());
    }
    Ok(())
}

fn stress(config: AdsConfig, threads: usize, ops: usize, json: bool) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .context("building worker pool")?;
    let ads = AnalysisDataService::new(config);
    let started = Instant::now();

    let failures: usize = pool.install(|| {
        (0..threads.max(1))
            .into_par_iter()
            .map(|worker| {
                let mut failed = 0usize;
                for step in 0..ops {
                    let name = format!("w{worker}_{step}");
                    let ws: Arc<dyn Workspace> = Arc::new(DataWorkspace::new(vec![0.0; 4]));
                    let outcome = match step % 4 {
                        0 | 1 => ads.add(&name, ws),
                        2 => ads
                            .add(&name, ws)
                            .and_then(|()| ads.rename(&name, &format!("{name}_renamed"))),
                        _ => ads.add(&name, ws).map(|()| {
                            ads.remove(&name);
                        }),
                    };
                    if let Err(err) = outcome {
                        warn!(worker, step, error = %err, "operation failed");
                        failed += 1;
                    }
                }
                failed
            })
            .sum()
    });

    let elapsed = started.elapsed();
    let total = threads.max(1) * ops;
    let expected = total - total_removed(threads.max(1), ops);
    let consistent = ads.size() == expected && failures == 0;

    if json {
        let report = serde_json::json!({
            "threads": threads,
            "operations": total,
            "elapsed_ms": elapsed.as_millis(),
            "registered": ads.size(),
            "expected": expected,
            "failures": failures,
            "consistent": consistent,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Stress Test Report:");
        println!("  Threads: {threads}");
        println!("  Operations: {total}");
        println!("  Elapsed: {}ms", elapsed.as_millis());
        println!("  Registered: {} (expected {expected})", ads.size());
        println!("  Failures: {failures}");
        println!("  Consistent: {consistent}");
    }

    if !consistent {
        bail!("registry ended in an inconsistent state");
    }
    Ok(())
}

fn total_removed(workers: usize, ops: usize) -> usize {
    workers * (ops / 4)
}
