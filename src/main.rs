// Registration Analytics - CLI
// generate / import / export / report / series / check over the SQLite fact store

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use registration_analytics::{
    check_density, setup_tracing, write_csv, AnalyticsFacade, AppConfig, Dashboard, FactStore,
    Growth, ImportOutcome, InMemoryFactStore, LogFormat, SeriesKey, SqliteFactStore, SyntheticGenerator,
    VehicleCategory, VERSION,
};
use registration_analytics::filter::FilterParams;

#[derive(Parser, Debug)]
#[command(name = "regstats", version, about = "Vehicle registration growth analytics")]
struct Cli {
    /// Config file (defaults to ./regstats.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate synthetic monthly registrations as CSV
    Generate {
        #[arg(short, long, default_value = "vehicle_registration_data.csv")]
        output: PathBuf,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Also import the generated file into the database
        #[arg(long)]
        import: bool,

        /// Print a summary only, write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Import a registration CSV (skipped if the same file was imported before)
    Import { csv: PathBuf },

    /// Export every stored fact to CSV
    Export { csv: PathBuf },

    /// Dashboard for a filter window
    Report {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Month-by-month growth of one manufacturer
    Series {
        /// 2W, 3W or 4W
        category: String,
        manufacturer: String,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Data quality: gaps and duplicate keys
    Check,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// First month (YYYY-MM)
    #[arg(long)]
    from: Option<String>,

    /// Last month (YYYY-MM)
    #[arg(long)]
    to: Option<String>,

    /// Comma separated, e.g. 2W,4W
    #[arg(long)]
    categories: Option<String>,

    /// Comma separated manufacturer names
    #[arg(long)]
    manufacturers: Option<String>,
}

impl From<FilterArgs> for FilterParams {
    fn from(args: FilterArgs) -> Self {
        FilterParams {
            from: args.from,
            to: args.to,
            categories: args.categories,
            manufacturers: args.manufacturers,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    let level = if cli.verbose { "debug".to_string() } else { config.logging.level.clone() };
    setup_tracing(&level, cli.log_format.unwrap_or(config.logging.format));

    match cli.command {
        Command::Generate { output, seed, import, dry_run } => run_generate(&config, output, seed, import, dry_run),
        Command::Import { csv } => run_import(&config, csv),
        Command::Export { csv } => run_export(&config, csv),
        Command::Report { filter, json } => run_report(&config, filter.into(), json),
        Command::Series { category, manufacturer, from, to, json } => {
            run_series(&config, &category, &manufacturer, from, to, json)
        }
        Command::Check => run_check(&config),
    }
}

fn open_store(config: &AppConfig) -> Result<SqliteFactStore> {
    SqliteFactStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))
}

fn run_generate(
    config: &AppConfig,
    output: PathBuf,
    seed: Option<u64>,
    import: bool,
    dry_run: bool,
) -> Result<()> {
    println!("🎲 Generating synthetic registrations");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut generator_config = config.generator.clone();
    if let Some(seed) = seed {
        generator_config.seed = seed;
    }
    let facts = SyntheticGenerator::new(generator_config.clone()).generate();
    let total: u64 = facts.iter().map(|f| f.registrations).sum();

    println!(
        "✓ {} facts, {}-{} (seed {})",
        facts.len(),
        generator_config.start_year,
        generator_config.end_year,
        generator_config.seed
    );
    println!("✓ {} registrations in total", thousands(total));

    if dry_run {
        // preview the generated set without touching disk
        let store = InMemoryFactStore::new(facts);
        let facade = AnalyticsFacade::with_options(store, config.analytics_options());
        let filter = FilterParams::default().resolve(&facade.domain()?, config.analytics.default_window_months)?;
        print_dashboard(&facade.dashboard(&filter)?);
        println!("\n(dry run: nothing written)");
        return Ok(());
    }

    write_csv(&output, &facts)?;
    println!("💾 Wrote {}", output.display());

    if import {
        run_import(config, output)?;
    }

    Ok(())
}

fn run_import(config: &AppConfig, csv: PathBuf) -> Result<()> {
    println!("🗄️  Import: CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = open_store(config)?;
    println!("\n📂 Loading {}...", csv.display());

    match store.import_csv(&csv)? {
        ImportOutcome::Imported { event } => {
            println!("✓ Read {} facts", event.facts_read);
            println!("✓ Inserted: {}", event.inserted);
            println!("✓ Already present: {}", event.unchanged);
            println!("✓ Import event {}", event.event_id);
        }
        ImportOutcome::AlreadyImported { fingerprint } => {
            println!("⏭️  Same file already imported (sha256 {}), nothing to do", &fingerprint[..12]);
        }
    }

    println!("\n🔍 Database contains {} facts (version {})", store.count()?, store.version()?);
    Ok(())
}

fn run_export(config: &AppConfig, csv: PathBuf) -> Result<()> {
    let store = open_store(config)?;
    let written = store.export_csv(&csv)?;
    println!("💾 Exported {} facts to {}", written, csv.display());
    Ok(())
}

fn run_report(config: &AppConfig, params: FilterParams, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let facade = AnalyticsFacade::with_options(store, config.analytics_options());

    let filter = params.resolve(&facade.domain()?, config.analytics.default_window_months)?;
    let dashboard = facade.dashboard(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print_dashboard(&dashboard);
    }
    Ok(())
}

fn run_series(
    config: &AppConfig,
    category: &str,
    manufacturer: &str,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let category: VehicleCategory = category.parse()?;
    let series = SeriesKey::new(category, manufacturer);

    let store = open_store(config)?;
    let facade = AnalyticsFacade::with_options(store, config.analytics_options());
    let params = FilterParams {
        from,
        to,
        ..FilterParams::default()
    };
    let filter = params.resolve(&facade.domain()?, config.analytics.default_window_months)?;
    let detail = facade.series_detail(&series, &filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("📈 {}  {} → {}", series, filter.date_from, filter.date_to);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<9} {:>12} {:>10} {:>10}", "Month", "Registered", "YoY", "QoQ");
    for point in &detail.points {
        println!(
            "{:<9} {:>12} {:>10} {:>10}",
            point.month.to_string(),
            thousands(point.registrations),
            point.yoy.display(),
            point.qoq.display()
        );
    }
    Ok(())
}

fn run_check(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let facts = store.all_facts()?;
    let report = check_density(&facts);

    println!("✅ Data quality");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", report.summary());

    let issues = report.issues();
    if issues.is_empty() {
        println!("\n🎉 Every series is dense, no duplicate keys");
    }
    for issue in issues {
        println!("\n⚠️  [{:?}] {}", issue.severity, issue.subject);
        println!("   {}", issue.issue);
        println!("   → {}", issue.recommendation);
    }

    let events = store.import_events()?;
    if !events.is_empty() {
        println!("\n🗂️  Imports");
        for event in events {
            println!(
                "   {}  {}  +{} ({} unchanged)",
                event.timestamp.format("%Y-%m-%d %H:%M"),
                event.source,
                event.inserted,
                event.unchanged
            );
        }
    }
    Ok(())
}

// ============================================================================
// TEXT OUTPUT
// ============================================================================

fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn percent(value: Option<f64>) -> String {
    value.map(|v| Growth::Change(v).display()).unwrap_or_else(|| "N/A".to_string())
}

fn share(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| "N/A".to_string())
}

fn print_dashboard(dashboard: &Dashboard) {
    let filter = &dashboard.filter;
    println!(
        "📊 Vehicle Registrations  {} → {}  (regstats {}, facts v{})",
        filter.date_from, filter.date_to, VERSION, dashboard.fact_set_version
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let kpis = &dashboard.kpis;
    println!("\n📈 KPIs");
    println!("   Total registrations:  {}", thousands(kpis.total_registrations));
    println!("   Avg YoY growth:       {}", percent(kpis.avg_yoy_growth));
    println!("   Avg QoQ growth:       {}", percent(kpis.avg_qoq_growth));
    println!("   Active manufacturers: {}", kpis.active_manufacturers);

    if kpis.total_registrations == 0 {
        println!("\n(no registrations in this window)");
        return;
    }

    println!("\n🚗 Categories");
    for category in &dashboard.categories {
        println!(
            "   {:<14} {:>14}  share {:>6}  YoY {:>8}  QoQ {:>8}  ({} manufacturers)",
            category.category.name(),
            thousands(category.total_registrations),
            share(category.market_share),
            percent(category.avg_yoy_growth),
            percent(category.avg_qoq_growth),
            category.manufacturers
        );
    }

    if let Some(as_of) = dashboard.market_share.as_of {
        println!("\n🥧 Market share ({})", as_of);
        for category in &dashboard.market_share.categories {
            let leaders: Vec<String> = category
                .entries
                .iter()
                .take(3)
                .map(|e| format!("{} {}", e.key, share(e.share)))
                .collect();
            println!("   {}: {}", category.category, leaders.join(", "));
        }
    }

    for board in [&dashboard.yoy_leaderboard, &dashboard.qoq_leaderboard] {
        println!("\n🏆 {} leaders", board.kind);
        for entry in &board.leaders {
            println!("   {:>2}. {:<28} {}", entry.rank, entry.id.to_string(), Growth::Change(entry.value));
        }
        if !board.new_entrants.is_empty() {
            let names: Vec<String> = board.new_entrants.iter().map(|s| s.to_string()).collect();
            println!("   New: {}", names.join(", "));
        }
        if !board.insufficient_data.is_empty() {
            println!("   N/A: {} series without a baseline", board.insufficient_data.len());
        }
        if !board.below_volume_floor.is_empty() {
            println!("   {} series below the volume floor", board.below_volume_floor.len());
        }
    }

    println!("\n📋 Summary");
    println!(
        "   {:<28} {:>14} {:>9} {:>9} {:>7}",
        "Manufacturer", "Registrations", "YoY", "QoQ", "Share"
    );
    for row in &dashboard.summary {
        println!(
            "   {:<28} {:>14} {:>9} {:>9} {:>7}",
            row.series.to_string(),
            thousands(row.total_registrations),
            row.latest_yoy.display(),
            row.latest_qoq.display(),
            share(row.market_share)
        );
    }

    if !dashboard.insights.is_empty() {
        println!("\n💡 Insights");
        for insight in &dashboard.insights {
            println!("   • {}", insight.message);
        }
    }
}
