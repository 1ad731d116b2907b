// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

use agroreal::logging::init_logger;
use agroreal::{build_dashboard, import_rows, load_csv, Config, Ledger};

const USAGE: &str = "\
Usage: agroreal [-v] [COMMAND]

Commands:
  init            Create the database and its tables
  import <csv>    Load clients, purchases and payments from a CSV file
  dashboard       Print the dashboard cards as JSON
  (none)          Open the terminal dashboard

Environment: AGROREAL_DB_PATH, AGROREAL_LOCALE, AGROREAL_CURRENCY,
             AGROREAL_RECENT_LIMIT, RUST_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    let args: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| *a != "-v" && *a != "--verbose")
        .collect();

    let config = Config::from_env().context("Invalid configuration")?;

    match args.as_slice() {
        ["init"] => {
            init_logger(verbose);
            run_init(&config)?;
        }
        ["import", csv_path] => {
            init_logger(verbose);
            run_import(&config, Path::new(csv_path))?;
        }
        ["dashboard"] => {
            init_logger(verbose);
            run_dashboard(&config)?;
        }
        ["help"] | ["-h"] | ["--help"] => println!("{}", USAGE),
        [] => run_ui_mode(&config).await?,
        other => bail!("unknown command: {}\n\n{}", other.join(" "), USAGE),
    }

    Ok(())
}

fn run_init(config: &Config) -> Result<()> {
    println!("🗄️  Creating ledger database");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    Ledger::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    println!("✓ Database ready at {} (WAL mode)", config.db_path.display());
    Ok(())
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    println!("📥 Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let rows = load_csv(csv_path)
        .with_context(|| format!("Failed to read {}", csv_path.display()))?;
    println!("✓ Loaded {} rows from CSV", rows.len());

    // 2. Open database
    let mut ledger = Ledger::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    // 3. Write through the ledger
    println!("\n💾 Importing...");
    let summary = import_rows(&mut ledger, &rows).context("Import stopped")?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Clients created:   {}", summary.clients_created);
    println!("✓ Purchases created: {}", summary.purchases_created);
    println!("✓ Payments added:    {}", summary.payments_added);
    println!("✓ Duplicates skipped: {}", summary.duplicates);

    Ok(())
}

fn run_dashboard(config: &Config) -> Result<()> {
    let ledger = Ledger::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    let cards = build_dashboard(&ledger, &config.formatter()?, config.recent_limit)?;
    println!("{}", serde_json::to_string_pretty(&cards)?);

    Ok(())
}

#[cfg(feature = "tui")]
async fn run_ui_mode(config: &Config) -> Result<()> {
    if !config.db_path.exists() {
        eprintln!("❌ Database not found at {}", config.db_path.display());
        eprintln!("   Run: agroreal import data/seed.csv");
        eprintln!("   to load demo data first.");
        std::process::exit(1);
    }

    agroreal::logging::init_file_logger(&config.db_path.with_extension("log"))
        .context("Failed to open log file")?;

    let ledger = Ledger::open(&config.db_path)?;
    let formatter = config.formatter()?;

    let mut app = ui::App::new(ledger, formatter, config.recent_limit)?;
    ui::run_ui(&mut app).await?;

    println!("✅ Dashboard closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin agroreal-server --features server");
    std::process::exit(1);
}
