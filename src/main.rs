use anyhow::{bail, Context, Result};
use std::env;

use dvf_dashboard::presenter::{format_price, PAGE_TITLE};
use dvf_dashboard::{init_dataset, logging, select_commune, Config, DashboardView, Dataset};

const USAGE: &str = "usage: dvf-dashboard [report <commune> | communes]";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("report") => {
            logging::init("dvf_dashboard=info");
            let commune = args[2..].join(" ");
            if commune.trim().is_empty() {
                bail!("missing commune name\n{}", USAGE);
            }
            run_report(&config, &commune)?;
        }
        Some("communes") => {
            logging::init("dvf_dashboard=info");
            run_list_communes(&config)?;
        }
        Some(other) => bail!("unknown command {:?}\n{}", other, USAGE),
        // UI mode (default)
        None => run_ui_mode(&config)?,
    }

    Ok(())
}

fn load(config: &Config) -> Result<&'static Dataset> {
    let dataset = init_dataset(&config.data_path)
        .with_context(|| format!("Failed to load dataset from {}", config.data_path.display()))?;
    if dataset.is_empty() {
        eprintln!("⚠️  {} has no rows", config.data_path.display());
    }
    Ok(dataset)
}

fn run_report(config: &Config, commune: &str) -> Result<()> {
    let dataset = load(config)?;
    let view = DashboardView::from_selection(&select_commune(dataset, commune));

    println!("{}", PAGE_TITLE);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match view {
        DashboardView::NoData { message, .. } => println!("{}", message),
        DashboardView::Report {
            heading, panels, ..
        } => {
            println!("{}\n", heading);
            for panel in panels {
                println!("{}", panel.metric.label);
                println!("  {}  ({})", panel.metric.value, panel.metric.delta);
                for (annee, prixm2) in &panel.chart.points {
                    println!("    {}  {:>14}", annee, format_price(*prixm2));
                }
                println!();
            }
        }
    }

    Ok(())
}

fn run_list_communes(config: &Config) -> Result<()> {
    let dataset = load(config)?;
    for commune in dataset.communes() {
        println!("{}", commune);
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    // Anything above warn would draw over the alternate screen
    logging::init("warn");

    println!("🖥️  Loading DVF dashboard...\n");
    let dataset = load(config)?;
    println!("✓ Loaded {} transactions\n", dataset.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = dvf_dashboard::ui::App::new(dataset);
    dvf_dashboard::ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin dvf-server --features server");
    eprintln!("   {}", USAGE);
    std::process::exit(1);
}
