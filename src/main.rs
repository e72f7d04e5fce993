// # padidx-build
//
// Loads a catalog of pads, users, packages and campaigns from a flat
// data directory, builds the full index, and reports build stats.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use pad_index::{catalog, index::PadIndex, Config};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    print_banner();

    let data_dir = std::env::args().nth(1).unwrap_or_else(|| Config::default().data_dir);
    let config = Config { data_dir: data_dir.clone() };

    info!(data_dir = %config.data_dir, "loading catalog");
    let catalog = match catalog::load_catalog(&PathBuf::from(&config.data_dir)) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "failed to load catalog");
            return ExitCode::FAILURE;
        }
    };

    info!(
        pads = catalog.pads.len(),
        users = catalog.users.len(),
        packages = catalog.packages.len(),
        campaigns = catalog.campaigns.len(),
        banners = catalog.indexed_banners.len(),
        "catalog loaded"
    );

    let index = match PadIndex::build(catalog) {
        Ok(index) => index,
        Err(e) => {
            error!(error = %e, "failed to build index");
            return ExitCode::FAILURE;
        }
    };

    print_summary(&index);
    ExitCode::SUCCESS
}

fn print_banner() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  padidx-build - pad targeting index builder   ║");
    println!("╚══════════════════════════════════════════════╝");
    println!();
}

fn print_summary(index: &PadIndex) {
    let catalog = index.catalog();
    println!();
    println!("┌──────────────────────────────────────────────┐");
    println!("│ INDEX SUMMARY                                 │");
    println!("├──────────────────────────────────────────────┤");
    println!("│   Pads:               {:<23} │", catalog.pads.len());
    println!("│   Campaigns:          {:<23} │", catalog.indexed_campaigns.len());
    println!("│   Banners:            {:<23} │", catalog.indexed_banners.len());
    println!("│   Pad filters loaded: {:<23} │", catalog.pad_filters.len());
    println!("└──────────────────────────────────────────────┘");
    println!();
}
