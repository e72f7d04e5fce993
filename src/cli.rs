//! # padidx-query
//!
//! Interactive query shell over a built index. Loads the catalog from
//! a data directory given as the first argument, builds the index
//! once, then repeatedly reads a pad id from stdin and prints the
//! campaigns and banners eligible there.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use pad_index::{catalog, index::PadIndex, Config};

fn main() -> pad_index::Result<()> {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  padidx-query - interactive pad query shell   ║");
    println!("╚══════════════════════════════════════════════╝");
    println!();

    let data_dir = std::env::args().nth(1).unwrap_or_else(|| Config::default().data_dir);
    println!("Loading catalog from {data_dir}...");
    let catalog = catalog::load_catalog(&PathBuf::from(&data_dir))?;
    let index = PadIndex::build(catalog)?;
    println!("Index built over {} pads. Type a pad id, or 'exit' to quit.", index.pad_count());
    println!();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut input = String::new();

    loop {
        print!("pad> ");
        io::stdout().flush().ok();

        input.clear();
        let n = reader.read_line(&mut input).unwrap_or(0);
        if n == 0 {
            break;
        }
        let cmd = input.trim();

        if cmd.is_empty() {
            continue;
        }
        if cmd.eq_ignore_ascii_case("exit") || cmd.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }

        let pad_id: u32 = match cmd.parse() {
            Ok(id) => id,
            Err(_) => {
                println!("ERROR: not a pad id: {cmd}");
                continue;
            }
        };

        print_pad(&index, pad_id);
        println!();
    }

    Ok(())
}

fn print_pad(index: &PadIndex, pad_id: u32) {
    let catalog = index.catalog();
    let campaigns = index.campaigns_by_pad(pad_id);
    let filtered = index.filtered_banners_by_pad(pad_id);
    let eligible = index.eligible_banners_by_pad(pad_id);

    println!("{:20}{}", "Eligible campaigns:", campaigns.count());
    for pos in campaigns.iter_ones() {
        println!("  {}", catalog.indexed_campaigns[pos].campaign_id);
    }
    println!("{:20}{}", "Filtered banners:", filtered.len());
    println!("{:20}{}", "Eligible banners:", eligible.len());
}
