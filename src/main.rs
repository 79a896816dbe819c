// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use railroute::osm::ingest::Source;
use railroute::{RailRouter, RouteStatus};

#[derive(Parser)]
#[command(about = "Offline shortest-path queries between named railway stops")]
struct Cli {
    /// The path to the OSM file, or "-" to read from standard input
    osm_file: PathBuf,

    /// Name of the stop to route from
    #[arg(long)]
    from: String,

    /// Name of the stop to route to
    #[arg(long)]
    to: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    // stdin cannot be rewound for the second pass, so slurp it up front
    let source = if cli.osm_file.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin().lock().read_to_end(&mut data)?;
        Source::Buffer(data)
    } else {
        Source::Path(cli.osm_file.clone())
    };

    let mut router = RailRouter::new();
    router.parse(&source)?;

    let result = router.find_route(&cli.from, &cli.to);
    if result.status != RouteStatus::Ok {
        return Err(format!("unable to find route: {}", result.status).into());
    }

    let start = result.start_node.expect("an OK result carries a start node");
    let end = result.end_node.expect("an OK result carries an end node");
    log::info!(
        "start node #{}, name: {} ({} candidate stops)",
        start.id,
        start.tags.get("name").unwrap_or_default(),
        result.start_count,
    );
    log::info!(
        "end node #{}, name: {} ({} candidate stops)",
        end.id,
        end.tags.get("name").unwrap_or_default(),
        result.end_count,
    );

    for turn in &result.sharp_turns {
        log::warn!(
            "sharp turn at node #{} ({}, {})",
            turn.id,
            turn.lonlat.lon,
            turn.lonlat.lat,
        );
    }

    println!("{:.3} km", result.distance / 1000.0);
    for node in &result.route_nodes {
        println!("{:.7}, {:.7}", node.lonlat.lon.degrees(), node.lonlat.lat.degrees());
    }

    Ok(())
}
