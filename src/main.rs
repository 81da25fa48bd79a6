//! Cell Timeline CLI - Inspect a dataset and simulate playback.

use std::fs;
use std::path::{Path, PathBuf};

use cell_timeline::{
    CrossSectionMode, DatasetRef, LoadOutcome, ViewerConfig, ViewerSession,
    loader::DirectorySource,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <dataset.csv> [ticks] [mode]", args[0]);
        eprintln!();
        eprintln!("Load a point cloud dataset and simulate playback.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  dataset.csv  Path to the dataset file");
        eprintln!("  ticks        Number of 60 Hz host ticks to simulate (default: 120)");
        eprintln!("  mode         Cross-section: full, horizontal, vertical (default: full)");
        eprintln!();
        eprintln!("A <dataset.csv>.viewer.json beside the dataset overrides the config.");
        eprintln!("Print the default config with --example.");
        std::process::exit(1);
    }

    let dataset_path = PathBuf::from(&args[1]);
    let ticks: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(120);
    let mode = match args.get(3) {
        Some(name) => CrossSectionMode::from_name(name).unwrap_or_else(|| {
            eprintln!("Unknown cross-section mode: {}", name);
            std::process::exit(1);
        }),
        None => CrossSectionMode::Full,
    };

    let config = load_config(&dataset_path);

    let mut session = ViewerSession::new(config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let root = dataset_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = dataset_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let dataset = DatasetRef::new(name).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let summary = match session.load_from(&DirectorySource::new(root), dataset) {
        Ok(LoadOutcome::Loaded(summary)) => summary,
        Ok(LoadOutcome::Stale) => unreachable!("single synchronous load cannot be stale"),
        Err(e) => {
            eprintln!("Error loading {}: {}", dataset_path.display(), e);
            std::process::exit(1);
        }
    };

    println!("Cell Timeline");
    println!("=============");
    println!("Dataset: {}", summary.name);
    println!("Frames: {}", summary.total_frames);
    println!("Max points: {}", summary.max_points);
    println!("Total points: {}", summary.total_points);
    println!("Category data: {}", summary.has_category_data);
    println!();

    println!("Categories:");
    for entry in session.legend() {
        println!("  {:>4}  #{:06X}  {}", entry.id, entry.color, entry.name);
    }
    println!();

    session.set_cross_section(mode);
    session.set_color_by_type(true);
    session.play();

    println!(
        "Simulating {} ticks ({} cross-section, every {:.0} ms)...",
        ticks,
        mode.name(),
        session.playback().advance_interval_ms()
    );
    println!(
        "  {}: {} visible",
        session.playback().frame_label(),
        session.visible_points().len()
    );

    let mut advances = 0;
    for i in 1..=ticks {
        let now = i as f64 * 1000.0 / 60.0;
        if session.tick(now) {
            advances += 1;
            println!(
                "  {}: {} visible",
                session.playback().frame_label(),
                session.visible_points().len()
            );
        }
    }

    println!();
    println!(
        "{} frame advances in {:.2}s of simulated time",
        advances,
        ticks as f64 / 60.0
    );
    println!("Share: ?{}", session.location_query().unwrap_or_default());
}

/// Read `<dataset>.viewer.json` if present, else defaults.
fn load_config(dataset_path: &Path) -> ViewerConfig {
    let mut config_path = dataset_path.as_os_str().to_owned();
    config_path.push(".viewer.json");
    let config_path = PathBuf::from(config_path);

    if !config_path.exists() {
        return ViewerConfig::default();
    }

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    })
}

fn print_example_config() {
    let config = ViewerConfig::default();

    println!("Example configuration (<dataset>.viewer.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
