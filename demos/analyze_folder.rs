//! Analyze every photo in a directory
//!
//! Usage: analyze_folder <photo-dir> [settings.json] [--json]
//!
//! Set RUST_LOG=photo_colorscan=debug for detailed logs.

use photo_colorscan::{AnalysisPipeline, AnalysisSettings, DirectoryPhotoSource};
use std::{env, path::Path, process, sync::Arc};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photo_colorscan=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let json_output = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();

    let dir = match positional.first() {
        Some(dir) => Path::new(dir.as_str()),
        None => {
            print_help(&args[0]);
            process::exit(1);
        }
    };

    let settings = match positional.get(1) {
        Some(path) => match AnalysisSettings::from_json_file(Path::new(path.as_str())) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error loading settings: {}", e.user_message());
                process::exit(1);
            }
        },
        None => AnalysisSettings::default(),
    };

    let source = DirectoryPhotoSource::new(dir);
    let ids = match source.list_photos() {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("Error reading '{}': {}", dir.display(), e);
            process::exit(1);
        }
    };
    eprintln!("Found {} photos in {}", ids.len(), dir.display());

    let pipeline = AnalysisPipeline::new(Arc::new(source), settings);
    let result = pipeline.analyze_collection(&ids, |p| {
        eprintln!(
            "[{:>3.0}%] {} ({}/{} photos, {} failed)",
            p.overall_progress * 100.0,
            p.stage,
            p.processed_photos,
            p.total_photos,
            p.failed_photos
        );
    });

    if json_output {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing result: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!(
        "Palette: {} colors (K = {}, quality: {})",
        result.clusters.len(),
        result.optimal_k,
        result.quality_level.label()
    );
    println!("  {}", result.quality_description());
    for cluster in &result.clusters {
        println!(
            "  #{:<2} {} {:<20} {:>4} photos",
            cluster.index,
            cluster.hex,
            cluster.name,
            cluster.photo_count()
        );
    }

    if let Some(warm_cool) = &result.warm_cool {
        println!(
            "Warmth: mean {:+.2} (min {:+.2}, max {:+.2})",
            warm_cool.mean, warm_cool.min, warm_cool.max
        );
    }

    let stats = result.global_statistics();
    println!(
        "Tone: {} hues, {}, {}",
        stats.dominant_hue_range, stats.dominant_value, stats.dominant_saturation
    );

    if let Some(feature) = &result.collection_feature {
        println!("Style: {}", feature.style_tags.join(", "));
    }

    for op in &result.adaptive_log {
        println!("  refine: {}", op);
    }
}

fn print_help(program: &str) {
    println!("Usage: {} <photo-dir> [settings.json] [--json]", program);
    println!();
    println!("Analyzes the colors of every supported image in <photo-dir>.");
    println!();
    println!("Options:");
    println!("  --json    Print the full analysis result as JSON");
}
