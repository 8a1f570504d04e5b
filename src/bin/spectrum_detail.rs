//! Spectrum inspection tool for checking what each level will keep

use layerfft::codec::{analyze, selector};
use layerfft::ingest::decode_file;
use std::env;

const DEFAULT_TOP: usize = 20;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: spectrum_detail <file> [top_n]");
        std::process::exit(1);
    }

    let top = match args.get(2) {
        Some(s) => match s.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("top_n must be a non-negative integer, got {:?}", s);
                std::process::exit(1);
            }
        },
        None => DEFAULT_TOP,
    };

    let path = &args[1];
    println!("\n{}", "=".repeat(60));
    println!("FILE: {}", path);
    println!("{}", "=".repeat(60));

    let clip = match decode_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to decode audio: {}", e);
            std::process::exit(1);
        }
    };

    println!("Sample rate: {} Hz", clip.sample_rate);
    println!("Samples: {} ({:.2}s)", clip.len(), clip.duration_secs());

    let analysis = match analyze(&clip) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Bin resolution: {:.4} Hz",
        clip.sample_rate as f64 / analysis.len() as f64
    );
    println!("Peak magnitude: {:.2}", analysis.peak);
    println!("Noise floor: {:.2}", analysis.threshold);
    println!("Significant bins: {}", analysis.significant.len());

    let ranked = selector::rank(&analysis.magnitude, &analysis.significant);
    println!("\nTop {} bins by magnitude:", top.min(ranked.len()));
    println!("{:>4} | {:>8} | {:>12} | {:>12} | {:>8}", "RANK", "BIN", "FREQ (Hz)", "MAGNITUDE", "ENERGY");
    println!("{}", "-".repeat(56));
    for (rank, &bin) in ranked.iter().take(top).enumerate() {
        let captured = analysis.energy_capture(&ranked[..=rank]);
        println!(
            "{:>4} | {:>8} | {:>12.2} | {:>12.2} | {:>7.2}%",
            rank + 1,
            bin,
            analysis.bin_frequency(bin),
            analysis.magnitude[bin],
            captured * 100.0
        );
    }
}
