use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use layerfft::report::{self, EncodeReport, Summary};
use layerfft::store::assign_song_ids;
use layerfft::{AudioClip, ClipStore, DisclosureLevels, Encoder, EncoderConfig, WavDirStore};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "layerfft")]
#[command(author, version, about = "Rebuild songs from their strongest frequency components, level by level")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show warnings and the summary
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a file, or every audio file under a directory
    Encode {
        /// Audio file or directory
        path: PathBuf,

        /// Song id for a single file (default: file stem)
        #[arg(long)]
        song_id: Option<String>,

        /// Root directory for reconstructed levels
        #[arg(short, long, default_value = "OutputWAVS")]
        out_dir: PathBuf,

        /// Comma separated bin budgets, e.g. 500,1000,2000 (overrides --config)
        #[arg(long)]
        levels: Option<String>,

        /// JSON encoder config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start of the excerpt in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// End of the excerpt in seconds (default: end of file)
        #[arg(long)]
        end: Option<f64>,

        /// Number of parallel workers (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Compute levels one after another instead of in parallel
        #[arg(long)]
        serial: bool,

        /// Write a JSON manifest of the run
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the levels already stored for a song
    Levels {
        /// Root directory for reconstructed levels
        root: PathBuf,

        /// Song id
        song_id: String,
    },
}

/// Settings shared by every file in an encode run
struct EncodeJob {
    encoder: Encoder,
    store: WavDirStore,
    start: f64,
    end: Option<f64>,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            2
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<i32> {
    match args.command {
        Command::Levels { root, song_id } => {
            let store = WavDirStore::new(root);
            let levels = store
                .available_levels(&song_id)
                .with_context(|| format!("listing levels for {}", song_id))?;
            if levels.is_empty() {
                println!("No levels stored for {}", song_id);
            } else {
                for level in levels {
                    println!("{}", level);
                }
            }
            Ok(0)
        }
        Command::Encode {
            path,
            song_id,
            out_dir,
            levels,
            config,
            start,
            end,
            jobs,
            serial,
            report,
        } => {
            let mut encoder_config = match config {
                Some(ref p) => EncoderConfig::load(p)
                    .with_context(|| format!("loading config {}", p.display()))?,
                None => EncoderConfig::default(),
            };
            if let Some(ref list) = levels {
                let levels = DisclosureLevels::parse_list(list).context("parsing --levels")?;
                encoder_config = encoder_config.with_levels(levels);
            }
            if serial {
                encoder_config = encoder_config.with_parallel(false);
            }

            if let Some(jobs) = jobs {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build_global()
                    .context("configuring worker pool")?;
            }

            let job = EncodeJob {
                encoder: Encoder::new(encoder_config),
                store: WavDirStore::new(out_dir),
                start,
                end,
            };
            encode_path(&job, &path, song_id, report.as_deref(), args.quiet)
        }
    }
}

// Supported audio formats
const SUPPORTED_EXTENSIONS: [&str; 6] = ["wav", "wave", "mp3", "flac", "ogg", "oga"];

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn default_song_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("song")
        .to_string()
}

fn encode_path(
    job: &EncodeJob,
    path: &Path,
    song_id: Option<String>,
    report_path: Option<&Path>,
    quiet: bool,
) -> Result<i32> {
    let files: Vec<(PathBuf, String)> = if path.is_dir() {
        if song_id.is_some() {
            log::warn!("--song-id is ignored for directories; ids come from relative paths");
        }
        let found = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_supported(e.path()))
            .map(|e| e.into_path());
        // Two files sharing an id would overwrite each other's levels
        assign_song_ids(path, found).context("assigning song ids")?
    } else {
        let id = song_id.unwrap_or_else(|| default_song_id(path));
        vec![(path.to_path_buf(), id)]
    };

    if files.is_empty() {
        anyhow::bail!(
            "no audio files found under {} (supported: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }

    log::info!(
        "Encoding {} file(s) at levels {:?}",
        files.len(),
        job.encoder.config().levels.as_slice()
    );

    // Set up progress bar
    let pb = if !quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let reports: Vec<EncodeReport> = files
        .par_iter()
        .map(|(file, id)| {
            let report = match encode_file(job, file, id) {
                Ok(report) => report,
                Err(e) => {
                    log::warn!("{}: {:#}", file.display(), e);
                    EncodeReport::failed(id, format!("{:#}", e))
                }
            };
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(id.clone());
            }
            report
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if !quiet {
        for r in &reports {
            match r.error {
                None => println!(
                    "\x1b[32m[OK]\x1b[0m    {:<30} {} levels, {} significant bins",
                    r.song_id,
                    r.levels.len(),
                    r.significant_bins
                ),
                Some(ref e) => println!("\x1b[31m[FAIL]\x1b[0m  {:<30} {}", r.song_id, e),
            }
        }
    }

    let summary = Summary::from_reports(&reports);
    eprintln!(
        "Encoded {}/{} song(s), {} level file(s) written, {} saturated",
        summary.encoded, summary.total, summary.levels_written, summary.saturated_levels
    );

    if let Some(report_path) = report_path {
        report::write_json(report_path, &reports)
            .with_context(|| format!("writing report {}", report_path.display()))?;
        log::info!("Report saved: {}", report_path.display());
    }

    Ok(if summary.failed > 0 { 1 } else { 0 })
}

fn encode_file(job: &EncodeJob, file: &Path, song_id: &str) -> Result<EncodeReport> {
    let source = layerfft::ingest::decode_file(file)
        .with_context(|| format!("decoding {}", file.display()))?;
    let clip: AudioClip = if job.start > 0.0 || job.end.is_some() {
        source.window(job.start, job.end).context("extracting excerpt")?
    } else {
        source
    };

    let encoding = job.encoder.encode(&clip).context("encoding")?;
    job.store
        .store_all(song_id, &encoding)
        .with_context(|| format!("storing levels for {}", song_id))?;

    Ok(EncodeReport::new(song_id, &clip, &encoding))
}
