//! Absorb JPEG files against the built-in grammar and report one status line per sample.
//!
//! Usage:
//!   absorb_file [OPTIONS] PATH...
//!
//! Directories are scanned for `.jpg` files (sorted); plain files are absorbed as given.
//!
//! Options:
//!   --mode M        Absorption mode token (default: ABS)
//!   --relax         Disable size, contents and structure checks (anchors still apply)
//!   --max-len N     Absorb at most N bytes of each file
//!   --threads N     Absorb samples on N threads (default: 1)
//!   --dump          Print the instance tree of each sample
//!   -v, -vv, -vvv   More logging (info, debug, trace); RUST_LOG also applies
//!
//! Exits with status 1 when no sample fully absorbed.

use absorbdsl::dump::{format_tree, result_summary_line};
use absorbdsl::formats::jpg;
use absorbdsl::{AbsorbConfig, AbsorbConstraints, Mode};
use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

struct Options {
    mode: Mode,
    relax: bool,
    max_len: Option<usize>,
    threads: usize,
    dump: bool,
    verbose: u8,
    paths: Vec<PathBuf>,
}

fn take_value(args: &mut Vec<String>, flag: &str) -> anyhow::Result<Option<String>> {
    match args.iter().position(|a| a == flag) {
        Some(pos) => {
            if pos + 1 >= args.len() {
                bail!("{} needs a value", flag);
            }
            let v = args.remove(pos + 1);
            args.remove(pos);
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn parse_args() -> anyhow::Result<Options> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mode = take_value(&mut args, "--mode")?.map(Mode::new).unwrap_or(Mode::ABSORB);
    let max_len = take_value(&mut args, "--max-len")?
        .map(|v| v.parse::<usize>().with_context(|| format!("--max-len {}", v)))
        .transpose()?;
    let threads = take_value(&mut args, "--threads")?
        .map(|v| v.parse::<usize>().with_context(|| format!("--threads {}", v)))
        .transpose()?
        .unwrap_or(1);
    let relax = take_flag(&mut args, "--relax");
    let dump = take_flag(&mut args, "--dump");
    let mut verbose = 0u8;
    args.retain(|a| {
        let is_v = a.len() > 1 && a.starts_with('-') && a[1..].chars().all(|c| c == 'v');
        if is_v {
            verbose = verbose.saturating_add((a.len() - 1) as u8);
        }
        !is_v
    });
    if let Some(unknown) = args.iter().find(|a| a.starts_with("--")) {
        bail!("unknown option {}", unknown);
    }
    if args.is_empty() {
        bail!("usage: absorb_file [--mode M] [--relax] [--max-len N] [--threads N] [--dump] [-v..] PATH...");
    }
    Ok(Options { mode, relax, max_len, threads, dump, verbose, paths: args.into_iter().map(PathBuf::from).collect() })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let opts = parse_args()?;
    init_logging(opts.verbose);

    let mut config = AbsorbConfig::new(opts.mode.clone());
    if opts.relax {
        config = config.with_constraints(AbsorbConstraints::none());
    }
    if let Some(cap) = opts.max_len {
        config = config.with_max_input_len(cap);
    }
    let model = jpg::data_model().context("building JPEG grammar")?.with_config(config);

    let mut files: Vec<(PathBuf, Vec<u8>)> = Vec::new();
    for path in &opts.paths {
        if path.is_dir() {
            files.extend(model.load_samples(path).with_context(|| format!("{}", path.display()))?);
        } else {
            let data = std::fs::read(path).with_context(|| format!("{}", path.display()))?;
            files.push((path.clone(), data));
        }
    }
    if files.is_empty() {
        bail!("no {} files found", model.file_extension);
    }

    let (paths, data): (Vec<PathBuf>, Vec<Vec<u8>>) = files.into_iter().unzip();
    let samples = model.absorb_all(&data, opts.threads);
    let mut absorbed = 0usize;
    for (path, sample) in paths.iter().zip(&samples) {
        println!("{} {}: {}", sample.name, path.display(), result_summary_line(&sample.result));
        if sample.result.is_fully_absorbed() {
            absorbed += 1;
        }
        if opts.dump {
            if let Some(tree) = &sample.result.instance_tree {
                println!("{}", format_tree(tree));
            }
        }
    }
    eprintln!("absorb: {} of {} sample(s) fully absorbed", absorbed, samples.len());
    if absorbed == 0 {
        std::process::exit(1);
    }
    Ok(())
}
