/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Command-line interface structs, functions, and methods.
//!
//! Each command is implemented as a submodule.

use crate::cc::Algorithm;
use crate::utils::MemoryUsage;
use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dsi_progress_logger::ProgressLog;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;

pub mod normalize;
pub mod run;

#[derive(Args, Debug)]
/// Shared CLI arguments for reading files containing arcs.
pub struct ArcsArgs {
    #[arg(long, default_value_t = '#')]
    /// Ignore lines that start with this symbol.
    pub line_comment_symbol: char,

    #[arg(long, default_value_t = 0)]
    /// How many lines to skip, ignoring comment lines.
    pub lines_to_skip: usize,

    #[arg(long)]
    /// How many lines to parse, after skipping the first lines_to_skip and
    /// ignoring comment lines.
    pub max_arcs: Option<usize>,

    #[arg(long, default_value_t = '\t')]
    /// The column separator.
    pub separator: char,

    #[arg(long, default_value_t = 0)]
    /// The index of the column containing the source node of an arc.
    pub source_column: usize,

    #[arg(long, default_value_t = 1)]
    /// The index of the column containing the target node of an arc.
    pub target_column: usize,

    #[arg(long, default_value_t = false)]
    /// Sources and destinations are not integer vertex identifiers, but
    /// labels; identifiers are assigned to labels in order of appearance.
    pub labels: bool,
}

/// Parses the number of threads from a string.
///
/// This function is meant to be used with `#[arg(...,  value_parser =
/// num_threads_parser)]`.
pub fn num_threads_parser(arg: &str) -> Result<usize> {
    let num_threads = arg.parse::<usize>()?;
    ensure!(num_threads > 0, "Number of threads must be greater than 0");
    Ok(num_threads)
}

/// Shared CLI arguments for commands that specify a number of threads.
#[derive(Args, Debug)]
pub struct NumThreadsArg {
    #[arg(short = 'j', long, default_value_t = rayon::current_num_threads().max(1), value_parser = num_threads_parser)]
    /// The number of threads to use.
    pub num_threads: usize,
}

/// Shared CLI arguments for commands that specify a memory usage.
#[derive(Args, Debug)]
pub struct MemoryUsageArg {
    #[clap(short = 'm', long = "memory-usage", value_parser = memory_usage_parser, default_value = "50%")]
    /// The number of pairs to be used in batches when sorting edges.
    /// If the number ends with a "b" or "B" it is interpreted as a number of bytes, otherwise as a number of elements.
    /// You can use the SI and NIST multipliers k, M, G, T, P, ki, Mi, Gi, Ti, and Pi.
    /// You can also use a percentage of the available memory by appending a "%" to the number.
    pub memory_usage: MemoryUsage,
}

/// Shared CLI arguments for commands that partition edge sets.
#[derive(Args, Debug)]
pub struct PartitionsArg {
    #[arg(long)]
    /// The number of partitions of edge sets (default: the number of CPUs).
    pub partitions: Option<std::num::NonZeroUsize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
/// Enum for the algorithms computing connected components.
///
/// It is used to implement [`ValueEnum`] here instead of in [`crate::cc`].
pub enum PrivAlgorithm {
    /// Alternating large-star and small-star supersteps.
    LargeSmallStar,
    /// A sequential disjoint-set forest.
    UnionFind,
}

impl From<PrivAlgorithm> for Algorithm {
    fn from(value: PrivAlgorithm) -> Self {
        match value {
            PrivAlgorithm::LargeSmallStar => Algorithm::LargeSmallStar,
            PrivAlgorithm::UnionFind => Algorithm::UnionFind,
        }
    }
}

/// Parses a batch size.
///
/// This function accepts either a number (possibly followed by a
/// SI or NIST multiplier k, M, G, T, P, ki, Mi, Gi, Ti, or Pi), or a percentage
/// (followed by a `%`) that is interpreted as a percentage of the core
/// memory. If the value ends with a `b` or `B` it is interpreted as a number of
/// bytes, otherwise as a number of elements.
pub fn memory_usage_parser(arg: &str) -> anyhow::Result<MemoryUsage> {
    const PREF_SYMS: [(&str, u64); 11] = [
        ("", 1),
        ("ki", 1 << 10),
        ("mi", 1 << 20),
        ("gi", 1 << 30),
        ("ti", 1 << 40),
        ("pi", 1 << 50),
        ("k", 1E3 as u64),
        ("m", 1E6 as u64),
        ("g", 1E9 as u64),
        ("t", 1E12 as u64),
        ("p", 1E15 as u64),
    ];
    let arg = arg.trim().to_ascii_lowercase();
    ensure!(!arg.is_empty(), "empty string");

    if let Some(perc) = arg.strip_suffix('%') {
        let perc = perc.parse::<f64>()?;
        ensure!((0.0..=100.0).contains(&perc), "percentage out of range");
        return Ok(MemoryUsage::from_perc(perc));
    }

    let num_digits = arg
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .count();

    let number = arg[..num_digits].parse::<f64>()?;
    let suffix = arg[num_digits..].trim();

    let prefix = suffix.strip_suffix('b').unwrap_or(suffix);
    let multiplier = PREF_SYMS
        .iter()
        .find(|(x, _)| *x == prefix)
        .map(|(_, m)| m)
        .ok_or(anyhow!("invalid prefix symbol {}", suffix))?;

    let value = (number * (*multiplier as f64)) as usize;
    ensure!(value > 0, "batch size must be greater than zero");

    if suffix.ends_with('b') {
        Ok(MemoryUsage::MemorySize(value))
    } else {
        Ok(MemoryUsage::BatchSize(value))
    }
}

/// Opens the given file for reading, or standard input if [`None`].
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => {
            log::info!("Reading arcs from {}", path.display());
            Box::new(BufReader::new(
                std::fs::File::open(path)
                    .with_context(|| format!("Could not open {}", path.display()))?,
            ))
        }
        None => {
            log::info!("Reading arcs from standard input");
            Box::new(std::io::stdin().lock())
        }
    })
}

/// Creates the given file for writing, or uses standard output if [`None`].
pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            create_parent_dir(path)?;
            Box::new(BufWriter::new(std::fs::File::create(path).with_context(
                || format!("Could not create {}", path.display()),
            )?))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

/// Reads arcs, parsing endpoints with `parse`.
///
/// Comment lines are ignored, and lines without enough columns are skipped
/// with a warning.
pub fn read_arcs<T>(
    args: &ArcsArgs,
    reader: impl BufRead,
    mut parse: impl FnMut(&str) -> Result<T>,
    pl: &mut impl ProgressLog,
) -> Result<Vec<(T, T)>> {
    pl.item_name("arc");
    pl.expected_updates(args.max_arcs);
    pl.start("Reading arcs...");

    let biggest_idx = args.source_column.max(args.target_column);
    let mut arcs = Vec::new();
    for (line_num, line) in reader.lines().enumerate().skip(args.lines_to_skip) {
        if args.max_arcs.is_some_and(|max_arcs| arcs.len() >= max_arcs) {
            break;
        }
        let line = line.with_context(|| format!("Could not read line {}", line_num + 1))?;
        if line.trim().is_empty() || line.trim().starts_with(args.line_comment_symbol) {
            continue;
        }

        let vals = line.split(args.separator).collect::<Vec<_>>();
        if vals.get(biggest_idx).is_none() {
            log::warn!(
                "Line {}: {:?} does not have enough columns: got {} columns but expected at least {} columns separated by {:?} (you can change the separator using the --separator option)",
                line_num + 1, line, vals.len(), biggest_idx + 1, args.separator,
            );
            continue;
        }

        let src = parse(vals[args.source_column].trim())
            .with_context(|| format!("Could not parse source at line {}", line_num + 1))?;
        let dst = parse(vals[args.target_column].trim())
            .with_context(|| format!("Could not parse target at line {}", line_num + 1))?;
        arcs.push((src, dst));
        pl.light_update();
    }
    pl.done();

    log::info!("Arcs read: {}", arcs.len());
    if arcs.is_empty() {
        log::warn!("No arcs read! Check that the --separator={:?} value is correct and that the --source-column={:?} and --target-column={:?} values are correct.", args.separator, args.source_column, args.target_column);
    }
    Ok(arcs)
}

/// Creates all parent directories of the given file path.
pub fn create_parent_dir(file_path: impl AsRef<Path>) -> Result<()> {
    // ensure that the dst directory exists
    if let Some(parent_dir) = file_path.as_ref().parent() {
        std::fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create the directory {:?}",
                parent_dir.to_string_lossy()
            )
        })?;
    }
    Ok(())
}

/// Parses a duration from a string.
/// For compatibility with Java, if no suffix is given, it is assumed to be in milliseconds.
/// You can use suffixes, the available ones are:
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
///
/// Example: `1d2h3m4s567` this is parsed as: 1 day, 2 hours, 3 minutes, 4 seconds, and 567 milliseconds.
fn parse_duration(value: &str) -> Result<Duration> {
    if value.is_empty() {
        bail!("Empty duration string, if you want every 0 milliseconds use `0`.");
    }
    let mut duration = Duration::from_secs(0);
    let mut acc = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            acc.push(c);
        } else if c.is_whitespace() {
            continue;
        } else {
            let dur = acc.parse::<u64>()?;
            match c {
                's' => duration += Duration::from_secs(dur),
                'm' => duration += Duration::from_secs(dur * 60),
                'h' => duration += Duration::from_secs(dur * 60 * 60),
                'd' => duration += Duration::from_secs(dur * 60 * 60 * 24),
                _ => return Err(anyhow!("Invalid duration suffix: {}", c)),
            }
            acc.clear();
        }
    }
    if !acc.is_empty() {
        let dur = acc.parse::<u64>()?;
        duration += Duration::from_millis(dur);
    }
    Ok(duration)
}

/// Initializes the `env_logger` logger with a custom format including
/// timestamps with elapsed time since initialization.
pub fn init_env_logger() -> Result<()> {
    use jiff::fmt::friendly::{Designator, Spacing, SpanPrinter};
    use jiff::SpanRound;

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let start = std::time::Instant::now();
    let printer = SpanPrinter::new()
        .spacing(Spacing::None)
        .designator(Designator::Compact);
    let span_round = SpanRound::new()
        .largest(jiff::Unit::Day)
        .smallest(jiff::Unit::Millisecond)
        .days_are_24_hours();

    builder.format(move |buf, record| {
        let Ok(ts) = jiff::Timestamp::try_from(SystemTime::now()) else {
            return Err(std::io::Error::other("Failed to get timestamp"));
        };
        let style = buf.default_level_style(record.level());
        let elapsed = start.elapsed();
        let span = jiff::Span::new()
            .seconds(elapsed.as_secs() as i64)
            .milliseconds(elapsed.subsec_millis() as i64);
        let span = span.round(span_round).map_err(std::io::Error::other)?;
        writeln!(
            buf,
            "{} {} {style}{}{style:#} [{:?}] {} - {}",
            ts.strftime("%F %T%.3f"),
            printer.span_to_string(&span),
            record.level(),
            std::thread::current().id(),
            record.target(),
            record.args()
        )
    });
    builder.try_init()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    #[arg(long, value_parser = parse_duration, global=true, display_order = 1000)]
    /// How often to log progress. Default is 10s. You can use the suffixes "s"
    /// for seconds, "m" for minutes, "h" for hours, and "d" for days. If no
    /// suffix is provided it is assumed to be in milliseconds.
    /// Example: "1d2h3m4s567" is parsed as 1 day + 2 hours + 3 minutes + 4
    /// seconds + 567 milliseconds = 93784567 milliseconds.
    pub log_interval: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    Run(run::CliArgs),
    Normalize(normalize::CliArgs),
}

#[derive(Parser, Debug)]
#[command(name = "starcc", version)]
/// Computes connected components of graphs given as lists of arcs.
///
/// Noteworthy environment variables:
///
/// - RUST_LOG: configuration for env_logger; pass `debug` to see hub counts,
///   lineages, and checkpoint paths.
///
/// - TMPDIR: where to store the temporary files used to sort edges.
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
    #[clap(flatten)]
    pub args: GlobalArgs,
}

/// The entry point of the command-line interface.
pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::try_parse_from(args)?;
    match cli.command {
        SubCommands::Run(args) => {
            run::main(cli.args, args)?;
        }
        SubCommands::Normalize(args) => {
            normalize::main(cli.args, args)?;
        }
    }

    log::info!(
        "The command took {}",
        pretty_print_elapsed(start.elapsed().as_secs_f64())
    );

    Ok(())
}

/// Pretty prints seconds in a humanly readable format.
fn pretty_print_elapsed(elapsed: f64) -> String {
    let mut result = String::new();
    let mut elapsed_seconds = elapsed as u64;
    let weeks = elapsed_seconds / (60 * 60 * 24 * 7);
    elapsed_seconds %= 60 * 60 * 24 * 7;
    let days = elapsed_seconds / (60 * 60 * 24);
    elapsed_seconds %= 60 * 60 * 24;
    let hours = elapsed_seconds / (60 * 60);
    elapsed_seconds %= 60 * 60;
    let minutes = elapsed_seconds / 60;

    match weeks {
        0 => {}
        1 => result.push_str("1 week "),
        _ => result.push_str(&format!("{} weeks ", weeks)),
    }
    match days {
        0 => {}
        1 => result.push_str("1 day "),
        _ => result.push_str(&format!("{} days ", days)),
    }
    match hours {
        0 => {}
        1 => result.push_str("1 hour "),
        _ => result.push_str(&format!("{} hours ", hours)),
    }
    match minutes {
        0 => {}
        1 => result.push_str("1 minute "),
        _ => result.push_str(&format!("{} minutes ", minutes)),
    }

    result.push_str(&format!("{:.3} seconds ({}s)", elapsed % 60.0, elapsed));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsi_progress_logger::no_logging;

    #[test]
    fn test_memory_usage_parser() -> Result<()> {
        assert_eq!(memory_usage_parser("1000")?, MemoryUsage::BatchSize(1000));
        assert_eq!(memory_usage_parser("2k")?, MemoryUsage::BatchSize(2000));
        assert_eq!(memory_usage_parser("1KiB")?, MemoryUsage::MemorySize(1024));
        assert_eq!(memory_usage_parser("1.5Mb")?, MemoryUsage::MemorySize(1_500_000));
        assert!(matches!(memory_usage_parser("10%")?, MemoryUsage::MemorySize(_)));
        assert!(memory_usage_parser("101%").is_err());
        assert!(memory_usage_parser("0").is_err());
        assert!(memory_usage_parser("3x").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_duration() -> Result<()> {
        assert_eq!(parse_duration("1500")?, Duration::from_millis(1500));
        assert_eq!(
            parse_duration("1h2m3s4")?,
            Duration::from_millis(((60 + 2) * 60 + 3) * 1000 + 4)
        );
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3w").is_err());
        Ok(())
    }

    #[test]
    fn test_pretty_print_elapsed() {
        assert_eq!(pretty_print_elapsed(61.5), "1 minute 1.500 seconds (61.5s)");
    }

    #[test]
    fn test_read_arcs() -> Result<()> {
        let args = ArcsArgs {
            line_comment_symbol: '#',
            lines_to_skip: 1,
            max_arcs: None,
            separator: ',',
            source_column: 1,
            target_column: 0,
            labels: false,
        };
        let input = "header\n# comment\n1,2\n\n3,4,x\n5\n";
        let arcs = read_arcs(&args, input.as_bytes(), |s| Ok(s.parse::<i64>()?), no_logging![])?;
        assert_eq!(arcs, vec![(2, 1), (4, 3)]);

        let bad = "1,a\n";
        let args = ArcsArgs {
            lines_to_skip: 0,
            ..args
        };
        assert!(read_arcs(&args, bad.as_bytes(), |s| Ok(s.parse::<i64>()?), no_logging![]).is_err());
        Ok(())
    }
}
