// Command-line front end for bsdelta.
//
// Subcommands: `apply` reconstructs a new file from an old file and a
// patch, `header` prints a patch header, `config` prints build details.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::format::{BSDIFF_MAGIC, HEADER_LEN, Header};
use crate::io::{ApplyMode, OldInput, hex_digest, patch_file};
use crate::patch::engine::{DEFAULT_BUFFER_SIZE, PatchOptions, PatchStats, Patcher};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// bsdiff 4.x (BSDIFF40) patch applier.
#[derive(Parser, Debug)]
#[command(
    name = "bsdelta",
    version,
    about = "BSDIFF40 patch applier",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Apply a patch to an old file.
    Apply(ApplyArgs),
    /// Print the header of a patch file.
    Header(HeaderArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Old file the patch was made against.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath, conflicts_with = "old_pos")]
    old: Option<PathBuf>,

    /// Patch file (default: stdin).
    #[arg(long, short = 'p', value_hint = ValueHint::FilePath, conflicts_with = "patch_pos")]
    patch: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Read the old file through a seekable handle instead of loading it.
    #[arg(long)]
    streaming: bool,

    /// Old file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    old_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,

    /// Patch file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    patch_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HeaderArgs {
    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Apply,
    Header,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    mode: ApplyMode,
    old_file: Option<PathBuf>,
    patch_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        mode: ApplyMode::WholeBuffer,
        old_file: None,
        patch_file: None,
        output_file: None,
        json_output: cli.json_output,
    };

    match cli.command {
        Cmd::Apply(args) => {
            opts.command = Command::Apply;
            opts.use_stdout = args.stdout;
            opts.mode = if args.streaming {
                ApplyMode::Streaming
            } else {
                ApplyMode::WholeBuffer
            };
            opts.old_file = args.old.or(args.old_pos);
            opts.patch_file = args.patch.or(args.patch_pos);
            opts.output_file = args.output.or(args.output_pos);
        }
        Cmd::Header(args) => {
            opts.command = Command::Header;
            opts.patch_file = Some(args.input);
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("bsdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("bsdelta version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let magic = String::from_utf8_lossy(&BSDIFF_MAGIC);

    eprintln!("FILE_IO={file_io}");
    eprintln!("MAGIC={magic}");
    eprintln!("HEADER_LEN={HEADER_LEN}");
    eprintln!("DEFAULT_BUFFER_SIZE={DEFAULT_BUFFER_SIZE}");
    eprintln!("SEGMENT_CODEC=bzip2");

    0
}

// ---------------------------------------------------------------------------
// Header command
// ---------------------------------------------------------------------------

fn cmd_header(opts: &Options) -> i32 {
    let Some(path) = opts.patch_file.as_ref() else {
        eprintln!("bsdelta: header: no patch file given");
        return 1;
    };
    let mut reader = match File::open(path) {
        Ok(f) => BufReader::new(f),
        Err(e) => {
            eprintln!("bsdelta: patch file: {}: {e}", path.display());
            return 1;
        }
    };
    let header = match Header::decode(&mut reader) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("bsdelta: {}: {e}", path.display());
            return 1;
        }
    };

    if opts.json_output {
        let json = serde_json::json!({
            "command": "header",
            "ctrl_len": header.ctrl_len,
            "diff_len": header.diff_len,
            "new_size": header.new_size,
        });
        println!("{json}");
    } else {
        println!("magic:        {}", String::from_utf8_lossy(&BSDIFF_MAGIC));
        println!("control len:  {}", header.ctrl_len);
        println!("diff len:     {}", header.diff_len);
        println!("new size:     {}", header.new_size);
    }
    0
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> i32 {
    let Some(old_path) = opts.old_file.as_ref() else {
        eprintln!("bsdelta: apply: no old file given");
        return 1;
    };

    if let (false, Some(out), Some(patch)) = (opts.use_stdout, &opts.output_file, &opts.patch_file)
    {
        if out.exists() && !opts.force {
            eprintln!(
                "bsdelta: output file exists, use -f to overwrite: {}",
                out.display()
            );
            return 1;
        }
        return apply_files(opts, old_path, patch, out);
    }

    apply_stdio(opts, old_path)
}

/// File-to-file path: goes through `io::patch_file` for sizes and digest.
fn apply_files(
    opts: &Options,
    old_path: &std::path::Path,
    patch_path: &std::path::Path,
    out_path: &std::path::Path,
) -> i32 {
    match patch_file(old_path, patch_path, out_path, opts.mode) {
        Ok(stats) => {
            log::info!(
                "applied {} controls: {} -> {} bytes",
                stats.controls,
                stats.old_size,
                stats.output_size
            );
            if opts.verbose > 0 && !opts.quiet {
                eprintln!(
                    "bsdelta: old size: {}, patch size: {}, output size: {}",
                    stats.old_size, stats.patch_size, stats.output_size
                );
            }
            if opts.json_output {
                let json = serde_json::json!({
                    "command": "apply",
                    "old_size": stats.old_size,
                    "patch_size": stats.patch_size,
                    "output_size": stats.output_size,
                    "controls": stats.controls,
                    "output_sha256": stats.output_sha256.map(|d| hex_digest(&d)),
                });
                eprintln!("{json}");
            }
            0
        }
        Err(e) => {
            // patch_file already removed any output it created.
            eprintln!("bsdelta: apply error: {e}");
            1
        }
    }
}

/// Patch from stdin and/or output to stdout.
///
/// The header is validated and the old file opened before an output file is
/// created; a failure after that removes the partial output.
fn apply_stdio(opts: &Options, old_path: &std::path::Path) -> i32 {
    let patch_reader: Box<dyn Read> = match &opts.patch_file {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::with_capacity(BUF_SIZE, f)),
            Err(e) => {
                eprintln!("bsdelta: patch file: {}: {e}", path.display());
                return 1;
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let patcher = match Patcher::with_options(
        patch_reader,
        PatchOptions {
            buffer_size: BUF_SIZE,
        },
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("bsdelta: apply error: {e}");
            return 1;
        }
    };

    let old = match OldInput::open(old_path, opts.mode) {
        Ok(old) => old,
        Err(e) => {
            eprintln!("bsdelta: old file: {}: {e}", old_path.display());
            return 1;
        }
    };

    let output_path = match (opts.use_stdout, &opts.output_file) {
        (false, Some(path)) => Some(path.as_path()),
        _ => None,
    };
    let mut output_writer: Box<dyn Write> = match output_path {
        Some(path) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "bsdelta: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return 1;
            }
            match File::create(path) {
                Ok(f) => Box::new(BufWriter::with_capacity(BUF_SIZE, f)),
                Err(e) => {
                    eprintln!("bsdelta: output file: {}: {e}", path.display());
                    return 1;
                }
            }
        }
        None => Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock())),
    };

    let result: Result<PatchStats, crate::PatchError> = old.apply(patcher, &mut output_writer);
    drop(output_writer);

    if let (Err(_), Some(path)) = (&result, output_path) {
        let _ = std::fs::remove_file(path);
    }

    match result {
        Ok(stats) => {
            if opts.verbose > 0 && !opts.quiet {
                eprintln!(
                    "bsdelta: output size: {}, controls: {}",
                    stats.new_size, stats.controls
                );
            }
            if opts.json_output {
                let json = serde_json::json!({
                    "command": "apply",
                    "output_size": stats.new_size,
                    "controls": stats.controls,
                    "add_bytes": stats.add_bytes,
                    "copy_bytes": stats.copy_bytes,
                });
                eprintln!("{json}");
            }
            0
        }
        Err(e) => {
            eprintln!("bsdelta: apply error: {e}");
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();

    let default_filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mut opts = resolve_options(cli);

    // Warn if -c overrides output filename.
    if opts.use_stdout && !opts.quiet {
        if let Some(path) = opts.output_file.take() {
            eprintln!(
                "bsdelta: warning: -c option overrides output filename: {}",
                path.display()
            );
        }
    }

    let exit_code = match opts.command {
        Command::Apply => cmd_apply(&opts),
        Command::Header => cmd_header(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
