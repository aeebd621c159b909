//! pdf2docx: convert PDF documents to Word (DOCX).
//!
//! ```text
//! pdf2docx convert report.pdf [report.docx] [--quality medium]
//! pdf2docx batch ./pdfs ./out --no-extract-images
//! pdf2docx info report.pdf --json
//! ```

mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

use convert_core::options::{ConversionOptions, Quality};

#[derive(Parser)]
#[command(name = "pdf2docx", version, about = "Convert PDF files to Word documents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output (debug logging and conversion statistics)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dump effective merged config as TOML and exit
    #[arg(long, global = true)]
    dump_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single PDF file
    Convert {
        /// Input PDF file
        input: PathBuf,

        /// Output DOCX file (defaults to the input name with .docx)
        output: Option<PathBuf>,

        #[command(flatten)]
        flags: ConvertFlags,
    },
    /// Convert every PDF in a directory
    Batch {
        /// Directory containing PDF files
        input_dir: PathBuf,

        /// Directory for the DOCX files
        output_dir: PathBuf,

        #[command(flatten)]
        flags: ConvertFlags,
    },
    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Conversion flags. Each one overrides the config only when given.
#[derive(Args)]
struct ConvertFlags {
    /// Image quality: low, medium or high
    #[arg(short, long)]
    quality: Option<Quality>,

    /// Keep page size and page breaks
    #[arg(short = 'p', long, conflicts_with = "no_preserve_layout")]
    preserve_layout: bool,

    #[arg(long)]
    no_preserve_layout: bool,

    /// Embed images from the PDF
    #[arg(short = 'i', long, conflicts_with = "no_extract_images")]
    extract_images: bool,

    #[arg(long)]
    no_extract_images: bool,

    /// Detect tables in the text layout
    #[arg(short = 't', long, conflicts_with = "no_extract_tables")]
    extract_tables: bool,

    #[arg(long)]
    no_extract_tables: bool,
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl ConvertFlags {
    fn apply(&self, opts: &mut ConversionOptions) {
        if let Some(quality) = self.quality {
            opts.quality = quality;
        }
        if let Some(v) = toggle(self.preserve_layout, self.no_preserve_layout) {
            opts.preserve_layout = v;
        }
        if let Some(v) = toggle(self.extract_images, self.no_extract_images) {
            opts.extract_images = v;
        }
        if let Some(v) = toggle(self.extract_tables, self.no_extract_tables) {
            opts.extract_tables = v;
        }
    }
}

fn effective_options(cli: &Cli) -> ConversionOptions {
    let mut opts = config::load_config();
    if cli.verbose {
        opts.verbose = true;
    }
    match &cli.command {
        Some(Commands::Convert { flags, .. }) | Some(Commands::Batch { flags, .. }) => {
            flags.apply(&mut opts)
        }
        _ => {}
    }
    opts
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let options = effective_options(&cli);

    if cli.dump_config {
        match toml::to_string_pretty(&options) {
            Ok(s) => {
                println!("{}", s);
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }

    if let Err(e) = run(&cli, &options) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli, options: &ConversionOptions) -> Result<()> {
    match &cli.command {
        Some(Commands::Convert { input, output, .. }) => {
            commands::run_convert(input, output.as_deref(), options)
        }
        Some(Commands::Batch {
            input_dir,
            output_dir,
            ..
        }) => commands::run_batch(input_dir, output_dir, options).map(|_| ()),
        Some(Commands::Info { input, json }) => commands::run_info(input, *json),
        None => {
            // Help goes to stderr; a bare invocation is a usage error.
            eprintln!("{}", Cli::command().render_help());
            process::exit(1);
        }
    }
}
