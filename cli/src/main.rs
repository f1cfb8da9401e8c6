use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One extracted text run per line
    Text,
    /// Document information entries, with dates converted to ISO 8601
    Metadata,
    /// Metadata followed by the text
    All,
}

#[derive(Parser)]
#[command(name = "pdf-stream-strings")]
#[command(about = "Extract text and metadata from PDF files in a single pass", long_about = None)]
struct Args {
    /// PDF file to extract text from
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Bytes of buffered data above which waiting pages are flushed
    #[arg(long)]
    memory_limit: Option<usize>,

    /// Log parser progress to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn print_metadata(metadata: &pdf_stream_strings::Metadata) {
    for (key, value) in metadata.iter() {
        let converted = match key {
            "CreationDate" | "ModDate" => pdf_stream_strings::pdf_date_to_xsd(value),
            _ => None,
        };
        println!("{}: {}", key, converted.as_deref().unwrap_or(value));
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // open failures are reported by the extractor below
    let mut header = Vec::with_capacity(8);
    if let Ok(file) = std::fs::File::open(&args.file) {
        if file.take(8).read_to_end(&mut header).is_ok()
            && !pdf_stream_strings::is_pdf(&header)
        {
            eprintln!("{:?} is not a PDF file", args.file);
            std::process::exit(1);
        }
    }

    let mut builder = pdf_stream_strings::PdfExtractor::builder();
    if let Some(limit) = args.memory_limit {
        builder = builder.memory_limit(limit);
    }
    let extractor = builder.build();

    let output = match extractor.from_path(&args.file) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error reading {:?}: {}", args.file, e);
            std::process::exit(1);
        }
    };

    match args.format {
        OutputFormat::Text => print!("{}", output),
        OutputFormat::Metadata => print_metadata(output.metadata()),
        OutputFormat::All => {
            print_metadata(output.metadata());
            println!();
            print!("{}", output);
        }
    }

    if let Some(error) = output.error() {
        eprintln!("Error in {:?}: {}", args.file, error);
        std::process::exit(2);
    }
}
