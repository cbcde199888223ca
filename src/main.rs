//! # Folio CLI
//!
//! Usage:
//!   folio page.html -o page.pdf
//!   folio page.html --font DejaVuSans.ttf --title "Report" -o report.pdf
//!   folio page.html --json > primitives.json
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use clap::Parser;
use folio::font::TrueTypeFont;
use folio::pdf::{Metadata, PdfWriter};
use folio::{convert, ConvertOptions, Services};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Lay out an HTML page and draw it to PDF")]
struct Cli {
    /// Markup file to convert
    input: PathBuf,

    /// Where to write the PDF
    #[arg(short, long, value_name = "FILE", default_value = "output.pdf")]
    output: PathBuf,

    /// TrueType font used to measure and draw text (Helvetica otherwise)
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Print the primitive list as JSON instead of writing a PDF
    #[arg(long)]
    json: bool,

    /// Document title for the PDF info dictionary
    #[arg(long)]
    title: Option<String>,

    /// Document author for the PDF info dictionary
    #[arg(long)]
    author: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let html = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let font = match &cli.font {
        Some(path) => {
            let data = fs::read(path)
                .with_context(|| format!("failed to read font {}", path.display()))?;
            Some(TrueTypeFont::from_bytes(data).with_context(|| format!("unusable font {}", path.display()))?)
        }
        None => None,
    };

    let options = ConvertOptions {
        base_path: cli.input.parent().map(|p| p.to_path_buf()),
        ..ConvertOptions::default()
    };
    let mut services = Services::default();
    if let Some(font) = &font {
        services.measure = font;
    }

    let document = convert(&html, &options, services).context("conversion failed")?;

    if cli.json {
        println!("{}", document.to_json()?);
        return Ok(());
    }

    let metadata = Metadata {
        title: cli.title,
        author: cli.author,
    };
    let writer = match &font {
        Some(font) => PdfWriter::with_font(font),
        None => PdfWriter::new(),
    };
    let pdf_bytes = writer.write(&document, &metadata)?;
    fs::write(&cli.output, &pdf_bytes)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    eprintln!(
        "✓ Written {} bytes to {}",
        pdf_bytes.len(),
        cli.output.display()
    );
    Ok(())
}
