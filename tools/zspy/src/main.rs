use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use zspy::{parse_hex, FrameFormatter, StreamDecoder};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode captured ZAppSI serial traffic")]
struct Opts {
    /// Input is a text hex dump instead of raw bytes
    #[arg(long)]
    hex: bool,

    /// Print one JSON object per frame
    #[arg(long)]
    json: bool,

    /// Only show these domains (comma separated names or ids)
    #[arg(long, value_delimiter = ',', value_name = "DOMAINS")]
    filter: Vec<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Capture file; standard input when omitted
    file: Option<PathBuf>,
}

fn read_input(opts: &Opts) -> Result<Vec<u8>> {
    let raw = match &opts.file {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("reading standard input")?;
            buf
        }
    };

    if opts.hex {
        let text = String::from_utf8(raw).context("hex input is not UTF-8")?;
        Ok(parse_hex(&text)?)
    } else {
        Ok(raw)
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    if opts.no_color {
        colored::control::set_override(false);
    }

    let mut formatter = FrameFormatter::new(opts.json);
    if !opts.filter.is_empty() {
        for name in formatter.set_filters(&opts.filter) {
            eprintln!("unknown domain filter: {name}");
        }
    }

    let input = read_input(&opts)?;
    let mut decoder = StreamDecoder::new();

    for result in decoder.push_bytes(&input) {
        match result {
            Ok(frame) => {
                if let Some(line) = formatter.format_frame(&frame)? {
                    println!("{line}");
                }
            }
            Err(err) => eprintln!("decoder error: {err}; resynchronizing"),
        }
    }

    if decoder.in_frame() {
        eprintln!("capture ends inside a frame");
    }
    if decoder.skipped() > 0 || decoder.errors() > 0 {
        eprintln!(
            "{} frames, {} errors, {} bytes skipped",
            decoder.frames(),
            decoder.errors(),
            decoder.skipped()
        );
    }

    Ok(())
}
