//! CLI tool keeping only the blue text of a PDF

use pdf_bluetext::{
    extract_blue_paragraphs, FlowStyle, Layout, Pipeline, RebuildOptions, OUTPUT_FILE_NAME,
};
use std::env;
use std::process;
use std::time::Instant;

#[derive(Debug, PartialEq)]
struct Args {
    input: String,
    output: String,
    paragraphs_only: bool,
    layout: Layout,
}

/// Flags may appear anywhere; the first two other arguments are input and output
fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut paragraphs_only = false;
    let mut layout = Layout::Positioned;

    for arg in args {
        match arg.as_str() {
            "--paragraphs" => paragraphs_only = true,
            "--flow" => layout = Layout::Flow(FlowStyle::PARAGRAPH),
            "--compact" => layout = Layout::Flow(FlowStyle::COMPACT),
            "--lines" => layout = Layout::Flow(FlowStyle::LINES),
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let input = positional.next().ok_or("missing input file")?;
    let output = positional
        .next()
        .unwrap_or_else(|| OUTPUT_FILE_NAME.to_string());
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument {}", extra));
    }

    Ok(Args {
        input,
        output,
        paragraphs_only,
        layout,
    })
}

fn usage(program: &str) {
    eprintln!("Usage: {} <pdf_file> [output_file] [--flow | --compact | --lines]", program);
    eprintln!("       {} <pdf_file> --paragraphs", program);
    eprintln!();
    eprintln!("Writes a PDF holding only the blue text, one page per source page.");
    eprintln!("--flow, --compact and --lines lay the text out as labeled paragraphs instead.");
    eprintln!("Default output: {}", OUTPUT_FILE_NAME);
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("bluetext");

    let args = match parse_args(argv.get(1..).unwrap_or_default()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            usage(program);
            process::exit(1);
        }
    };

    if args.paragraphs_only {
        match extract_blue_paragraphs(&args.input) {
            Ok(paragraphs) => {
                for paragraph in &paragraphs {
                    println!("[page {}] {}", paragraph.page, paragraph.text);
                    println!();
                }
                if paragraphs.is_empty() {
                    eprintln!("No blue text found.");
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let start = Instant::now();
    let pipeline = Pipeline::new().with_options(RebuildOptions {
        layout: args.layout,
        ..Default::default()
    });

    match pipeline.run(&args.input, &args.output) {
        Ok(report) => {
            println!("Blue Text Extraction");
            println!("====================");
            println!("File: {}", args.input);
            println!("Pages: {}", report.page_count);
            println!("Output pages: {}", report.output_pages);
            println!("Spans kept: {}", report.total_retained());
            for page in &report.degraded {
                println!("Page {} left blank: {}", page.index + 1, page.reason);
            }
            if !report.has_blue_text() {
                println!("No blue text found; output pages are blank.");
            }
            println!("Output: {}", args.output);
            println!("Processing time: {}ms", start.elapsed().as_millis());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
