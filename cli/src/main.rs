//! pdfblocks CLI - parse PDFs into blocks and write edits back

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfblocks::{
    export_pdf_with_source, from_json, parse_bytes_with_options, to_json, to_text, BlockType,
    Document, JsonFormat, PageSelection, ParseOptions,
};

#[derive(Parser)]
#[command(name = "pdfblocks")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Parse PDFs into editable blocks and export edits in place", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that parses a PDF.
#[derive(clap::Args)]
struct ParseArgs {
    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Keep going when a page fails to parse
    #[arg(long)]
    lenient: bool,

    /// Classify pages on all cores
    #[arg(long)]
    parallel: bool,

    /// Layout pixels per PDF point
    #[arg(long, default_value = "1.0", env = "PDFBLOCKS_SCALE")]
    scale: f32,
}

impl ParseArgs {
    fn options(&self) -> Result<ParseOptions, Box<dyn std::error::Error>> {
        let mut options = ParseOptions::new()
            .with_scale(self.scale)
            .with_parallel(self.parallel);
        if let Some(pages) = &self.pages {
            options = options.with_pages(PageSelection::parse(pages)?);
        }
        if self.lenient {
            options = options.lenient();
        }
        Ok(options)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a PDF into the JSON block model
    Parse {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Apply an edited JSON model to the original PDF
    Export {
        /// Original PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Edited document model
        #[arg(value_name = "JSON")]
        model: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Replace the text of one block and export the result
    Edit {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Block id (e.g., "p1-b0")
        #[arg(short, long)]
        block: String,

        /// Replacement text; an empty string erases the block
        #[arg(short, long)]
        text: String,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// List the blocks found on each page
    Blocks {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Extract plain text in block order
    Text {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print a marker line before each page
        #[arg(long)]
        page_markers: bool,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            output,
            compact,
            parse,
        } => cmd_parse(&input, output.as_deref(), compact, &parse),
        Commands::Export {
            input,
            model,
            output,
        } => cmd_export(&input, &model, &output),
        Commands::Edit {
            input,
            block,
            text,
            output,
        } => cmd_edit(&input, &block, &text, &output),
        Commands::Blocks { input, parse } => cmd_blocks(&input, &parse),
        Commands::Text {
            input,
            output,
            page_markers,
            parse,
        } => cmd_text(&input, output.as_deref(), page_markers, &parse),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn load(input: &Path, options: ParseOptions) -> Result<Document, Box<dyn std::error::Error>> {
    let pb = spinner("Parsing PDF...");
    let data = fs::read(input)?;
    let mut doc = parse_bytes_with_options(&data, options)?;
    if let Some(name) = input.file_name() {
        doc.metadata.original_file_name = Some(name.to_string_lossy().to_string());
    }
    pb.finish_and_clear();
    log::debug!("parsed {} into {} blocks", input.display(), doc.block_count());
    Ok(doc)
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_parse(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    parse: &ParseArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load(input, parse.options()?)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = to_json(&doc, format)?;
    write_or_print(output, &json)
}

fn cmd_export(input: &Path, model: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read(input)?;
    let doc = from_json(&fs::read_to_string(model)?)?;

    let edited = doc.edited_blocks().len();
    if edited == 0 {
        println!("{}", "No edited blocks; writing the original PDF".yellow());
    }

    let pb = spinner("Re-rendering edited blocks...");
    let bytes = export_pdf_with_source(&source, &doc)?;
    fs::write(output, bytes)?;
    pb.finish_and_clear();

    println!(
        "{} {} ({} edited blocks)",
        "Saved to".green(),
        output.display(),
        edited
    );
    Ok(())
}

fn cmd_edit(
    input: &Path,
    block: &str,
    text: &str,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read(input)?;
    let mut doc = parse_bytes_with_options(&source, ParseOptions::new())?;
    doc.block_mut(block)?.set_text(text)?;

    let bytes = export_pdf_with_source(&source, &doc)?;
    fs::write(output, bytes)?;
    println!("{} {} -> {}", "Edited".green(), block, output.display());
    Ok(())
}

fn cmd_blocks(input: &Path, parse: &ParseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load(input, parse.options()?)?;

    for page in &doc.pages {
        println!(
            "{} {} ({:.0} x {:.0})",
            "Page".cyan().bold(),
            page.page_number,
            page.dimensions.width,
            page.dimensions.height
        );
        for block in &page.blocks {
            let preview: String = block
                .plain_text()
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(60)
                .collect();
            println!(
                "  {:<10} {:<10} {:>4.2}  {}",
                block.id.bold(),
                type_label(block.block_type),
                block.metadata.confidence,
                preview.dimmed()
            );
        }
    }
    Ok(())
}

fn cmd_text(
    input: &Path,
    output: Option<&Path>,
    page_markers: bool,
    parse: &ParseArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load(input, parse.options()?)?;
    write_or_print(output, &to_text(&doc, page_markers))
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Show metadata even when some pages fail
    let doc = load(input, ParseOptions::new().lenient())?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if let Some(ref version) = doc.metadata.version {
        println!("{}: PDF {}", "Format".bold(), version);
    }
    println!("{}: {}", "Pages".bold(), doc.metadata.page_count);

    if let Some(ref title) = doc.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = doc.metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref created) = doc.metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = doc.metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Block Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for block in doc.pages.iter().flat_map(|p| &p.blocks) {
        *counts.entry(type_label(block.block_type)).or_default() += 1;
    }
    for (label, count) in &counts {
        println!("{}: {}", label.bold(), count);
    }

    let text = doc.plain_text();
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());

    Ok(())
}

fn type_label(block_type: BlockType) -> &'static str {
    match block_type {
        BlockType::Paragraph => "paragraph",
        BlockType::Heading => "heading",
        BlockType::Table => "table",
        BlockType::List => "list",
        BlockType::Image => "image",
        BlockType::Quote => "quote",
        BlockType::Code => "code",
    }
}

fn cmd_version() {
    println!("{} {}", "pdfblocks".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF block parsing and in-place reflow tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfblocks".dimmed());
    println!("License: MIT");
}
