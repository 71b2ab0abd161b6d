//! folio - EPUB inspection CLI

use std::process::ExitCode;

use clap::Parser;

use folio::read_book;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Inspect EPUB publications", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio book.epub           Show metadata, chapters, and TOC
    folio --json book.epub    Emit the parsed book as JSON")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: String,

    /// Emit the parsed book as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match inspect(&cli.input, cli.json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn inspect(path: &str, json: bool) -> Result<(), String> {
    let book = read_book(path).map_err(|e| e.to_string())?;

    if json {
        let rendered = serde_json::to_string_pretty(&book).map_err(|e| e.to_string())?;
        println!("{rendered}");
        return Ok(());
    }

    let meta = &book.descriptor;
    println!("File: {path}");
    println!("Title: {}", meta.title);
    if !meta.authors.is_empty() {
        println!("Authors: {}", meta.authors.join(", "));
    }
    println!("Language: {}", meta.language);
    if let Some(ref isbn) = meta.isbn {
        println!("ISBN: {isbn}");
    }
    if let Some(ref publisher) = meta.publisher {
        println!("Publisher: {publisher}");
    }
    if let Some(ref desc) = meta.description {
        let desc = desc.trim();
        if desc.chars().count() > 200 {
            let truncated: String = desc.chars().take(200).collect();
            println!("Description: {truncated}...");
        } else {
            println!("Description: {desc}");
        }
    }
    println!("Chapters: {}", book.chapters.len());
    for chapter in &book.chapters {
        let marker = if chapter.warning { " (!)" } else { "" };
        println!("  {:>3}. {}{}", chapter.order, chapter.title, marker);
    }
    println!("TOC entries: {}", book.toc.len());
    for entry in &book.toc {
        println!("  {}- {} -> {}", "  ".repeat(entry.level), entry.title, entry.href);
    }
    if !book.warnings.is_empty() {
        println!("Warnings: {:?}", book.warnings);
    }

    Ok(())
}
