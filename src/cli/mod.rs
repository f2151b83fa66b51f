//! Command-line interface for readshelf.
//!
//! Browses the bundled catalog, manages the personal library and the user's
//! own uploads. State lives in a file-backed key-value store under the
//! configured storage directory. Notices raised by the stores go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config;
use crate::domain::{Book, PositionKind, UploadedFile, UploadedItem};
use crate::library::{AddOutcome, Catalog, PersonalLibrary, SearchIndex};
use crate::notify::{drain, Notice, Notifier};
use crate::storage::{FileStore, KeyValueStore};
use crate::uploads::{accept_upload, UploadStore, UploadTarget};
use crate::viewer::{
    dispatch_item, Extraction, HeuristicMobiExtractor, ReadingPositionStore, ViewerMode,
};

/// readshelf - book catalog and personal library
#[derive(Parser, Debug)]
#[command(name = "readshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog sections
    Sections,

    /// List the books of one section
    Section {
        /// Section ID (e.g. "classics")
        section_id: String,
    },

    /// Browse the A-Z index by letter
    Letter {
        letter: char,
    },

    /// Search the catalog by title or author
    Search {
        /// Search query
        query: String,
    },

    /// Show details of a catalog book
    Show {
        book_id: String,
    },

    /// Keep a catalog book in your personal library
    Keep {
        book_id: String,
    },

    /// Remove a book from your personal library
    Unkeep {
        book_id: String,
    },

    /// List your personal library
    Kept,

    /// Empty your personal library
    ClearKept,

    /// Upload a document (PDF, EPUB, MOBI) or an audiobook
    Upload {
        /// File to upload
        path: PathBuf,

        /// Upload as an audiobook
        #[arg(short, long)]
        audio: bool,

        /// MIME type (inferred from the extension if not specified)
        #[arg(long)]
        mime: Option<String>,
    },

    /// List your uploads
    Uploads,

    /// Open an upload in its viewer
    Open {
        upload_id: String,
    },

    /// Remove an upload
    Remove {
        upload_id: String,
    },

    /// Remove every upload
    ClearUploads,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Sections => list_sections(),
            Commands::Section { section_id } => show_section(&section_id),
            Commands::Letter { letter } => show_letter(letter),
            Commands::Search { query } => search_catalog(&query),
            Commands::Show { book_id } => show_book(&book_id).await,
            Commands::Keep { book_id } => keep_book(&book_id).await,
            Commands::Unkeep { book_id } => unkeep_book(&book_id).await,
            Commands::Kept => list_kept().await,
            Commands::ClearKept => clear_kept().await,
            Commands::Upload { path, audio, mime } => upload_file(path, audio, mime).await,
            Commands::Uploads => list_uploads().await,
            Commands::Open { upload_id } => open_upload(&upload_id).await,
            Commands::Remove { upload_id } => remove_upload(&upload_id).await,
            Commands::ClearUploads => clear_uploads().await,
            Commands::Config => show_config(),
        }
    }
}

// ----------------------------------------------------------------------------
// Shared state
// ----------------------------------------------------------------------------

async fn open_storage() -> Result<Arc<dyn KeyValueStore>> {
    let cfg = config::config()?;
    let store = FileStore::open(cfg.storage.clone(), Some(cfg.limits.storage_quota_bytes))
        .await
        .with_context(|| format!("Failed to open storage: {}", cfg.storage.display()))?;
    Ok(Arc::new(store))
}

fn print_notices(rx: &mut UnboundedReceiver<Notice>) {
    for notice in drain(rx) {
        eprintln!("{}", notice);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn print_book_table(books: &[&Book]) {
    println!("{:<36} {:<40} {:<24}", "ID", "TITLE", "AUTHOR");
    println!("{}", "-".repeat(100));
    for book in books {
        println!(
            "{:<36} {:<40} {:<24}",
            truncate(&book.id, 36),
            truncate(&book.title, 40),
            truncate(&book.author, 24)
        );
    }
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

fn list_sections() -> Result<()> {
    let catalog = Catalog::bundled()?;

    let featured = catalog.featured();
    println!("Featured: {} by {}\n", featured.title, featured.author);

    println!("{:<14} {:<28} {:<8}", "ID", "TITLE", "BOOKS");
    println!("{}", "-".repeat(52));
    for section in catalog.sections() {
        println!(
            "{:<14} {:<28} {:<8}",
            section.id,
            truncate(&section.title, 28),
            section.books.len()
        );
    }

    Ok(())
}

fn show_section(section_id: &str) -> Result<()> {
    let catalog = Catalog::bundled()?;
    let section = catalog
        .section(section_id)
        .ok_or_else(|| anyhow::anyhow!("Section not found: {}", section_id))?;

    if section.is_az {
        println!("{} is browsed by letter. Use 'readshelf letter <L>'.", section.title);
        return Ok(());
    }

    println!("{}\n", section.title);
    let books: Vec<&Book> = section.books.iter().collect();
    print_book_table(&books);

    Ok(())
}

fn show_letter(letter: char) -> Result<()> {
    let catalog = Catalog::bundled()?;
    let books = catalog.letter(letter);

    if books.is_empty() {
        println!("No books under letter: {}", letter);
        return Ok(());
    }

    print_book_table(&books);
    match catalog.letter_link(letter) {
        Some(link) => println!("\nFolder: {}", link),
        None => println!("\nNo folder available for {}", letter.to_ascii_uppercase()),
    }

    Ok(())
}

fn search_catalog(query: &str) -> Result<()> {
    let cfg = config::config()?;
    let catalog = Catalog::bundled()?;
    let index = SearchIndex::new(&catalog, cfg.search.max_results);

    let results = index.search(query);
    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\":\n", results.len(), query);
    print_book_table(&results);

    Ok(())
}

async fn show_book(book_id: &str) -> Result<()> {
    let catalog = Catalog::bundled()?;
    let book = catalog
        .find(book_id)
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", book_id))?;

    let storage = open_storage().await?;
    let library = PersonalLibrary::open(storage, Notifier::silent()).await;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  {}", book.title);
    println!("  by {}", book.author);
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("{}", book.summary);
    println!();
    println!("Cover:     {}", book.cover);
    if let Some(category) = &book.category {
        println!("Category:  {}", category);
    }
    if book.is_audiobook {
        println!("Duration:  {}", book.duration.as_deref().unwrap_or("unknown"));
        if let Some(url) = &book.audio_url {
            println!("Stream:    {}", url);
        }
    }
    match book.download_link() {
        Some(link) => println!("Download:  {}", link),
        None => println!("Download:  (not available)"),
    }
    println!(
        "Library:   {}",
        if library.contains(&book.id) { "kept" } else { "not kept" }
    );

    Ok(())
}

// ----------------------------------------------------------------------------
// Personal library
// ----------------------------------------------------------------------------

async fn keep_book(book_id: &str) -> Result<()> {
    let catalog = Catalog::bundled()?;
    let book = catalog
        .find(book_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", book_id))?;

    let (notifier, mut rx) = Notifier::channel();
    let mut library = PersonalLibrary::open(open_storage().await?, notifier).await;

    if library.add(book).await == AddOutcome::Added {
        println!("Kept: {}", book_id);
    }
    print_notices(&mut rx);

    Ok(())
}

async fn unkeep_book(book_id: &str) -> Result<()> {
    let (notifier, mut rx) = Notifier::channel();
    let mut library = PersonalLibrary::open(open_storage().await?, notifier).await;

    let removed = library.remove(book_id).await;
    print_notices(&mut rx);

    if removed.is_none() {
        anyhow::bail!("Not in your library: {}", book_id);
    }
    Ok(())
}

async fn list_kept() -> Result<()> {
    let (notifier, mut rx) = Notifier::channel();
    let library = PersonalLibrary::open(open_storage().await?, notifier).await;
    print_notices(&mut rx);

    if library.is_empty() {
        println!("Your library is empty. Use 'readshelf keep <book-id>' to add books.");
        return Ok(());
    }

    let books: Vec<&Book> = library.books().iter().collect();
    print_book_table(&books);
    println!("\nTotal: {} books", library.len());

    Ok(())
}

async fn clear_kept() -> Result<()> {
    let (notifier, mut rx) = Notifier::channel();
    let mut library = PersonalLibrary::open(open_storage().await?, notifier).await;
    library.clear().await;
    print_notices(&mut rx);
    Ok(())
}

// ----------------------------------------------------------------------------
// Uploads
// ----------------------------------------------------------------------------

async fn open_uploads() -> Result<(UploadStore, UnboundedReceiver<Notice>)> {
    let cfg = config::config()?;
    let (notifier, rx) = Notifier::channel();
    let store = UploadStore::open(open_storage().await?, notifier, cfg.limits).await;
    Ok((store, rx))
}

async fn upload_file(path: PathBuf, audio: bool, mime: Option<String>) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", path.display()))?;

    let target = if audio {
        UploadTarget::Audio
    } else {
        UploadTarget::Documents
    };
    accept_upload(&name, target)?;

    let file = UploadedFile::from_path(&path, mime.as_deref()).await?;
    let (mut store, mut rx) = open_uploads().await?;
    // Restore notices are noise here
    drain(&mut rx);

    let receipt = store.add(file).await;
    print_notices(&mut rx);

    println!("Uploaded: {} ({})", receipt.id, receipt.kind);
    if !receipt.persist.written {
        println!("Warning: the upload is kept for this session only");
    }

    Ok(())
}

fn print_upload_row(item: &UploadedItem) {
    let opened = item
        .last_opened_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<44} {:<6} {:>10} {:<16}",
        truncate(&item.id, 44),
        if item.is_audio { "audio" } else { "doc" },
        item.size_bytes,
        opened
    );
}

async fn list_uploads() -> Result<()> {
    let (store, mut rx) = open_uploads().await?;
    print_notices(&mut rx);

    if store.is_empty() {
        println!("No uploads. Use 'readshelf upload <path>' to add your own files.");
        return Ok(());
    }

    println!("{:<44} {:<6} {:>10} {:<16}", "ID", "KIND", "BYTES", "LAST OPENED");
    println!("{}", "-".repeat(80));

    if let Some(recent) = store.most_recent() {
        print_upload_row(recent);
        println!("{}", "-".repeat(80));
    }
    for item in store.others() {
        print_upload_row(item);
    }

    println!("\nTotal: {} uploads", store.len());

    Ok(())
}

async fn open_upload(upload_id: &str) -> Result<()> {
    let cfg = config::config()?;
    let (mut store, mut rx) = open_uploads().await?;
    drain(&mut rx);

    store.mark_opened(upload_id).await?;
    print_notices(&mut rx);

    let item = store
        .get(upload_id)
        .ok_or_else(|| anyhow::anyhow!("Upload not found: {}", upload_id))?;

    let mode = dispatch_item(item)?;
    println!("Opening {} ({})", item.name, mode);

    let positions = ReadingPositionStore::new(open_storage().await?);
    match mode {
        ViewerMode::TextExtraction => {
            let extractor = HeuristicMobiExtractor::new(cfg.viewer.mobi_min_readable_chars);
            match extractor.extract_off_thread(item.content_handle()).await {
                Extraction::Text(text) => println!("\n{}", text),
                Extraction::Insufficient { readable_chars } => {
                    eprintln!(
                        "[warning] MOBI preview unavailable: only {} readable characters found. \
                         Download the file to read it in a dedicated reader.",
                        readable_chars
                    );
                }
            }
        }
        ViewerMode::Paginated => {
            if let Some(saved) = positions.load(PositionKind::Pdf, &item.name).await {
                println!("Last position: {:?}", saved.position);
            }
        }
        ViewerMode::Reflowable => {
            if let Some(saved) = positions.load(PositionKind::Epub, &item.name).await {
                println!("Last position: {:?}", saved.position);
            }
        }
        ViewerMode::Playback => {
            if let Some(duration) = &item.duration {
                println!("Duration: {}", duration);
            }
            if let Some(saved) = positions.load(PositionKind::Audio, &item.name).await {
                println!("Last position: {:?}", saved.position);
            }
        }
    }

    Ok(())
}

async fn remove_upload(upload_id: &str) -> Result<()> {
    let (mut store, mut rx) = open_uploads().await?;
    drain(&mut rx);

    let removed = store.remove(upload_id).await;
    print_notices(&mut rx);

    if removed.is_none() {
        anyhow::bail!("Upload not found: {}", upload_id);
    }
    Ok(())
}

async fn clear_uploads() -> Result<()> {
    let (mut store, mut rx) = open_uploads().await?;
    drain(&mut rx);
    store.clear_all().await;
    print_notices(&mut rx);
    Ok(())
}

// ----------------------------------------------------------------------------
// Config
// ----------------------------------------------------------------------------

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  readshelf Configuration");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Storage:  {}", cfg.storage.display());
    println!();
    println!("Limits:");
    println!("  Upload warning:       {} bytes", cfg.limits.upload_warn_bytes);
    println!("  Collection soft cap:  {} bytes", cfg.limits.collection_soft_cap_bytes);
    println!("  Storage quota:        {} bytes", cfg.limits.storage_quota_bytes);
    println!();
    println!("Search:");
    println!("  Max results:  {}", cfg.search.max_results);
    println!();
    println!("Viewer:");
    println!("  MOBI min readable chars:  {}", cfg.viewer.mobi_min_readable_chars);

    Ok(())
}
