//! ketab2epub - catalog payload to EPUB converter

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use ketab2epub::decode::{DecodeOptions, decode_search};
use ketab2epub::io::open_payload;
use ketab2epub::{
    BookId, BookType, ConvertConfig, Converter, DownloadTracker, Error, Sources,
    file_name_from_url,
};

#[derive(Parser)]
#[command(name = "ketab2epub")]
#[command(version, about = "Convert online catalog books to EPUB", long_about = None)]
#[command(after_help = "EXAMPLES:
    ketab2epub convert --book-id 1207 --data 1207.data.zip --index 1207.index.json
    ketab2epub convert --type pdf --book-id 1207 --data 1207.data.zip --pdf 1207.pdf.zip
    ketab2epub inspect --data 1207.data.zip
    ketab2epub urls --book-id 1207 --query 'صحيح'")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a downloaded book payload
    Convert {
        #[arg(long = "type", value_enum, default_value_t = Kind::Epub)]
        kind: Kind,

        #[arg(long)]
        book_id: u64,

        /// Book data payload (raw or zipped JSON)
        #[arg(long, value_name = "PATH")]
        data: PathBuf,

        /// Index response; repeat once per part, in order
        #[arg(long, value_name = "PATH")]
        index: Vec<PathBuf>,

        /// PDF payload (required with --type pdf)
        #[arg(long, value_name = "PATH")]
        pdf: Option<PathBuf>,

        /// Output directory
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// TOML settings file
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Download status file to update on success
        #[arg(long, value_name = "PATH")]
        tracker: Option<PathBuf>,
    },

    /// Show book metadata without converting
    Inspect {
        #[arg(long, value_name = "PATH")]
        data: PathBuf,

        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print a saved search response
    Search {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the catalog URLs for a book
    Urls {
        #[arg(long)]
        book_id: u64,

        /// Also print the search URL for this query
        #[arg(long)]
        query: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Show download flags for a book
    Status {
        #[arg(long, value_name = "PATH")]
        tracker: PathBuf,

        #[arg(long)]
        book_id: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Epub,
    Pdf,
}

impl Kind {
    fn book_type(self, id: BookId) -> BookType {
        match self {
            Kind::Epub => BookType::Epub(id),
            Kind::Pdf => BookType::Pdf(id),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Convert {
            kind,
            book_id,
            data,
            index,
            pdf,
            out,
            config,
            tracker,
        } => {
            let sources = Sources { data, index, pdf };
            let book = kind.book_type(BookId(book_id));
            convert(book, &sources, &out, config.as_deref(), tracker.as_deref())
        }
        Command::Inspect { data, config } => inspect(&data, config.as_deref()),
        Command::Search { path } => search(&path),
        Command::Urls {
            book_id,
            query,
            page,
            config,
        } => urls(BookId(book_id), query.as_deref(), page, config.as_deref()),
        Command::Status { tracker, book_id } => status(&tracker, BookId(book_id)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ConvertConfig, Error> {
    match path {
        Some(path) => ConvertConfig::load(path),
        None => Ok(ConvertConfig::default()),
    }
}

fn convert(
    book: BookType,
    sources: &Sources,
    out: &Path,
    config: Option<&Path>,
    tracker: Option<&Path>,
) -> Result<(), Error> {
    let converter = Converter::new(load_config(config)?);

    if let BookType::Pdf(_) = book
        && sources.pdf.is_none()
    {
        // Tell the user what to fetch
        let meta = converter.load_metadata(&sources.data)?;
        let url = meta.pdf_url.ok_or(Error::MissingPdfUrl)?;
        let name = file_name_from_url(&url).unwrap_or_else(|| format!("book_{}", book.book_id()));
        eprintln!("PDF payload required: download {url} (as {name}) and pass it with --pdf");
        return Err(Error::ResourceUnavailable {
            path: PathBuf::from(name),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing --pdf"),
        });
    }

    let written = converter.convert(book, sources, out)?;
    println!("{}", written.display());

    if let Some(path) = tracker {
        DownloadTracker::open(path)?.mark_downloaded(book, true)?;
    }
    Ok(())
}

fn inspect(data: &Path, config: Option<&Path>) -> Result<(), Error> {
    let converter = Converter::new(load_config(config)?);
    let book = converter.load_book(data)?;
    let meta = &book.metadata;

    println!("File: {}", data.display());
    println!("Title: {}", meta.title);
    if !meta.author.is_empty() {
        println!("Authors: {}", meta.author);
    }
    if let Some(ref desc) = meta.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }
    println!("Pages: {}", book.pages.len());
    println!("Cover: {}", if meta.cover.is_some() { "yes" } else { "no" });
    if let Some(ref url) = meta.pdf_url {
        println!("PDF: {url}");
    }

    Ok(())
}

fn search(path: &Path) -> Result<(), Error> {
    let opts = DecodeOptions::new(ConvertConfig::default().unknown_author);
    let items = open_payload(path, |reader| decode_search(reader, &opts))?;

    for item in &items {
        let pdf = if item.has_pdf { " [pdf]" } else { "" };
        if item.author.is_empty() {
            println!("{}\t{}{}", item.id, item.title, pdf);
        } else {
            println!("{}\t{} - {}{}", item.id, item.title, item.author, pdf);
        }
    }
    Ok(())
}

fn urls(id: BookId, query: Option<&str>, page: u32, config: Option<&Path>) -> Result<(), Error> {
    let endpoints = load_config(config)?.endpoints;
    println!("index: {}", endpoints.index_url(id));
    println!("index part 1: {}", endpoints.paged_index_url(id, 1));
    println!("data: {}", endpoints.data_url(id));
    if let Some(query) = query {
        println!("search: {}", endpoints.search_url(query, page, 20));
    }
    Ok(())
}

fn status(tracker: &Path, id: BookId) -> Result<(), Error> {
    let tracker = DownloadTracker::open(tracker)?;
    for book in [BookType::Epub(id), BookType::Pdf(id)] {
        println!("{}: {}", book.name(), tracker.is_downloaded(book));
    }
    Ok(())
}
