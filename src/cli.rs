use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the catalog as JSON lines.
    List(ListArgs),
    /// Print one chapter with its navigation indices.
    Read(ReadArgs),
    /// Ingest an EPUB into the store through an external converter.
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Book store root (folders named `<name>_data`).
    #[arg(long, default_value = ".")]
    pub books_dir: String,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Book store root (folders named `<name>_data`).
    #[arg(long, default_value = ".")]
    pub books_dir: String,

    /// Book id, i.e. the folder name.
    #[arg(long)]
    pub book: String,

    /// Zero-based chapter index.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub chapter: i64,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Book store root (folders named `<name>_data`).
    #[arg(long, default_value = ".")]
    pub books_dir: String,

    /// Path to the `.epub` file.
    #[arg(long)]
    pub epub: String,

    /// Converter program; receives `<epub> <out_dir>` after any extra args
    /// and must print the book as JSON on stdout.
    #[arg(long)]
    pub command: String,

    /// Extra arguments passed to the converter before the paths.
    #[arg(last = true)]
    pub command_args: Vec<String>,
}
