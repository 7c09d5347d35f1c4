use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use wallfeed::layout::{column_count_for_width, LayoutCache};
use wallfeed::liked::{open_or_memory, LikedStore};

#[derive(Parser)]
#[command(name = "wallfeed", about = "Inspect the locally liked wallpapers")]
struct Cli {
    /// Liked-set database (defaults to the user data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage liked images
    Liked {
        #[command(subcommand)]
        action: LikedAction,
    },
    /// Print the masonry placement of the liked images
    Layout {
        /// Number of columns
        #[arg(long, conflicts_with = "width")]
        columns: Option<usize>,
        /// Viewport width in pixels, used to pick the column count
        #[arg(long)]
        width: Option<f32>,
    },
}

#[derive(Subcommand)]
enum LikedAction {
    /// List liked images
    List,
    /// Unlike an image by id
    Remove { id: String },
}

fn main() -> Result<()> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "wallfeed=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut store = LikedStore::load(open_or_memory(cli.db.as_deref()));

    match cli.command {
        Command::Liked {
            action: LikedAction::List,
        } => {
            for image in store.liked() {
                let dims = match (image.width, image.height) {
                    (Some(w), Some(h)) => format!("{}x{}", w, h),
                    _ => "-".to_string(),
                };
                println!("{}\t{}\t{}", image.id, dims, image.url);
            }
        }
        Command::Liked {
            action: LikedAction::Remove { id },
        } => {
            if !store.remove_like(&id) {
                bail!("{} is not liked", id);
            }
            store.flush();
            info!(id = %id, remaining = store.len(), "Removed like");
        }
        Command::Layout { columns, width } => {
            let columns = columns
                .or_else(|| width.map(column_count_for_width))
                .unwrap_or(2);
            let cache = LayoutCache::new();
            for p in cache.compute(store.liked(), columns) {
                println!(
                    "{}\tcol={}\ttop={:.0}\th={:.0}",
                    p.image_id, p.column, p.top, p.display_h
                );
            }
        }
    }

    Ok(())
}
