use clap::{Parser, Subcommand};
use photostream::types::Node;
use photostream::{album, config, output, photo, store, stream};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "photostream")]
#[command(about = "Static photo-stream dataset builder for photo portfolios")]
#[command(long_about = "\
Static photo-stream dataset builder for photo portfolios

Your filesystem is the data source. Nested directories become albums, and
the whole tree is flattened into one ordered photo-stream JSON document.

Site structure:

  site/
  ├── gallery.toml                 # Config (optional, defaults apply)
  ├── photos/                      # Content root
  │   ├── Landscapes/              # Leaf album (no sub-directories)
  │   │   ├── dawn.jpg
  │   │   └── dawn.min.avif        # Generated derivative
  │   └── Travel/                  # Composite album (has sub-directories)
  │       ├── tokyo.jpg            # Direct photo child
  │       └── Japan/
  │           └── kyoto.jpg
  └── _data/                       # Generated manifests
      ├── albums/Landscapes.json   # One manifest per leaf album
      ├── albums/Travel-Japan.json
      ├── gallery.json             # Root album tree
      └── stream.json              # Flattened photo stream

Run 'photostream gen-config' to generate a documented gallery.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site directory
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    /// Config file (defaults to gallery.toml in the site directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: build the album tree, then flatten it
    Build,
    /// Build the album tree and write the root manifest
    Scan,
    /// Flatten an existing root manifest into the photo stream
    Nest,
    /// Validate the photo tree without writing anything
    Check,
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build => {
            let config = load_site_config(&cli)?;
            run_build(&cli, &config)?;
            run_flatten(&cli, &config)?;
            println!(
                "==> Build complete: {}",
                config.stream_path(&cli.site).display()
            );
        }
        Command::Scan => {
            let config = load_site_config(&cli)?;
            run_build(&cli, &config)?;
        }
        Command::Nest => {
            let config = load_site_config(&cli)?;
            run_flatten(&cli, &config)?;
        }
        Command::Check => {
            let config = load_site_config(&cli)?;
            let photos_path = config.photos_path(&cli.site);
            println!("==> Checking {}", photos_path.display());
            let survey = album::survey(&photos_path)?;
            output::print_check_output(&survey);
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_site_config(cli: &Cli) -> Result<config::GalleryConfig, config::ConfigError> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.site.join("gallery.toml"));
    config::load_config(&config_path)
}

/// Stage 1: walk the photo tree, write leaf manifests and the root manifest.
fn run_build(
    cli: &Cli,
    config: &config::GalleryConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let photos_path = config.photos_path(&cli.site);
    println!("==> Stage 1: Building album tree from {}", photos_path.display());

    init_thread_pool(&config.processing);
    let descriptor = photo::ImageDescriptor::new(&cli.site, &config.derivatives);
    let builder = album::AlbumBuilder::new(config, &descriptor, &cli.site);
    let root = builder.build_root()?;
    output::print_tree_output(&root);

    let tree_path = config.tree_path(&cli.site);
    store::write_manifest(&tree_path, &Node::Album(root), config.keep_order)?;
    println!("Wrote {}", tree_path.display());
    Ok(())
}

/// Stage 2: flatten the persisted tree into the photo stream.
fn run_flatten(
    cli: &Cli,
    config: &config::GalleryConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let tree_path = config.tree_path(&cli.site);
    println!("==> Stage 2: Flattening {}", tree_path.display());

    let resources = stream::flatten(&tree_path, &cli.site)?;
    output::print_stream_output(&resources);

    let stream_path = config.stream_path(&cli.site);
    store::write_manifest(&stream_path, &resources, config.keep_order)?;
    println!("Wrote {}", stream_path.display());
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
