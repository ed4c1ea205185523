use clap::{Parser, Subcommand};
use quire::config::{self, SiteConfig};
use quire::deploy::{self, DeployError, DeployOptions, DirectoryTransfer, UploadScope};
use quire::generate::{self, BuildOptions};
use quire::ledger::Ledger;
use quire::types::SiteLayout;
use quire::{output, scan};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Shared flags for commands that convert sources.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Reconvert every source, not only new and changed ones
    #[arg(long)]
    convert_all: bool,
}

/// Shared flags for commands that upload.
#[derive(clap::Args, Clone)]
struct DeployArgs {
    /// Upload everything in public_html/, not only changed outputs
    #[arg(long, conflicts_with = "res")]
    all: bool,

    /// Also upload a resource folder: res, css, js, font or img
    #[arg(long, value_name = "SCOPE")]
    res: Option<UploadScope>,

    /// Remote directory to mirror into (overrides deploy.target)
    #[arg(long)]
    target: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Plain-text to HTML website generator")]
#[command(long_about = "\
Plain-text to HTML website generator

Pages are written in a light plain-text markup (or markdown) and turned
into HTML. Only new and changed sources are converted, and only changed
pages are uploaded. Posts in page_sources/news/ are collected into a news
listing automatically.

Site structure:

  mysite/
  ├── config/config.toml        # Site config (optional)
  ├── config/import/            # Snippets for @import: \"file\"
  ├── page_sources/
  │   ├── index.txt             # Light markup page
  │   ├── about.mdml            # Markdown page
  │   ├── news.txt              # News listing (maintained by quire)
  │   └── news/
  │       └── 20240301-fair.txt # News post
  ├── public_html/              # Output, uploaded as-is
  └── private/ledger.txt        # Change-tracking ledger

Run 'quire gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site directory
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    /// Print the full error structure on failure
    #[arg(long, global = true)]
    debug: bool,

    /// Log progress as well as warnings
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List sources that need converting
    Status,
    /// Convert new and changed sources into pages
    Build(BuildArgs),
    /// Upload changed pages to the remote
    Deploy(DeployArgs),
    /// Build, then deploy
    Publish {
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        deploy: DeployArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut debug = cli.debug;
    match run(&cli, &mut debug) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(err.as_ref(), debug);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn print_error(err: &dyn Error, debug: bool) {
    if debug {
        eprintln!("{err:#?}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("caused by: {cause:#?}");
            source = cause.source();
        }
    } else {
        eprintln!("Error: {err}");
    }
}

fn run(cli: &Cli, debug: &mut bool) -> Result<(), Box<dyn Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let layout = SiteLayout::new(&cli.site);
    let site_config = config::load_config(&layout.root)?;
    *debug |= site_config.limits.debug_errors;
    let mut ledger = Ledger::load(&layout)?.with_size_limit(site_config.size_limit());

    match &cli.command {
        Command::Status => {
            let report = scan::scan(&layout, &site_config, &ledger)?;
            output::print_scan_output(&report, &ledger.summary());
        }
        Command::Build(args) => {
            build(&layout, &site_config, &mut ledger, args)?;
        }
        Command::Deploy(args) => {
            upload(&layout, &site_config, &mut ledger, args)?;
        }
        Command::Publish { build: b, deploy: d } => {
            build(&layout, &site_config, &mut ledger, b)?;
            upload(&layout, &site_config, &mut ledger, d)?;
        }
        Command::GenConfig => {}
    }
    Ok(())
}

fn build(
    layout: &SiteLayout,
    site_config: &SiteConfig,
    ledger: &mut Ledger,
    args: &BuildArgs,
) -> Result<(), Box<dyn Error>> {
    println!("==> Building {}", layout.root.display());
    let options = BuildOptions {
        convert_all: args.convert_all,
        now: chrono::Local::now().naive_local(),
    };
    let report = generate::build(layout, site_config, ledger, options)?;
    ledger.save(layout)?;
    output::print_build_output(&report);
    Ok(())
}

fn upload(
    layout: &SiteLayout,
    site_config: &SiteConfig,
    ledger: &mut Ledger,
    args: &DeployArgs,
) -> Result<(), Box<dyn Error>> {
    let target = args
        .target
        .clone()
        .or_else(|| site_config.deploy.target.clone())
        .ok_or(DeployError::NoTarget)?;
    println!("==> Deploying to {}", target.display());

    let options = DeployOptions {
        scope: if args.all { Some(UploadScope::All) } else { args.res },
        remote_root: site_config.deploy.remote_root.clone(),
        prune: site_config.deploy.prune,
    };
    let mut transfer = DirectoryTransfer::new(target);
    let result = deploy::deploy(&mut transfer, layout, ledger, &options);
    // Confirmed uploads are marked even when the batch failed part way.
    ledger.save(layout)?;
    output::print_deploy_output(&result?);
    Ok(())
}
