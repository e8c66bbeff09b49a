//! CLI entry point for `msgview`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use msgview::config::{self, Config};
use msgview::export;
use msgview::model::mail::ParsedMessage;
use msgview::session::Session;

#[derive(Parser)]
#[command(
    name = "msgview",
    version,
    about = "View Outlook .msg and .eml files from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// .msg or .eml file to show
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a message: headers, body, and attachment list
    Show {
        path: PathBuf,
        /// Print the parsed record as JSON
        #[arg(long, conflicts_with = "html")]
        json: bool,
        /// Print the HTML body as-is
        #[arg(long)]
        html: bool,
    },
    /// Print the raw transport headers
    Headers {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Extract all attachments into a directory
    Attachments {
        path: PathBuf,
        /// Output directory (defaults to `export.default_output_dir`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Show { path, json, html }) => cmd_show(&path, json, html, &config),
        Some(Commands::Headers { path, json }) => cmd_headers(&path, json, &config),
        Some(Commands::Attachments { path, output }) => {
            cmd_attachments(&path, output.as_deref(), &config)
        }
        Some(Commands::Config { init }) => cmd_config(init, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.file {
            Some(path) => cmd_show(&path, false, false, &config),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "msgview.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Parse `path` into a message, enforcing the configured size limit.
fn open_message(path: &Path, config: &Config) -> anyhow::Result<ParsedMessage> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let mut session = Session::new();
    let message = session.open(path, config.limits.max_file_size)?;
    Ok(message.clone())
}

/// Print a message as text, raw HTML, or JSON.
fn cmd_show(path: &Path, json: bool, html: bool, config: &Config) -> anyhow::Result<()> {
    let message = open_message(path, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else if html {
        println!("{}", message.record.body_html);
    } else {
        print!("{}", export::text::render_text(&message, &config.display));
    }
    Ok(())
}

/// Print the message's transport headers.
fn cmd_headers(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let message = open_message(path, config)?;
    let headers = &message.record.raw_headers;

    if json {
        println!("{}", serde_json::to_string_pretty(headers)?);
        return Ok(());
    }

    if headers.is_empty() {
        println!("  No transport headers in {}", message.file_name);
        return Ok(());
    }
    let width = headers.keys().map(|k| k.len()).max().unwrap_or(0);
    for (name, value) in headers {
        println!("{:<width$}  {}", format!("{name}:"), value, width = width + 1);
    }
    Ok(())
}

/// Extract every attachment of a message.
fn cmd_attachments(path: &Path, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let output = match output.or(config.export.default_output_dir.as_deref()) {
        Some(dir) => dir.to_path_buf(),
        None => anyhow::bail!("No output directory: pass --output or set export.default_output_dir"),
    };

    let message = open_message(path, config)?;
    let record = &message.record;
    if record.attachments.is_empty() {
        println!("  No attachments in {}", message.file_name);
        return Ok(());
    }

    println!(
        "  Extracting {} attachment(s), {}",
        record.attachments.len(),
        humansize::format_size(record.attachments_size(), humansize::BINARY)
    );

    let pb = ProgressBar::new(record.attachments.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let paths = export::attachment::export_all_attachments(record, &output, &|current, _total| {
        pb.set_position(current as u64);
    })?;

    pb.finish_and_clear();
    println!(
        "  Extracted {} attachment(s) to {}",
        paths.len(),
        output.display()
    );
    if paths.len() < record.attachments.len() {
        eprintln!(
            "  {} attachment(s) could not be written, see the log for details",
            record.attachments.len() - paths.len()
        );
    }

    Ok(())
}

/// Print the effective configuration, or write it out with `--init`.
fn cmd_config(init: bool, config: &Config) -> anyhow::Result<()> {
    if init {
        config::save_config(config)?;
        if let Some(path) = config::config_file_path() {
            println!("  Wrote {}", path.display());
        }
        return Ok(());
    }

    if let Some(path) = config::config_file_path() {
        println!("# {}", path.display());
    }
    println!("# log: {}", config::log_file_path(config).display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "msgview", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
