use captcha_autofill::{Config, HttpRecognizer, LivePage, Observer, Solver};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "captcha-autofill")]
#[command(about = "Watch a page's captcha image and auto-fill the solved text")]
#[command(version)]
struct Cli {
    /// Page URL to open
    url: String,

    /// Config file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recognition service endpoint (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Captcha image element id (overrides config)
    #[arg(long)]
    image_id: Option<String>,

    /// Captcha input element id (overrides config)
    #[arg(long)]
    input_id: Option<String>,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> captcha_autofill::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(image_id) = cli.image_id {
        config.image_id = image_id;
    }
    if let Some(input_id) = cli.input_id {
        config.input_id = input_id;
    }

    let stealth = eoka::StealthConfig {
        headless: cli.headless,
        ..Default::default()
    };
    let browser = eoka::Browser::launch_with_config(stealth).await?;
    let page = browser.new_page(&cli.url).await?;

    let adapter = Arc::new(LivePage::new(page, &config));
    let recognizer = Arc::new(HttpRecognizer::new(&config)?);
    let solver = Arc::new(Solver::new(adapter.clone(), recognizer, config.clone()));
    let observer = Observer::new(adapter, solver, config);

    let result = observer.run().await;
    browser.close().await?;

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
    Ok(())
}
