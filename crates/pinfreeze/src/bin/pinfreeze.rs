// ABOUTME: CLI binary for Pin & Freeze capture.
// ABOUTME: Captures a URL (or extracts from an HTML file) with a configured selector and prints the HTML or JSON.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pinfreeze_core::{CaptureError, Client, SelectorContract, Settings};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pinfreeze")]
#[command(about = "Capture a page's rendered HTML for a configured selector")]
struct Args {
    /// URL to capture (fetch mode)
    #[arg()]
    url: Option<String>,

    /// HTML file to extract from instead of fetching
    #[arg(long = "html", conflicts_with = "url")]
    html: Option<PathBuf>,

    /// Selector kind: id, class, tag or xpath
    #[arg(long = "type", value_name = "KIND")]
    kind: Option<String>,

    /// Selector value for --type
    #[arg(long = "value", value_name = "V")]
    value: Option<String>,

    /// Legacy selector string (#id, .class or tag)
    #[arg(long = "selector", value_name = "LEGACY", conflicts_with_all = ["kind", "value"])]
    selector: Option<String>,

    /// Settings JSON file to read the capture selector from
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// host[:port] used for the loopback fallback
    #[arg(long = "loopback", value_name = "HOST[:PORT]")]
    loopback: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    timeout: Option<u64>,

    /// Sanitise the captured HTML with the post-content allow-list
    #[arg(long = "sanitize")]
    sanitize: bool,

    /// Output the full result as JSON
    #[arg(long = "json")]
    json_output: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Pick the selector: explicit flags, then the legacy flag, then the settings file.
fn resolve_selector(args: &Args) -> anyhow::Result<SelectorContract> {
    if args.kind.is_some() || args.value.is_some() {
        let mut settings = Settings::default();
        let contract = settings.set_capture_selector(
            args.kind.as_deref().unwrap_or(""),
            args.value.as_deref().unwrap_or(""),
        )?;
        return Ok(contract);
    }

    if let Some(legacy) = &args.selector {
        let settings = Settings {
            capture_selector: Some(legacy.clone()),
            ..Default::default()
        };
        return Ok(settings.capture_selector_contract());
    }

    match &args.config {
        Some(path) => Ok(Settings::load(path)?.capture_selector_contract()),
        None => Ok(SelectorContract::default()),
    }
}

fn build_client(args: &Args) -> Client {
    let mut builder = Client::builder().allow_unfiltered_html(!args.sanitize);
    if let Some(host) = &args.loopback {
        builder = builder.loopback_host(host.clone());
    }
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<CaptureError>() {
        Some(capture) => eprintln!("error: {} (status {})", capture, capture.http_status()),
        None => eprintln!("error: {:#}", err),
    }
}

async fn run(args: &Args) -> anyhow::Result<String> {
    let selector = resolve_selector(args)?;
    let client = build_client(args);

    if let Some(path) = &args.html {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let html = client.extract_html(&raw, &selector)?;
        if args.json_output {
            let out = serde_json::json!({ "html": html, "selector": selector.normalized() });
            return Ok(serde_json::to_string_pretty(&out)?);
        }
        return Ok(html);
    }

    let Some(url) = &args.url else {
        anyhow::bail!("a URL is required, or use --html FILE");
    };

    let result = client.capture(url, &selector).await?;
    if args.json_output {
        Ok(serde_json::to_string_pretty(&result)?)
    } else {
        Ok(result.html)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::from(1)
        }
    }
}
