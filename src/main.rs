//! geektime-downloader - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use geektime_downloader::{
    api::{Catalog, GeektimeApi},
    cancel::install_interrupt_handler,
    cli::Args,
    config::{validate_config, Config, CredentialStore},
    download::{BatchSettings, Coordinator, Engines},
    engine::{
        ChromeLauncher, HlsDownloader, MarkdownExtractor, Mp3Fetcher, PdfRenderer,
        StandardVideoEngine, TrainingVideoEngine,
    },
    error::{exit_codes, Result},
    fs::account_folder,
    login::{GeektimeGateway, SignIn},
    navigation::{NavigationOptions, Navigator, Prompter, TerminalPrompter},
    output::{print_banner, print_config_summary, print_error, print_success, print_warning},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cancel = install_interrupt_handler();

    match run(cancel).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) if e.is_cancellation() => {
            print_warning("Interrupted");
            // A prompt thread may still be blocked on stdin; don't wait for it.
            std::process::exit(exit_codes::SUCCESS);
        }
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cancel: CancellationToken) -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    // Print banner
    print_banner();

    // Load settings, then let the command line override them
    let mut config = Config::load_or_default(args.config.as_deref())?;
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    print_config_summary(
        &config.account_identity()?,
        &config.download_folder().display().to_string(),
        &config.format_mask()?.to_string(),
        config.options.quality.as_str(),
    );

    let prompter: Arc<dyn Prompter> = Arc::new(TerminalPrompter::new());
    let proxy = config.options.proxy.clone();
    let store = CredentialStore::default_location()?;
    let gateway = GeektimeGateway::new(proxy.clone());
    let cookies = SignIn::new(&gateway, &store, prompter.clone(), &cancel)
        .run(config.credentials()?)
        .await?;
    let api = Arc::new(GeektimeApi::new(cookies, proxy.as_deref())?);
    print_success("Signed in");

    // Wire the engines to the shared HTTP client
    let catalog: Arc<dyn Catalog> = api.clone();
    let http = api.http_client();
    let hls = HlsDownloader::new(http.clone());
    let engines = Engines {
        document: Arc::new(PdfRenderer::new(api.site_cookies().to_vec())),
        text: Arc::new(MarkdownExtractor::new()),
        audio: Arc::new(Mp3Fetcher::new(http)),
        standard_video: Arc::new(StandardVideoEngine::new(catalog.clone(), hls.clone())),
        training_video: Arc::new(TrainingVideoEngine::new(catalog.clone(), hls)),
    };

    let coordinator = Coordinator::new(
        catalog.clone(),
        engines,
        Arc::new(ChromeLauncher::new()),
        BatchSettings::from_config(&config)?,
        cancel.clone(),
    );

    let options = NavigationOptions {
        preset_product: config.options.product_id,
        university: config.options.university,
        download_all: config.options.download_all,
    };
    let mut navigator = Navigator::new(
        catalog,
        prompter,
        &coordinator,
        account_folder(&config)?,
        options,
        cancel,
    );

    navigator.run().await
}
