use anyhow::Context;
use clap::Parser;
use documentor::config::{dates, inclusive_end, Command, ConfigureArgs, RunArgs};
use documentor::utils::{logger, validation::Validate};
use documentor::{
    spawn_service, AppConfig, CliArgs, ConfigStore, DocumentPipeline, DownloadLayout,
    PlentyConnector, ProgressEvent, RunRequest,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    logger::init_cli_logger(args.verbose, args.json_logs);
    tracing::info!("Starting documentor");
    if args.verbose {
        tracing::debug!("Config file: {}", args.config);
    }

    let store = ConfigStore::new(&args.config);
    let exit_code = match args.command {
        Command::Init => init(&store)?,
        Command::Configure(edits) => configure(&store, &edits)?,
        Command::Show => show(&store)?,
        Command::Run(run_args) => run(store, &run_args).await?,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn init(store: &ConfigStore) -> anyhow::Result<i32> {
    if store.init_from_template()? {
        println!(
            "Created {}. Fill in url and login with `documentor configure`.",
            store.path().display()
        );
    } else {
        println!("{} already exists", store.path().display());
    }
    Ok(0)
}

fn configure(store: &ConfigStore, edits: &ConfigureArgs) -> anyhow::Result<i32> {
    let current = if store.exists() {
        store.load()?
    } else {
        AppConfig::template()
    };
    let next = current.apply(edits);

    if let Err(e) = next.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        return Ok(1);
    }

    store
        .save(&next)
        .with_context(|| format!("saving {}", store.path().display()))?;
    println!("Configuration saved to {}", store.path().display());
    Ok(0)
}

fn show(store: &ConfigStore) -> anyhow::Result<i32> {
    let config = store.load()?;
    println!("URL:        {}", config.plenty_url);
    println!("Username:   {}", config.login.username);
    println!("Password:   {}", "*".repeat(config.login.password.len()));
    println!("Start date: {}", dates::to_calendar(config.scope.start_date));
    println!(
        "End date:   {} (inclusive)",
        dates::to_calendar(inclusive_end(config.scope.end_date))
    );
    println!("Batch size: {}", config.scope.batch_size);
    println!(
        "Timezone:   {}",
        config
            .timezone
            .as_deref()
            .unwrap_or(documentor::config::store::DEFAULT_TIMEZONE)
    );
    match config.token_issued_at() {
        Some(at) if config.bearer_token.is_some() => println!("Token:      issued {}", at),
        _ => println!("Token:      none"),
    }
    Ok(0)
}

async fn run(store: ConfigStore, run_args: &RunArgs) -> anyhow::Result<i32> {
    let mut layout = DownloadLayout::under(&run_args.download_dir);
    if let Some(output_dir) = &run_args.output_dir {
        layout.output_dir = output_dir.into();
    }

    let pipeline = DocumentPipeline::new(PlentyConnector, store, layout);
    let mut handle = spawn_service(pipeline);
    handle.submit(RunRequest::default()).await?;

    let terminal = handle
        .wait_for_terminal(|event| {
            if !event.is_terminal() {
                println!("{}", event);
            }
        })
        .await;
    handle.shutdown().await;

    let exit_code = match terminal {
        Some(ProgressEvent::Finished(report)) => {
            println!("✅ {}", report.summary());
            for stage in report.stages.iter().filter(|s| s.partial) {
                println!("⚠️  {}: {}", stage.stage, stage.detail);
            }
            if report.is_clean() {
                0
            } else {
                2
            }
        }
        Some(ProgressEvent::Failed(reason)) => {
            eprintln!("❌ {}", reason);
            1
        }
        _ => {
            eprintln!("❌ pipeline stopped without reporting a result");
            1
        }
    };
    Ok(exit_code)
}
