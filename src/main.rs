use anyhow::Context;
use docchat::cli::output::Output;
use docchat::cli::{Cli, Commands};
use docchat::utils::toml_config::{DocChatConfig, LogFormat};
use docchat::{AppError, DocChat};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIT_COMMAND: &str = "/quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = match DocChatConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    };
    init_tracing(&config, cli.verbose);

    let result = match cli.command {
        Commands::Config { validate } => show_config(&output, &cli.config, &config, validate),
        Commands::Index {
            corpus,
            source,
            replace,
        } => index(&output, config, &corpus, source, replace).await,
        Commands::Ask {
            question,
            show_context,
        } => ask(&output, config, &question, show_context).await,
        Commands::Chat => chat(&output, config).await,
    };

    if let Err(e) = result {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(config: &DocChatConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("docchat={}", default_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

fn show_config(
    output: &Output,
    path: &Path,
    config: &DocChatConfig,
    validate: bool,
) -> anyhow::Result<()> {
    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    output.kv("generation", &format!("{} ({})", config.generation.kind(), config.generation.model()));
    output.kv("embedding", &format!("{} ({})", config.embedding.kind(), config.embedding.model()));
    output.kv("vector store", config.vector_store.kind());
    output.newline();
    println!("{}", config.to_toml()?);

    if validate {
        config.generation.generation_provider()?;
        config.embedding.embedding_provider()?;
        config.vector_store.store_provider()?;
        output.success("Configuration is valid");
    }
    Ok(())
}

async fn index(
    output: &Output,
    config: DocChatConfig,
    corpus: &Path,
    source: Option<String>,
    replace: bool,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(corpus)
        .await
        .with_context(|| format!("Failed to read corpus {}", corpus.display()))?;
    let source = source.or_else(|| {
        corpus
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    });

    let app = DocChat::from_config(config).await?;
    output.info(&format!(
        "Indexing {} into {}",
        corpus.display(),
        app.store.provider_name()
    ));

    let report = app.index_corpus(&text, source.as_deref(), replace).await?;
    output.success(&format!("{} chunks written", report.chunks_written));
    if report.chunks_written == 0 {
        output.warning("The corpus is empty");
    }
    Ok(())
}

async fn ask(
    output: &Output,
    config: DocChatConfig,
    question: &str,
    show_context: bool,
) -> anyhow::Result<()> {
    let app = DocChat::from_config(config).await?;
    let result = app.chain.invoke(question).await?;

    if show_context {
        output.header("Standalone question");
        output.kv("rewritten", &result.standalone_question);
        output.header("Sources");
        for (rank, chunk) in result.sources.iter().enumerate() {
            output.source(rank + 1, chunk);
        }
    }
    output.answer(&result.answer);
    Ok(())
}

async fn chat(output: &Output, config: DocChatConfig) -> anyhow::Result<()> {
    let app = DocChat::from_config(config).await?;
    if app.store.count().await? == 0 {
        output.warning("The vector store is empty; run `docchat index <CORPUS>` first");
    }

    let mut session = app.session();
    output.banner();
    output.hint(&format!(
        "Press Enter to send, Ctrl-C to cancel a question, {} to exit.",
        QUIT_COMMAND
    ));

    while let Some(line) = output.prompt()? {
        if line == QUIT_COMMAND {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let cancel = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        match session.submit_until(&line, cancel).await {
            Ok(answer) => output.answer(&answer),
            Err(AppError::Cancelled) => output.warning("Cancelled"),
            Err(e) => output.error(&e.to_string()),
        }
    }

    tracing::debug!(turns = session.transcript().len(), "Chat session ended");
    Ok(())
}
