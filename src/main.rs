// src/main.rs
use std::path::PathBuf;

use clap::Parser;
use scraper::Html;

use faq_extractor::config::SourceConfig;
use faq_extractor::extractors::layouts::compile_selector;
use faq_extractor::extractors::links::{discover_topics, TopicLink};
use faq_extractor::extractors::StrategyDispatcher;
use faq_extractor::fetch::{request_delay, PageCache};
use faq_extractor::record::SourceContext;
use faq_extractor::storage::{file_stem, stats, StorageManager};
use faq_extractor::utils::{self, AppError};

/// Command Line Interface for the FAQ extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for record files and reports
    #[arg(short, long, default_value = "./data")]
    output_dir: String,

    /// Debug mode - save review HTML for topics with pairs flagged for review
    #[arg(short, long)]
    debug: bool,

    /// Regenerate scraped_stats.md in the output directory when done
    #[arg(long)]
    stats: bool,

    /// Delay before each HTTP request in milliseconds (default: FAQ_REQUEST_DELAY_MS or 150)
    #[arg(long)]
    request_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    let delay = request_delay(args.request_delay_ms);
    tracing::debug!("Request delay: {:?}", delay);

    // 3. Load the source configuration and initialize storage
    let config = SourceConfig::load(&args.config)?;
    let storage = StorageManager::new(&args.output_dir)?;
    let mut pages = PageCache::new(delay);

    // 4. The landing page carries the review date, the authority and the topic index
    let landing = Html::parse_document(pages.get(&config.page_url).await?);
    let context = SourceContext::from_document(&config, &landing)?;
    let dispatcher = StrategyDispatcher::from_config(&config)?;

    let discovered = match &config.topic_index {
        Some(index) => {
            let selector = compile_selector(&index.selector)?;
            let links = discover_topics(landing.root_element(), &selector, dispatcher.links());
            tracing::info!("Topic index lists {} topic(s)", links.len());
            links
        }
        None => Vec::new(),
    };
    let topics = faq_extractor::topic_pages(&config, discovered);
    drop(landing);

    // 5. Extract every topic
    let mut writer = storage.open_records(&config.source_name)?;
    let mut success_count = 0;
    let mut failure_count = 0;
    let mut review_count = 0;

    for TopicLink { title: topic, url } in &topics {
        tracing::info!("Processing topic '{}' from {}", topic, url);

        let body = match pages.get(url).await {
            Ok(body) => body.to_string(),
            Err(e) => {
                tracing::error!("Failed to load page for topic '{}': {}", topic, e);
                failure_count += 1;
                continue;
            }
        };

        let document = Html::parse_document(&body);
        let extraction = match faq_extractor::extract_records(&dispatcher, topic, &document, &context) {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::error!("Failed to extract topic '{}': {}", topic, e);
                failure_count += 1;
                continue;
            }
        };

        if extraction.records.is_empty() {
            tracing::warn!("Topic '{}' yielded no records, the page layout may have changed", topic);
        }
        writer.write_all(&extraction.records)?;
        success_count += 1;

        if extraction.needs_review > 0 {
            review_count += extraction.needs_review;
            if args.debug {
                let path = storage.review_dir()?.join(format!("{}.html", file_stem(topic)));
                if let Err(e) = utils::html_debug::save_review_html(&body, &path) {
                    tracing::warn!("Failed to create review HTML: {}", e);
                }
            }
        }
    }

    let written = writer.written();
    let records_path = writer.finish()?;
    tracing::info!("Wrote {} record(s) to {}", written, records_path.display());
    tracing::debug!("{} distinct page(s) loaded", pages.len());

    // 6. Optional stats report
    if args.stats {
        stats::save_stats(storage.base_dir())?;
    }

    tracing::info!(
        "Processing finished. Success: {}, Failures: {}, Pairs for review: {}",
        success_count,
        failure_count,
        review_count
    );

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any records from {} topic(s)",
            failure_count
        )));
    }

    Ok(())
}
