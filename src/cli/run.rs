//! Run command implementation

use crate::analysis::LlmClient;
use crate::config::Config;
use crate::dispatch::AlertDispatcher;
use crate::engine::MonitorEngine;
use crate::ingest::{HttpQuoteClient, NewsHub, WsNewsFeed};
use crate::store::{AlertRecorder, FileSubscriptionStore, ParquetAlertSink};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Subscriptions file (overrides store.subscriptions_path)
    #[arg(short, long)]
    pub subscriptions: Option<PathBuf>,

    /// Alert output directory (overrides store.alert_dir)
    #[arg(long)]
    pub alert_dir: Option<PathBuf>,

    /// Do not connect to the news push feed
    #[arg(long)]
    pub no_news_feed: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let subscriptions_path = self
            .subscriptions
            .clone()
            .unwrap_or_else(|| config.store.subscriptions_path.clone());
        let alert_dir = self
            .alert_dir
            .clone()
            .unwrap_or_else(|| config.store.alert_dir.clone());

        let quotes = Arc::new(HttpQuoteClient::new(config.ingest.quote_client_config())?);
        let hub = Arc::new(NewsHub::new(config.ingest.news_retention()));

        let (dispatcher, stream) = AlertDispatcher::channel(config.engine.alert_buffer);
        let dispatcher = if config.analysis.enabled {
            tracing::info!(model = %config.analysis.model, "AI analysis enabled");
            let llm = LlmClient::new(config.analysis.llm_config())?;
            dispatcher.with_analyzer(Arc::new(llm), config.analysis.timeout())
        } else {
            dispatcher
        };
        let dispatcher = Arc::new(dispatcher);
        let dispatch_stats = dispatcher.stats();

        let engine = Arc::new(MonitorEngine::new(
            config.engine.engine_config(),
            quotes,
            hub.clone(),
            Arc::clone(&dispatcher),
        ));

        let store = FileSubscriptionStore::new(&subscriptions_path);
        engine.load_subscriptions(&store).await?;

        let sink = Arc::new(ParquetAlertSink::new(&alert_dir, config.store.flush_batch));
        let recorder = AlertRecorder::new(sink, config.store.flush_interval());
        let recorder_handle = tokio::spawn(recorder.run(stream));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let feed_handle = if config.ingest.news_feed_enabled() && !self.no_news_feed {
            let feed = WsNewsFeed::new(config.ingest.ws_news_config(), hub);
            Some(feed.spawn(shutdown_rx.clone()))
        } else {
            tracing::info!("News push feed disabled");
            None
        };

        let engine_handle = tokio::spawn(Arc::clone(&engine).run(shutdown_rx));

        tracing::info!(
            subscriptions = ?subscriptions_path,
            alert_dir = ?alert_dir,
            "trade-radar running, press Ctrl-C to stop"
        );

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested");
        shutdown_tx.send(true)?;

        engine_handle.await??;
        if let Some(handle) = feed_handle {
            handle.await?;
        }
        let recorded = recorder_handle.await?;

        let dispatched = dispatch_stats.snapshot();
        tracing::info!(
            published = dispatched.published,
            dropped = dispatched.dropped,
            enrichment_fallbacks = dispatched.enrichment_fallbacks,
            saved = recorded.alerts_saved,
            save_failures = recorded.save_failures,
            "trade-radar stopped"
        );
        Ok(())
    }
}
