use super::types::{PipelineConfig, PipelineStats};
use crate::metrics::Metrics;
use crate::service::engine::AutocompleteService;
use crate::service::types::{SearchEvent, Suggestion};
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const TREND_CHECK_INTERVAL: Duration = Duration::from_secs(3600);
const TREND_MIN_EVENTS: usize = 5;
const TREND_THRESHOLD: f64 = 1.5;

const TECH_TERMS: &[&str] = &[
    "app", "software", "computer", "tech", "programming", "code", "api", "web", "mobile",
    "android", "ios",
];
const BUSINESS_TERMS: &[&str] = &[
    "company", "business", "service", "product", "market", "sales", "marketing",
];
const ENTERTAINMENT_TERMS: &[&str] = &[
    "movie", "music", "game", "video", "show", "entertainment", "sport", "book",
];

/// The ingestion pipeline: a bounded event queue feeding three workers
/// (batcher, frequency flusher, trend detector). Owns its queue, the
/// pending-frequency map and the trend windows exclusively.
pub struct DataPipeline {
    service: Arc<AutocompleteService>,
    config: PipelineConfig,
    sender: mpsc::Sender<SearchEvent>,
    /// Taken by the batcher on `start`; `None` once running.
    receiver: Mutex<Option<mpsc::Receiver<SearchEvent>>>,
    /// Aggregated frequency deltas awaiting the next flush.
    pending: Mutex<HashMap<String, u64>>,
    /// Per-query event timestamps for the trend detector, fed by the
    /// batcher from the same stream it consumes.
    windows: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<Metrics>,
}

impl DataPipeline {
    pub fn new(
        service: Arc<AutocompleteService>,
        config: PipelineConfig,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let config = config.normalized();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let (shutdown, _) = watch::channel(false);

        Arc::new(Self {
            service,
            config,
            sender,
            receiver: Mutex::new(Some(receiver)),
            pending: Mutex::new(HashMap::new()),
            windows: Mutex::new(HashMap::new()),
            shutdown,
            workers: Mutex::new(Vec::new()),
            metrics,
        })
    }

    /// Spawns the three workers. Calling `start` twice is a no-op.
    pub fn start(self: &Arc<Self>) {
        let Some(receiver) = self.receiver.lock().take() else {
            tracing::warn!("Ingestion pipeline already started");
            return;
        };
        tracing::info!("Starting ingestion pipeline");

        let mut workers = self.workers.lock();

        let batcher = self.clone();
        workers.push(tokio::spawn(async move {
            batcher.run_batcher(receiver).await;
        }));

        let flusher = self.clone();
        workers.push(tokio::spawn(async move {
            flusher.run_frequency_flusher().await;
        }));

        let detector = self.clone();
        workers.push(tokio::spawn(async move {
            detector.run_trend_detector().await;
        }));
    }

    /// Signals the workers and waits for them to drain. Idempotent; returns
    /// only after all workers have quiesced.
    pub async fn stop(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock();
            workers.drain(..).collect()
        };
        if handles.is_empty() {
            return;
        }

        tracing::info!("Stopping ingestion pipeline");
        let _ = self.shutdown.send(true);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Pipeline worker panicked: {}", e);
            }
        }
        tracing::info!("Ingestion pipeline stopped");
    }

    /// Hands an observed query to the pipeline. Never blocks: a full queue
    /// drops the event and bumps the drop counter.
    pub fn enqueue(&self, event: SearchEvent) -> Result<()> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Ingestion queue is full, dropping event");
                self.metrics.record_pipeline_drop();
                self.metrics.record_error("pipeline", "queue_full");
                Err(anyhow::anyhow!("ingestion queue is full"))
            }
            Err(TrySendError::Closed(_)) => Err(anyhow::anyhow!("ingestion pipeline is stopped")),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queue_length: self.sender.max_capacity() - self.sender.capacity(),
            pending_updates: self.pending.lock().len(),
            batch_size: self.config.batch_size,
            flush_interval: format!("{:?}", self.config.flush_interval),
        }
    }

    /// Worker A: buffers events and flushes on size or time, whichever
    /// comes first. On shutdown it drains the queue and flushes once more.
    async fn run_batcher(&self, mut receiver: mpsc::Receiver<SearchEvent>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut buffer: Vec<SearchEvent> = Vec::with_capacity(self.config.batch_size);
        let mut ticker = tokio::time::interval(self.config.flush_interval);

        loop {
            tokio::select! {
                maybe_event = receiver.recv() => {
                    match maybe_event {
                        Some(event) => {
                            self.record_window(&event);
                            buffer.push(event);
                            if buffer.len() >= self.config.batch_size {
                                self.process_batch(&mut buffer);
                            }
                        }
                        None => {
                            self.process_batch(&mut buffer);
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        self.process_batch(&mut buffer);
                    }
                }
                _ = shutdown.changed() => {
                    while let Ok(event) = receiver.try_recv() {
                        self.record_window(&event);
                        buffer.push(event);
                    }
                    self.process_batch(&mut buffer);
                    return;
                }
            }
        }
    }

    /// Worker B: applies the pending frequency deltas to the index at twice
    /// the batch flush cadence, with a final flush on shutdown.
    async fn run_frequency_flusher(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.config.flush_interval * 2);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_frequency_updates();
                }
                _ = shutdown.changed() => {
                    self.flush_frequency_updates();
                    return;
                }
            }
        }
    }

    /// Worker C: hourly trend pass over the activity windows.
    async fn run_trend_detector(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(TREND_CHECK_INTERVAL);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.analyze_trends();
                }
                _ = shutdown.changed() => {
                    return;
                }
            }
        }
    }

    fn record_window(&self, event: &SearchEvent) {
        let query = normalize_query(&event.query);
        if query.is_empty() {
            return;
        }
        self.windows
            .lock()
            .entry(query)
            .or_default()
            .push_back(event.at);
    }

    fn process_batch(&self, buffer: &mut Vec<SearchEvent>) {
        if buffer.is_empty() {
            return;
        }
        tracing::debug!("Processing batch of {} events", buffer.len());

        let mut batch_deltas: HashMap<String, u64> = HashMap::new();
        for event in buffer.iter() {
            let query = normalize_query(&event.query);
            if !query.is_empty() {
                *batch_deltas.entry(query).or_insert(0) += 1;
            }
        }

        {
            let mut pending = self.pending.lock();
            for (query, delta) in &batch_deltas {
                *pending.entry(query.clone()).or_insert(0) += delta;
            }
        }

        self.extract_new_terms(&batch_deltas);

        self.metrics.record_pipeline_batch(buffer.len() as u64);
        buffer.clear();
    }

    /// Promotes observed queries into fresh index candidates.
    fn extract_new_terms(&self, batch_deltas: &HashMap<String, u64>) {
        for (query, delta) in batch_deltas {
            let length = query.chars().count();
            if !(2..=50).contains(&length) {
                continue;
            }
            if *delta < self.config.min_term_frequency {
                continue;
            }

            let suggestion =
                Suggestion::new(query.clone(), *delta).with_category(categorize_query(query));
            self.service.add_suggestion(suggestion);
        }
    }

    fn flush_frequency_updates(&self) {
        let updates = {
            let mut pending = self.pending.lock();
            std::mem::take(&mut *pending)
        };
        if updates.is_empty() {
            return;
        }

        tracing::debug!("Flushing {} frequency updates", updates.len());
        for (term, delta) in updates {
            // Unknown terms are a silent no-op; they only exist in the
            // index once the batcher has promoted them.
            self.service.update_frequency(&term, delta);
        }
    }

    fn analyze_trends(&self) {
        let now = Utc::now();
        let boosts = {
            let mut windows = self.windows.lock();
            compute_trend_boosts(&mut windows, now)
        };

        for (query, frequency, trend_score) in boosts {
            self.service.update_frequency(&query, frequency);
            tracing::info!(
                query = %query,
                trend_score,
                frequency,
                "Detected trending query"
            );
        }
    }

    /// Seeds the queue with synthetic traffic for local testing. Never
    /// blocks; events beyond the queue bound are simply skipped.
    pub fn load_historical_data(&self) {
        let historical_queries = [
            "apple", "application", "app", "android", "amazon", "banana", "book", "basketball",
            "computer", "coding", "developer", "design", "database", "facebook", "google",
            "iphone", "javascript", "java", "machine learning", "mobile", "netflix", "python",
            "programming", "react", "software", "technology", "web development", "youtube",
            "zoom",
        ];

        let base_time = Utc::now() - ChronoDuration::hours(30 * 24);

        for (i, query) in historical_queries.iter().enumerate() {
            for j in 0..(i % 10 + 1) * 100 {
                let event = SearchEvent {
                    query: query.to_string(),
                    user_id: Some(format!("user_{}", j % 1000)),
                    session_id: Some(format!("session_{}", j % 500)),
                    client_addr: None,
                    at: base_time + ChronoDuration::hours(j as i64),
                };
                if self.sender.try_send(event).is_err() {
                    // Skip the rest once the queue fills up.
                    return;
                }
            }
        }

        tracing::info!(
            "Queued historical data for {} queries",
            historical_queries.len()
        );
    }
}

/// Normalises an observed query into index form: lower-cased ASCII letters
/// and digits separated by single spaces.
pub fn normalize_query(query: &str) -> String {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classifies a query through a small keyword lexicon.
pub fn categorize_query(query: &str) -> &'static str {
    let query = query.to_lowercase();

    if TECH_TERMS.iter().any(|term| query.contains(term)) {
        return "tech";
    }
    if BUSINESS_TERMS.iter().any(|term| query.contains(term)) {
        return "business";
    }
    if ENTERTAINMENT_TERMS.iter().any(|term| query.contains(term)) {
        return "entertainment";
    }
    "general"
}

/// Prunes each window to the last 24 hours and returns `(query, boosted
/// frequency, trend score)` for every query whose last hour outweighs the
/// remainder of its day by more than the trend threshold.
pub(crate) fn compute_trend_boosts(
    windows: &mut HashMap<String, VecDeque<DateTime<Utc>>>,
    now: DateTime<Utc>,
) -> Vec<(String, u64, f64)> {
    let hour_ago = now - ChronoDuration::hours(1);
    let day_ago = now - ChronoDuration::hours(24);

    windows.retain(|_, stamps| {
        stamps.retain(|at| *at > day_ago);
        !stamps.is_empty()
    });

    let mut boosts = Vec::new();
    for (query, stamps) in windows.iter() {
        let day_count = stamps.len();
        if day_count < TREND_MIN_EVENTS {
            continue;
        }

        let hour_count = stamps.iter().filter(|at| **at > hour_ago).count();
        if day_count <= hour_count {
            continue;
        }

        let trend_score = hour_count as f64 / (day_count - hour_count) as f64;
        if trend_score > TREND_THRESHOLD {
            let boosted = (day_count as f64 * (1.0 + trend_score)) as u64;
            boosts.push((query.clone(), boosted, trend_score));
        }
    }

    boosts
}
