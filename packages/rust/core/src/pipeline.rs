//! Pipeline controller: one run claims a keyword, assembles and publishes an
//! article, then records the outcome.
//!
//! 1. Reconcile stale `generating` records (when configured)
//! 2. Resolve the target: explicit keyword, or the next queued by priority
//! 3. Claim it: `queued|failed|published → generating`, stamped and persisted
//! 4. Assemble → publish locally
//! 5. Commit `generating → published` (or `failed` on error)
//! 6. Dispatch mirror push and cache revalidation as background tasks

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use seopress_generation::{GenerationClient, TextGenerator};
use seopress_shared::{
    AppConfig, GeneratedDocument, KeywordRecord, KeywordStatus, PublishConfig, Result,
    SeoPressError,
};
use seopress_storage::{KeywordStore, select_next};

use crate::assembler::{Assembler, AssemblyProgress, SilentProgress};
use crate::mirror::RepositoryMirror;
use crate::publisher::{ArticleWrite, PublishedDocument, Publisher};
use crate::revalidate::Revalidator;

/// Upper bound for `store.stale_after_minutes` (about a century).
const MAX_STALE_MINUTES: i64 = 60 * 24 * 365 * 100;

/// Age after which a `generating` record counts as abandoned, clamped so
/// oversized config values cannot overflow `chrono::Duration`.
pub fn stale_after_duration(minutes: u64) -> chrono::Duration {
    let minutes = i64::try_from(minutes).unwrap_or(i64::MAX).min(MAX_STALE_MINUTES);
    chrono::Duration::minutes(minutes)
}

/// What to generate.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Explicit keyword; `None` picks the next queued keyword.
    pub keyword: Option<String>,
}

impl RunRequest {
    pub fn next() -> Self {
        Self::default()
    }

    pub fn for_keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
        }
    }
}

/// Result of a run that did not fail.
#[derive(Debug)]
pub enum RunOutcome {
    Published {
        keyword: String,
        title: String,
        url: String,
        path: PathBuf,
        word_count: usize,
        side_effects: SideEffects,
    },
    /// Nothing to do; the table was not modified.
    NoEligible { message: String },
}

impl RunOutcome {
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Self::Published { keyword, .. } => Some(keyword),
            Self::NoEligible { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Published { keyword, url, .. } => format!("Published '{keyword}' at {url}"),
            Self::NoEligible { message } => message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Side effects
// ---------------------------------------------------------------------------

/// Background tasks started after a successful commit. Their failures are
/// logged, never returned.
#[derive(Default)]
pub struct SideEffects {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SideEffects {
    fn push(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task to finish.
    pub async fn settle(self) {
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "side effect task did not complete");
            }
        }
    }

    /// Let the tasks run on without waiting for them.
    pub fn detach(self) {
        if !self.tasks.is_empty() {
            debug!(count = self.tasks.len(), "side effects detached");
        }
    }
}

impl std::fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tasks.iter().map(|(name, _)| *name).collect();
        f.debug_struct("SideEffects").field("tasks", &names).finish()
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller {
    store: KeywordStore,
    assembler: Assembler<Arc<dyn TextGenerator>>,
    publisher: Publisher,
    mirror: Option<Arc<RepositoryMirror>>,
    revalidator: Option<Arc<Revalidator>>,
    stale_after: Option<chrono::Duration>,
}

impl Controller {
    pub fn new(store: KeywordStore, generator: Arc<dyn TextGenerator>, publish: PublishConfig) -> Self {
        Self {
            store,
            assembler: Assembler::new(GenerationClient::new(generator), publish.clone()),
            publisher: Publisher::new(publish),
            mirror: None,
            revalidator: None,
            stale_after: None,
        }
    }

    /// Wire every component from the application config.
    pub fn from_config(config: &AppConfig, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        config.validate()?;

        let store = KeywordStore::new(&config.store.keywords_path);
        let mut controller = Self::new(store, generator, config.publish.clone());

        if let Some(mirror) = RepositoryMirror::from_config(&config.mirror)? {
            controller = controller.with_mirror(mirror);
        }
        if let Some(revalidator) = Revalidator::from_config(&config.revalidate)? {
            controller = controller.with_revalidator(revalidator);
        }
        if config.store.stale_after_minutes > 0 {
            controller = controller
                .with_stale_after(Some(stale_after_duration(config.store.stale_after_minutes)));
        }
        Ok(controller)
    }

    pub fn with_mirror(mut self, mirror: RepositoryMirror) -> Self {
        self.mirror = Some(Arc::new(mirror));
        self
    }

    pub fn with_revalidator(mut self, revalidator: Revalidator) -> Self {
        self.revalidator = Some(Arc::new(revalidator));
        self
    }

    pub fn with_stale_after(mut self, stale_after: Option<chrono::Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn store(&self) -> &KeywordStore {
        &self.store
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        self.run_with_progress(request, &SilentProgress).await
    }

    #[instrument(skip_all, fields(requested = request.keyword.as_deref().unwrap_or("<next>")))]
    pub async fn run_with_progress(
        &self,
        request: RunRequest,
        progress: &dyn AssemblyProgress,
    ) -> Result<RunOutcome> {
        if let Some(max_age) = self.stale_after {
            let reconciled = self
                .with_store(move |s| s.reconcile_stale(max_age, Utc::now()))
                .await?;
            if !reconciled.is_empty() {
                warn!(count = reconciled.len(), keywords = ?reconciled, "stale generations marked failed");
            }
        }

        let records = self.with_store(|s| s.read_all()).await?;
        let target = match resolve_target(&records, request.keyword.as_deref()) {
            Ok(record) => record.clone(),
            Err(message) => {
                info!(%message, "nothing to generate");
                return Ok(RunOutcome::NoEligible { message });
            }
        };

        let keyword = target.keyword.clone();
        let previous = target.status;
        let started_at = Utc::now();
        let claimed = self
            .with_store({
                let keyword = keyword.clone();
                move |s| {
                    s.compare_and_swap_status(&keyword, previous, KeywordStatus::Generating, |r| {
                        r.last_generated = Some(started_at)
                    })
                }
            })
            .await?;
        info!(%keyword, %previous, priority = %claimed.priority, "keyword claimed");

        match self.produce(&claimed, progress).await {
            Ok((document, published)) => self.commit(keyword, document, published).await,
            Err(e) => {
                error!(%keyword, error = %e, "generation failed");
                self.mark_failed(&keyword).await;
                Err(SeoPressError::Pipeline {
                    keyword,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn produce(
        &self,
        record: &KeywordRecord,
        progress: &dyn AssemblyProgress,
    ) -> Result<(GeneratedDocument, PublishedDocument)> {
        let document = self.assembler.assemble(record, progress).await?;
        let published = self.publisher.publish(&document)?;
        Ok((document, published))
    }

    async fn commit(
        &self,
        keyword: String,
        document: GeneratedDocument,
        published: PublishedDocument,
    ) -> Result<RunOutcome> {
        let committed = self
            .with_store({
                let keyword = keyword.clone();
                let url = published.url.clone();
                let title = document.title.clone();
                let excerpt = document.meta_description.clone();
                move |s| {
                    s.compare_and_swap_status(
                        &keyword,
                        KeywordStatus::Generating,
                        KeywordStatus::Published,
                        |r| {
                            r.url = Some(url);
                            r.title = Some(title);
                            r.excerpt = Some(excerpt);
                        },
                    )
                }
            })
            .await;

        if let Err(e) = committed {
            error!(%keyword, error = %e, "article written but status commit failed");
            // On a conflict another writer owns the record; leave it and the
            // file alone. Otherwise the record must not stay `generating`,
            // and a newly created article with no record is removed.
            if !matches!(e.root(), SeoPressError::Conflict(_)) {
                self.mark_failed(&keyword).await;
                if published.write == ArticleWrite::Created {
                    match std::fs::remove_file(&published.path) {
                        Ok(()) => warn!(path = %published.path.display(), "removed uncommitted article"),
                        Err(err) => warn!(path = %published.path.display(), error = %err, "could not remove uncommitted article"),
                    }
                }
            }
            return Err(SeoPressError::Pipeline {
                keyword,
                source: Box::new(e),
            });
        }

        info!(
            %keyword,
            url = %published.url,
            words = document.word_count,
            hash = %published.content_hash,
            "keyword published"
        );
        let side_effects = self.dispatch_side_effects(&published);

        Ok(RunOutcome::Published {
            keyword,
            title: document.title,
            url: published.url,
            path: published.path,
            word_count: document.word_count,
            side_effects,
        })
    }

    async fn mark_failed(&self, keyword: &str) {
        let keyword = keyword.to_string();
        let result = self
            .with_store(move |s| {
                s.compare_and_swap_status(&keyword, KeywordStatus::Generating, KeywordStatus::Failed, |_| {})
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "could not mark keyword as failed");
        }
    }

    fn dispatch_side_effects(&self, published: &PublishedDocument) -> SideEffects {
        let mut effects = SideEffects::default();

        if let Some(mirror) = &self.mirror {
            let mirror = Arc::clone(mirror);
            let doc = published.clone();
            effects.push(
                "mirror",
                tokio::spawn(async move {
                    if let Err(e) = mirror.push(&doc).await {
                        warn!(slug = %doc.slug, error = %e, "mirror push failed");
                    }
                }),
            );
        }

        if let Some(revalidator) = &self.revalidator {
            let revalidator = Arc::clone(revalidator);
            let paths = vec![
                self.publisher.config().url_prefix.clone(),
                published.url.clone(),
            ];
            effects.push(
                "revalidate",
                tokio::spawn(async move {
                    if let Err(e) = revalidator.revalidate(&paths).await {
                        warn!(error = %e, "cache revalidation failed");
                    }
                }),
            );
        }

        effects
    }

    /// Run a store operation on the blocking pool; the store does file I/O
    /// and may wait on the table lock.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&KeywordStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| SeoPressError::Storage(format!("store task failed: {e}")))?
    }
}

/// Pick the record a run should work on, or explain why there is none.
fn resolve_target<'a>(
    records: &'a [KeywordRecord],
    keyword: Option<&str>,
) -> std::result::Result<&'a KeywordRecord, String> {
    match keyword.map(str::trim).filter(|k| !k.is_empty()) {
        Some(keyword) => match records.iter().find(|r| r.keyword == keyword) {
            None => Err(format!("Keyword '{keyword}' not found")),
            Some(r) if r.status == KeywordStatus::Generating => {
                Err(format!("Keyword '{keyword}' is already being generated"))
            }
            Some(r) => Ok(r),
        },
        None => select_next(records).ok_or_else(|| "No queued keywords available".to_string()),
    }
}
