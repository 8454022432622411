//! End-to-end run: feed lookup, three drafts, review, boilerplate, output.

use std::io::Write;
use thiserror::Error;
use tracing::Instrument;

use crate::compose::{self, ComposeError, Selection, ServiceError, DRAFT_COUNT};
use crate::config::{ConfigError, ModelSettings};
use crate::feed::{self, FeedEntry, FetchError};
use crate::post;

const FINAL_POST_BANNER: &str = "!------------------ Final Post ------------------!";

/// Broad classes of pipeline failure, independent of which stage raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    NotFound,
    Service,
    Data,
    Output,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Article '{title}' not found in feed: {feed_url}")]
    NotFound { title: String, feed_url: String },

    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Chat service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Invalid response format from chat service: {0}")]
    Data(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<ComposeError> for PipelineError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::Config(e) => PipelineError::Config(e),
            ComposeError::Validation(msg) => PipelineError::Validation(msg),
            ComposeError::Service(e) => PipelineError::Service(e),
            ComposeError::Data(msg) => PipelineError::Data(msg),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Config(_) => ErrorKind::Configuration,
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::Fetch(FetchError::InvalidUrl(_)) => ErrorKind::Validation,
            PipelineError::Fetch(FetchError::Parse(_) | FetchError::InvalidUtf8) => ErrorKind::Data,
            PipelineError::Fetch(_) | PipelineError::Service(_) => ErrorKind::Service,
            PipelineError::Data(_) => ErrorKind::Data,
            PipelineError::Output(_) => ErrorKind::Output,
        }
    }
}

/// What the process does with a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ErrorPolicy {
    /// Log the failure and finish normally.
    #[default]
    Log,
    /// Return the failure so the process exits non-zero.
    Propagate,
}

impl ErrorPolicy {
    /// Applies the policy to a run result. `Ok(None)` means a failure was
    /// logged and swallowed.
    pub fn settle<T>(self, result: Result<T, PipelineError>) -> Result<Option<T>, PipelineError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self == ErrorPolicy::Log => {
                tracing::error!(kind = ?e.kind(), error = %e, "Pipeline run failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// How the three drafts are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftMode {
    /// One after another, each printed as soon as it arrives.
    #[default]
    Sequential,
    /// All three in flight together, printed in order once all have returned.
    Concurrent,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct FinalPost {
    pub article: FeedEntry,
    pub drafts: Vec<String>,
    pub selection: Selection,
    pub text: String,
}

pub struct Pipeline {
    http: reqwest::Client,
    settings: ModelSettings,
    draft_mode: DraftMode,
}

impl Pipeline {
    pub fn new(http: reqwest::Client, settings: ModelSettings) -> Self {
        Self {
            http,
            settings,
            draft_mode: DraftMode::default(),
        }
    }

    pub fn with_draft_mode(mut self, draft_mode: DraftMode) -> Self {
        self.draft_mode = draft_mode;
        self
    }

    /// Runs every stage once, writing drafts and the final post to `out`.
    ///
    /// All logging happens inside a `pipeline` span carrying the feed URL and
    /// title. The first failing stage aborts the run.
    pub async fn run<W: Write>(
        &self,
        feed_url: &str,
        title: &str,
        out: &mut W,
    ) -> Result<FinalPost, PipelineError> {
        let span = tracing::info_span!("pipeline", feed = %feed_url, title = %title);
        self.run_stages(feed_url, title, out).instrument(span).await
    }

    async fn run_stages<W: Write>(
        &self,
        feed_url: &str,
        title: &str,
        out: &mut W,
    ) -> Result<FinalPost, PipelineError> {
        let article = self.find_article(feed_url, title).await?;
        let article_text = format!("{}\n{}", article.title, article.body);

        let drafts = self.write_drafts(&article_text, out).await?;

        tracing::info!("Reviewing drafts");
        let selection = compose::select(&self.http, &self.settings, &drafts).await?;
        writeln!(out, "Final Draft")?;
        writeln!(out, "{}", selection.text)?;
        writeln!(out, "\n")?;

        let text = post::assemble(&selection.text, &article.tags, &article.link);
        writeln!(out, "{FINAL_POST_BANNER}")?;
        writeln!(out, "{text}")?;
        writeln!(out, "\n")?;
        out.flush()?;

        tracing::info!(option = ?selection.index.map(|i| i + 1), "Post assembled");
        Ok(FinalPost {
            article,
            drafts,
            selection,
            text,
        })
    }

    /// Fetches the feed and returns the entry titled exactly `title`.
    pub async fn find_article(&self, feed_url: &str, title: &str) -> Result<FeedEntry, PipelineError> {
        let entries = feed::fetch_feed(&self.http, feed_url).await?;

        match feed::locate(&entries, title) {
            Some(entry) => {
                tracing::info!(link = %entry.link, tags = entry.tags.len(), "Article found");
                Ok(entry.clone())
            }
            None => {
                let err = PipelineError::NotFound {
                    title: title.to_string(),
                    feed_url: feed_url.to_string(),
                };
                tracing::error!(error = %err, "Article lookup failed");
                Err(err)
            }
        }
    }

    async fn write_drafts<W: Write>(
        &self,
        article_text: &str,
        out: &mut W,
    ) -> Result<Vec<String>, PipelineError> {
        let generate = || compose::generate(&self.http, &self.settings, article_text);

        match self.draft_mode {
            DraftMode::Sequential => {
                let mut drafts = Vec::with_capacity(DRAFT_COUNT);
                for i in 0..DRAFT_COUNT {
                    tracing::info!(option = i + 1, "Generating draft");
                    let draft = generate().await?;
                    print_draft(out, i, &draft)?;
                    drafts.push(draft);
                }
                Ok(drafts)
            }
            DraftMode::Concurrent => {
                tracing::info!(count = DRAFT_COUNT, "Generating drafts concurrently");
                let drafts =
                    futures::future::try_join_all((0..DRAFT_COUNT).map(|_| generate())).await?;
                for (i, draft) in drafts.iter().enumerate() {
                    print_draft(out, i, draft)?;
                }
                Ok(drafts)
            }
        }
    }
}

fn print_draft<W: Write>(out: &mut W, index: usize, draft: &str) -> std::io::Result<()> {
    writeln!(out, "Option #{}", index + 1)?;
    writeln!(out, "{draft}")?;
    writeln!(out, "\n")
}
