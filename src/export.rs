// ABOUTME: Repository export pipeline from Yuque to a local markdown tree
// ABOUTME: Incremental selection by watermark, per-document failure isolation

use crate::{
    api::{AssetSource, RemoteCatalog},
    assets::{AssetFetcher, AssetReport},
    filter::FilterChain,
    storage::{write_atomic, ExportPaths},
    watermark::{qualifies, read_watermark, write_watermark},
    DocumentSummary, Error, Result,
};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, info_span, warn};

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub repository: String,
    pub examined: usize,
    pub exported: usize,
    pub skipped: usize,
    pub assets_stored: usize,
    pub assets_failed: usize,
    /// Slugs of documents that could not be exported this run.
    pub failed: Vec<String>,
    /// Set only when the run completed and the watermark advanced.
    pub watermark: Option<DateTime<Utc>>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Exporter<'a, C: RemoteCatalog + ?Sized, A: AssetSource + ?Sized> {
    catalog: &'a C,
    assets: &'a A,
    paths: ExportPaths,
}

impl<'a, C: RemoteCatalog + ?Sized, A: AssetSource + ?Sized> Exporter<'a, C, A> {
    pub fn new(catalog: &'a C, assets: &'a A, paths: ExportPaths) -> Self {
        Exporter {
            catalog,
            assets,
            paths,
        }
    }

    /// Exports every document of `namespace/slug` changed since the last
    /// completed run. Resolution and listing failures abort; a failing
    /// document is logged, skipped, and holds the watermark back so the
    /// next run retries it.
    pub fn dump_repository(&self, namespace: &str, slug: &str) -> Result<ExportReport> {
        let span = info_span!("dump_repository", repo = %slug);
        let _enter = span.enter();

        let repos = self.catalog.list_repositories(namespace)?;
        let repo = repos
            .get(slug)
            .ok_or_else(|| Error::RepositoryNotFound(format!("{}/{}", namespace, slug)))?;
        info!(repo_id = repo.remote_id, name = %repo.name, "resolved repository");

        self.paths.ensure_export_dir()?;
        let watermark = read_watermark(&self.paths);

        let docs = self.catalog.list_documents(repo.remote_id)?;
        let qualifying: Vec<&DocumentSummary> =
            docs.iter().filter(|doc| qualifies(doc, watermark)).collect();

        let mut report = ExportReport {
            repository: slug.to_string(),
            examined: docs.len(),
            skipped: docs.len() - qualifying.len(),
            ..ExportReport::default()
        };
        info!(
            total = report.examined,
            changed = qualifying.len(),
            "listed documents"
        );

        let pb = ProgressBar::new(qualifying.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} docs") {
            pb.set_style(style.progress_chars("##-"));
        }

        for doc in qualifying {
            match self.export_document(repo.remote_id, doc) {
                Ok(assets) => {
                    report.exported += 1;
                    report.assets_stored += assets.stored;
                    report.assets_failed += assets.failed;
                }
                Err(e) => {
                    error!(slug = %doc.slug, error = %e, "failed to export document");
                    report.failed.push(doc.slug.clone());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if report.is_complete() {
            let now = Utc::now();
            write_watermark(&self.paths, now)?;
            report.watermark = Some(now);
        } else {
            warn!(
                failed = report.failed.len(),
                "export incomplete, watermark not advanced"
            );
        }

        info!(
            exported = report.exported,
            skipped = report.skipped,
            failed = report.failed.len(),
            assets = report.assets_stored,
            "repository export finished"
        );
        Ok(report)
    }

    /// Fetches one document, rewrites it, saves it, then mirrors its images.
    pub fn export_document(&self, repo_id: u64, doc: &DocumentSummary) -> Result<AssetReport> {
        let path = self.paths.document_path(&doc.slug)?;
        let content = self.catalog.fetch_document(repo_id, &doc.slug)?;

        let (markdown, byproducts) = FilterChain::standard(&content).run(content.body())?;
        write_atomic(&path, markdown.as_bytes())?;
        info!(slug = %doc.slug, path = %path.display(), "saved markdown");

        AssetFetcher::new(self.assets, &self.paths).fetch_all(byproducts.images())
    }
}
