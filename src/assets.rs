// ABOUTME: Downloads images referenced by exported documents into `assets/`
// ABOUTME: Each asset fails on its own without aborting the document

use crate::api::AssetSource;
use crate::storage::{write_atomic, ExportPaths};
use crate::{ImageReference, Result};
use std::fs;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssetReport {
    pub stored: usize,
    pub failed: usize,
}

pub struct AssetFetcher<'a, S: AssetSource + ?Sized> {
    source: &'a S,
    paths: &'a ExportPaths,
}

impl<'a, S: AssetSource + ?Sized> AssetFetcher<'a, S> {
    pub fn new(source: &'a S, paths: &'a ExportPaths) -> Self {
        AssetFetcher { source, paths }
    }

    /// Overwrites `assets/<local_filename>` with the remote bytes.
    pub fn fetch_and_store(&self, image: &ImageReference) -> Result<()> {
        let target = self.paths.asset_path(&image.local_filename)?;
        info!(url = %image.original_url, "downloading image");
        let bytes = self.source.fetch_asset(&image.original_url)?;
        write_atomic(&target, &bytes)
    }

    pub fn fetch_all(&self, images: &[ImageReference]) -> Result<AssetReport> {
        let mut report = AssetReport::default();
        if images.is_empty() {
            return Ok(report);
        }

        fs::create_dir_all(&self.paths.assets_dir)?;
        for image in images {
            match self.fetch_and_store(image) {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    warn!(
                        url = %image.original_url,
                        file = %image.local_filename,
                        error = %e,
                        "failed to download image"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
