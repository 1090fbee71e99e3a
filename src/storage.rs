// ABOUTME: Export directory layout with atomic writes
// ABOUTME: Maps document slugs to markdown paths inside one export target

use crate::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const WATERMARK_FILE: &str = "_timestamp.txt";
pub const ASSETS_DIR: &str = "assets";

/// Configuration object for one export target, handed to every stage
/// that touches the filesystem.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub export_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub watermark_file: PathBuf,
}

impl ExportPaths {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        let export_dir = export_dir.into();
        ExportPaths {
            assets_dir: export_dir.join(ASSETS_DIR),
            watermark_file: export_dir.join(WATERMARK_FILE),
            export_dir,
        }
    }

    /// `<output_root>/<repository slug>`
    pub fn for_repository(output_root: &Path, repo_slug: &str) -> Result<Self> {
        check_segment(repo_slug)?;
        Ok(Self::new(output_root.join(repo_slug)))
    }

    pub fn ensure_export_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.export_dir)?;
        Ok(())
    }

    /// `<export_dir>/<slug up to the first '.'>/<slug without spaces>.md`
    ///
    /// The prefix directory is required: documents sit one level below
    /// `export_dir` so their `./../assets/` image links resolve.
    pub fn document_path(&self, slug: &str) -> Result<PathBuf> {
        let prefix = slug.split('.').next().unwrap_or_default();
        let file_name = format!("{}.md", slug.replace(' ', ""));
        check_segment(&file_name)?;
        if prefix.trim().is_empty() {
            return Err(Error::InvalidPath(format!(
                "{} has no directory prefix",
                slug
            )));
        }
        check_segment(prefix)?;
        Ok(self.export_dir.join(prefix).join(file_name))
    }

    pub fn asset_path(&self, filename: &str) -> Result<PathBuf> {
        check_segment(filename)?;
        Ok(self.assets_dir.join(filename))
    }
}

/// Rejects anything that is not a single normal path component.
fn check_segment(segment: &str) -> Result<()> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !segment.contains(['/', '\\']) => Ok(()),
        _ => Err(Error::InvalidPath(segment.to_string())),
    }
}

/// Writes through a sibling temp file and renames over `path`, so readers
/// never observe a half-written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    use rand::Rng;

    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidPath(path.display().to_string()))?;
    fs::create_dir_all(parent)?;

    let random: u32 = rand::thread_rng().gen();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{}.{:x}.part", file_name, random));

    if let Err(e) = fs::write(&tmp_path, content) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    fs::rename(&tmp_path, path)?;

    Ok(())
}
