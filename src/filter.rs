// ABOUTME: Ordered markdown rewrite filters applied before a document is saved
// ABOUTME: Strips Yuque anchors and line breaks, localizes images, adds frontmatter

use crate::{DocumentContent, Frontmatter, ImageReference, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Relative link target for images, as seen from `<exportDir>/<prefix>/<slug>.md`.
pub const ASSET_LINK_PREFIX: &str = "./../assets";

/// Data a filter hands to the pipeline besides the rewritten text.
#[derive(Debug, Default)]
pub struct Byproducts {
    images: Vec<ImageReference>,
}

impl Byproducts {
    pub fn images(&self) -> &[ImageReference] {
        &self.images
    }

    fn record_image(&mut self, image: ImageReference) {
        if !self
            .images
            .iter()
            .any(|known| known.original_url == image.original_url)
        {
            self.images.push(image);
        }
    }
}

pub trait MarkdownFilter {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str, byproducts: &mut Byproducts) -> Result<String>;
}

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

/// Collapses Yuque's invisible `<a name="..."></a>` heading anchors, and the
/// line break that follows one, into a single line break.
pub struct EmptyAnchorFilter;

impl MarkdownFilter for EmptyAnchorFilter {
    fn name(&self) -> &'static str {
        "empty-anchor"
    }

    fn apply(&self, text: &str, _: &mut Byproducts) -> Result<String> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = compiled(&PATTERN, r#"<a\sname="[a-zA-Z0-9]+"></a>\n?"#);
        Ok(re.replace_all(text, "\n").into_owned())
    }
}

/// Points remote images at `./../assets/<filename>` and records each one
/// so the pipeline can download it.
pub struct ImageRewriteFilter;

impl ImageRewriteFilter {
    fn pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        // alt is lazy and single-line so bracketed alt text still matches;
        // filename is the last path segment, query and fragment are dropped
        compiled(
            &PATTERN,
            r"!\[(?P<alt>.*?)\]\((?P<src>https?://[\w.\-]+(?::\d+)?(?:/[^/?#)\s]*)*/(?P<filename>[\w.\-]+)(?:\?[^#)\s]*)?(?:#[^)\s]*)?)\)",
        )
    }
}

impl MarkdownFilter for ImageRewriteFilter {
    fn name(&self) -> &'static str {
        "image-rewrite"
    }

    fn apply(&self, text: &str, byproducts: &mut Byproducts) -> Result<String> {
        let rewritten = Self::pattern().replace_all(text, |caps: &Captures| {
            let filename = &caps["filename"];
            byproducts.record_image(ImageReference {
                original_url: caps["src"].to_string(),
                local_filename: filename.to_string(),
            });
            format!("![{}]({}/{})", &caps["alt"], ASSET_LINK_PREFIX, filename)
        });
        Ok(rewritten.into_owned())
    }
}

/// Turns `<br>`, `<br/>` and `<br />` into plain newlines.
pub struct LineBreakFilter;

impl MarkdownFilter for LineBreakFilter {
    fn name(&self) -> &'static str {
        "line-break"
    }

    fn apply(&self, text: &str, _: &mut Byproducts) -> Result<String> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = compiled(&PATTERN, r"<br\s?/?>");
        Ok(re.replace_all(text, "\n").into_owned())
    }
}

pub struct MetadataHeaderFilter {
    frontmatter: Frontmatter,
}

impl MetadataHeaderFilter {
    pub fn for_document(doc: &DocumentContent) -> Self {
        let description = doc
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&doc.title)
            .to_string();

        MetadataHeaderFilter {
            frontmatter: Frontmatter {
                title: doc.title.clone(),
                description,
                doc_id: doc.remote_id,
            },
        }
    }
}

impl MarkdownFilter for MetadataHeaderFilter {
    fn name(&self) -> &'static str {
        "metadata-header"
    }

    fn apply(&self, text: &str, _: &mut Byproducts) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.frontmatter)?;
        Ok(format!("---\n{}---\n\n{}", yaml, text))
    }
}

pub struct FilterChain {
    filters: Vec<Box<dyn MarkdownFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn MarkdownFilter>>) -> Self {
        FilterChain { filters }
    }

    /// Order matters: anchors go first so their trailing newline is gone
    /// before anything else matches, and the header goes last so it is
    /// never rewritten.
    pub fn standard(doc: &DocumentContent) -> Self {
        Self::new(vec![
            Box::new(EmptyAnchorFilter),
            Box::new(ImageRewriteFilter),
            Box::new(LineBreakFilter),
            Box::new(MetadataHeaderFilter::for_document(doc)),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn run(&self, text: &str) -> Result<(String, Byproducts)> {
        let mut byproducts = Byproducts::default();
        let mut current = text.to_string();
        for filter in &self.filters {
            current = filter.apply(&current, &mut byproducts)?;
        }
        Ok((current, byproducts))
    }
}
