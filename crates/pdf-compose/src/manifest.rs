//! JSON manifest describing fonts and templates
//!
//! ```json
//! {
//!   "fonts": [{ "name": "Serif", "regular": "Times-Roman", "bold": "fonts/Serif-Bold.ttf" }],
//!   "templates": [{
//!     "name": "chapter",
//!     "source": { "path": "layouts.pdf", "page": 2 },
//!     "regions": [{ "name": "body", "type": "text", "x": 72, "y": 72, "width": 468, "height": 600 }],
//!     "overflow_template": "chapter",
//!     "page_restriction": { "parity": "odd", "filler_template": "blank" }
//!   }]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the manifest.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::font::{FontFace, FontFamily, FontStyle};
use crate::io::load_template_pdf;
use crate::registry::Registry;
use crate::source::TemplateSource;
use crate::template::{
    PageRestriction, PageTransforms, PositionPredicate, PositionRule, RegionSpec,
    TemplateDescription,
};
use crate::types::*;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub fonts: Vec<FontConfig>,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// A font family. Each face is a standard PDF font name or a `.ttf` path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub name: String,
    pub regular: Option<String>,
    pub bold: Option<String>,
    pub italic: Option<String>,
    pub bold_italic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// 1-based page number
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub name: String,
    /// Page drawn under the regions; a blank page of `width` x `height` when absent
    pub source: Option<SourceConfig>,
    pub even_source: Option<SourceConfig>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    #[serde(default)]
    pub regions: Vec<RegionSpec>,
    pub even_regions: Option<Vec<RegionSpec>>,
    pub overflow_template: Option<String>,
    pub page_restriction: Option<RestrictionConfig>,
    #[serde(default)]
    pub page_transforms: PageTransforms,
}

/// Exactly one of `parity` and `modulo` must be given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionConfig {
    pub parity: Option<Parity>,
    pub modulo: Option<ModuloConfig>,
    pub filler_template: Option<String>,
}

/// Allows positions where `position % divisor == remainder`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModuloConfig {
    pub divisor: usize,
    pub remainder: usize,
}

impl RestrictionConfig {
    pub fn to_restriction(&self) -> Result<PageRestriction> {
        let rule = match (self.parity, self.modulo) {
            (Some(parity), None) => PositionRule::Parity(parity),
            (None, Some(modulo)) => {
                if modulo.divisor == 0 {
                    return Err(ComposeError::Config(
                        "page restriction modulo divisor must be positive".to_string(),
                    ));
                }
                PositionRule::Predicate(PositionPredicate::modulo(
                    modulo.divisor,
                    modulo.remainder,
                ))
            }
            _ => {
                return Err(ComposeError::Config(
                    "page restriction needs exactly one of 'parity' or 'modulo'".to_string(),
                ));
            }
        };
        Ok(PageRestriction {
            rule,
            filler_template: self.filler_template.clone(),
        })
    }
}

impl Manifest {
    /// Load a manifest file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&json, base_dir)
    }

    /// Parse a manifest whose relative paths are relative to `base_dir`
    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: Manifest = serde_json::from_str(json)
            .map_err(|e| ComposeError::Config(format!("Failed to parse manifest: {}", e)))?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Load every font and template source and build the registry
    pub async fn into_registry(self) -> Result<Registry> {
        let mut builder = Registry::builder().asset_root(self.base_dir.clone());

        for font in &self.fonts {
            builder = builder.font(self.load_family(font).await?);
        }

        let mut documents: HashMap<PathBuf, Document> = HashMap::new();
        let mut sources: HashMap<(PathBuf, u32), Arc<TemplateSource>> = HashMap::new();
        for template in &self.templates {
            let odd = match &template.source {
                Some(source) => self.load_source(source, &mut documents, &mut sources).await?,
                None => {
                    let (default_width, default_height) = DEFAULT_PAGE_DIMENSIONS;
                    Arc::new(TemplateSource::blank(
                        template.name.clone(),
                        template.width.unwrap_or(default_width),
                        template.height.unwrap_or(default_height),
                    ))
                }
            };
            let even = match &template.even_source {
                Some(source) => self.load_source(source, &mut documents, &mut sources).await?,
                None => Arc::clone(&odd),
            };

            builder = builder.template_with_sources(template.to_description()?, odd, even);
        }

        log::debug!(
            "manifest: {} font families, {} templates",
            self.fonts.len(),
            self.templates.len()
        );
        builder.build()
    }

    async fn load_family(&self, config: &FontConfig) -> Result<FontFamily> {
        let faces = [
            (FontStyle::Regular, &config.regular),
            (FontStyle::Bold, &config.bold),
            (FontStyle::Italic, &config.italic),
            (FontStyle::BoldItalic, &config.bold_italic),
        ];
        if config.regular.is_none() {
            return Err(ComposeError::Config(format!(
                "font '{}' needs a regular face",
                config.name
            )));
        }

        let mut family = FontFamily::new(config.name.clone());
        for (style, value) in faces {
            if let Some(value) = value {
                family = family.with_face(style, self.load_face(value).await?);
            }
        }
        Ok(family)
    }

    async fn load_face(&self, value: &str) -> Result<FontFace> {
        let lower = value.to_ascii_lowercase();
        if !(lower.ends_with(".ttf") || lower.ends_with(".otf")) {
            return FontFace::standard(value);
        }

        let path = self.resolve(Path::new(value));
        let data = tokio::fs::read(&path).await?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| value.to_string());
        tokio::task::spawn_blocking(move || FontFace::true_type(name, data)).await?
    }

    async fn load_source(
        &self,
        config: &SourceConfig,
        documents: &mut HashMap<PathBuf, Document>,
        sources: &mut HashMap<(PathBuf, u32), Arc<TemplateSource>>,
    ) -> Result<Arc<TemplateSource>> {
        let path = self.resolve(&config.path);
        let key = (path.clone(), config.page);
        if let Some(source) = sources.get(&key) {
            return Ok(Arc::clone(source));
        }

        let document = match documents.get(&path) {
            Some(document) => document.clone(),
            None => {
                let document = load_template_pdf(&path).await?;
                documents.insert(path.clone(), document.clone());
                document
            }
        };
        let label = format!("{}#{}", path.display(), config.page);
        let source = Arc::new(TemplateSource::from_document(label, document, config.page)?);
        sources.insert(key, Arc::clone(&source));
        Ok(source)
    }
}

impl TemplateConfig {
    pub fn to_description(&self) -> Result<TemplateDescription> {
        Ok(TemplateDescription {
            name: self.name.clone(),
            regions: self.regions.clone(),
            even_regions: self.even_regions.clone(),
            overflow_template: self.overflow_template.clone(),
            page_restriction: self
                .page_restriction
                .as_ref()
                .map(RestrictionConfig::to_restriction)
                .transpose()?,
            page_transforms: self.page_transforms.clone(),
        })
    }
}
