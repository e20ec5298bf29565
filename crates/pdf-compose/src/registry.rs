//! Template and font registry
//!
//! A [`Registry`] is assembled once with a [`RegistryBuilder`] and is
//! read-only afterwards. At the start of assembly its fonts are embedded into
//! the output document, producing an [`AssemblyContext`]: the registry plus
//! the embedded fonts, handed to every region filler.

use crate::constants::DEFAULT_FONT_FAMILY;
use crate::document::ComposedDocument;
use crate::font::{EmbeddedFont, FontBook, FontFamily, FontStyle};
use crate::source::{SourceHandle, TemplateSource};
use crate::template::{RegionSpec, TemplateDescription};
use crate::types::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Template {
    description: TemplateDescription,
    odd_source: Arc<TemplateSource>,
    even_source: Arc<TemplateSource>,
}

pub struct Registry {
    templates: HashMap<String, Template>,
    fonts: BTreeMap<String, FontFamily>,
    pending_fonts: Vec<(String, FontStyle)>,
    asset_root: Option<PathBuf>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&TemplateDescription> {
        self.templates.get(name).map(|t| &t.description)
    }

    fn template(&self, name: &str) -> Result<&Template> {
        self.templates
            .get(name)
            .ok_or_else(|| ComposeError::UnknownTemplate(name.to_string()))
    }

    /// Region set a template uses at a position of the given parity
    pub fn regions_for_parity(&self, name: &str, parity: Parity) -> Result<&[RegionSpec]> {
        Ok(self.template(name)?.description.regions_for_parity(parity))
    }

    /// Physical page a template uses at a position of the given parity
    pub fn source_for_parity(&self, name: &str, parity: Parity) -> Result<&Arc<TemplateSource>> {
        let template = self.template(name)?;
        Ok(match parity {
            Parity::Odd => &template.odd_source,
            Parity::Even => &template.even_source,
        })
    }

    /// Open a handle on the physical page for `name` at `parity`
    pub fn open_source(&self, name: &str, parity: Parity) -> Result<SourceHandle> {
        Ok(self.source_for_parity(name, parity)?.open())
    }

    /// Every distinct template source, for release bookkeeping
    pub fn sources(&self) -> Vec<&Arc<TemplateSource>> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        let mut names: Vec<&String> = self.templates.keys().collect();
        names.sort();
        for name in names {
            let template = &self.templates[name];
            for source in [&template.odd_source, &template.even_source] {
                if seen.insert(source.id()) {
                    sources.push(source);
                }
            }
        }
        sources
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn font(&self, name: &str) -> Option<&FontFamily> {
        self.fonts.get(name)
    }

    /// (family, style) pairs embedded at the start of every assembly
    pub fn pending_font_embeddings(&self) -> &[(String, FontStyle)] {
        &self.pending_fonts
    }

    /// Directory relative image paths are resolved against
    pub fn asset_root(&self) -> Option<&Path> {
        self.asset_root.as_deref()
    }

    /// Embed every pending font into `document`.
    ///
    /// Must run before any region is filled: text regions refer to fonts by
    /// the resource names assigned here.
    pub fn embed_fonts(&self, document: &mut ComposedDocument) -> Result<AssemblyContext<'_>> {
        let mut fonts = FontBook::new();
        for (family, style) in &self.pending_fonts {
            let family = self.fonts.get(family).ok_or_else(|| {
                ComposeError::Font(format!("font family '{family}' is not registered"))
            })?;
            fonts.embed(document, family, *style)?;
        }
        log::debug!("embedded {} font faces", fonts.len());

        Ok(AssemblyContext {
            registry: self,
            fonts,
        })
    }
}

/// Build phase of a [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    templates: Vec<Template>,
    fonts: Vec<FontFamily>,
    asset_root: Option<PathBuf>,
}

impl RegistryBuilder {
    /// Register a template drawn on the same page at every position
    pub fn template(self, description: TemplateDescription, source: Arc<TemplateSource>) -> Self {
        self.template_with_sources(description, Arc::clone(&source), source)
    }

    /// Register a template with distinct pages for odd and even positions
    pub fn template_with_sources(
        mut self,
        description: TemplateDescription,
        odd_source: Arc<TemplateSource>,
        even_source: Arc<TemplateSource>,
    ) -> Self {
        self.templates.push(Template {
            description,
            odd_source,
            even_source,
        });
        self
    }

    pub fn font(mut self, family: FontFamily) -> Self {
        self.fonts.push(family);
        self
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Validate and freeze the registry.
    ///
    /// Duplicate template names and duplicate region names within a template
    /// are errors. References to unregistered overflow or filler templates are
    /// only logged: they fail at composition time if they are ever followed.
    /// A registry without fonts gets a Helvetica family.
    pub fn build(self) -> Result<Registry> {
        let mut templates = HashMap::new();
        for template in self.templates {
            validate_regions(&template.description)?;
            let name = template.description.name.clone();
            if templates.insert(name.clone(), template).is_some() {
                return Err(ComposeError::Config(format!(
                    "template '{name}' is registered twice"
                )));
            }
        }

        for template in templates.values() {
            let description = &template.description;
            let referenced = description.overflow_template.iter().chain(
                description
                    .page_restriction
                    .as_ref()
                    .and_then(|r| r.filler_template.as_ref()),
            );
            for target in referenced {
                if !templates.contains_key(target) {
                    log::warn!(
                        "template '{}' refers to unregistered template '{}'",
                        description.name,
                        target
                    );
                }
            }
        }

        let mut family_list = self.fonts;
        if family_list.is_empty() {
            log::debug!("no fonts registered, using {}", DEFAULT_FONT_FAMILY);
            family_list.push(FontFamily::helvetica(DEFAULT_FONT_FAMILY));
        }

        let mut fonts = BTreeMap::new();
        let mut pending_fonts = Vec::new();
        for family in family_list {
            if fonts.contains_key(&family.name) {
                return Err(ComposeError::Config(format!(
                    "font family '{}' is registered twice",
                    family.name
                )));
            }
            pending_fonts.extend(family.styles().map(|style| (family.name.clone(), style)));
            fonts.insert(family.name.clone(), family);
        }

        Ok(Registry {
            templates,
            fonts,
            pending_fonts,
            asset_root: self.asset_root,
        })
    }
}

fn validate_regions(description: &TemplateDescription) -> Result<()> {
    let sets = std::iter::once(&description.regions).chain(description.even_regions.as_ref());
    for regions in sets {
        let mut names = HashSet::new();
        for region in regions {
            if !names.insert(region.name.as_str()) {
                return Err(ComposeError::Config(format!(
                    "region '{}' is declared twice in template '{}'",
                    region.name, description.name
                )));
            }
        }
    }
    Ok(())
}

/// The registry as seen during one assembly: read-only, with fonts embedded
pub struct AssemblyContext<'r> {
    registry: &'r Registry,
    fonts: FontBook,
}

impl<'r> AssemblyContext<'r> {
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Embedded face for a family (default family when `None`) and style
    pub fn font(&self, family: Option<&str>, style: FontStyle) -> Result<&EmbeddedFont> {
        self.fonts.resolve(family, style)
    }

    /// Resolve an asset path against the registry's asset root
    pub fn resolve_asset(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match self.registry.asset_root() {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
