//! Template descriptions: regions, page restrictions and page transforms

use crate::types::{Parity, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Free-form record of type-specific fields, as found in region specs,
/// location entries and transform descriptors.
pub type FieldMap = Map<String, Value>;

/// A named, positioned placement area on a template page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    /// Filler tag used to render this region (`text`, `rich-text`, `image`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Lower values are drawn first, i.e. underneath
    #[serde(default)]
    pub priority: i32,
    /// Type-specific static fields (font, size, alignment, ...)
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl RegionSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, bounds: Rect) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            priority: 0,
            fields: FieldMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Caller-supplied test on a 1-based page position.
#[derive(Clone)]
pub struct PositionPredicate(Arc<dyn Fn(usize) -> bool + Send + Sync>);

impl PositionPredicate {
    pub fn new(predicate: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Holds where `position % divisor == remainder`
    pub fn modulo(divisor: usize, remainder: usize) -> Self {
        Self::new(move |position| divisor != 0 && position % divisor == remainder)
    }

    pub fn test(&self, position: usize) -> bool {
        (self.0)(position)
    }
}

impl fmt::Debug for PositionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PositionPredicate(..)")
    }
}

/// Which positions a template may occupy
#[derive(Debug, Clone)]
pub enum PositionRule {
    Parity(Parity),
    Predicate(PositionPredicate),
}

impl PositionRule {
    pub fn allows(&self, position: usize) -> bool {
        match self {
            PositionRule::Parity(parity) => parity.matches(position),
            PositionRule::Predicate(predicate) => predicate.test(position),
        }
    }
}

/// Restricts a template to certain positions, optionally padding with a
/// filler template until an allowed position is reached.
#[derive(Debug, Clone)]
pub struct PageRestriction {
    pub rule: PositionRule,
    pub filler_template: Option<String>,
}

impl PageRestriction {
    pub fn parity(parity: Parity) -> Self {
        Self {
            rule: PositionRule::Parity(parity),
            filler_template: None,
        }
    }

    pub fn predicate(predicate: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        Self {
            rule: PositionRule::Predicate(PositionPredicate::new(predicate)),
            filler_template: None,
        }
    }

    pub fn with_filler(mut self, template: impl Into<String>) -> Self {
        self.filler_template = Some(template.into());
        self
    }
}

/// A page transform descriptor, dispatched on `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub kind: String,
    #[serde(flatten)]
    pub params: FieldMap,
}

impl TransformSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: FieldMap::new(),
        }
    }

    pub fn rotate(degrees: i64) -> Self {
        Self::new("rotate").with_param("degrees", degrees)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Transforms applied to finished pages, per parity of the page position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTransforms {
    #[serde(default)]
    pub odd: Vec<TransformSpec>,
    #[serde(default)]
    pub even: Vec<TransformSpec>,
}

impl PageTransforms {
    pub fn for_parity(&self, parity: Parity) -> &[TransformSpec] {
        match parity {
            Parity::Odd => &self.odd,
            Parity::Even => &self.even,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.odd.is_empty() && self.even.is_empty()
    }
}

/// A reusable page layout.
///
/// The physical page a template draws on lives in the [`Registry`](crate::Registry);
/// this type only describes where content goes and how the page behaves.
#[derive(Debug, Clone)]
pub struct TemplateDescription {
    pub name: String,
    /// Regions in declaration order
    pub regions: Vec<RegionSpec>,
    /// Mirrored layout for even positions; `regions` is used when absent
    pub even_regions: Option<Vec<RegionSpec>>,
    /// Template receiving content that did not fit; overflow is dropped when `None`
    pub overflow_template: Option<String>,
    pub page_restriction: Option<PageRestriction>,
    pub page_transforms: PageTransforms,
}

impl TemplateDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regions: Vec::new(),
            even_regions: None,
            overflow_template: None,
            page_restriction: None,
            page_transforms: PageTransforms::default(),
        }
    }

    pub fn region(mut self, region: RegionSpec) -> Self {
        self.regions.push(region);
        self
    }

    pub fn even_region(mut self, region: RegionSpec) -> Self {
        self.even_regions.get_or_insert_with(Vec::new).push(region);
        self
    }

    pub fn overflow_to(mut self, template: impl Into<String>) -> Self {
        self.overflow_template = Some(template.into());
        self
    }

    pub fn restrict(mut self, restriction: PageRestriction) -> Self {
        self.page_restriction = Some(restriction);
        self
    }

    pub fn transform(mut self, parity: Parity, transform: TransformSpec) -> Self {
        match parity {
            Parity::Odd => self.page_transforms.odd.push(transform),
            Parity::Even => self.page_transforms.even.push(transform),
        }
        self
    }

    pub fn regions_for_parity(&self, parity: Parity) -> &[RegionSpec] {
        match (parity, &self.even_regions) {
            (Parity::Even, Some(even)) => even,
            _ => &self.regions,
        }
    }
}
