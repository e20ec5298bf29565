//! Region fillers
//!
//! A region filler renders one location entry into one region of a page and
//! reports whatever did not fit. Fillers are looked up by the region's type
//! tag in a [`FillerRegistry`]; new tags are added with
//! [`FillerRegistry::register`].

mod image;
mod rich_text;
mod text;
mod wrap;

pub use image::{Fit, ImageFiller};
pub use rich_text::{Paragraph, RichTextFiller, Span};
pub use text::TextFiller;
pub use wrap::Align;

use crate::document::ComposedDocument;
use crate::font::FontStyle;
use crate::page_data::{CONTENTS, LocationEntry, Locations, OverflowMap};
use crate::registry::AssemblyContext;
use crate::render::Canvas;
use crate::template::{FieldMap, RegionSpec};
use crate::types::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// Region spec and location entry merged into one view.
///
/// Fields of the location entry take precedence over the region's static
/// fields, geometry included.
#[derive(Debug)]
pub struct RegionInput<'a> {
    spec: &'a RegionSpec,
    entry: &'a LocationEntry,
    bounds: Rect,
    fields: FieldMap,
}

impl<'a> RegionInput<'a> {
    pub fn new(spec: &'a RegionSpec, entry: &'a LocationEntry) -> Result<Self> {
        let mut fields = spec.fields.clone();
        for (key, value) in entry {
            fields.insert(key.clone(), value.clone());
        }

        let mut bounds = spec.bounds();
        for (key, slot) in [
            ("x", &mut bounds.x),
            ("y", &mut bounds.y),
            ("width", &mut bounds.width),
            ("height", &mut bounds.height),
        ] {
            if let Some(value) = entry.get(key) {
                *slot = value.as_f64().ok_or_else(|| ComposeError::InvalidLocation {
                    region: spec.name.clone(),
                    reason: format!("'{key}' must be a number"),
                })? as f32;
            }
        }

        Ok(Self {
            spec,
            entry,
            bounds,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> &str {
        &self.spec.kind
    }

    pub fn spec(&self) -> &RegionSpec {
        self.spec
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn contents(&self) -> Option<&Value> {
        self.fields.get(CONTENTS)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// The `contents` field as a string
    pub fn contents_str(&self) -> Result<&str> {
        match self.contents() {
            Some(Value::String(text)) => Ok(text),
            Some(_) => Err(self.invalid("'contents' must be a string")),
            None => Err(self.invalid("missing 'contents'")),
        }
    }

    /// Optional string field; present but not a string is an error
    pub fn str_field(&self, key: &str) -> Result<Option<&str>> {
        match self.field(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(_) => Err(self.invalid(format!("'{key}' must be a string"))),
        }
    }

    /// Optional positive number field
    pub fn f32_field(&self, key: &str) -> Result<Option<f32>> {
        match self.field(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match value.as_f64() {
                Some(number) if number > 0.0 => Ok(Some(number as f32)),
                _ => Err(self.invalid(format!("'{key}' must be a positive number"))),
            },
        }
    }

    /// Optional field deserialized into `T`
    pub fn parse_field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.field(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| self.invalid(format!("'{key}': {err}"))),
        }
    }

    /// The `style` field, regular when absent
    pub fn font_style(&self) -> Result<FontStyle> {
        match self.str_field("style")? {
            None => Ok(FontStyle::Regular),
            Some(style) => FontStyle::parse(style)
                .ok_or_else(|| self.invalid(format!("unknown font style '{style}'"))),
        }
    }

    /// Continuation entry: this region's location entry with `contents` replaced
    pub fn remainder(&self, contents: impl Into<Value>) -> LocationEntry {
        let mut entry = self.entry.clone();
        entry.insert(CONTENTS.to_string(), contents.into());
        entry
    }

    pub fn invalid(&self, reason: impl Into<String>) -> ComposeError {
        ComposeError::InvalidLocation {
            region: self.spec.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Renders a location entry into a region.
///
/// Drawing must be complete when `fill` returns. Returns `None` when all the
/// content fit, or a continuation entry holding the rest.
pub trait RegionFiller: Send + Sync {
    fn fill(
        &self,
        document: &mut ComposedDocument,
        canvas: &mut Canvas,
        input: &RegionInput<'_>,
        context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>>;
}

impl<F> RegionFiller for F
where
    F: Fn(
            &mut ComposedDocument,
            &mut Canvas,
            &RegionInput<'_>,
            &AssemblyContext<'_>,
        ) -> Result<Option<LocationEntry>>
        + Send
        + Sync,
{
    fn fill(
        &self,
        document: &mut ComposedDocument,
        canvas: &mut Canvas,
        input: &RegionInput<'_>,
        context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        self(document, canvas, input, context)
    }
}

/// Region fillers keyed by region type tag
pub struct FillerRegistry {
    fillers: HashMap<String, Box<dyn RegionFiller>>,
}

impl Default for FillerRegistry {
    /// Registry with the `text`, `rich-text` and `image` fillers
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("text", TextFiller);
        registry.register("rich-text", RichTextFiller);
        registry.register("image", ImageFiller);
        registry
    }
}

impl FillerRegistry {
    pub fn empty() -> Self {
        Self {
            fillers: HashMap::new(),
        }
    }

    /// Register a filler for `tag`, replacing any existing one
    pub fn register(&mut self, tag: impl Into<String>, filler: impl RegionFiller + 'static) {
        self.fillers.insert(tag.into(), Box::new(filler));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.fillers.contains_key(tag)
    }

    /// Fill one region, clipped to its bounds
    pub fn fill(
        &self,
        document: &mut ComposedDocument,
        canvas: &mut Canvas,
        spec: &RegionSpec,
        entry: &LocationEntry,
        context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        let filler = self
            .fillers
            .get(&spec.kind)
            .ok_or_else(|| ComposeError::UnknownRegionType {
                kind: spec.kind.clone(),
                region: spec.name.clone(),
            })?;
        let input = RegionInput::new(spec, entry)?;

        canvas.save_state();
        canvas.clip(&input.bounds());
        let result = filler.fill(document, canvas, &input, context);
        canvas.restore_state();
        result
    }

    /// Fill every region that has a location entry, lowest priority first.
    ///
    /// Regions without an entry are skipped. Returns the continuation entries
    /// of the regions that overflowed.
    pub fn fill_regions(
        &self,
        document: &mut ComposedDocument,
        canvas: &mut Canvas,
        specs: &[RegionSpec],
        locations: &Locations,
        context: &AssemblyContext<'_>,
    ) -> Result<OverflowMap> {
        let mut overflow = OverflowMap::new();
        for spec in by_priority(specs) {
            let Some(entry) = locations.get(&spec.name) else {
                log::trace!("region '{}' has no location entry, skipping", spec.name);
                continue;
            };

            log::debug!("filling region '{}' ({})", spec.name, spec.kind);
            if let Some(rest) = self.fill(document, canvas, spec, entry, context)? {
                log::debug!("region '{}' overflowed", spec.name);
                overflow.insert(spec.name.clone(), rest);
            }
        }
        Ok(overflow)
    }
}

/// Regions in drawing order. The sort is stable, so equal priorities keep
/// declaration order.
fn by_priority(specs: &[RegionSpec]) -> Vec<&RegionSpec> {
    let mut ordered: Vec<&RegionSpec> = specs.iter().collect();
    ordered.sort_by_key(|spec| spec.priority);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_data::location_entry;

    fn region(name: &str, priority: i32) -> RegionSpec {
        RegionSpec::new(name, "text", Rect::new(10.0, 20.0, 100.0, 50.0)).with_priority(priority)
    }

    #[test]
    fn test_priority_sort_is_stable() {
        let specs = vec![
            region("a", 1),
            region("b", 0),
            region("c", 1),
            region("d", -5),
            region("e", 0),
        ];
        let names: Vec<&str> = by_priority(&specs).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "e", "a", "c"]);
    }

    #[test]
    fn test_location_entry_wins_on_collision() {
        let spec = region("title", 0).with_field("size", 12).with_field("align", "left");
        let mut entry = location_entry("Hello");
        entry.insert("size".to_string(), Value::from(24));
        entry.insert("width".to_string(), Value::from(300));

        let input = RegionInput::new(&spec, &entry).unwrap();
        assert_eq!(input.f32_field("size").unwrap(), Some(24.0));
        assert_eq!(input.str_field("align").unwrap(), Some("left"));
        assert_eq!(input.bounds(), Rect::new(10.0, 20.0, 300.0, 50.0));
        assert_eq!(input.contents_str().unwrap(), "Hello");
    }

    #[test]
    fn test_non_numeric_geometry_is_rejected() {
        let spec = region("title", 0);
        let mut entry = location_entry("Hello");
        entry.insert("x".to_string(), Value::from("left"));
        assert!(matches!(
            RegionInput::new(&spec, &entry),
            Err(ComposeError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn test_remainder_keeps_entry_fields() {
        let spec = region("body", 0).with_field("font", "Serif");
        let mut entry = location_entry("one two");
        entry.insert("size".to_string(), Value::from(9));

        let input = RegionInput::new(&spec, &entry).unwrap();
        let rest = input.remainder("two");
        assert_eq!(rest["contents"], Value::from("two"));
        assert_eq!(rest["size"], Value::from(9));
        // Static fields stay on the region spec
        assert!(!rest.contains_key("font"));
    }

    #[test]
    fn test_default_registry_has_builtins() {
        let registry = FillerRegistry::default();
        assert!(registry.contains("text"));
        assert!(registry.contains("rich-text"));
        assert!(registry.contains("image"));
        assert!(!FillerRegistry::empty().contains("text"));
    }
}
