//! Per-page input data and overflow fragments

use crate::template::FieldMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Content for one region. The only required field is `contents`; any other
/// field overrides the region spec's static field of the same name.
pub type LocationEntry = FieldMap;

/// Region name → location entry
pub type Locations = BTreeMap<String, LocationEntry>;

/// Region name → continuation entry for content that did not fit
pub type OverflowMap = BTreeMap<String, LocationEntry>;

/// Key of the required field of a location entry
pub const CONTENTS: &str = "contents";

/// Build a location entry holding only `contents`
pub fn location_entry(contents: impl Into<Value>) -> LocationEntry {
    let mut entry = LocationEntry::new();
    entry.insert(CONTENTS.to_string(), contents.into());
    entry
}

/// One logical page of input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    pub template: String,
    #[serde(default)]
    pub locations: Locations,
    /// Locations handed to filler pages inserted before this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filler_locations: Option<Locations>,
}

impl PageData {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, region: impl Into<String>, entry: LocationEntry) -> Self {
        self.locations.insert(region.into(), entry);
        self
    }

    pub fn with_contents(self, region: impl Into<String>, contents: impl Into<Value>) -> Self {
        self.with_location(region, location_entry(contents))
    }

    pub fn with_filler_locations(mut self, locations: Locations) -> Self {
        self.filler_locations = Some(locations);
        self
    }

    /// Page data for a filler page inserted ahead of this page
    pub fn filler(&self, template: &str) -> PageData {
        PageData {
            template: template.to_string(),
            locations: self.filler_locations.clone().unwrap_or_default(),
            filler_locations: None,
        }
    }

    /// Page data for the continuation page receiving `overflow`.
    ///
    /// Overflow entries replace this page's location entries region by region;
    /// regions that did not overflow keep their entries.
    pub fn continuation(&self, template: &str, overflow: OverflowMap) -> PageData {
        let mut locations = self.locations.clone();
        locations.extend(overflow);
        PageData {
            template: template.to_string(),
            locations,
            filler_locations: self.filler_locations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_replaces_overflowed_regions() {
        let page = PageData::new("first")
            .with_contents("body", "long text")
            .with_contents("footer", "page footer");

        let mut overflow = OverflowMap::new();
        overflow.insert("body".to_string(), location_entry("text"));

        let next = page.continuation("rest", overflow);
        assert_eq!(next.template, "rest");
        assert_eq!(next.locations["body"], location_entry("text"));
        assert_eq!(next.locations["footer"], location_entry("page footer"));
    }

    #[test]
    fn test_filler_uses_filler_locations() {
        let mut filler_locations = Locations::new();
        filler_locations.insert("note".to_string(), location_entry("intentionally blank"));

        let page = PageData::new("chapter")
            .with_contents("body", "text")
            .with_filler_locations(filler_locations.clone());

        let filler = page.filler("blank");
        assert_eq!(filler.template, "blank");
        assert_eq!(filler.locations, filler_locations);
        assert!(filler.filler_locations.is_none());
    }

    #[test]
    fn test_page_data_from_json() {
        let json = r#"{"template":"letter","locations":{"to":{"contents":"Ada","size":14}}}"#;
        let page: PageData = serde_json::from_str(json).unwrap();
        assert_eq!(page.locations["to"]["contents"], Value::from("Ada"));
        assert!(page.filler_locations.is_none());
    }
}
