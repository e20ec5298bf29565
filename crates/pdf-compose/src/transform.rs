//! Page transforms applied to finished pages
//!
//! Transforms are dispatched on [`TransformSpec::kind`] through a
//! [`TransformRegistry`]. The built-in `rotate` transform sets the page's
//! `/Rotate` entry.

use crate::template::TransformSpec;
use crate::types::*;
use lopdf::{Dictionary, Object};
use std::collections::HashMap;

pub trait PageTransform: Send + Sync {
    fn apply(&self, page: &mut Dictionary, spec: &TransformSpec) -> Result<()>;
}

/// Sets the absolute page rotation from the `degrees` parameter
pub struct Rotate;

impl PageTransform for Rotate {
    fn apply(&self, page: &mut Dictionary, spec: &TransformSpec) -> Result<()> {
        let degrees = spec
            .params
            .get("degrees")
            .and_then(|value| value.as_i64())
            .ok_or_else(|| {
                ComposeError::InvalidTransform("rotate needs integer 'degrees'".to_string())
            })?;
        let rotation = normalize_rotation(degrees)?;
        page.set("Rotate", Object::Integer(rotation));
        Ok(())
    }
}

/// Normalize a rotation to 0, 90, 180 or 270
pub fn normalize_rotation(degrees: i64) -> Result<i64> {
    if degrees % 90 != 0 {
        return Err(ComposeError::InvalidTransform(format!(
            "rotation must be a multiple of 90, got {degrees}"
        )));
    }
    Ok(degrees.rem_euclid(360))
}

pub struct TransformRegistry {
    transforms: HashMap<String, Box<dyn PageTransform>>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("rotate", Rotate);
        registry
    }
}

impl TransformRegistry {
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, transform: impl PageTransform + 'static) {
        self.transforms.insert(kind.into(), Box::new(transform));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.transforms.contains_key(kind)
    }

    pub fn apply(&self, page: &mut Dictionary, spec: &TransformSpec) -> Result<()> {
        let transform = self
            .transforms
            .get(&spec.kind)
            .ok_or_else(|| ComposeError::UnknownTransform(spec.kind.clone()))?;
        transform.apply(page, spec)
    }

    /// Apply transforms in order
    pub fn apply_all(&self, page: &mut Dictionary, specs: &[TransformSpec]) -> Result<()> {
        for spec in specs {
            log::trace!("applying page transform '{}'", spec.kind);
            self.apply(page, spec)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0).unwrap(), 0);
        assert_eq!(normalize_rotation(450).unwrap(), 90);
        assert_eq!(normalize_rotation(-90).unwrap(), 270);
        assert!(normalize_rotation(45).is_err());
    }

    #[test]
    fn test_rotate_sets_absolute_rotation() {
        let registry = TransformRegistry::default();
        let mut page = Dictionary::new();
        page.set("Rotate", Object::Integer(90));

        registry
            .apply_all(&mut page, &[TransformSpec::rotate(180), TransformSpec::rotate(-90)])
            .unwrap();
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 270);
    }

    #[test]
    fn test_unknown_and_invalid_transforms() {
        let registry = TransformRegistry::default();
        let mut page = Dictionary::new();

        assert!(matches!(
            registry.apply(&mut page, &TransformSpec::new("flip")),
            Err(ComposeError::UnknownTransform(_))
        ));
        assert!(matches!(
            registry.apply(&mut page, &TransformSpec::new("rotate")),
            Err(ComposeError::InvalidTransform(_))
        ));
    }
}
