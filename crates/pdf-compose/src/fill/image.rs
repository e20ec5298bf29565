use super::{RegionFiller, RegionInput};
use crate::document::{ComposedDocument, ImageXObject};
use crate::page_data::LocationEntry;
use crate::registry::AssemblyContext;
use crate::render::Canvas;
use crate::types::*;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GenericImageView};
use lopdf::{Dictionary, Object, Stream};
use serde::{Deserialize, Serialize};

/// How an image is scaled into its region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Largest size that fits entirely, aspect ratio kept
    #[default]
    Contain,
    /// Smallest size that covers the region, aspect ratio kept; the excess is clipped
    Fill,
    /// Exactly the region, aspect ratio ignored
    Stretch,
}

impl Fit {
    /// Placement of a `width` x `height` pixel image in `bounds`, centred
    pub fn place(self, bounds: &Rect, width: u32, height: u32) -> Rect {
        if self == Fit::Stretch || width == 0 || height == 0 {
            return *bounds;
        }

        let scale_x = bounds.width / width as f32;
        let scale_y = bounds.height / height as f32;
        let scale = match self {
            Fit::Contain => scale_x.min(scale_y),
            _ => scale_x.max(scale_y),
        };
        let drawn_width = width as f32 * scale;
        let drawn_height = height as f32 * scale;
        Rect::new(
            bounds.center_x() - drawn_width / 2.0,
            bounds.center_y() - drawn_height / 2.0,
            drawn_width,
            drawn_height,
        )
    }
}

/// A PNG or JPEG image, given as a file path or a `data:` URI.
///
/// Each distinct image is embedded once per document. Images never overflow.
pub struct ImageFiller;

impl RegionFiller for ImageFiller {
    fn fill(
        &self,
        document: &mut ComposedDocument,
        canvas: &mut Canvas,
        input: &RegionInput<'_>,
        context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        let source = input.contents_str()?;
        let fit: Fit = input.parse_field("fit")?.unwrap_or_default();

        let image = match document.image(source) {
            Some(image) => image,
            None => {
                let bytes = load_image_bytes(source, input, context)?;
                let decoded = image::load_from_memory(&bytes)?;
                let image = embed_image(document, &decoded)?;
                log::debug!(
                    "embedded {}x{} image for region '{}'",
                    image.width,
                    image.height,
                    input.name()
                );
                document.insert_image(source, image);
                image
            }
        };

        let placement = fit.place(&input.bounds(), image.width, image.height);
        canvas.draw_image(&image, &placement);
        Ok(None)
    }
}

fn load_image_bytes(
    source: &str,
    input: &RegionInput<'_>,
    context: &AssemblyContext<'_>,
) -> Result<Vec<u8>> {
    if let Some(uri) = source.strip_prefix("data:") {
        let (media_type, payload) = uri
            .split_once(',')
            .ok_or_else(|| input.invalid("malformed data URI"))?;
        if !media_type.ends_with(";base64") {
            return Err(input.invalid("only base64 data URIs are supported"));
        }
        return STANDARD
            .decode(payload.trim())
            .map_err(|err| input.invalid(format!("invalid base64 image data: {err}")));
    }

    let path = context.resolve_asset(source);
    std::fs::read(&path)
        .map_err(|err| input.invalid(format!("cannot read image {}: {err}", path.display())))
}

/// Write `decoded` as an RGB Image XObject, with an SMask when it has alpha
pub(crate) fn embed_image(
    document: &mut ComposedDocument,
    decoded: &DynamicImage,
) -> Result<ImageXObject> {
    let (width, height) = decoded.dimensions();

    let mut dict = image_dictionary(width, height, "DeviceRGB");
    if decoded.color().has_alpha() {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|pixel| pixel.0[3]).collect();
        let mut mask = Stream::new(image_dictionary(width, height, "DeviceGray"), alpha);
        mask.compress()?;
        let mask_id = document.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
    }

    let mut stream = Stream::new(dict, decoded.to_rgb8().into_raw());
    stream.compress()?;
    let id = document.add_object(stream);

    Ok(ImageXObject { id, width, height })
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}
