//! Image sizing, path safety, and the `<hp:pic>` element the Block Emitter
//! wires a resolved image into.

use std::path::{Path, PathBuf};

use crate::constants::{IMAGE_DEFAULT_HEIGHT, IMAGE_DEFAULT_WIDTH, IMAGE_MAX_WIDTH, LUNIT_PER_MM, LUNIT_PER_PX};
use crate::error::{ConvertError, Result};
use crate::xmltree::Element;

/// A binary entry destined for `BinData/` and a matching `content.hpf`
/// manifest item.
pub struct EmbeddedImage {
    pub binary_item_id: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Resolved placement for one `<hp:pic>`, in logical units.
#[derive(Debug, Clone, Copy)]
pub struct ImageSize {
    pub width: i64,
    pub height: i64,
}

/// Parses a CSS-ish dimension attribute (`"400px"`, `"3cm"`, `"50%"`, a bare
/// number treated as pixels) into logical units, or `None` if it doesn't
/// parse. Percentages are resolved against [`crate::constants::NOMINAL_PAGE_WIDTH_MM`].
pub fn parse_dimension(value: &str) -> Option<i64> {
    let s = value.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    let split_at = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (num_part, unit) = s.split_at(split_at);
    let value: f64 = num_part.parse().ok()?;

    let mm = match unit {
        "" | "px" => value * (25.4 / 96.0),
        "in" => value * 25.4,
        "cm" => value * 10.0,
        "mm" => value,
        "pt" => value * (25.4 / 72.0),
        "%" => value * (crate::constants::NOMINAL_PAGE_WIDTH_MM / 100.0),
        _ => value * (25.4 / 96.0),
    };

    Some((mm * LUNIT_PER_MM) as i64)
}

/// Rejects absolute paths and any path that escapes `base_dir` via `..`
/// components. `base_dir` is the directory the source Markdown file lives
/// in; images are resolved relative to it.
pub fn validate_image_path(image_path: &str, base_dir: Option<&Path>) -> Result<()> {
    let path = Path::new(image_path);
    if path.is_absolute() {
        return Err(ConvertError::security(format!(
            "absolute image paths are not allowed: {image_path}"
        )));
    }
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(ConvertError::security(format!(
            "directory traversal in image path is not allowed: {image_path}"
        )));
    }
    if let Some(base) = base_dir {
        let resolved = base.join(path);
        let resolved = normalize(&resolved);
        let base = normalize(base);
        if resolved != base && !resolved.starts_with(&base) {
            return Err(ConvertError::security(format!(
                "image path resolves outside the input directory: {image_path}"
            )));
        }
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves a placement size from explicit `width`/`height` attributes,
/// falling back to decoded pixel dimensions (scaled preserving aspect
/// ratio if only one of width/height was given), then a fixed default.
/// Oversized results are clamped to [`IMAGE_MAX_WIDTH`].
pub fn resolve_size(
    width_attr: Option<&str>,
    height_attr: Option<&str>,
    pixel_dims: Option<(u32, u32)>,
) -> ImageSize {
    let w_parsed = width_attr.and_then(parse_dimension);
    let h_parsed = height_attr.and_then(parse_dimension);

    let (mut width, mut height) = match (w_parsed, h_parsed) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, IMAGE_DEFAULT_HEIGHT),
        (None, Some(h)) => (IMAGE_DEFAULT_WIDTH, h),
        (None, None) => (IMAGE_DEFAULT_WIDTH, IMAGE_DEFAULT_HEIGHT),
    };

    if let Some((px_w, px_h)) = pixel_dims {
        let calc_w = (px_w as f64 * LUNIT_PER_PX) as i64;
        let calc_h = (px_h as f64 * LUNIT_PER_PX) as i64;
        match (w_parsed, h_parsed) {
            (None, None) => {
                width = calc_w;
                height = calc_h;
            }
            (Some(w), None) => {
                let ratio = px_h as f64 / px_w as f64;
                height = (w as f64 * ratio) as i64;
            }
            (None, Some(h)) => {
                let ratio = px_w as f64 / px_h as f64;
                width = (h as f64 * ratio) as i64;
            }
            (Some(_), Some(_)) => {}
        }
    }

    if width > IMAGE_MAX_WIDTH {
        let ratio = IMAGE_MAX_WIDTH as f64 / width as f64;
        width = IMAGE_MAX_WIDTH;
        height = (height as f64 * ratio) as i64;
    }

    ImageSize { width, height }
}

const NS_PARA: &str = "http://www.hancom.co.kr/hwpml/2011/paragraph";
const NS_CORE: &str = "http://www.hancom.co.kr/hwpml/2011/core";

/// Builds the `<hp:run><hp:pic>...</hp:pic></hp:run>` subtree for one
/// embedded image, given resolved geometry and identifiers already
/// assigned by the caller (the Block Emitter owns id/counter bookkeeping
/// so it can keep them unique across the whole document).
pub fn build_pic_run(
    char_pr_id: &str,
    pic_id: &str,
    inst_id: &str,
    binary_item_id: &str,
    size: ImageSize,
) -> Element {
    let mut run = Element::new("hp:run");
    run.set_attr("charPrIDRef", char_pr_id);

    let mut pic = Element::new("hp:pic");
    for (k, v) in [
        ("id", pic_id),
        ("zOrder", "0"),
        ("numberingType", "NONE"),
        ("textWrap", "TOP_AND_BOTTOM"),
        ("textFlow", "BOTH_SIDES"),
        ("lock", "0"),
        ("dropcapstyle", "None"),
        ("href", ""),
        ("groupLevel", "0"),
        ("instid", inst_id),
        ("reverse", "0"),
    ] {
        pic.set_attr(k, v);
    }

    let w = size.width.to_string();
    let h = size.height.to_string();

    let mut offset = Element::new("hp:offset");
    offset.set_attr("x", "0");
    offset.set_attr("y", "0");
    pic.push_child(offset);

    for tag in ["hp:orgSz", "hp:curSz"] {
        let mut sz = Element::new(tag);
        sz.set_attr("width", w.clone());
        sz.set_attr("height", h.clone());
        pic.push_child(sz);
    }

    let mut flip = Element::new("hp:flip");
    flip.set_attr("horizontal", "0");
    flip.set_attr("vertical", "0");
    pic.push_child(flip);

    let mut rotation_info = Element::new("hp:rotationInfo");
    for (k, v) in [("angle", "0"), ("centerX", "0"), ("centerY", "0"), ("rotateimage", "1")] {
        rotation_info.set_attr(k, v);
    }
    pic.push_child(rotation_info);

    let mut render_info = Element::new("hp:renderingInfo");
    for matrix_name in ["hc:transMatrix", "hc:scaMatrix", "hc:rotMatrix"] {
        let mut matrix = Element::new(matrix_name);
        for (k, v) in [("e1", "1"), ("e2", "0"), ("e3", "0"), ("e4", "0"), ("e5", "1"), ("e6", "0")] {
            matrix.set_attr(k, v);
        }
        render_info.push_child(matrix);
    }
    pic.push_child(render_info);

    let mut img = Element::new("hc:img");
    img.set_attr("binaryItemIDRef", binary_item_id);
    img.set_attr("bright", "0");
    img.set_attr("contrast", "0");
    img.set_attr("effect", "REAL_PIC");
    img.set_attr("alpha", "0");
    pic.push_child(img);

    let mut img_rect = Element::new("hp:imgRect");
    for (tag, x, y) in [
        ("hc:pt0", "0", "0"),
        ("hc:pt1", w.as_str(), "0"),
        ("hc:pt2", w.as_str(), h.as_str()),
        ("hc:pt3", "0", h.as_str()),
    ] {
        let mut pt = Element::new(tag);
        pt.set_attr("x", x);
        pt.set_attr("y", y);
        img_rect.push_child(pt);
    }
    pic.push_child(img_rect);

    let mut clip = Element::new("hp:imgClip");
    for k in ["left", "right", "top", "bottom"] {
        clip.set_attr(k, "0");
    }
    pic.push_child(clip);

    let mut in_margin = Element::new("hp:inMargin");
    for k in ["left", "right", "top", "bottom"] {
        in_margin.set_attr(k, "0");
    }
    pic.push_child(in_margin);

    let mut dim = Element::new("hp:imgDim");
    dim.set_attr("dimwidth", "0");
    dim.set_attr("dimheight", "0");
    pic.push_child(dim);

    pic.push_child(Element::new("hp:effects"));

    let mut sz = Element::new("hp:sz");
    sz.set_attr("width", w.clone());
    sz.set_attr("widthRelTo", "ABSOLUTE");
    sz.set_attr("height", h.clone());
    sz.set_attr("heightRelTo", "ABSOLUTE");
    sz.set_attr("protect", "0");
    pic.push_child(sz);

    let mut pos = Element::new("hp:pos");
    for (k, v) in [
        ("treatAsChar", "1"),
        ("affectLSpacing", "0"),
        ("flowWithText", "1"),
        ("allowOverlap", "1"),
        ("holdAnchorAndSO", "0"),
        ("vertRelTo", "PARA"),
        ("horzRelTo", "COLUMN"),
        ("vertAlign", "TOP"),
        ("horzAlign", "LEFT"),
        ("vertOffset", "0"),
        ("horzOffset", "0"),
    ] {
        pos.set_attr(k, v);
    }
    pic.push_child(pos);

    let mut out_margin = Element::new("hp:outMargin");
    for k in ["left", "right", "top", "bottom"] {
        out_margin.set_attr(k, "0");
    }
    pic.push_child(out_margin);

    pic.push_child(Element::new("hp:shapeComment"));

    run.push_child(pic);
    run
}

/// Reads an image file from disk and, on a successful decode, its pixel
/// dimensions. A file that exists but fails to decode (an SVG, a corrupt
/// file) still returns its bytes with `None` dimensions, mirroring the
/// reference behavior of silently falling back to default sizing rather
/// than failing the whole conversion over one image.
pub fn read_image_file(path: &Path) -> Result<(Vec<u8>, Option<(u32, u32)>)> {
    let bytes = std::fs::read(path).map_err(|e| ConvertError::image(format!("{}: {e}", path.display())))?;
    let dims = image::load_from_memory(&bytes).ok().map(|img| {
        use image::GenericImageView;
        img.dimensions()
    });
    Ok((bytes, dims))
}

/// Infers the `BinData` file extension from the source path's suffix,
/// defaulting to PNG (the format the Mermaid renderer always returns).
pub fn extension_for_path(path: &str) -> String {
    let lower = path.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "jpg".to_string()
    } else if lower.ends_with(".gif") {
        "gif".to_string()
    } else if lower.ends_with(".bmp") {
        "bmp".to_string()
    } else {
        "png".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_units() {
        assert_eq!(parse_dimension("10mm"), Some((10.0 * LUNIT_PER_MM) as i64));
        assert_eq!(parse_dimension("1cm"), Some((10.0 * LUNIT_PER_MM) as i64));
        assert_eq!(parse_dimension(""), None);
    }

    #[test]
    fn rejects_absolute_and_traversal_paths() {
        assert!(validate_image_path("/etc/passwd", None).is_err());
        assert!(validate_image_path("../secrets.png", None).is_err());
        assert!(validate_image_path("images/fig1.png", None).is_ok());
    }

    #[test]
    fn rejects_paths_escaping_base_dir() {
        let base = Path::new("/project/docs");
        assert!(validate_image_path("../../etc/passwd", Some(base)).is_err());
        assert!(validate_image_path("assets/fig1.png", Some(base)).is_ok());
    }

    #[test]
    fn falls_back_to_pixel_dimensions_preserving_aspect_ratio() {
        let size = resolve_size(Some("200px"), None, Some((400, 200)));
        assert_eq!(size.height, size.width / 2);
    }

    #[test]
    fn clamps_oversized_width() {
        let size = resolve_size(Some("1000mm"), Some("1000mm"), None);
        assert_eq!(size.width, IMAGE_MAX_WIDTH);
    }
}
