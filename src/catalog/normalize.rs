//! Backend JSON to canonical records.
//!
//! The wallpaper backend names things its own way (`_id`, nested
//! `image.url`, `mainCategory` objects). Every function here is total: bad
//! entries are dropped with a warning and a body of the wrong shape becomes an
//! empty page, so schema drift never reaches the feed as an error.

use serde_json::Value;
use tracing::{trace, warn};

use super::CatalogError;
use crate::models::{CatalogOption, FilterOptions, ImageRecord, Page};

/// Parses and normalizes a raw `/wallpapers` response body.
///
/// Only a body that is not JSON at all is an error; any JSON becomes a page.
pub fn parse_page(raw: &str) -> Result<Page, CatalogError> {
    let body: Value =
        serde_json::from_str(raw).map_err(|e| CatalogError::Malformed(e.to_string()))?;
    Ok(normalize_page(&body))
}

/// Normalizes a `/wallpapers` response body.
pub fn normalize_page(body: &Value) -> Page {
    let Some(obj) = body.as_object() else {
        warn!(kind = value_kind(body), "Malformed wallpaper page, treating as empty");
        return Page::default();
    };

    let list: &[Value] = match obj.get("data").or_else(|| obj.get("hits")) {
        Some(Value::Array(list)) => list.as_slice(),
        Some(other) => {
            warn!(kind = value_kind(other), "Wallpaper page data is not a list");
            &[]
        }
        None => &[],
    };

    let items: Vec<ImageRecord> = list.iter().filter_map(normalize_wallpaper).collect();
    if items.len() < list.len() {
        warn!(
            dropped = list.len() - items.len(),
            "Dropped wallpapers without id or url"
        );
    }

    Page {
        total: obj.get("total").and_then(Value::as_u64),
        pages: obj
            .get("pages")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok()),
        items,
    }
}

/// Normalizes one backend wallpaper. `None` if it has no usable id or url.
pub fn normalize_wallpaper(item: &Value) -> Option<ImageRecord> {
    let id = scalar_string(item.get("_id")).or_else(|| scalar_string(item.get("id")))?;
    let url = item
        .get("image")
        .and_then(|image| string_field(image, "url"))
        .or_else(|| string_field(item, "webformatURL"))
        .or_else(|| string_field(item, "url"))?;

    let width = dimension(item, "imageWidth").or_else(|| {
        item.get("image")
            .and_then(|image| dimension(image, "width"))
    });
    let height = dimension(item, "imageHeight").or_else(|| {
        item.get("image")
            .and_then(|image| dimension(image, "height"))
    });

    let category = match item.get("mainCategory") {
        Some(Value::Object(cat)) => cat
            .get("slug")
            .or_else(|| cat.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        other => scalar_string(other),
    };

    let dominant_color = match item.get("dominantColor") {
        Some(Value::Object(color)) => color
            .get("hexCode")
            .and_then(Value::as_str)
            .map(str::to_string),
        other => scalar_string(other),
    };

    trace!(%id, "Normalized wallpaper");
    Some(ImageRecord {
        id,
        url,
        width,
        height,
        category,
        dominant_color,
        title: string_field(item, "title"),
    })
}

/// Normalizes a `/categories` response, keeping only top-level categories.
pub fn normalize_categories(body: &Value) -> Vec<CatalogOption> {
    list_field(body, "categories")
        .iter()
        .filter(|cat| matches!(cat.get("parentCategory"), None | Some(Value::Null)))
        .filter_map(normalize_option)
        .collect()
}

/// Normalizes an option list such as `/wallpaper-types` (`types`) or
/// `/screen-types` (`screens`).
pub fn normalize_options(body: &Value, list_key: &str) -> Vec<CatalogOption> {
    list_field(body, list_key)
        .iter()
        .filter_map(normalize_option)
        .collect()
}

/// Normalizes a `/colors` response. Inactive colors are skipped and the hex
/// code is carried in `slug`.
pub fn normalize_colors(body: &Value) -> Vec<CatalogOption> {
    list_field(body, "data")
        .iter()
        .filter(|color| color.get("isActive").and_then(Value::as_bool) != Some(false))
        .filter_map(|color| {
            let id = scalar_string(color.get("_id")).or_else(|| scalar_string(color.get("id")))?;
            let hex = string_field(color, "hexCode")?;
            let name = string_field(color, "name").unwrap_or_else(|| hex.clone());
            Some(CatalogOption {
                id,
                slug: hex,
                name,
            })
        })
        .collect()
}

/// Combines the three option responses into `FilterOptions`.
pub fn normalize_filter_options(types: &Value, screens: &Value, colors: &Value) -> FilterOptions {
    FilterOptions {
        wallpaper_types: normalize_options(types, "types"),
        screen_types: normalize_options(screens, "screens"),
        colors: normalize_colors(colors),
    }
}

fn normalize_option(item: &Value) -> Option<CatalogOption> {
    let id = scalar_string(item.get("_id")).or_else(|| scalar_string(item.get("id")))?;
    let slug = string_field(item, "slug").unwrap_or_default();
    let name = string_field(item, "name").unwrap_or_else(|| id.clone());
    Some(CatalogOption { id, slug, name })
}

fn list_field<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    match body.get(key) {
        Some(Value::Array(list)) => list.as_slice(),
        _ => {
            warn!(key, "Option list missing from catalog response");
            &[]
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn dimension(value: &Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u32)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
