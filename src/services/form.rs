//! Turning submitted form fields into painting data
//!
//! All parsing happens before anything is staged or uploaded, so a malformed
//! field never leaves side effects behind.

use crate::error::AppError;
use crate::models::{LocalizedText, Material, PaintingRecord, PaintingUpdate};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub type FormFields = HashMap<String, String>;

fn text(fields: &FormFields, name: &str) -> String {
    fields.get(name).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Value of `name` if it was submitted and is not blank
fn present<'a>(fields: &'a FormFields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(fields: &'a FormFields, name: &str) -> Result<&'a str, AppError> {
    present(fields, name)
        .ok_or_else(|| AppError::Validation(format!("Field '{}' is required", name)))
}

fn parse_price(value: &str) -> Result<f64, AppError> {
    match value.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(AppError::Validation(format!(
            "Field 'price' must be a non-negative decimal, got '{}'",
            value
        ))),
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            AppError::Validation(format!(
                "Field 'date' must be an RFC 3339 timestamp: {}",
                e
            ))
        })
}

fn parse_materials(value: &str) -> Result<Vec<Material>, AppError> {
    serde_json::from_str(value).map_err(|e| {
        AppError::Validation(format!("Field 'materials' must be a JSON array: {}", e))
    })
}

fn parse_size(value: &str) -> Result<Vec<f64>, AppError> {
    let size: Vec<f64> = serde_json::from_str(value).map_err(|e| {
        AppError::Validation(format!("Field 'size' must be a JSON array of numbers: {}", e))
    })?;
    if size.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AppError::Validation(
            "Size values must be non-negative numbers".to_string(),
        ));
    }
    Ok(size)
}

/// Builds a new record from a create submission
///
/// `price`, `date`, `materials` and `size` must be present and well formed;
/// text fields default to empty. The photo set starts empty.
pub fn parse_new_painting(fields: &FormFields) -> Result<PaintingRecord, AppError> {
    let price = parse_price(required(fields, "price")?)?;
    let created_on = parse_date(required(fields, "date")?)?;
    let materials = parse_materials(required(fields, "materials")?)?;
    let size = parse_size(required(fields, "size")?)?;

    let mut record = PaintingRecord::new(
        LocalizedText::new(text(fields, "title"), text(fields, "title_secondary")),
        price,
        created_on,
    );
    record.description =
        LocalizedText::new(text(fields, "description"), text(fields, "description_secondary"));
    record.availability = text(fields, "availability");
    record.materials = materials;
    record.size = size;

    record.validate()?;
    Ok(record)
}

/// Builds a partial update from the non-blank fields of a submission
pub fn parse_update(fields: &FormFields) -> Result<PaintingUpdate, AppError> {
    Ok(PaintingUpdate {
        title: present(fields, "title").map(str::to_string),
        title_secondary: present(fields, "title_secondary").map(str::to_string),
        description: present(fields, "description").map(str::to_string),
        description_secondary: present(fields, "description_secondary").map(str::to_string),
        price: present(fields, "price").map(parse_price).transpose()?,
        size: present(fields, "size").map(parse_size).transpose()?,
        created_on: present(fields, "date").map(parse_date).transpose()?,
        availability: present(fields, "availability").map(str::to_string),
        materials: present(fields, "materials").map(parse_materials).transpose()?,
        photos: None,
    })
}
