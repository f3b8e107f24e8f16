use crate::error::AppError;
use chrono::{DateTime, Utc};
use photo_pipeline::PhotoSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Stable painting identifier: 12 bytes rendered as 24 hex characters
///
/// Layout: 4 bytes big-endian Unix seconds, 5 bytes chosen once per process,
/// 3 bytes of a wrapping counter. Identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaintingId([u8; 12]);

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

impl PaintingId {
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let unique = PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
        let count = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random::<u32>()))
            .fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Parses a 24-character hex identifier (case-insensitive)
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let s = s.trim();
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AppError::Validation(format!("Invalid painting id '{}'", s)));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| AppError::Validation(format!("Invalid painting id '{}'", s)))?;
        }
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for PaintingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for PaintingId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PaintingId> for String {
    fn from(id: PaintingId) -> Self {
        id.to_hex()
    }
}

/// Text in the primary locale plus its translation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalizedText {
    pub primary: String,
    pub secondary: String,
}

impl LocalizedText {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Material {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: String,
}

/// A painting as stored in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaintingRecord {
    /// Assigned by the metadata store on first save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<PaintingId>,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub price: f64,
    /// Physical dimensions, unit-agnostic
    pub size: Vec<f64>,
    pub created_on: DateTime<Utc>,
    pub availability: String,
    pub materials: Vec<Material>,
    pub photos: PhotoSet,
}

impl PaintingRecord {
    pub fn new(title: LocalizedText, price: f64, created_on: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title,
            description: LocalizedText::default(),
            price,
            size: Vec::new(),
            created_on,
            availability: String::new(),
            materials: Vec::new(),
            photos: PhotoSet::empty(),
        }
    }

    /// Rejects values that can never be stored
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::Validation(
                "Price must be a non-negative number".to_string(),
            ));
        }
        if self.size.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AppError::Validation(
                "Size values must be non-negative numbers".to_string(),
            ));
        }
        if !self.photos.is_consistent() {
            return Err(AppError::Validation(
                "Photo links require a folder handle".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update: only `Some` fields are written, `None` fields stay as stored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintingUpdate {
    pub title: Option<String>,
    pub title_secondary: Option<String>,
    pub description: Option<String>,
    pub description_secondary: Option<String>,
    pub price: Option<f64>,
    pub size: Option<Vec<f64>>,
    pub created_on: Option<DateTime<Utc>>,
    pub availability: Option<String>,
    pub materials: Option<Vec<Material>>,
    pub photos: Option<PhotoSet>,
}

impl PaintingUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the present fields to `record`
    pub fn apply_to(&self, record: &mut PaintingRecord) {
        if let Some(title) = &self.title {
            record.title.primary = title.clone();
        }
        if let Some(title) = &self.title_secondary {
            record.title.secondary = title.clone();
        }
        if let Some(description) = &self.description {
            record.description.primary = description.clone();
        }
        if let Some(description) = &self.description_secondary {
            record.description.secondary = description.clone();
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(size) = &self.size {
            record.size = size.clone();
        }
        if let Some(created_on) = self.created_on {
            record.created_on = created_on;
        }
        if let Some(availability) = &self.availability {
            record.availability = availability.clone();
        }
        if let Some(materials) = &self.materials {
            record.materials = materials.clone();
        }
        if let Some(photos) = &self.photos {
            record.photos = photos.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_pipeline::FolderHandle;

    #[test]
    fn test_generated_ids_are_hex_and_unique() {
        let a = PaintingId::generate();
        let b = PaintingId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_hex().len(), 24);
        assert!(a.to_hex().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_parse_roundtrip() {
        let id = PaintingId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(PaintingId::parse("65A1F0C2E4B0A1B2C3D4E5F6").unwrap(), id);
    }

    #[test]
    fn test_id_parse_rejects_malformed() {
        assert!(PaintingId::parse("").is_err());
        assert!(PaintingId::parse("65a1f0c2e4b0a1b2c3d4e5f").is_err());
        assert!(PaintingId::parse("zza1f0c2e4b0a1b2c3d4e5f6").is_err());
        assert!(PaintingId::parse("ééa1f0c2e4b0a1b2c3d4e5").is_err());
        assert!(PaintingId::parse("+0+0+0+0+0+0+0+0+0+0+0+0").is_err());
        assert!(PaintingId::parse("-0a1f0c2e4b0a1b2c3d4e5f6").is_err());
    }

    #[test]
    fn test_ids_sort_by_creation_time() {
        let older = PaintingId::parse("000000010000000000000000").unwrap();
        let newer = PaintingId::generate();
        assert!(older < newer);
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let mut record = PaintingRecord::new(LocalizedText::new("A", "Б"), 10.0, Utc::now());
        assert!(record.validate().is_ok());
        record.price = -1.0;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_update_touches_only_present_fields() {
        let mut record = PaintingRecord::new(LocalizedText::new("A", "Б"), 10.0, Utc::now());
        record.availability = "available".to_string();
        let before = record.clone();

        let update = PaintingUpdate {
            price: Some(25.5),
            ..Default::default()
        };
        update.apply_to(&mut record);

        assert_eq!(record.price, 25.5);
        assert_eq!(record.title, before.title);
        assert_eq!(record.availability, before.availability);
        assert_eq!(record.photos, before.photos);
    }

    #[test]
    fn test_update_replaces_photo_set_whole() {
        let mut record = PaintingRecord::new(LocalizedText::default(), 1.0, Utc::now());
        record.photos = PhotoSet::new(vec!["old".into()], FolderHandle::new("f-old"));

        let update = PaintingUpdate {
            photos: Some(PhotoSet::new(vec!["new".into()], FolderHandle::new("f-new"))),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut record);
        assert_eq!(record.photos.urls, vec!["new".to_string()]);
        assert_eq!(record.photos.folder, Some(FolderHandle::new("f-new")));
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = PaintingId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65a1f0c2e4b0a1b2c3d4e5f6\"");
        let back: PaintingId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
