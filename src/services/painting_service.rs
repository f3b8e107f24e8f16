use crate::error::AppError;
use crate::models::{LocalizedText, PaintingId, PaintingRecord, PaintingUpdate};
use photo_pipeline::{FolderHandle, PhotoSet};
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

const SELECT_COLUMNS: &str = "SELECT id, title, title_secondary, description, description_secondary,
        price, size, created_on, availability, materials, photo_urls, photo_folder
     FROM paintings";

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Persistence(format!("JSON serialize failed: {}", e)))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl<'r> TryFrom<&Row<'r>> for PaintingRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'r>) -> Result<Self, Self::Error> {
        let id: String = row.get(0)?;
        let id = PaintingId::parse(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.to_string().into())
        })?;
        let folder: Option<String> = row.get(11)?;

        Ok(PaintingRecord {
            id: Some(id),
            title: LocalizedText::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
            description: LocalizedText::new(row.get::<_, String>(3)?, row.get::<_, String>(4)?),
            price: row.get(5)?,
            size: json_column(row, 6)?,
            created_on: row.get(7)?,
            availability: row.get(8)?,
            materials: json_column(row, 9)?,
            photos: PhotoSet {
                urls: json_column(row, 10)?,
                folder: folder.map(FolderHandle::new),
            },
        })
    }
}

/// Stores a new painting and returns its freshly generated identifier
///
/// Any identifier already set on `record` is ignored.
pub fn insert_painting(
    conn: &Connection,
    record: &PaintingRecord,
) -> Result<PaintingId, AppError> {
    record.validate()?;
    let id = PaintingId::generate();

    conn.execute(
        "INSERT INTO paintings (id, title, title_secondary, description, description_secondary,
            price, size, created_on, availability, materials, photo_urls, photo_folder)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            id.to_hex(),
            &record.title.primary,
            &record.title.secondary,
            &record.description.primary,
            &record.description.secondary,
            record.price,
            to_json(&record.size)?,
            record.created_on,
            &record.availability,
            to_json(&record.materials)?,
            to_json(&record.photos.urls)?,
            record.photos.folder.as_ref().map(|f| f.as_str().to_string()),
        ],
    )?;

    Ok(id)
}

/// Lists all paintings, oldest first
pub fn list_paintings(conn: &Connection) -> Result<Vec<PaintingRecord>, AppError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;
    let paintings = stmt
        .query_map([], |row| PaintingRecord::try_from(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(paintings)
}

/// Loads a painting, `None` if there is no such record
pub fn get_painting(
    conn: &Connection,
    id: PaintingId,
) -> Result<Option<PaintingRecord>, AppError> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
    let painting = stmt
        .query_row([id.to_hex()], |row| PaintingRecord::try_from(row))
        .optional()?;
    Ok(painting)
}

/// Writes the fields present in `update`; returns false if the record is missing
pub fn update_painting(
    conn: &Connection,
    id: PaintingId,
    update: &PaintingUpdate,
) -> Result<bool, AppError> {
    let mut assignments: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let mut set = |column: &'static str, value: Value| {
        assignments.push(column);
        values.push(value);
    };

    if let Some(title) = &update.title {
        set("title", Value::Text(title.clone()));
    }
    if let Some(title) = &update.title_secondary {
        set("title_secondary", Value::Text(title.clone()));
    }
    if let Some(description) = &update.description {
        set("description", Value::Text(description.clone()));
    }
    if let Some(description) = &update.description_secondary {
        set("description_secondary", Value::Text(description.clone()));
    }
    if let Some(price) = update.price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::Validation(
                "Price must be a non-negative number".to_string(),
            ));
        }
        set("price", Value::Real(price));
    }
    if let Some(size) = &update.size {
        set("size", Value::Text(to_json(size)?));
    }
    if let Some(created_on) = update.created_on {
        // Same text layout rusqlite uses when binding a DateTime<Utc>
        set(
            "created_on",
            Value::Text(created_on.format("%F %T%.f%:z").to_string()),
        );
    }
    if let Some(availability) = &update.availability {
        set("availability", Value::Text(availability.clone()));
    }
    if let Some(materials) = &update.materials {
        set("materials", Value::Text(to_json(materials)?));
    }
    if let Some(photos) = &update.photos {
        if !photos.is_consistent() {
            return Err(AppError::Validation(
                "Photo links require a folder handle".to_string(),
            ));
        }
        set("photo_urls", Value::Text(to_json(&photos.urls)?));
        set(
            "photo_folder",
            photos
                .folder
                .as_ref()
                .map(|f| Value::Text(f.as_str().to_string()))
                .unwrap_or(Value::Null),
        );
    }

    if assignments.is_empty() {
        return Ok(get_painting(conn, id)?.is_some());
    }

    let set_clause = assignments
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    values.push(Value::Text(id.to_hex()));
    let sql = format!(
        "UPDATE paintings SET {} WHERE id = ?{}",
        set_clause,
        values.len()
    );

    let rows_affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(rows_affected > 0)
}

/// Deletes a painting; returns false if there was nothing to delete
pub fn delete_painting(conn: &Connection, id: PaintingId) -> Result<bool, AppError> {
    let rows_affected = conn.execute("DELETE FROM paintings WHERE id = ?1", [id.to_hex()])?;
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Material;
    use chrono::{TimeZone, Utc};

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        conn
    }

    fn full_record() -> PaintingRecord {
        let mut record = PaintingRecord::new(
            LocalizedText::new("Sunflowers", "Соняшники"),
            1250.0,
            Utc.with_ymd_and_hms(2021, 6, 1, 12, 30, 0).unwrap(),
        );
        record.description = LocalizedText::new("Oil on canvas", "Олія на полотні");
        record.size = vec![60.0, 80.5];
        record.availability = "available".to_string();
        record.materials = vec![Material {
            id: "oil".to_string(),
            primary: "Oil".to_string(),
            secondary: "Олія".to_string(),
        }];
        record.photos = PhotoSet::new(
            vec!["https://a/1".to_string(), "https://a/2".to_string()],
            FolderHandle::new("gallery/sunflowers"),
        );
        record
    }

    #[test]
    fn test_insert_and_get_painting() {
        let conn = setup_test_db();
        let record = full_record();

        let id = insert_painting(&conn, &record).unwrap();
        let loaded = get_painting(&conn, id).unwrap().unwrap();

        assert_eq!(loaded.id, Some(id));
        assert_eq!(PaintingRecord { id: None, ..loaded }, record);
    }

    #[test]
    fn test_get_missing_painting_is_none() {
        let conn = setup_test_db();
        let missing = PaintingId::generate();
        assert!(get_painting(&conn, missing).unwrap().is_none());
    }

    #[test]
    fn test_list_paintings_in_creation_order() {
        let conn = setup_test_db();
        let first = insert_painting(&conn, &full_record()).unwrap();
        let second = insert_painting(&conn, &full_record()).unwrap();

        let all = list_paintings(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, Some(first));
        assert_eq!(all[1].id, Some(second));
    }

    #[test]
    fn test_price_only_update_leaves_other_columns_untouched() {
        let conn = setup_test_db();
        let id = insert_painting(&conn, &full_record()).unwrap();

        let raw_before: Vec<String> = conn
            .query_row(
                "SELECT title, title_secondary, description, description_secondary, size,
                        created_on, availability, materials, photo_urls, photo_folder
                 FROM paintings WHERE id = ?1",
                [id.to_hex()],
                |row| (0..10usize).map(|i| row.get::<_, String>(i)).collect(),
            )
            .unwrap();

        let update = PaintingUpdate {
            price: Some(999.0),
            ..Default::default()
        };
        assert!(update_painting(&conn, id, &update).unwrap());

        let raw_after: Vec<String> = conn
            .query_row(
                "SELECT title, title_secondary, description, description_secondary, size,
                        created_on, availability, materials, photo_urls, photo_folder
                 FROM paintings WHERE id = ?1",
                [id.to_hex()],
                |row| (0..10usize).map(|i| row.get::<_, String>(i)).collect(),
            )
            .unwrap();

        assert_eq!(raw_before, raw_after);
        assert_eq!(get_painting(&conn, id).unwrap().unwrap().price, 999.0);
    }

    #[test]
    fn test_update_replaces_photos() {
        let conn = setup_test_db();
        let id = insert_painting(&conn, &full_record()).unwrap();

        let new_photos =
            PhotoSet::new(vec!["https://b/1".to_string()], FolderHandle::new("gallery/x"));
        let update = PaintingUpdate {
            photos: Some(new_photos.clone()),
            created_on: Some(Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        };
        assert!(update_painting(&conn, id, &update).unwrap());

        let loaded = get_painting(&conn, id).unwrap().unwrap();
        assert_eq!(loaded.photos, new_photos);
        assert_eq!(
            loaded.created_on,
            Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn test_update_missing_painting_is_false() {
        let conn = setup_test_db();
        let update = PaintingUpdate {
            availability: Some("sold".to_string()),
            ..Default::default()
        };
        assert!(!update_painting(&conn, PaintingId::generate(), &update).unwrap());
        let empty = PaintingUpdate::default();
        assert!(!update_painting(&conn, PaintingId::generate(), &empty).unwrap());
    }

    #[test]
    fn test_update_rejects_links_without_folder() {
        let conn = setup_test_db();
        let id = insert_painting(&conn, &full_record()).unwrap();
        let update = PaintingUpdate {
            photos: Some(PhotoSet {
                urls: vec!["https://c/1".to_string()],
                folder: None,
            }),
            ..Default::default()
        };
        assert!(matches!(
            update_painting(&conn, id, &update),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_painting() {
        let conn = setup_test_db();
        let id = insert_painting(&conn, &full_record()).unwrap();

        assert!(delete_painting(&conn, id).unwrap());
        assert!(get_painting(&conn, id).unwrap().is_none());
        assert!(!delete_painting(&conn, id).unwrap());
    }
}
