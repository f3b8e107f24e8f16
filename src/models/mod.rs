pub mod painting;
pub mod user;

pub use painting::{LocalizedText, Material, PaintingId, PaintingRecord, PaintingUpdate};
pub use user::User;
