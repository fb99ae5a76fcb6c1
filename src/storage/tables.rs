use redb::TableDefinition;

/// Image records: id -> ImageRecord (msgpack)
pub const IMAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("images");

/// Unique URL index: url -> id (dedupe lookups and the uniqueness constraint)
pub const IMAGE_URLS: TableDefinition<&str, &str> = TableDefinition::new("image_urls");
