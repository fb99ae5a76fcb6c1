use async_trait::async_trait;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{ImageRecord, InsertOutcome, NewImage};
use super::tables::*;
use super::{ImageTable, TableError};

impl Database {
    // ========================================================================
    // Image operations
    // ========================================================================

    /// Insert a record unless its URL is already indexed.
    /// The check and the write share one transaction, so the URL index acts
    /// as a unique constraint.
    pub fn insert_image(&self, image: &NewImage) -> Result<InsertOutcome, DatabaseError> {
        debug_assert!(!image.url.is_empty(), "image url must not be empty");

        let write_txn = self.begin_write()?;
        let exists = {
            let url_table = write_txn.open_table(IMAGE_URLS)?;
            let found = url_table.get(image.url.as_str())?.is_some();
            found
        };
        if exists {
            write_txn.abort()?;
            return Ok(InsertOutcome::Duplicate);
        }

        // v7 ids sort by creation time, so table scans come back in insertion order
        let record = image.clone().into_record(uuid::Uuid::now_v7().to_string());
        {
            let mut table = write_txn.open_table(IMAGES)?;
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(record.id.as_str(), data.as_slice())?;

            let mut url_table = write_txn.open_table(IMAGE_URLS)?;
            url_table.insert(record.url.as_str(), record.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(InsertOutcome::Inserted(record))
    }

    /// Get an image by id
    pub fn get_image(&self, id: &str) -> Result<Option<ImageRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(IMAGES)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get an image by its public URL (resolves url -> id -> record)
    pub fn get_image_by_url(&self, url: &str) -> Result<Option<ImageRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let url_table = read_txn.open_table(IMAGE_URLS)?;

        let id = match url_table.get(url)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(IMAGES)?;
        match table.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All images, oldest first
    pub fn get_all_images(&self) -> Result<Vec<ImageRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(IMAGES)?;

        let mut images = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            images.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(images)
    }

    /// Replace an image's tags wholesale. Returns the updated record, or
    /// `None` when the id is unknown.
    pub fn update_image_tags(
        &self,
        id: &str,
        tags: &[String],
    ) -> Result<Option<ImageRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<ImageRecord> = {
            let table = write_txn.open_table(IMAGES)?;
            let result = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut image) => {
                image.tags = tags.to_vec();
                let serialized = rmp_serde::to_vec_named(&image)?;
                let mut table = write_txn.open_table(IMAGES)?;
                table.insert(id, serialized.as_slice())?;
                Some(image)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Delete an image by id and drop its URL index entry
    pub fn delete_image(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let url: Option<String> = {
            let table = write_txn.open_table(IMAGES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let image: ImageRecord = rmp_serde::from_slice(data.value())?;
                    Some(image.url)
                }
                None => None,
            };
            result
        };

        let deleted = match url {
            Some(url) => {
                {
                    let mut table = write_txn.open_table(IMAGES)?;
                    table.remove(id)?;
                }
                {
                    let mut url_table = write_txn.open_table(IMAGE_URLS)?;
                    url_table.remove(url.as_str())?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

#[async_trait]
impl ImageTable for Database {
    async fn select_all(&self) -> Result<Vec<ImageRecord>, TableError> {
        Ok(self.get_all_images()?)
    }

    async fn select_by_url(&self, url: &str) -> Result<Option<ImageRecord>, TableError> {
        Ok(self.get_image_by_url(url)?)
    }

    async fn insert(&self, image: NewImage) -> Result<InsertOutcome, TableError> {
        Ok(self.insert_image(&image)?)
    }

    async fn update_tags(
        &self,
        id: &str,
        tags: Vec<String>,
    ) -> Result<Option<ImageRecord>, TableError> {
        Ok(self.update_image_tags(id, &tags)?)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, TableError> {
        Ok(self.delete_image(id)?)
    }
}
