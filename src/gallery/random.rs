use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::object_store::{ObjectStore, ObjectStoreError};

/// How many objects the random picker considers.
pub const DEFAULT_PICK_LIMIT: usize = 100;

/// Draws made while trying to avoid the previously shown URL.
pub const DEFAULT_PICK_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum PickError {
    #[error("No images found in the storage bucket")]
    NoImages,
    #[error("Failed to list bucket: {0}")]
    Listing(#[from] ObjectStoreError),
}

/// Public URL of an object drawn uniformly from the first `limit` objects
/// of the bucket. Objects beyond the cap are never picked.
pub async fn pick_random<R: Rng + Send>(
    store: &dyn ObjectStore,
    limit: usize,
    rng: &mut R,
) -> Result<String, PickError> {
    let objects = store.list(Some(limit)).await?;
    let object = objects.choose(rng).ok_or(PickError::NoImages)?;
    Ok(store.public_url(&object.name))
}

/// Draw up to `attempts` times while the pick equals `previous`.
/// The last draw is returned even if it still repeats, so a bucket with a
/// single object always yields that object.
pub async fn pick_avoiding<R: Rng + Send>(
    store: &dyn ObjectStore,
    limit: usize,
    previous: Option<&str>,
    attempts: usize,
    rng: &mut R,
) -> Result<String, PickError> {
    let mut url = pick_random(store, limit, rng).await?;
    let mut drawn = 1;
    while previous == Some(url.as_str()) && drawn < attempts {
        url = pick_random(store, limit, rng).await?;
        drawn += 1;
    }
    if previous == Some(url.as_str()) {
        tracing::debug!(%url, drawn, "Returning repeated image");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::LocalStore;
    use bytes::Bytes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    async fn store_with(names: &[&str]) -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "http://img.test").unwrap();
        for name in names {
            store
                .put(name, Bytes::from_static(b"px"), "image/png")
                .await
                .unwrap();
        }
        (dir, store)
    }

    #[tokio::test]
    async fn test_empty_bucket() {
        let (_dir, store) = store_with(&[]).await;
        let mut rng = StdRng::seed_from_u64(7);

        let result = pick_random(&store, DEFAULT_PICK_LIMIT, &mut rng).await;
        assert!(matches!(result, Err(PickError::NoImages)));

        let result = pick_avoiding(&store, DEFAULT_PICK_LIMIT, None, 5, &mut rng).await;
        assert!(matches!(result, Err(PickError::NoImages)));
    }

    #[tokio::test]
    async fn test_single_object_always_returned() {
        let (_dir, store) = store_with(&["only.png"]).await;
        let expected = store.public_url("only.png");
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..10 {
            assert_eq!(
                pick_random(&store, DEFAULT_PICK_LIMIT, &mut rng).await.unwrap(),
                expected
            );
        }

        let url = pick_avoiding(
            &store,
            DEFAULT_PICK_LIMIT,
            Some(&expected),
            DEFAULT_PICK_ATTEMPTS,
            &mut rng,
        )
        .await
        .unwrap();
        assert_eq!(url, expected);
    }

    #[tokio::test]
    async fn test_pick_avoiding_skips_previous() {
        let (_dir, store) = store_with(&["a.png", "b.png"]).await;
        let previous = store.public_url("a.png");

        // With two objects, 50 attempts makes a repeat astronomically unlikely
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let url = pick_avoiding(&store, DEFAULT_PICK_LIMIT, Some(&previous), 50, &mut rng)
                .await
                .unwrap();
            assert_eq!(url, store.public_url("b.png"));
        }
    }

    #[tokio::test]
    async fn test_limit_caps_candidates() {
        let (_dir, store) = store_with(&["a.png", "b.png", "c.png"]).await;
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            let url = pick_random(&store, 1, &mut rng).await.unwrap();
            assert_eq!(url, store.public_url("a.png"));
        }
    }
}
