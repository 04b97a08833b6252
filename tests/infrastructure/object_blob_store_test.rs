use bytes::Bytes;
use tempfile::TempDir;

use gpd_uploader::application::ports::{BlobStore, BlobStoreError};
use gpd_uploader::domain::StoragePath;
use gpd_uploader::infrastructure::storage::ObjectBlobStore;

use crate::helpers::fixtures::input_path;

#[tokio::test]
async fn given_local_store_when_storing_then_fetch_and_head_return_content() {
    let dir = TempDir::new().unwrap();
    let store = ObjectBlobStore::local(dir.path().to_path_buf()).unwrap();
    let path = input_path();

    let written = store
        .store(&path, Bytes::from_static(b"{\"operation\":\"DELETE\"}"))
        .await
        .unwrap();

    assert_eq!(store.head(&path).await.unwrap(), written);
    assert_eq!(
        store.fetch(&path).await.unwrap(),
        Bytes::from_static(b"{\"operation\":\"DELETE\"}")
    );
    assert!(dir.path().join(path.as_str()).exists());
}

#[tokio::test]
async fn given_missing_object_when_fetching_then_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ObjectBlobStore::local(dir.path().to_path_buf()).unwrap();

    let result = store.fetch(&StoragePath::from_raw("b/o/input/missing.json")).await;

    assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
}

#[tokio::test]
async fn given_existing_object_when_storing_again_then_overwritten() {
    let store = ObjectBlobStore::in_memory();
    let path = input_path();

    store.store(&path, Bytes::from_static(b"first")).await.unwrap();
    store.store(&path, Bytes::from_static(b"second!")).await.unwrap();

    assert_eq!(store.head(&path).await.unwrap(), 7);
}
