pub mod firestore;
pub mod memory;

use std::sync::Arc;

use crate::config::DocumentStoreProvider;
use crate::domain::repository::DocumentStore;
use crate::error::Result;

pub use firestore::FirestoreDocumentStore;
pub use memory::InMemoryDocumentStore;

pub type DocumentStoreRef = Arc<dyn DocumentStore>;

pub fn build_document_store(provider: &DocumentStoreProvider) -> Result<DocumentStoreRef> {
    match provider {
        DocumentStoreProvider::Firestore(settings) => {
            Ok(Arc::new(FirestoreDocumentStore::new(settings)?))
        }
        DocumentStoreProvider::Memory { seed_path: Some(path) } => {
            Ok(Arc::new(InMemoryDocumentStore::from_seed_file(path)?))
        }
        DocumentStoreProvider::Memory { seed_path: None } => {
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}
