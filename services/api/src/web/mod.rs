pub mod auth;
pub mod dto;
pub mod middleware;
pub mod orders;
pub mod rest;
pub mod state;

// Re-export what the binary needs to assemble the router.
pub use middleware::{require_admin, require_auth};
pub use rest::ApiDoc;
pub use state::AppState;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::adapters::{InMemoryStore, LocalFileStorage};
    use crate::config::Config;
    use crate::web::state::AppState;
    use axum::{
        body::Body,
        extract::{FromRequest, Multipart},
        http::{header, Request},
    };
    use std::sync::Arc;
    use study_market_core::ports::MarketplaceStore;
    use uuid::Uuid;

    /// Shared state over a fresh in-memory store and a throwaway storage root.
    pub fn test_state() -> (Arc<AppState>, Arc<InMemoryStore>) {
        let root = std::env::temp_dir().join(format!("study-market-{}", Uuid::new_v4()));
        let config = Config::for_tests(root.clone());
        let store = Arc::new(InMemoryStore::new());
        let storage = Arc::new(LocalFileStorage::new(root, config.public_base_url.clone()));
        let state = Arc::new(AppState::new(store.clone(), storage, config));
        (state, store)
    }

    pub async fn register(store: &InMemoryStore, email: &str) -> Uuid {
        store
            .create_profile(email, "not-a-real-hash", Some("Test"), Some("User"))
            .await
            .unwrap()
            .id
    }

    /// A text field `(name, None, value)` or a file field `(name, Some(file_name), contents)`.
    pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

    pub async fn multipart(parts: &[Part<'_>]) -> Multipart {
        const BOUNDARY: &str = "study-market-boundary";
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }
}
