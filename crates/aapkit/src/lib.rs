//! # aapkit
//!
//! Blocking client for the inventory, group and host endpoints of Ansible
//! Automation Platform (and AWX) `api/v2`.
//!
//! The platform exposes flat CRUD endpoints plus pairwise association
//! endpoints (`groups/{id}/children/`, `hosts/{id}/groups/`). This crate
//! wraps them behind the [`Backend`] trait so higher layers can be tested
//! against [`MockBackend`] and run against [`HttpBackend`].
//!
//! ## Example
//!
//! ```no_run
//! use aapkit::{Client, GroupRequest};
//!
//! let client = Client::http(
//!     aapkit::HttpBackend::builder("https://aap.example.com").basic_auth("admin", "secret"),
//! )
//! .expect("invalid host");
//!
//! let group = client
//!     .backend()
//!     .create_group(&GroupRequest {
//!         inventory: 3,
//!         name: "web".to_string(),
//!         description: String::new(),
//!         variables: None,
//!     })
//!     .expect("create failed");
//! println!("created group {}", group.id);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Backend trait and implementations.
pub mod backend;
/// Error types for platform operations.
pub mod error;
/// Wire types for requests and responses.
#[allow(missing_docs)]
pub mod types;

pub use backend::http::{HttpBackend, HttpBackendBuilder};
pub use backend::{Backend, Call, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AssociationRequest, Group, GroupRequest, Host, HostRequest, Inventory, InventoryRequest, Page,
};

/// High-level handle owning a backend.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking HTTP to a live platform.
    pub fn http(builder: HttpBackendBuilder) -> Result<Self> {
        Ok(Self {
            backend: Box::new(builder.build()?),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Borrow the underlying backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_mock_backend() {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone()));

        let inventory = client
            .backend()
            .create_inventory(&InventoryRequest {
                organization: 1,
                name: "lab".to_string(),
                description: String::new(),
                variables: None,
            })
            .unwrap();

        // Clones share state with the handle the client owns.
        assert_eq!(mock.inventory_count(), 1);
        assert_eq!(
            mock.calls(),
            vec![Call::CreateInventory {
                name: "lab".to_string()
            }]
        );
        assert_eq!(client.backend().get_inventory(inventory.id).unwrap(), inventory);
    }

    #[test]
    fn test_client_http_rejects_bad_host() {
        assert!(Client::http(HttpBackend::builder("ftp://nope")).is_err());
    }
}
