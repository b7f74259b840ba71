// crates/canteen-api/src/services/users.rs
// ============================================================================
// Module: User Service
// Description: Profiles and customer search.
// Purpose: Expose account data without password material.
// Dependencies: canteen-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use canteen_core::CanteenStore;
use canteen_core::Page;
use canteen_core::PageRequest;
use canteen_core::SharedCanteenStore;
use canteen_core::User;
use canteen_core::UserDto;

use super::ServiceDeps;
use super::ServiceError;
use super::normalize_query;
use super::page_key;
use crate::cache::CacheNamespace;
use crate::cache::TtlCache;

// ============================================================================
// SECTION: Service
// ============================================================================

/// User profile and search service.
#[derive(Clone)]
pub struct UserService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Search cache.
    cache: Arc<TtlCache>,
}

impl UserService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps) -> Self {
        Self {
            store: deps.store.clone(),
            cache: Arc::clone(&deps.cache),
        }
    }

    /// Returns the public projection of `user`.
    #[must_use]
    pub fn profile(&self, user: &User) -> UserDto {
        user.to_dto()
    }

    /// Lists customers whose name or email starts with `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn list_customers(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<UserDto>, ServiceError> {
        let query = normalize_query(query);
        let key = page_key(query.as_deref(), page);
        self.cache.get_or_insert_with(CacheNamespace::UserSearch, &key, || {
            let users = self.store.search_customers(query.as_deref(), page)?;
            Ok::<_, ServiceError>(users.map(|user| user.to_dto()))
        })
    }
}
