// crates/canteen-api/src/services/catalog.rs
// ============================================================================
// Module: Catalog Service
// Description: Categories and menu items with images and cached listings.
// Purpose: Enforce catalog uniqueness rules and keep listing caches coherent.
// Dependencies: canteen-core
// ============================================================================

//! ## Overview
//! Category slugs and case-folded item names are unique. A category that
//! still has items cannot be deleted. Deleting an item removes it from every
//! cart. Image cleanup after deletes is best effort: a stale file never fails
//! the request.
//!
//! Public listings are cached; every catalog write drops the namespaces it can
//! affect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use canteen_core::CanteenStore;
use canteen_core::Category;
use canteen_core::CategoryId;
use canteen_core::Clock;
use canteen_core::ImageError;
use canteen_core::ImageStore;
use canteen_core::MenuFilter;
use canteen_core::MenuItem;
use canteen_core::MenuItemId;
use canteen_core::MenuItemWithCart;
use canteen_core::Money;
use canteen_core::Page;
use canteen_core::PageRequest;
use canteen_core::SharedCanteenStore;
use canteen_core::StoreError;
use canteen_core::StoredImage;
use canteen_core::UserId;
use canteen_core::slugify;

use super::ServiceDeps;
use super::ServiceError;
use super::non_blank;
use super::normalize_query;
use super::page_key;
use crate::audit::ApiAuditSink;
use crate::audit::ServiceErrorEvent;
use crate::cache::CacheNamespace;
use crate::cache::TtlCache;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Uploaded image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// Declared content type.
    pub content_type: String,
}

/// New category input.
#[derive(Debug, Clone)]
pub struct NewCategory {
    /// Category name.
    pub name: String,
    /// Optional image.
    pub image: Option<ImageUpload>,
}

/// New menu item input.
#[derive(Debug, Clone)]
pub struct NewMenuItem {
    /// Item name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Price.
    pub price: Money,
    /// Owning category.
    pub category_id: CategoryId,
    /// Optional image.
    pub image: Option<ImageUpload>,
}

/// Partial menu item update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    /// New description.
    pub description: Option<String>,
    /// New price.
    pub price: Option<Money>,
    /// New availability.
    pub is_available: Option<bool>,
}

/// Namespaces touched by menu item writes.
const ITEM_NAMESPACES: [CacheNamespace; 2] =
    [CacheNamespace::Items, CacheNamespace::ItemsByCategory];
/// Namespaces touched by category writes.
const CATEGORY_NAMESPACES: [CacheNamespace; 3] =
    [CacheNamespace::Categories, CacheNamespace::Items, CacheNamespace::ItemsByCategory];

// ============================================================================
// SECTION: Service
// ============================================================================

/// Category and menu item service.
#[derive(Clone)]
pub struct CatalogService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Image storage.
    images: Arc<dyn ImageStore + Send + Sync>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Listing cache.
    cache: Arc<TtlCache>,
    /// Records image cleanup failures.
    audit: Arc<dyn ApiAuditSink>,
}

impl CatalogService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps) -> Self {
        Self {
            store: deps.store.clone(),
            images: Arc::clone(&deps.images),
            clock: Arc::clone(&deps.clock),
            cache: Arc::clone(&deps.cache),
            audit: Arc::clone(&deps.audit),
        }
    }

    // ---- categories ----

    /// Adds a category.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] when the slug is taken and image
    /// errors when the upload is rejected.
    pub fn add_category(&self, input: NewCategory) -> Result<Category, ServiceError> {
        let name = non_blank(&input.name, "Category name")?.to_string();
        let slug = slugify(&name);
        if self.store.category_by_slug(&slug)?.is_some() {
            return Err(category_taken());
        }
        let image = self.store_image(input.image)?;
        let category = Category {
            category_id: CategoryId::generate(),
            category_name: name,
            slug_name: slug,
            img_url: image.as_ref().map(|stored| stored.url.clone()),
            img_id: image.as_ref().map(|stored| stored.id.clone()),
            created_at: self.clock.now(),
            updated_at: None,
        };
        if let Err(err) = self.store.insert_category(&category) {
            self.discard_image(category.img_id.as_deref());
            return Err(match err {
                StoreError::Conflict(_) => category_taken(),
                other => other.into(),
            });
        }
        self.cache.invalidate_all(&CATEGORY_NAMESPACES);
        Ok(category)
    }

    /// Lists categories whose name starts with `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn list_categories(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Category>, ServiceError> {
        let query = normalize_query(query);
        let key = page_key(query.as_deref(), page);
        self.cache.get_or_insert_with(CacheNamespace::Categories, &key, || {
            self.store.search_categories(query.as_deref(), page).map_err(ServiceError::from)
        })
    }

    /// Deletes a category that no item references.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids and
    /// [`ServiceError::Conflict`] while items still reference it.
    pub fn delete_category(&self, category_id: &CategoryId) -> Result<(), ServiceError> {
        let category = self
            .store
            .category_by_id(category_id)?
            .ok_or_else(|| ServiceError::NotFound("Category Not Found".to_string()))?;
        if self.store.category_in_use(category_id)? {
            return Err(category_in_use());
        }
        self.store.delete_category(category_id).map_err(|err| match err {
            StoreError::Conflict(_) => category_in_use(),
            other => other.into(),
        })?;
        self.discard_image(category.img_id.as_deref());
        self.cache.invalidate_all(&CATEGORY_NAMESPACES);
        Ok(())
    }

    // ---- menu items ----

    /// Adds a menu item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] for duplicate names and
    /// [`ServiceError::NotFound`] for unknown categories.
    pub fn add_item(&self, input: NewMenuItem) -> Result<MenuItem, ServiceError> {
        let name = non_blank(&input.name, "Item name")?.to_string();
        if self.store.menu_item_by_name_ci(&name)?.is_some() {
            return Err(item_taken(&name));
        }
        let category = self
            .store
            .category_by_id(&input.category_id)?
            .ok_or_else(|| ServiceError::NotFound("Category Not Found".to_string()))?;
        let image = self.store_image(input.image)?;
        let item = MenuItem {
            item_id: MenuItemId::generate(),
            item_name: name,
            description: input.description.trim().to_string(),
            price: input.price,
            img_url: image.as_ref().map(|stored| stored.url.clone()),
            img_id: image.as_ref().map(|stored| stored.id.clone()),
            category_id: category.category_id,
            category_name: category.category_name,
            is_available: true,
            created_at: self.clock.now(),
            updated_at: None,
        };
        if let Err(err) = self.store.insert_menu_item(&item) {
            self.discard_image(item.img_id.as_deref());
            return Err(match err {
                StoreError::Conflict(_) => item_taken(&item.item_name),
                StoreError::NotFound(_) => ServiceError::NotFound("Category Not Found".to_string()),
                other => other.into(),
            });
        }
        self.cache.invalidate_all(&ITEM_NAMESPACES);
        Ok(item)
    }

    /// Applies a partial update to a menu item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn update_item(
        &self,
        item_id: &MenuItemId,
        update: ItemUpdate,
    ) -> Result<MenuItem, ServiceError> {
        let mut item = self
            .store
            .menu_item_by_id(item_id)?
            .ok_or_else(|| ServiceError::NotFound("Item not found".to_string()))?;
        if let Some(description) = update.description {
            item.description = description.trim().to_string();
        }
        if let Some(price) = update.price {
            item.price = price;
        }
        if let Some(is_available) = update.is_available {
            item.is_available = is_available;
        }
        item.updated_at = Some(self.clock.now());
        self.store.update_menu_item(&item)?;
        self.cache.invalidate_all(&ITEM_NAMESPACES);
        Ok(item)
    }

    /// Deletes a menu item and every cart entry holding it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn delete_item(&self, item_id: &MenuItemId) -> Result<(), ServiceError> {
        let item = self
            .store
            .menu_item_by_id(item_id)?
            .ok_or_else(|| ServiceError::NotFound("Item not found".to_string()))?;
        self.store.delete_menu_item(item_id)?;
        self.discard_image(item.img_id.as_deref());
        self.cache.invalidate_all(&ITEM_NAMESPACES);
        Ok(())
    }

    /// Lists menu items matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for inverted price bounds.
    pub fn list_items(
        &self,
        filter: &MenuFilter,
        page: PageRequest,
    ) -> Result<Page<MenuItem>, ServiceError> {
        let filter = normalize_filter(filter)?;
        let key = format!("{}|{}", filter.cache_key(), page_key(None, page));
        self.cache.get_or_insert_with(CacheNamespace::Items, &key, || {
            self.store.search_menu_items(&filter, page).map_err(ServiceError::from)
        })
    }

    /// Lists menu items with a flag telling whether each is in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for inverted price bounds.
    pub fn list_items_for_user(
        &self,
        user_id: Option<&UserId>,
        filter: &MenuFilter,
        page: PageRequest,
    ) -> Result<Page<MenuItemWithCart>, ServiceError> {
        let filter = normalize_filter(filter)?;
        let saved = self.saved_item_ids(user_id)?;
        let items = self.store.search_menu_items(&filter, page)?;
        Ok(items.map(|item| MenuItemWithCart {
            saved: saved.contains(&item.item_id),
            item,
        }))
    }

    /// Loads a menu item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn get_item(&self, item_id: &MenuItemId) -> Result<MenuItem, ServiceError> {
        self.store
            .menu_item_by_id(item_id)?
            .ok_or_else(|| ServiceError::NotFound("Item Not Found".to_string()))
    }

    /// Loads a menu item with the user's cart flag.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn get_item_for_user(
        &self,
        item_id: &MenuItemId,
        user_id: Option<&UserId>,
    ) -> Result<MenuItemWithCart, ServiceError> {
        let item = self.get_item(item_id)?;
        let saved = match user_id {
            Some(user_id) => self.store.cart_entry_for(user_id, item_id)?.is_some(),
            None => false,
        };
        Ok(MenuItemWithCart {
            item,
            saved,
        })
    }

    /// Lists every item of a category.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn items_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<MenuItem>, ServiceError> {
        self.cache.get_or_insert_with(
            CacheNamespace::ItemsByCategory,
            category_id.as_str(),
            || self.store.menu_items_by_category(Some(category_id)).map_err(ServiceError::from),
        )
    }

    /// Item ids in the user's cart.
    fn saved_item_ids(&self, user_id: Option<&UserId>) -> Result<HashSet<MenuItemId>, ServiceError> {
        let Some(user_id) = user_id else {
            return Ok(HashSet::new());
        };
        let entries = self.store.cart_entries_for_user(user_id)?;
        Ok(entries.into_iter().map(|entry| entry.menu_item.item_id).collect())
    }

    /// Stores an optional upload.
    fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<StoredImage>, ServiceError> {
        image
            .map(|upload| self.images.put(&upload.bytes, &upload.content_type))
            .transpose()
            .map_err(ServiceError::from)
    }

    /// Deletes an image without failing the caller.
    ///
    /// A file that is already gone is fine; any other failure leaves an
    /// orphaned file and is audited under its media path.
    fn discard_image(&self, image_id: Option<&str>) {
        let Some(image_id) = image_id else {
            return;
        };
        match self.images.delete(image_id) {
            Ok(()) | Err(ImageError::NotFound(_)) => {}
            Err(err) => {
                let event = ServiceErrorEvent::cleanup(
                    format!("/media/{image_id}"),
                    format!("image cleanup failed: {err}"),
                );
                self.audit.record_error(&event);
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Trims the query and rejects inverted price bounds.
fn normalize_filter(filter: &MenuFilter) -> Result<MenuFilter, ServiceError> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(ServiceError::BadRequest("minPrice must not exceed maxPrice".to_string()));
    }
    Ok(MenuFilter {
        query: normalize_query(filter.query.as_deref()),
        category_id: filter
            .category_id
            .clone()
            .filter(|category_id| !category_id.as_str().trim().is_empty()),
        min_price: filter.min_price,
        max_price: filter.max_price,
    })
}

/// Conflict for duplicate category slugs.
fn category_taken() -> ServiceError {
    ServiceError::Conflict("Category Already exists".to_string())
}

/// Conflict for deleting a referenced category.
fn category_in_use() -> ServiceError {
    ServiceError::Conflict("Category still has menu items".to_string())
}

/// Conflict for duplicate item names.
fn item_taken(name: &str) -> ServiceError {
    ServiceError::Conflict(format!("Item {name} Already exists"))
}
