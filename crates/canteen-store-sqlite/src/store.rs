// crates/canteen-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Canteen Store
// Description: Durable CanteenStore backed by SQLite.
// Purpose: Persist canteen records with constraint-checked, atomic writes.
// Dependencies: canteen-core, rusqlite, serde, thiserror, time
// ============================================================================

//! ## Overview
//! This module implements [`CanteenStore`] on a single `SQLite` connection
//! guarded by a mutex. Timestamps are stored as unix milliseconds and money as
//! integer paise. Uniqueness violations (duplicate email, slug, item name, or
//! cart line) and restricted category deletes surface as
//! [`SqliteStoreError::Conflict`]; writes referencing a missing row surface as
//! [`SqliteStoreError::NotFound`] and other constraint failures as
//! [`SqliteStoreError::Invalid`].
//! Security posture: database contents are untrusted and decoded with range
//! checks; user search input is escaped before it reaches `LIKE`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use canteen_core::AddressId;
use canteen_core::CanteenStore;
use canteen_core::CartEntry;
use canteen_core::CartEntryId;
use canteen_core::Category;
use canteen_core::CategoryId;
use canteen_core::DeliveryAddress;
use canteen_core::ItemTally;
use canteen_core::MenuFilter;
use canteen_core::MenuItem;
use canteen_core::MenuItemId;
use canteen_core::Money;
use canteen_core::NewCartEntry;
use canteen_core::Order;
use canteen_core::OrderId;
use canteen_core::OrderItem;
use canteen_core::OrderItemId;
use canteen_core::OrderStatus;
use canteen_core::Page;
use canteen_core::PageRequest;
use canteen_core::Role;
use canteen_core::StoreError;
use canteen_core::User;
use canteen_core::UserId;
use canteen_core::core::clock::from_unix_millis;
use canteen_core::core::clock::to_unix_millis;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::ffi;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list for menu item reads (joined with `categories c`).
const MENU_ITEM_COLUMNS: &str = "m.item_id, m.item_name, m.description, m.price_paise, \
                                 m.img_url, m.img_id, m.category_id, c.category_name, \
                                 m.is_available, m.created_at, m.updated_at";
/// Column list for user reads.
const USER_COLUMNS: &str =
    "user_id, name, email, password_hash, role, created_at, updated_at";
/// Column list for category reads.
const CATEGORY_COLUMNS: &str =
    "category_id, category_name, slug_name, img_url, img_id, created_at, updated_at";
/// Column list for order reads (joined with `delivery_addresses a`).
const ORDER_COLUMNS: &str = "o.order_id, o.user_id, o.razorpay_order_id, o.razorpay_payment_id, \
                             o.status, o.total_paise, o.created_at, o.updated_at, a.address_id, \
                             a.name, a.phone, a.address, a.city, a.pincode";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` canteen store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with default tuning.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid input or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Constraint violation.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Target row does not exist.
    #[error("sqlite store not found: {0}")]
    NotFound(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(format!("version mismatch: {message}"))
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
        }
    }
}

/// Maps an engine error by constraint kind.
///
/// Uniqueness violations are conflicts, dangling references are missing rows,
/// and any other constraint failure is invalid data.
fn map_write_error(err: &rusqlite::Error) -> SqliteStoreError {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return SqliteStoreError::Db(err.to_string());
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return SqliteStoreError::Db(err.to_string());
    }
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            SqliteStoreError::Conflict(err.to_string())
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
            SqliteStoreError::NotFound(format!("referenced row missing: {err}"))
        }
        _ => SqliteStoreError::Invalid(err.to_string()),
    }
}

/// Maps a read error.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed canteen store.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - Foreign keys are enforced on every connection.
#[derive(Clone)]
pub struct SqliteCanteenStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCanteenStore {
    /// Opens an `SQLite`-backed canteen store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_string()))
    }

    /// Runs a `COUNT`-style query returning a single non-negative integer.
    fn count(&self, sql: &str, args: &[Value]) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        count_with(&guard, sql, args)
    }

    /// Loads users matching `sql` (which must select [`USER_COLUMNS`]).
    fn query_users(&self, sql: &str, args: &[Value]) -> Result<Vec<User>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(sql).map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params_from_iter(args.iter()), RawUser::from_row)
            .map_err(|err| db_error(&err))?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(|err| db_error(&err))?.decode()?);
        }
        Ok(users)
    }

    /// Loads categories matching `sql` (which must select [`CATEGORY_COLUMNS`]).
    fn query_categories(
        &self,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<Category>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(sql).map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params_from_iter(args.iter()), RawCategory::from_row)
            .map_err(|err| db_error(&err))?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row.map_err(|err| db_error(&err))?.decode()?);
        }
        Ok(categories)
    }

    /// Loads menu items matching `sql` (which must select [`MENU_ITEM_COLUMNS`]).
    fn query_menu_items(
        &self,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<MenuItem>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(sql).map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params_from_iter(args.iter()), |row| RawMenuItem::from_row(row, 0))
            .map_err(|err| db_error(&err))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|err| db_error(&err))?.decode()?);
        }
        Ok(items)
    }

    /// Loads cart entries matching `where_clause`.
    fn query_cart_entries(
        &self,
        where_clause: &str,
        args: &[Value],
    ) -> Result<Vec<CartEntry>, SqliteStoreError> {
        let sql = format!(
            "SELECT ce.cart_id, ce.user_id, ce.quantity, {MENU_ITEM_COLUMNS} FROM cart_entries ce \
             JOIN menu_items m ON m.item_id = ce.item_id JOIN categories c ON c.category_id = \
             m.category_id WHERE {where_clause} ORDER BY ce.created_at ASC, ce.cart_id ASC"
        );
        let guard = self.lock()?;
        let mut statement = guard.prepare(&sql).map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    RawMenuItem::from_row(row, 3)?,
                ))
            })
            .map_err(|err| db_error(&err))?;
        let mut entries = Vec::new();
        for row in rows {
            let (cart_id, user_id, quantity, item) = row.map_err(|err| db_error(&err))?;
            entries.push(CartEntry {
                cart_id: CartEntryId::new(cart_id),
                user_id: UserId::new(user_id),
                quantity: decode_quantity(quantity)?,
                menu_item: item.decode()?,
            });
        }
        Ok(entries)
    }

    /// Loads a page of orders matching `where_clause`, newest first.
    fn query_orders(
        &self,
        where_clause: &str,
        args: &[Value],
        page: PageRequest,
    ) -> Result<Page<Order>, SqliteStoreError> {
        let guard = self.lock()?;
        let total = count_with(
            &guard,
            &format!("SELECT COUNT(1) FROM orders o WHERE {where_clause}"),
            args,
        )?;
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o JOIN delivery_addresses a ON a.address_id = \
             o.address_id WHERE {where_clause} ORDER BY o.created_at DESC, o.order_id DESC LIMIT \
             ? OFFSET ?"
        );
        let mut paged = args.to_vec();
        paged.extend(page_values(page)?);
        let raw_orders = {
            let mut statement = guard.prepare(&sql).map_err(|err| db_error(&err))?;
            let rows = statement
                .query_map(params_from_iter(paged.iter()), RawOrder::from_row)
                .map_err(|err| db_error(&err))?;
            let mut raw_orders = Vec::new();
            for row in rows {
                raw_orders.push(row.map_err(|err| db_error(&err))?);
            }
            raw_orders
        };
        let mut orders = Vec::with_capacity(raw_orders.len());
        for raw in raw_orders {
            let items = load_order_items(&guard, &raw.order_id)?;
            orders.push(raw.decode(items)?);
        }
        Ok(Page::new(orders, page, total))
    }

    // ---- inherent implementations (SqliteStoreError) ----

    /// Verifies the store can execute a simple SQL statement.
    fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).map_err(|err| db_error(&err))?;
        Ok(())
    }

    /// Inserts a user row.
    fn put_user(&self, user: &User) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        insert_user_row(&guard, user, "").map_err(|err| map_write_error(&err))?;
        Ok(())
    }

    /// Inserts a user row unless its email exists and reads back the owner
    /// of that email under the same lock.
    fn put_user_or_existing(&self, user: &User) -> Result<User, SqliteStoreError> {
        let guard = self.lock()?;
        insert_user_row(&guard, user, " ON CONFLICT(email) DO NOTHING")
            .map_err(|err| map_write_error(&err))?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 LIMIT 1");
        let raw = guard
            .query_row(&sql, params![user.email], RawUser::from_row)
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        raw.ok_or_else(|| SqliteStoreError::NotFound(format!("user {}", user.email)))?.decode()
    }

    /// Loads at most one user by a single-column predicate.
    fn user_where(&self, predicate: &str, value: &str) -> Result<Option<User>, SqliteStoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate} LIMIT 1");
        Ok(self.query_users(&sql, &[Value::Text(value.to_string())])?.into_iter().next())
    }

    /// Lists customers matching an optional name/email prefix.
    fn customer_page(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<User>, SqliteStoreError> {
        let mut clause = "role = 'CUSTOMER'".to_string();
        let mut args = Vec::new();
        if let Some(pattern) = prefix_pattern(query) {
            clause.push_str(
                " AND (lower(name) LIKE ?1 ESCAPE '\\' OR lower(email) LIKE ?1 ESCAPE '\\')",
            );
            args.push(Value::Text(pattern));
        }
        let total = self.count(&format!("SELECT COUNT(1) FROM users WHERE {clause}"), &args)?;
        let limit_index = args.len() + 1;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {clause} ORDER BY created_at DESC, user_id \
             DESC LIMIT ?{limit_index} OFFSET ?{}",
            limit_index + 1
        );
        args.extend(page_values(page)?);
        let users = self.query_users(&sql, &args)?;
        Ok(Page::new(users, page, total))
    }

    /// Inserts a category row.
    fn put_category(&self, category: &Category) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO categories (category_id, category_name, slug_name, img_url, img_id, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    category.category_id.as_str(),
                    category.category_name,
                    category.slug_name,
                    category.img_url,
                    category.img_id,
                    to_unix_millis(category.created_at),
                    category.updated_at.map(to_unix_millis),
                ],
            )
            .map_err(|err| map_write_error(&err))?;
        Ok(())
    }

    /// Loads at most one category by a single-column predicate.
    fn category_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<Category>, SqliteStoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE {predicate} LIMIT 1");
        Ok(self.query_categories(&sql, &[Value::Text(value.to_string())])?.into_iter().next())
    }

    /// Lists categories matching an optional name prefix.
    fn category_page(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Category>, SqliteStoreError> {
        let mut clause = "1 = 1".to_string();
        let mut args = Vec::new();
        if let Some(pattern) = prefix_pattern(query) {
            clause.push_str(" AND lower(category_name) LIKE ? ESCAPE '\\'");
            args.push(Value::Text(pattern));
        }
        let total = self.count(&format!("SELECT COUNT(1) FROM categories WHERE {clause}"), &args)?;
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE {clause} ORDER BY created_at DESC, \
             category_id DESC LIMIT ? OFFSET ?"
        );
        args.extend(page_values(page)?);
        let categories = self.query_categories(&sql, &args)?;
        Ok(Page::new(categories, page, total))
    }

    /// Deletes a category, failing on missing rows and restricted references.
    fn remove_category(&self, category_id: &CategoryId) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute("DELETE FROM categories WHERE category_id = ?1", params![category_id.as_str()])
            .map_err(|err| match map_write_error(&err) {
                SqliteStoreError::NotFound(_) => {
                    SqliteStoreError::Conflict(format!("category {category_id} is in use"))
                }
                other => other,
            })?;
        if changed == 0 {
            return Err(SqliteStoreError::NotFound(format!("category {category_id}")));
        }
        Ok(())
    }

    /// Inserts a menu item row.
    fn put_menu_item(&self, item: &MenuItem) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO menu_items (item_id, item_name, description, price_paise, img_url, \
                 img_id, category_id, is_available, created_at, updated_at) VALUES (?1, ?2, ?3, \
                 ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    item.item_id.as_str(),
                    item.item_name,
                    item.description,
                    item.price.paise(),
                    item.img_url,
                    item.img_id,
                    item.category_id.as_str(),
                    item.is_available,
                    to_unix_millis(item.created_at),
                    item.updated_at.map(to_unix_millis),
                ],
            )
            .map_err(|err| map_write_error(&err))?;
        Ok(())
    }

    /// Loads at most one menu item by a predicate on `m`.
    fn menu_item_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<MenuItem>, SqliteStoreError> {
        let sql = format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items m JOIN categories c ON c.category_id = \
             m.category_id WHERE {predicate} LIMIT 1"
        );
        Ok(self.query_menu_items(&sql, &[Value::Text(value.to_string())])?.into_iter().next())
    }

    /// Lists menu items matching a filter.
    fn menu_item_page(
        &self,
        filter: &MenuFilter,
        page: PageRequest,
    ) -> Result<Page<MenuItem>, SqliteStoreError> {
        let mut clause = "1 = 1".to_string();
        let mut args = Vec::new();
        if let Some(pattern) = prefix_pattern(filter.query.as_deref()) {
            clause.push_str(" AND lower(m.item_name) LIKE ? ESCAPE '\\'");
            args.push(Value::Text(pattern));
        }
        if let Some(category_id) = &filter.category_id {
            clause.push_str(" AND m.category_id = ?");
            args.push(Value::Text(category_id.as_str().to_string()));
        }
        if let Some(min_price) = filter.min_price {
            clause.push_str(" AND m.price_paise >= ?");
            args.push(Value::Integer(min_price.paise()));
        }
        if let Some(max_price) = filter.max_price {
            clause.push_str(" AND m.price_paise <= ?");
            args.push(Value::Integer(max_price.paise()));
        }
        let total =
            self.count(&format!("SELECT COUNT(1) FROM menu_items m WHERE {clause}"), &args)?;
        let sql = format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items m JOIN categories c ON c.category_id = \
             m.category_id WHERE {clause} ORDER BY m.created_at DESC, m.item_id DESC LIMIT ? \
             OFFSET ?"
        );
        args.extend(page_values(page)?);
        let items = self.query_menu_items(&sql, &args)?;
        Ok(Page::new(items, page, total))
    }

    /// Rewrites the mutable columns of a menu item.
    fn rewrite_menu_item(&self, item: &MenuItem) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE menu_items SET item_name = ?1, description = ?2, price_paise = ?3, \
                 img_url = ?4, img_id = ?5, category_id = ?6, is_available = ?7, updated_at = ?8 \
                 WHERE item_id = ?9",
                params![
                    item.item_name,
                    item.description,
                    item.price.paise(),
                    item.img_url,
                    item.img_id,
                    item.category_id.as_str(),
                    item.is_available,
                    item.updated_at.map(to_unix_millis),
                    item.item_id.as_str(),
                ],
            )
            .map_err(|err| map_write_error(&err))?;
        if changed == 0 {
            return Err(SqliteStoreError::NotFound(format!("menu item {}", item.item_id)));
        }
        Ok(())
    }

    /// Executes a single-row write keyed by identifier, failing when no row matched.
    fn execute_keyed(
        &self,
        sql: &str,
        args: &[Value],
        what: &str,
    ) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(sql, params_from_iter(args.iter()))
            .map_err(|err| map_write_error(&err))?;
        if changed == 0 {
            return Err(SqliteStoreError::NotFound(what.to_string()));
        }
        Ok(())
    }

    /// Applies a status change guarded by the order's current status.
    fn guarded_status_update(
        &self,
        order_id: &OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<bool, SqliteStoreError> {
        if from.is_empty() {
            return Ok(false);
        }
        let allowed = (0 .. from.len())
            .map(|index| format!("?{}", index + 5))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE orders SET status = ?1, razorpay_payment_id = COALESCE(?2, \
             razorpay_payment_id), updated_at = ?3 WHERE order_id = ?4 AND status IN ({allowed})"
        );
        let mut args = vec![
            Value::Text(to.as_str().to_string()),
            payment_id.map_or(Value::Null, |value| Value::Text(value.to_string())),
            Value::Integer(to_unix_millis(updated_at)),
            Value::Text(order_id.as_str().to_string()),
        ];
        args.extend(from.iter().map(|status| Value::Text(status.as_str().to_string())));
        let guard = self.lock()?;
        let changed = guard
            .execute(&sql, params_from_iter(args.iter()))
            .map_err(|err| map_write_error(&err))?;
        Ok(changed > 0)
    }

    /// Inserts a cart entry row.
    fn put_cart_entry(&self, entry: &NewCartEntry) -> Result<(), SqliteStoreError> {
        if entry.quantity == 0 {
            return Err(SqliteStoreError::Invalid("cart quantity must be at least 1".to_string()));
        }
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO cart_entries (cart_id, user_id, item_id, quantity, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.cart_id.as_str(),
                    entry.user_id.as_str(),
                    entry.item_id.as_str(),
                    i64::from(entry.quantity),
                    to_unix_millis(entry.created_at),
                ],
            )
            .map_err(|err| map_write_error(&err))?;
        Ok(())
    }

    /// Persists an order, its address, and its lines in one transaction.
    fn put_order(&self, order: &Order) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        insert_order_rows(&tx, order)?;
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(())
    }

    /// Loads one order with its address and lines.
    fn order_where_id(&self, order_id: &OrderId) -> Result<Option<Order>, SqliteStoreError> {
        let guard = self.lock()?;
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o JOIN delivery_addresses a ON a.address_id = \
             o.address_id WHERE o.order_id = ?1"
        );
        let raw = guard
            .query_row(&sql, params![order_id.as_str()], RawOrder::from_row)
            .optional()
            .map_err(|err| db_error(&err))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let items = load_order_items(&guard, &raw.order_id)?;
        Ok(Some(raw.decode(items)?))
    }

    /// Sums delivered order totals in a time window.
    fn income_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Money, SqliteStoreError> {
        let guard = self.lock()?;
        let paise: i64 = guard
            .query_row(
                "SELECT COALESCE(SUM(total_paise), 0) FROM orders WHERE status = 'DELIVERED' AND \
                 created_at >= ?1 AND created_at < ?2",
                params![to_unix_millis(start), to_unix_millis(end)],
                |row| row.get(0),
            )
            .map_err(|err| db_error(&err))?;
        Money::from_paise(paise).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
    }

    /// Tallies ordered quantities per item over non-cancelled orders.
    fn tally_items(&self, limit: u32) -> Result<Vec<ItemTally>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT oi.item_id, SUM(oi.quantity) AS total FROM order_items oi JOIN orders o \
                 ON o.order_id = oi.order_id WHERE o.status != 'CANCELLED' GROUP BY oi.item_id \
                 ORDER BY total DESC, oi.item_id ASC LIMIT ?1",
            )
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params![i64::from(limit)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|err| db_error(&err))?;
        let mut tallies = Vec::new();
        for row in rows {
            let (item_id, total) = row.map_err(|err| db_error(&err))?;
            tallies.push(ItemTally {
                item_id: MenuItemId::new(item_id),
                total_count: decode_count(total)?,
            });
        }
        Ok(tallies)
    }
}

// ============================================================================
// SECTION: CanteenStore
// ============================================================================

impl CanteenStore for SqliteCanteenStore {
    fn readiness(&self) -> Result<(), StoreError> {
        self.check_connection().map_err(StoreError::from)
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.put_user(user).map_err(StoreError::from)
    }

    fn insert_user_or_existing(&self, user: &User) -> Result<User, StoreError> {
        self.put_user_or_existing(user).map_err(StoreError::from)
    }

    fn user_by_id(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        self.user_where("user_id = ?1", user_id.as_str()).map_err(StoreError::from)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.user_where("email = ?1", email).map_err(StoreError::from)
    }

    fn search_customers(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        self.customer_page(query, page).map_err(StoreError::from)
    }

    fn count_customers(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(1) FROM users WHERE role = 'CUSTOMER'", &[])
            .map_err(StoreError::from)
    }

    fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.put_category(category).map_err(StoreError::from)
    }

    fn category_by_id(&self, category_id: &CategoryId) -> Result<Option<Category>, StoreError> {
        self.category_where("category_id = ?1", category_id.as_str()).map_err(StoreError::from)
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        self.category_where("slug_name = ?1", slug).map_err(StoreError::from)
    }

    fn search_categories(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Category>, StoreError> {
        self.category_page(query, page).map_err(StoreError::from)
    }

    fn delete_category(&self, category_id: &CategoryId) -> Result<(), StoreError> {
        self.remove_category(category_id).map_err(StoreError::from)
    }

    fn count_categories(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(1) FROM categories", &[]).map_err(StoreError::from)
    }

    fn category_in_use(&self, category_id: &CategoryId) -> Result<bool, StoreError> {
        self.count(
            "SELECT COUNT(1) FROM menu_items WHERE category_id = ?1",
            &[Value::Text(category_id.as_str().to_string())],
        )
        .map(|count| count > 0)
        .map_err(StoreError::from)
    }

    fn insert_menu_item(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.put_menu_item(item).map_err(StoreError::from)
    }

    fn menu_item_by_id(&self, item_id: &MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        self.menu_item_where("m.item_id = ?1", item_id.as_str()).map_err(StoreError::from)
    }

    fn menu_item_by_name_ci(&self, name: &str) -> Result<Option<MenuItem>, StoreError> {
        self.menu_item_where("lower(m.item_name) = lower(?1)", name.trim())
            .map_err(StoreError::from)
    }

    fn search_menu_items(
        &self,
        filter: &MenuFilter,
        page: PageRequest,
    ) -> Result<Page<MenuItem>, StoreError> {
        self.menu_item_page(filter, page).map_err(StoreError::from)
    }

    fn menu_items_by_category(
        &self,
        category_id: Option<&CategoryId>,
    ) -> Result<Vec<MenuItem>, StoreError> {
        let base = format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items m JOIN categories c ON c.category_id = \
             m.category_id"
        );
        let result = match category_id {
            Some(category_id) => self.query_menu_items(
                &format!("{base} WHERE m.category_id = ?1 ORDER BY m.created_at DESC"),
                &[Value::Text(category_id.as_str().to_string())],
            ),
            None => self.query_menu_items(&format!("{base} ORDER BY m.created_at DESC"), &[]),
        };
        result.map_err(StoreError::from)
    }

    fn update_menu_item(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.rewrite_menu_item(item).map_err(StoreError::from)
    }

    fn delete_menu_item(&self, item_id: &MenuItemId) -> Result<(), StoreError> {
        self.execute_keyed(
            "DELETE FROM menu_items WHERE item_id = ?1",
            &[Value::Text(item_id.as_str().to_string())],
            &format!("menu item {item_id}"),
        )
        .map_err(StoreError::from)
    }

    fn count_menu_items(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(1) FROM menu_items", &[]).map_err(StoreError::from)
    }

    fn insert_cart_entry(&self, entry: &NewCartEntry) -> Result<(), StoreError> {
        self.put_cart_entry(entry).map_err(StoreError::from)
    }

    fn cart_entry_by_id(&self, cart_id: &CartEntryId) -> Result<Option<CartEntry>, StoreError> {
        self.query_cart_entries("ce.cart_id = ?1", &[Value::Text(cart_id.as_str().to_string())])
            .map(|entries| entries.into_iter().next())
            .map_err(StoreError::from)
    }

    fn cart_entry_for(
        &self,
        user_id: &UserId,
        item_id: &MenuItemId,
    ) -> Result<Option<CartEntry>, StoreError> {
        self.query_cart_entries(
            "ce.user_id = ?1 AND ce.item_id = ?2",
            &[
                Value::Text(user_id.as_str().to_string()),
                Value::Text(item_id.as_str().to_string()),
            ],
        )
        .map(|entries| entries.into_iter().next())
        .map_err(StoreError::from)
    }

    fn cart_entries_for_user(&self, user_id: &UserId) -> Result<Vec<CartEntry>, StoreError> {
        self.query_cart_entries("ce.user_id = ?1", &[Value::Text(user_id.as_str().to_string())])
            .map_err(StoreError::from)
    }

    fn update_cart_quantity(&self, cart_id: &CartEntryId, quantity: u32) -> Result<(), StoreError> {
        if quantity == 0 {
            return Err(StoreError::Invalid("cart quantity must be at least 1".to_string()));
        }
        self.execute_keyed(
            "UPDATE cart_entries SET quantity = ?1 WHERE cart_id = ?2",
            &[Value::Integer(i64::from(quantity)), Value::Text(cart_id.as_str().to_string())],
            &format!("cart entry {cart_id}"),
        )
        .map_err(StoreError::from)
    }

    fn delete_cart_entry(&self, cart_id: &CartEntryId) -> Result<(), StoreError> {
        self.execute_keyed(
            "DELETE FROM cart_entries WHERE cart_id = ?1",
            &[Value::Text(cart_id.as_str().to_string())],
            &format!("cart entry {cart_id}"),
        )
        .map_err(StoreError::from)
    }

    fn clear_cart(&self, user_id: &UserId) -> Result<u64, StoreError> {
        let guard = self.lock()?;
        let removed = guard
            .execute("DELETE FROM cart_entries WHERE user_id = ?1", params![user_id.as_str()])
            .map_err(|err| StoreError::from(map_write_error(&err)))?;
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.put_order(order).map_err(StoreError::from)
    }

    fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.order_where_id(order_id).map_err(StoreError::from)
    }

    fn orders_for_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        self.query_orders("o.user_id = ?", &[Value::Text(user_id.as_str().to_string())], page)
            .map_err(StoreError::from)
    }

    fn orders_by_status(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        let result = match status {
            Some(status) => {
                self.query_orders("o.status = ?", &[Value::Text(status.as_str().to_string())], page)
            }
            None => self.query_orders("1 = 1", &[], page),
        };
        result.map_err(StoreError::from)
    }

    fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let payment = payment_id.map_or(Value::Null, |value| Value::Text(value.to_string()));
        self.execute_keyed(
            "UPDATE orders SET status = ?1, razorpay_payment_id = COALESCE(?2, \
             razorpay_payment_id), updated_at = ?3 WHERE order_id = ?4",
            &[
                Value::Text(status.as_str().to_string()),
                payment,
                Value::Integer(to_unix_millis(updated_at)),
                Value::Text(order_id.as_str().to_string()),
            ],
            &format!("order {order_id}"),
        )
        .map_err(StoreError::from)
    }

    fn transition_order_status(
        &self,
        order_id: &OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        self.guarded_status_update(order_id, from, to, payment_id, updated_at)
            .map_err(StoreError::from)
    }

    fn count_orders(&self, status: Option<OrderStatus>) -> Result<u64, StoreError> {
        let result = match status {
            Some(status) => self.count(
                "SELECT COUNT(1) FROM orders WHERE status = ?1",
                &[Value::Text(status.as_str().to_string())],
            ),
            None => self.count("SELECT COUNT(1) FROM orders", &[]),
        };
        result.map_err(StoreError::from)
    }

    fn delivered_income_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Money, StoreError> {
        self.income_between(start, end).map_err(StoreError::from)
    }

    fn top_ordered_items(&self, limit: u32) -> Result<Vec<ItemTally>, StoreError> {
        self.tally_items(limit).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Undecoded user row.
struct RawUser {
    /// User identifier.
    user_id: String,
    /// Display name.
    name: String,
    /// Email.
    email: String,
    /// Password hash.
    password_hash: Option<String>,
    /// Role label.
    role: String,
    /// Creation millis.
    created_at: i64,
    /// Update millis.
    updated_at: Option<i64>,
}

impl RawUser {
    /// Reads a row selected with [`USER_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    /// Decodes into a domain user.
    fn decode(self) -> Result<User, SqliteStoreError> {
        let role: Role =
            self.role.parse().map_err(|err: canteen_core::ModelError| {
                SqliteStoreError::Corrupt(err.to_string())
            })?;
        Ok(User {
            user_id: UserId::new(self.user_id),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            created_at: decode_time(self.created_at)?,
            updated_at: decode_optional_time(self.updated_at)?,
        })
    }
}

/// Undecoded category row.
struct RawCategory {
    /// Category identifier.
    category_id: String,
    /// Display name.
    category_name: String,
    /// Slug.
    slug_name: String,
    /// Image URL.
    img_url: Option<String>,
    /// Image key.
    img_id: Option<String>,
    /// Creation millis.
    created_at: i64,
    /// Update millis.
    updated_at: Option<i64>,
}

impl RawCategory {
    /// Reads a row selected with [`CATEGORY_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            category_id: row.get(0)?,
            category_name: row.get(1)?,
            slug_name: row.get(2)?,
            img_url: row.get(3)?,
            img_id: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    /// Decodes into a domain category.
    fn decode(self) -> Result<Category, SqliteStoreError> {
        Ok(Category {
            category_id: CategoryId::new(self.category_id),
            category_name: self.category_name,
            slug_name: self.slug_name,
            img_url: self.img_url,
            img_id: self.img_id,
            created_at: decode_time(self.created_at)?,
            updated_at: decode_optional_time(self.updated_at)?,
        })
    }
}

/// Undecoded menu item row.
struct RawMenuItem {
    /// Item identifier.
    item_id: String,
    /// Display name.
    item_name: String,
    /// Description.
    description: String,
    /// Price in paise.
    price_paise: i64,
    /// Image URL.
    img_url: Option<String>,
    /// Image key.
    img_id: Option<String>,
    /// Category identifier.
    category_id: String,
    /// Category name.
    category_name: String,
    /// Availability flag.
    is_available: bool,
    /// Creation millis.
    created_at: i64,
    /// Update millis.
    updated_at: Option<i64>,
}

impl RawMenuItem {
    /// Reads [`MENU_ITEM_COLUMNS`] starting at column `offset`.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get(offset)?,
            item_name: row.get(offset + 1)?,
            description: row.get(offset + 2)?,
            price_paise: row.get(offset + 3)?,
            img_url: row.get(offset + 4)?,
            img_id: row.get(offset + 5)?,
            category_id: row.get(offset + 6)?,
            category_name: row.get(offset + 7)?,
            is_available: row.get(offset + 8)?,
            created_at: row.get(offset + 9)?,
            updated_at: row.get(offset + 10)?,
        })
    }

    /// Decodes into a domain menu item.
    fn decode(self) -> Result<MenuItem, SqliteStoreError> {
        Ok(MenuItem {
            item_id: MenuItemId::new(self.item_id),
            item_name: self.item_name,
            description: self.description,
            price: decode_money(self.price_paise)?,
            img_url: self.img_url,
            img_id: self.img_id,
            category_id: CategoryId::new(self.category_id),
            category_name: self.category_name,
            is_available: self.is_available,
            created_at: decode_time(self.created_at)?,
            updated_at: decode_optional_time(self.updated_at)?,
        })
    }
}

/// Undecoded order row joined with its address.
struct RawOrder {
    /// Order identifier.
    order_id: String,
    /// Owner identifier.
    user_id: String,
    /// Gateway order identifier.
    razorpay_order_id: Option<String>,
    /// Gateway payment identifier.
    razorpay_payment_id: Option<String>,
    /// Status label.
    status: String,
    /// Total in paise.
    total_paise: i64,
    /// Creation millis.
    created_at: i64,
    /// Update millis.
    updated_at: Option<i64>,
    /// Delivery address.
    address: DeliveryAddress,
}

impl RawOrder {
    /// Reads a row selected with [`ORDER_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            user_id: row.get(1)?,
            razorpay_order_id: row.get(2)?,
            razorpay_payment_id: row.get(3)?,
            status: row.get(4)?,
            total_paise: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            address: DeliveryAddress {
                id: AddressId::new(row.get::<_, String>(8)?),
                name: row.get(9)?,
                phone: row.get(10)?,
                address: row.get(11)?,
                city: row.get(12)?,
                pincode: row.get(13)?,
            },
        })
    }

    /// Decodes into a domain order with the given lines.
    fn decode(self, items: Vec<OrderItem>) -> Result<Order, SqliteStoreError> {
        let status: OrderStatus =
            self.status.parse().map_err(|err: canteen_core::ModelError| {
                SqliteStoreError::Corrupt(err.to_string())
            })?;
        Ok(Order {
            order_id: OrderId::new(self.order_id),
            user_id: UserId::new(self.user_id),
            razorpay_order_id: self.razorpay_order_id,
            razorpay_payment_id: self.razorpay_payment_id,
            status,
            total_amount: decode_money(self.total_paise)?,
            delivery_address: self.address,
            items,
            created_at: decode_time(self.created_at)?,
            updated_at: decode_optional_time(self.updated_at)?,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for integrity and durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    user_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT,
                    role TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_users_role_created
                    ON users (role, created_at);
                CREATE TABLE IF NOT EXISTS categories (
                    category_id TEXT PRIMARY KEY,
                    category_name TEXT NOT NULL,
                    slug_name TEXT NOT NULL UNIQUE,
                    img_url TEXT,
                    img_id TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER
                );
                CREATE TABLE IF NOT EXISTS menu_items (
                    item_id TEXT PRIMARY KEY,
                    item_name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    price_paise INTEGER NOT NULL CHECK (price_paise >= 0),
                    img_url TEXT,
                    img_id TEXT,
                    category_id TEXT NOT NULL
                        REFERENCES categories(category_id) ON DELETE RESTRICT,
                    is_available INTEGER NOT NULL DEFAULT 1,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_menu_items_name
                    ON menu_items (lower(item_name));
                CREATE INDEX IF NOT EXISTS idx_menu_items_category
                    ON menu_items (category_id);
                CREATE TABLE IF NOT EXISTS cart_entries (
                    cart_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
                    item_id TEXT NOT NULL REFERENCES menu_items(item_id) ON DELETE CASCADE,
                    quantity INTEGER NOT NULL CHECK (quantity >= 1),
                    created_at INTEGER NOT NULL,
                    UNIQUE (user_id, item_id)
                );
                CREATE TABLE IF NOT EXISTS delivery_addresses (
                    address_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    address TEXT NOT NULL,
                    city TEXT NOT NULL,
                    pincode TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS orders (
                    order_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    razorpay_order_id TEXT,
                    razorpay_payment_id TEXT,
                    status TEXT NOT NULL,
                    total_paise INTEGER NOT NULL CHECK (total_paise >= 0),
                    address_id TEXT NOT NULL REFERENCES delivery_addresses(address_id),
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_orders_user_created
                    ON orders (user_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_orders_status_created
                    ON orders (status, created_at);
                CREATE TABLE IF NOT EXISTS order_items (
                    order_item_id TEXT PRIMARY KEY,
                    order_id TEXT NOT NULL REFERENCES orders(order_id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    item_id TEXT NOT NULL,
                    item_name TEXT NOT NULL,
                    price_paise INTEGER NOT NULL CHECK (price_paise >= 0),
                    quantity INTEGER NOT NULL CHECK (quantity >= 1),
                    image_url TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_order_items_order
                    ON order_items (order_id, position);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Inserts one user row; `on_conflict` is appended to the statement.
fn insert_user_row(
    connection: &Connection,
    user: &User,
    on_conflict: &str,
) -> rusqlite::Result<usize> {
    let sql = format!(
        "INSERT INTO users (user_id, name, email, password_hash, role, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7){on_conflict}"
    );
    connection.execute(
        &sql,
        params![
            user.user_id.as_str(),
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            to_unix_millis(user.created_at),
            user.updated_at.map(to_unix_millis),
        ],
    )
}

/// Writes the address, order, and line rows inside `tx`.
fn insert_order_rows(tx: &Transaction<'_>, order: &Order) -> Result<(), SqliteStoreError> {
    if order.items.is_empty() {
        return Err(SqliteStoreError::Invalid("order must contain items".to_string()));
    }
    let address = &order.delivery_address;
    tx.execute(
        "INSERT INTO delivery_addresses (address_id, name, phone, address, city, pincode) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            address.id.as_str(),
            address.name,
            address.phone,
            address.address,
            address.city,
            address.pincode,
        ],
    )
    .map_err(|err| map_write_error(&err))?;
    tx.execute(
        "INSERT INTO orders (order_id, user_id, razorpay_order_id, razorpay_payment_id, status, \
         total_paise, address_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, \
         ?8, ?9)",
        params![
            order.order_id.as_str(),
            order.user_id.as_str(),
            order.razorpay_order_id,
            order.razorpay_payment_id,
            order.status.as_str(),
            order.total_amount.paise(),
            address.id.as_str(),
            to_unix_millis(order.created_at),
            order.updated_at.map(to_unix_millis),
        ],
    )
    .map_err(|err| map_write_error(&err))?;
    for (position, item) in order.items.iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| SqliteStoreError::Invalid("too many order items".to_string()))?;
        tx.execute(
            "INSERT INTO order_items (order_item_id, order_id, position, item_id, item_name, \
             price_paise, quantity, image_url) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.order_item_id.as_str(),
                order.order_id.as_str(),
                position,
                item.item_id.as_str(),
                item.item_name,
                item.price.paise(),
                i64::from(item.quantity),
                item.image_url,
            ],
        )
        .map_err(|err| map_write_error(&err))?;
    }
    Ok(())
}

/// Loads the lines of one order in placement order.
fn load_order_items(
    connection: &Connection,
    order_id: &str,
) -> Result<Vec<OrderItem>, SqliteStoreError> {
    let mut statement = connection
        .prepare(
            "SELECT order_item_id, item_id, item_name, price_paise, quantity, image_url FROM \
             order_items WHERE order_id = ?1 ORDER BY position ASC",
        )
        .map_err(|err| db_error(&err))?;
    let rows = statement
        .query_map(params![order_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .map_err(|err| db_error(&err))?;
    let mut items = Vec::new();
    for row in rows {
        let (order_item_id, item_id, item_name, price, quantity, image_url) =
            row.map_err(|err| db_error(&err))?;
        items.push(OrderItem {
            order_item_id: OrderItemId::new(order_item_id),
            item_id: MenuItemId::new(item_id),
            item_name,
            price: decode_money(price)?,
            quantity: decode_quantity(quantity)?,
            image_url,
        });
    }
    Ok(items)
}

/// Runs a single-integer query on an already locked connection.
fn count_with(connection: &Connection, sql: &str, args: &[Value]) -> Result<u64, SqliteStoreError> {
    let count: i64 = connection
        .query_row(sql, params_from_iter(args.iter()), |row| row.get(0))
        .map_err(|err| db_error(&err))?;
    decode_count(count)
}

/// Returns `LIMIT`/`OFFSET` bind values for a page.
fn page_values(page: PageRequest) -> Result<[Value; 2], SqliteStoreError> {
    let offset = i64::try_from(page.offset())
        .map_err(|_| SqliteStoreError::Invalid("page offset too large".to_string()))?;
    Ok([Value::Integer(i64::from(page.limit())), Value::Integer(offset)])
}

/// Builds a lowercase, escaped `LIKE` prefix pattern from optional input.
fn prefix_pattern(query: Option<&str>) -> Option<String> {
    let trimmed = query.map(str::trim).filter(|value| !value.is_empty())?;
    let mut pattern = String::with_capacity(trimmed.len() + 1);
    for ch in trimmed.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

/// Decodes a stored timestamp.
fn decode_time(millis: i64) -> Result<OffsetDateTime, SqliteStoreError> {
    from_unix_millis(millis).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

/// Decodes an optional stored timestamp.
fn decode_optional_time(millis: Option<i64>) -> Result<Option<OffsetDateTime>, SqliteStoreError> {
    millis.map(decode_time).transpose()
}

/// Decodes a stored amount.
fn decode_money(paise: i64) -> Result<Money, SqliteStoreError> {
    Money::from_paise(paise).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

/// Decodes a stored quantity.
fn decode_quantity(quantity: i64) -> Result<u32, SqliteStoreError> {
    u32::try_from(quantity)
        .ok()
        .filter(|value| *value >= 1)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid quantity: {quantity}")))
}

/// Decodes a stored count.
fn decode_count(count: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt(format!("negative count: {count}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn prefix_pattern_escapes_like_wildcards() {
        assert_eq!(prefix_pattern(Some("50%_Off\\")).unwrap(), "50\\%\\_off\\\\%");
        assert_eq!(prefix_pattern(Some("  Dosa ")).unwrap(), "dosa%");
        assert!(prefix_pattern(Some("   ")).is_none());
        assert!(prefix_pattern(None).is_none());
    }

    #[test]
    fn decode_quantity_rejects_zero_and_negative() {
        assert!(decode_quantity(0).is_err());
        assert!(decode_quantity(-4).is_err());
        assert_eq!(decode_quantity(3).unwrap(), 3);
    }

    #[test]
    fn conflict_errors_map_to_store_conflict() {
        let error: StoreError = SqliteStoreError::Conflict("dup".to_string()).into();
        assert_eq!(error, StoreError::Conflict("dup".to_string()));
        let missing: StoreError = SqliteStoreError::NotFound("x".to_string()).into();
        assert_eq!(missing, StoreError::NotFound("x".to_string()));
    }
}
