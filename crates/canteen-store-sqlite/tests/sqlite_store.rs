// crates/canteen-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite CanteenStore behavior.
// Purpose: Ensure constraints, atomic order writes, and queries behave.
// Dependencies: canteen-store-sqlite, canteen-core, rusqlite, tempfile, time
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed canteen store: uniqueness and
//! reference constraints, cascades, paging and search, order persistence, and
//! dashboard aggregates.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use canteen_core::AddressId;
use canteen_core::CanteenStore;
use canteen_core::CartEntryId;
use canteen_core::Category;
use canteen_core::CategoryId;
use canteen_core::DeliveryAddress;
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
use canteen_core::PageRequest;
use canteen_core::Role;
use canteen_core::StoreError;
use canteen_core::User;
use canteen_core::UserId;
use canteen_store_sqlite::SqliteCanteenStore;
use canteen_store_sqlite::SqliteStoreConfig;
use canteen_store_sqlite::SqliteStoreError;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open_store() -> (TempDir, SqliteCanteenStore) {
    let temp = TempDir::new().expect("temp dir");
    let config = SqliteStoreConfig::for_path(temp.path().join("canteen.db"));
    let store = SqliteCanteenStore::new(&config).expect("store");
    (temp, store)
}

fn user(id: &str, email: &str, role: Role, created_at: OffsetDateTime) -> User {
    User {
        user_id: UserId::new(id),
        name: format!("User {id}"),
        email: email.to_string(),
        password_hash: Some("hash".to_string()),
        role,
        created_at,
        updated_at: None,
    }
}

fn category(id: &str, name: &str) -> Category {
    Category {
        category_id: CategoryId::new(id),
        category_name: name.to_string(),
        slug_name: canteen_core::slugify(name),
        img_url: None,
        img_id: None,
        created_at: datetime!(2024-01-01 00:00 UTC),
        updated_at: None,
    }
}

fn item(id: &str, name: &str, category_id: &str, paise: i64) -> MenuItem {
    MenuItem {
        item_id: MenuItemId::new(id),
        item_name: name.to_string(),
        description: format!("{name} description"),
        price: Money::from_paise(paise).unwrap(),
        img_url: Some(format!("http://localhost/media/{id}.png")),
        img_id: Some(format!("{id}.png")),
        category_id: CategoryId::new(category_id),
        category_name: String::new(),
        is_available: true,
        created_at: datetime!(2024-01-02 00:00 UTC),
        updated_at: None,
    }
}

fn order(id: &str, user_id: &str, status: OrderStatus, lines: &[(&str, u32, i64)]) -> Order {
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|(item_id, quantity, paise)| OrderItem {
            order_item_id: OrderItemId::generate(),
            item_id: MenuItemId::new(*item_id),
            item_name: format!("Item {item_id}"),
            price: Money::from_paise(*paise).unwrap(),
            quantity: *quantity,
            image_url: None,
        })
        .collect();
    let total = Money::checked_sum(
        items.iter().map(|line| line.price.checked_mul(line.quantity).unwrap()),
    )
    .unwrap();
    Order {
        order_id: OrderId::new(id),
        user_id: UserId::new(user_id),
        razorpay_order_id: Some(format!("order_rzp_{id}")),
        razorpay_payment_id: None,
        status,
        total_amount: total,
        delivery_address: DeliveryAddress {
            id: AddressId::generate(),
            name: "Asha".to_string(),
            phone: "9999999999".to_string(),
            address: "12 Main Road".to_string(),
            city: "Pune".to_string(),
            pincode: "411001".to_string(),
        },
        items,
        created_at: datetime!(2024-03-10 12:00 UTC),
        updated_at: None,
    }
}

fn seed_catalog(store: &SqliteCanteenStore) {
    store.insert_category(&category("cat-1", "South Indian")).unwrap();
    store.insert_category(&category("cat-2", "Drinks")).unwrap();
    store.insert_menu_item(&item("dosa", "Masala Dosa", "cat-1", 8_000)).unwrap();
    store.insert_menu_item(&item("idli", "Idli", "cat-1", 4_000)).unwrap();
    store.insert_menu_item(&item("chai", "Chai", "cat-2", 1_500)).unwrap();
}

// ============================================================================
// SECTION: Users
// ============================================================================

#[test]
fn duplicate_email_is_conflict() {
    let (_temp, store) = open_store();
    let now = datetime!(2024-01-01 00:00 UTC);
    store.insert_user(&user("u1", "a@example.com", Role::Customer, now)).unwrap();
    let err = store.insert_user(&user("u2", "a@example.com", Role::Customer, now)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
}

#[test]
fn user_lookup_round_trips_fields() {
    let (_temp, store) = open_store();
    let now = datetime!(2024-01-01 10:15:30.250 UTC);
    let stored = user("u1", "a@example.com", Role::Admin, now);
    store.insert_user(&stored).unwrap();
    assert_eq!(store.user_by_email("a@example.com").unwrap(), Some(stored.clone()));
    assert_eq!(store.user_by_id(&UserId::new("u1")).unwrap(), Some(stored));
    assert!(store.user_by_email("missing@example.com").unwrap().is_none());
}

#[test]
fn customer_search_matches_name_or_email_prefix_newest_first() {
    let (_temp, store) = open_store();
    let base = datetime!(2024-01-01 00:00 UTC);
    store.insert_user(&user("u1", "ravi@example.com", Role::Customer, base)).unwrap();
    store
        .insert_user(&user("u2", "rani@example.com", Role::Customer, base + Duration::hours(1)))
        .unwrap();
    store.insert_user(&user("u3", "ra-admin@example.com", Role::Admin, base)).unwrap();
    store.insert_user(&user("u4", "zoe@example.com", Role::Customer, base)).unwrap();

    let page = store.search_customers(Some("RA"), PageRequest::new(Some(0), Some(10))).unwrap();
    let ids: Vec<&str> = page.content.iter().map(|user| user.user_id.as_str()).collect();
    assert_eq!(ids, vec!["u2", "u1"]);
    assert_eq!(page.total_elements, 2);
    assert_eq!(store.count_customers().unwrap(), 3);

    let by_name = store.search_customers(Some("user u4"), PageRequest::default()).unwrap();
    assert_eq!(by_name.total_elements, 1);
}

#[test]
fn search_treats_wildcards_literally() {
    let (_temp, store) = open_store();
    let base = datetime!(2024-01-01 00:00 UTC);
    store.insert_user(&user("u1", "ravi@example.com", Role::Customer, base)).unwrap();
    let page = store.search_customers(Some("%"), PageRequest::default()).unwrap();
    assert_eq!(page.total_elements, 0);
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

#[test]
fn duplicate_slug_and_item_name_are_conflicts() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let err = store.insert_category(&category("cat-3", "south  indian")).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    let err = store.insert_menu_item(&item("dosa-2", "MASALA dosa", "cat-1", 100)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[test]
fn menu_items_carry_category_name_and_case_insensitive_lookup() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let found = store.menu_item_by_name_ci("masala DOSA").unwrap().unwrap();
    assert_eq!(found.item_id.as_str(), "dosa");
    assert_eq!(found.category_name, "South Indian");
    assert_eq!(found.img_id.as_deref(), Some("dosa.png"));
}

#[test]
fn menu_search_applies_every_filter() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let filter = MenuFilter {
        query: None,
        category_id: Some(CategoryId::new("cat-1")),
        min_price: Some(Money::from_paise(5_000).unwrap()),
        max_price: None,
    };
    let page = store.search_menu_items(&filter, PageRequest::default()).unwrap();
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.content[0].item_id.as_str(), "dosa");

    let by_name = MenuFilter {
        query: Some("ch".to_string()),
        ..MenuFilter::default()
    };
    let page = store.search_menu_items(&by_name, PageRequest::default()).unwrap();
    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content[0].item_name, "Chai");

    let paged = store
        .search_menu_items(&MenuFilter::default(), PageRequest::new(Some(1), Some(2)))
        .unwrap();
    assert_eq!(paged.total_elements, 3);
    assert_eq!(paged.total_pages, 2);
    assert_eq!(paged.content.len(), 1);
    assert!(paged.last);
}

#[test]
fn category_in_use_cannot_be_deleted() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    assert!(store.category_in_use(&CategoryId::new("cat-2")).unwrap());
    let err = store.delete_category(&CategoryId::new("cat-2")).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    store.delete_menu_item(&MenuItemId::new("chai")).unwrap();
    store.delete_category(&CategoryId::new("cat-2")).unwrap();
    let err = store.delete_category(&CategoryId::new("cat-2")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(store.count_categories().unwrap(), 1);
}

#[test]
fn update_menu_item_rewrites_fields() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let mut dosa = store.menu_item_by_id(&MenuItemId::new("dosa")).unwrap().unwrap();
    dosa.price = Money::from_paise(9_000).unwrap();
    dosa.is_available = false;
    dosa.updated_at = Some(datetime!(2024-02-01 00:00 UTC));
    store.update_menu_item(&dosa).unwrap();
    let reloaded = store.menu_item_by_id(&MenuItemId::new("dosa")).unwrap().unwrap();
    assert_eq!(reloaded, dosa);

    let mut ghost = dosa;
    ghost.item_id = MenuItemId::new("ghost");
    assert!(matches!(store.update_menu_item(&ghost), Err(StoreError::NotFound(_))));
}

#[test]
fn insert_or_existing_returns_the_first_account_for_an_email() {
    let (_temp, store) = open_store();
    let now = datetime!(2024-01-01 00:00 UTC);
    let mut first = user("u1", "guest@example.com", Role::Customer, now);
    first.password_hash = None;
    assert_eq!(store.insert_user_or_existing(&first).unwrap(), first);

    let mut second = user("u2", "guest@example.com", Role::Customer, now + Duration::seconds(1));
    second.password_hash = None;
    let stored = store.insert_user_or_existing(&second).unwrap();
    assert_eq!(stored.user_id, UserId::new("u1"));
    assert!(store.user_by_id(&UserId::new("u2")).unwrap().is_none());
    assert!(matches!(store.insert_user(&second), Err(StoreError::Conflict(_))));
}

// ============================================================================
// SECTION: Cart
// ============================================================================

#[test]
fn cart_entries_are_unique_per_user_and_item_and_cascade_on_item_delete() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let now = datetime!(2024-01-01 00:00 UTC);
    store.insert_user(&user("u1", "a@example.com", Role::Customer, now)).unwrap();
    let entry = NewCartEntry {
        cart_id: CartEntryId::new("c1"),
        user_id: UserId::new("u1"),
        item_id: MenuItemId::new("dosa"),
        quantity: 1,
        created_at: now,
    };
    store.insert_cart_entry(&entry).unwrap();
    let duplicate = NewCartEntry {
        cart_id: CartEntryId::new("c2"),
        ..entry
    };
    assert!(matches!(store.insert_cart_entry(&duplicate), Err(StoreError::Conflict(_))));

    store.update_cart_quantity(&CartEntryId::new("c1"), 4).unwrap();
    let loaded = store.cart_entry_by_id(&CartEntryId::new("c1")).unwrap().unwrap();
    assert_eq!(loaded.quantity, 4);
    assert_eq!(loaded.menu_item.item_name, "Masala Dosa");
    assert!(
        store
            .cart_entry_for(&UserId::new("u1"), &MenuItemId::new("dosa"))
            .unwrap()
            .is_some()
    );

    store.delete_menu_item(&MenuItemId::new("dosa")).unwrap();
    assert!(store.cart_entries_for_user(&UserId::new("u1")).unwrap().is_empty());
}

#[test]
fn cart_quantity_must_be_positive_and_entry_must_exist() {
    let (_temp, store) = open_store();
    assert!(matches!(
        store.update_cart_quantity(&CartEntryId::new("none"), 0),
        Err(StoreError::Invalid(_))
    ));
    assert!(matches!(
        store.update_cart_quantity(&CartEntryId::new("none"), 2),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_cart_entry(&CartEntryId::new("none")),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn cart_lists_by_supplied_timestamp_and_rejects_dangling_items() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let now = datetime!(2024-01-01 00:00 UTC);
    store.insert_user(&user("u1", "a@example.com", Role::Customer, now)).unwrap();
    for (cart_id, item_id, created_at) in
        [("c1", "dosa", now + Duration::minutes(10)), ("c2", "chai", now)]
    {
        store
            .insert_cart_entry(&NewCartEntry {
                cart_id: CartEntryId::new(cart_id),
                user_id: UserId::new("u1"),
                item_id: MenuItemId::new(item_id),
                quantity: 1,
                created_at,
            })
            .unwrap();
    }
    let ids: Vec<String> = store
        .cart_entries_for_user(&UserId::new("u1"))
        .unwrap()
        .into_iter()
        .map(|entry| entry.cart_id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["c2", "c1"]);

    let dangling = NewCartEntry {
        cart_id: CartEntryId::new("c3"),
        user_id: UserId::new("u1"),
        item_id: MenuItemId::new("deleted"),
        quantity: 1,
        created_at: now,
    };
    let err = store.insert_cart_entry(&dangling).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

#[test]
fn clear_cart_removes_only_that_users_entries() {
    let (_temp, store) = open_store();
    seed_catalog(&store);
    let now = datetime!(2024-01-01 00:00 UTC);
    store.insert_user(&user("u1", "a@example.com", Role::Customer, now)).unwrap();
    store.insert_user(&user("u2", "b@example.com", Role::Customer, now)).unwrap();
    for (cart_id, user_id, item_id) in
        [("c1", "u1", "dosa"), ("c2", "u1", "chai"), ("c3", "u2", "dosa")]
    {
        store
            .insert_cart_entry(&NewCartEntry {
                cart_id: CartEntryId::new(cart_id),
                user_id: UserId::new(user_id),
                item_id: MenuItemId::new(item_id),
                quantity: 1,
                created_at: now,
            })
            .unwrap();
    }
    assert_eq!(store.clear_cart(&UserId::new("u1")).unwrap(), 2);
    assert_eq!(store.cart_entries_for_user(&UserId::new("u2")).unwrap().len(), 1);
}

// ============================================================================
// SECTION: Orders
// ============================================================================

#[test]
fn order_round_trips_with_address_and_lines_in_order() {
    let (_temp, store) = open_store();
    let placed = order("ORD_1", "u1", OrderStatus::Pending, &[("dosa", 2, 8_000), ("chai", 1, 1_500)]);
    store.insert_order(&placed).unwrap();
    let loaded = store.order_by_id(&OrderId::new("ORD_1")).unwrap().unwrap();
    assert_eq!(loaded, placed);
    assert_eq!(loaded.total_amount.paise(), 17_500);
}

#[test]
fn failed_order_insert_leaves_no_rows() {
    let (_temp, store) = open_store();
    let first = order("ORD_1", "u1", OrderStatus::Pending, &[("dosa", 1, 8_000)]);
    store.insert_order(&first).unwrap();
    let mut clash = order("ORD_2", "u1", OrderStatus::Pending, &[("dosa", 1, 8_000)]);
    clash.items[0].order_item_id = first.items[0].order_item_id.clone();
    assert!(matches!(store.insert_order(&clash), Err(StoreError::Conflict(_))));
    assert!(store.order_by_id(&OrderId::new("ORD_2")).unwrap().is_none());
    assert_eq!(store.count_orders(None).unwrap(), 1);

    let empty_line = order("ORD_3", "u1", OrderStatus::Pending, &[("dosa", 0, 8_000)]);
    let err = store.insert_order(&empty_line).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)), "got {err:?}");
    assert_eq!(store.count_orders(None).unwrap(), 1);
}

#[test]
fn order_listings_are_newest_first_and_filterable() {
    let (_temp, store) = open_store();
    let mut older = order("ORD_A", "u1", OrderStatus::Pending, &[("dosa", 1, 8_000)]);
    older.created_at = datetime!(2024-03-01 00:00 UTC);
    let mut newer = order("ORD_B", "u1", OrderStatus::Delivered, &[("chai", 1, 1_500)]);
    newer.created_at = datetime!(2024-03-05 00:00 UTC);
    let other = order("ORD_C", "u2", OrderStatus::Delivered, &[("chai", 2, 1_500)]);
    for placed in [&older, &newer, &other] {
        store.insert_order(placed).unwrap();
    }
    let mine = store.orders_for_user(&UserId::new("u1"), PageRequest::default()).unwrap();
    let ids: Vec<&str> = mine.content.iter().map(|order| order.order_id.as_str()).collect();
    assert_eq!(ids, vec!["ORD_B", "ORD_A"]);

    let delivered =
        store.orders_by_status(Some(OrderStatus::Delivered), PageRequest::default()).unwrap();
    assert_eq!(delivered.total_elements, 2);
    assert_eq!(store.count_orders(Some(OrderStatus::Pending)).unwrap(), 1);
}

#[test]
fn status_update_keeps_payment_id_unless_replaced() {
    let (_temp, store) = open_store();
    store.insert_order(&order("ORD_1", "u1", OrderStatus::Pending, &[("dosa", 1, 8_000)])).unwrap();
    let at = datetime!(2024-03-11 00:00 UTC);
    store
        .update_order_status(&OrderId::new("ORD_1"), OrderStatus::Paid, Some("pay_1"), at)
        .unwrap();
    store.update_order_status(&OrderId::new("ORD_1"), OrderStatus::Preparing, None, at).unwrap();
    let loaded = store.order_by_id(&OrderId::new("ORD_1")).unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Preparing);
    assert_eq!(loaded.razorpay_payment_id.as_deref(), Some("pay_1"));
    assert_eq!(loaded.updated_at, Some(at));
    assert!(matches!(
        store.update_order_status(&OrderId::new("missing"), OrderStatus::Paid, None, at),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn guarded_transition_only_moves_orders_in_allowed_statuses() {
    let (_temp, store) = open_store();
    store.insert_order(&order("ORD_1", "u1", OrderStatus::Pending, &[("dosa", 1, 8_000)])).unwrap();
    let id = OrderId::new("ORD_1");
    let at = datetime!(2024-03-11 00:00 UTC);
    let payable = [OrderStatus::Pending, OrderStatus::Failed];

    assert!(store.transition_order_status(&id, &payable, OrderStatus::Paid, Some("pay_1"), at).unwrap());
    let later = at + Duration::minutes(5);
    assert!(
        !store
            .transition_order_status(&id, &[OrderStatus::Pending], OrderStatus::Failed, None, later)
            .unwrap()
    );
    let loaded = store.order_by_id(&id).unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Paid);
    assert_eq!(loaded.razorpay_payment_id.as_deref(), Some("pay_1"));
    assert_eq!(loaded.updated_at, Some(at));

    assert!(!store.transition_order_status(&id, &[], OrderStatus::Cancelled, None, later).unwrap());
    assert!(
        !store
            .transition_order_status(&OrderId::new("missing"), &payable, OrderStatus::Paid, None, at)
            .unwrap()
    );
}

#[test]
fn income_counts_only_delivered_orders_in_window() {
    let (_temp, store) = open_store();
    let mut in_window = order("ORD_1", "u1", OrderStatus::Delivered, &[("dosa", 2, 8_000)]);
    in_window.created_at = datetime!(2024-03-10 00:00 UTC);
    let mut pending = order("ORD_2", "u1", OrderStatus::Pending, &[("dosa", 1, 8_000)]);
    pending.created_at = datetime!(2024-03-11 00:00 UTC);
    let mut outside = order("ORD_3", "u1", OrderStatus::Delivered, &[("dosa", 1, 8_000)]);
    outside.created_at = datetime!(2024-04-01 00:00 UTC);
    for placed in [&in_window, &pending, &outside] {
        store.insert_order(placed).unwrap();
    }
    let income = store
        .delivered_income_between(datetime!(2024-03-01 00:00 UTC), datetime!(2024-04-01 00:00 UTC))
        .unwrap();
    assert_eq!(income.paise(), 16_000);
}

#[test]
fn top_items_sum_quantities_and_skip_cancelled_orders() {
    let (_temp, store) = open_store();
    store
        .insert_order(&order("ORD_1", "u1", OrderStatus::Delivered, &[("dosa", 2, 8_000), ("chai", 1, 1_500)]))
        .unwrap();
    store.insert_order(&order("ORD_2", "u2", OrderStatus::Paid, &[("chai", 5, 1_500)])).unwrap();
    store
        .insert_order(&order("ORD_3", "u2", OrderStatus::Cancelled, &[("dosa", 9, 8_000)]))
        .unwrap();
    let tallies = store.top_ordered_items(5).unwrap();
    let summary: Vec<(&str, u64)> =
        tallies.iter().map(|tally| (tally.item_id.as_str(), tally.total_count)).collect();
    assert_eq!(summary, vec![("chai", 6), ("dosa", 2)]);
}

// ============================================================================
// SECTION: Schema
// ============================================================================

#[test]
fn reopening_existing_database_succeeds() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::for_path(temp.path().join("canteen.db"));
    {
        let store = SqliteCanteenStore::new(&config).unwrap();
        store.insert_category(&category("cat-1", "Snacks")).unwrap();
    }
    let store = SqliteCanteenStore::new(&config).unwrap();
    assert_eq!(store.count_categories().unwrap(), 1);
    store.readiness().unwrap();
}

#[test]
fn unknown_schema_version_fails_closed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("canteen.db");
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute_batch(
                "CREATE TABLE store_meta (version INTEGER NOT NULL); INSERT INTO store_meta \
                 (version) VALUES (99);",
            )
            .unwrap();
    }
    let result = SqliteCanteenStore::new(&SqliteStoreConfig::for_path(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn directory_path_is_rejected() {
    let temp = TempDir::new().unwrap();
    let result = SqliteCanteenStore::new(&SqliteStoreConfig::for_path(temp.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}
