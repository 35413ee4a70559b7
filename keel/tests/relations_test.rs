#[path = "helpers.rs"]
mod helpers;

use helpers::setup_with_schema;
use keel::{
    ActiveRecord, BlockingConnection, Engine, EngineConfig, Entity, KeelError, Reference, Value,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::str::FromStr;

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[keel(table = "category")]
struct Category {
    id: Option<i32>,
    name: Option<String>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[keel(table = "product")]
struct Product {
    id: Option<i32>,
    name: Option<String>,
    price: Option<Decimal>,
    #[keel(foreign_key)]
    category: Reference<Category>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[keel(table = "review")]
struct Review {
    id: Option<i32>,
    body: Option<String>,
    #[keel(foreign_key, lazy)]
    product: Reference<Product>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[keel(table = "listing")]
struct Listing {
    id: Option<i32>,
    #[keel(foreign_key, column = "product_ref")]
    product: Reference<Product>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[keel(table = "node")]
struct Node {
    id: Option<i32>,
    #[keel(foreign_key)]
    next: Reference<Node>,
}

fn shop() -> BlockingConnection<DatabaseConnection> {
    setup_with_schema(&[
        "CREATE TABLE category (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
        "CREATE TABLE product (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            price REAL,
            id_category INTEGER
        )",
        "CREATE TABLE review (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT, id_product INTEGER)",
        "CREATE TABLE listing (id INTEGER PRIMARY KEY AUTOINCREMENT, product_ref INTEGER)",
    ])
}

fn books(db: &BlockingConnection<DatabaseConnection>) -> Category {
    let mut category = Category {
        id: Some(1),
        name: Some("Books".to_string()),
    };
    category.save(db).unwrap();
    category
}

#[test]
fn test_product_resolves_its_category() {
    let db = shop();
    let category = books(&db);

    let mut product = Product {
        name: Some("Foo".to_string()),
        price: Some(Decimal::from_str("9.99").unwrap()),
        category: Reference::to(category),
        ..Default::default()
    };
    product.save(&db).unwrap();
    assert_eq!(product.id, Some(1));

    let found = Product::find_by_id(&db, 1).unwrap().unwrap();
    assert_eq!(found.name.as_deref(), Some("Foo"));
    assert_eq!(found.price, Some(Decimal::from_str("9.99").unwrap()));
    let category = found.category.get().expect("category is eager");
    assert_eq!(category.name.as_deref(), Some("Books"));
}

#[test]
fn test_cycle_terminates_with_a_stub() {
    let db = setup_with_schema(&[
        "CREATE TABLE node (id INTEGER PRIMARY KEY, id_next INTEGER)",
        "INSERT INTO node (id, id_next) VALUES (1, 2), (2, 1), (3, NULL)",
    ]);

    let first = Node::find_by_id(&db, 1).unwrap().unwrap();
    let second = first.next.get().expect("node 2 is hydrated");
    assert_eq!(second.id, Some(2));
    let stub = second.next.get().expect("node 1 comes back as a stub");
    assert_eq!(
        stub,
        &Node {
            id: Some(1),
            next: Reference::Unset
        }
    );

    let lone = Node::find_by_id(&db, 3).unwrap().unwrap();
    assert!(lone.next.is_unset());

    // Listing every node goes through the same guard
    let all = Node::get_all(&db).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].next.get().and_then(|n| n.next.get()).map(|n| n.id), Some(Some(2)));
}

#[test]
fn test_self_reference_on_one_row() {
    let db = setup_with_schema(&[
        "CREATE TABLE node (id INTEGER PRIMARY KEY, id_next INTEGER)",
        "INSERT INTO node (id, id_next) VALUES (7, 7)",
    ]);
    let node = Node::find_by_id(&db, 7).unwrap().unwrap();
    assert_eq!(
        node.next,
        Reference::to(Node {
            id: Some(7),
            next: Reference::Unset
        })
    );
}

#[test]
fn test_dangling_foreign_key_leaves_the_field_unset() {
    let db = shop();
    db.execute_unprepared("INSERT INTO product (id, name, id_category) VALUES (1, 'Orphan', 99)")
        .unwrap();

    let product = Product::get(&db, 1).unwrap();
    assert_eq!(product.name.as_deref(), Some("Orphan"));
    assert!(product.category.is_unset());
}

#[test]
fn test_lazy_reference_waits_for_an_explicit_load() {
    let db = shop();
    let category = books(&db);
    let mut product = Product {
        name: Some("Foo".into()),
        category: Reference::to(category),
        ..Default::default()
    };
    product.save(&db).unwrap();
    let mut review = Review {
        body: Some("great".into()),
        product: Reference::to(product),
        ..Default::default()
    };
    review.save(&db).unwrap();

    let mut found = Review::get(&db, review.id).unwrap();
    assert_eq!(found.product, Reference::Deferred(Value::BigInt(1)));

    found.load(&db, "product").unwrap();
    let loaded = found.product.get().expect("loaded on demand");
    assert_eq!(loaded.name.as_deref(), Some("Foo"));
    assert_eq!(loaded.category.get().and_then(|c| c.name.as_deref()), Some("Books"));

    // Idempotent: an already populated field is left untouched
    found.product.get_mut().unwrap().name = Some("edited".into());
    found.load(&db, "product").unwrap();
    assert_eq!(found.product.get().and_then(|p| p.name.as_deref()), Some("edited"));
}

#[test]
fn test_load_on_a_fresh_instance_reads_the_stored_key() {
    let db = shop();
    db.execute_unprepared("INSERT INTO product (id, name) VALUES (4, 'Bar')").unwrap();
    db.execute_unprepared("INSERT INTO review (id, body, id_product) VALUES (1, 'ok', 4)")
        .unwrap();

    let mut review = Review {
        id: Some(1),
        ..Default::default()
    };
    review.load(&db, "product").unwrap();
    assert_eq!(review.product.get().and_then(|p| p.id), Some(4));

    let mut unknown = Review {
        id: Some(1),
        ..Default::default()
    };
    assert!(matches!(
        unknown.load(&db, "body"),
        Err(KeelError::Configuration { .. })
    ));
}

#[test]
fn test_overridden_column_and_depth_limit() {
    let db = shop();
    let category = books(&db);
    let mut product = Product {
        name: Some("Foo".into()),
        category: Reference::to(category),
        ..Default::default()
    };
    product.save(&db).unwrap();
    let mut listing = Listing {
        id: None,
        product: Reference::to(product),
    };
    listing.save(&db).unwrap();

    let full = Listing::get(&db, 1).unwrap();
    assert!(full.product.get().unwrap().category.is_loaded());

    let shallow = Engine::new(EngineConfig::from_json(r#"{"max_resolve_depth": 1}"#).unwrap());
    let listing: Listing = shallow.get(&db, 1).unwrap();
    let product = listing.product.get().expect("first level resolves");
    assert_eq!(product.category, Reference::Deferred(Value::BigInt(1)));
}

#[test]
fn test_unsaved_reference_is_left_out_of_the_insert() {
    let db = shop();
    let mut product = Product {
        name: Some("Loose".into()),
        category: Reference::to(Category {
            id: None,
            name: Some("Never saved".into()),
        }),
        ..Default::default()
    };
    product.save(&db).unwrap();

    let stored = Product::get(&db, product.id).unwrap();
    assert!(stored.category.is_unset());
    assert!(Category::get_all(&db).unwrap().is_empty());

    let strict = Engine::new(EngineConfig {
        strict_references: true,
        ..Default::default()
    });
    let mut again = Product {
        category: Reference::to(Category::default()),
        ..Default::default()
    };
    assert!(matches!(
        strict.save(&db, &mut again),
        Err(KeelError::IllegalState { .. })
    ));
}

#[test]
fn test_update_can_repoint_a_reference() {
    let db = shop();
    books(&db);
    let mut music = Category {
        id: None,
        name: Some("Music".into()),
    };
    music.save(&db).unwrap();

    let mut product = Product {
        name: Some("Foo".into()),
        category: Reference::deferred(1),
        ..Default::default()
    };
    product.save(&db).unwrap();

    product.category = Reference::to(music.clone());
    product.update(&db).unwrap();

    let stored = Product::get(&db, product.id).unwrap();
    assert_eq!(stored.category.get(), Some(&music));
}
