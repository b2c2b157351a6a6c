mod common;

use chrono::NaiveDate;
use outing_schema::tourism::{self, Guide, Location, Outing, Test, Tour, Tourist};
use outing_schema::{AppError, CrudService, Database};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Keys of the rows every other insert can point at.
struct Fixture {
    guide: i32,
    outing: i32,
    tourist: i32,
}

async fn fixture(db: &Database) -> Fixture {
    let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    db.insert(&Tour {
        name: "Old Town".into(),
        description: "Walk through the old town".into(),
        length_in_hours: 3,
        fee: 25.0,
    })
    .await
    .unwrap();
    db.insert(&Test {
        qualification_name: "Old Town Certificate".into(),
        tour_name: "Old Town".into(),
    })
    .await
    .unwrap();
    db.insert(&Location {
        name: "Castle".into(),
        kind: "landmark".into(),
        description: "On the hill".into(),
    })
    .await
    .unwrap();
    let guide = db
        .insert(&Guide {
            employee_id: None,
            name: "Ana".into(),
            home_address: "1 Main St".into(),
            date_of_hire: day,
        })
        .await
        .unwrap();
    let guide = guide.employee_id.unwrap();
    let outing = db
        .insert(&Outing {
            id: None,
            date_and_time: day.and_hms_opt(9, 0, 0).unwrap(),
            tour_name: "Old Town".into(),
            employee_id: guide,
        })
        .await
        .unwrap();
    let tourist = db
        .insert(&Tourist {
            id: None,
            name: "Bo".into(),
            phone: "555-0100".into(),
        })
        .await
        .unwrap();
    Fixture {
        guide,
        outing: outing.id.unwrap(),
        tourist: tourist.id.unwrap(),
    }
}

/// A row of `table` that would insert cleanly against the fixture.
fn valid_row(table: &str, f: &Fixture) -> HashMap<String, Value> {
    let v = match table {
        "tests" => json!({"qualification_name": "Harbour Certificate", "tour_name": "Old Town"}),
        "guide_qualifications" => json!({
            "employee_id": f.guide,
            "qualification_name": "Old Town Certificate",
            "date_of_completion": "2024-05-01",
            "tour_name": "Old Town",
            "outing_id": f.outing
        }),
        "tour_locations" => json!({"tour_name": "Old Town", "location_name": "Castle", "visit_order": 1}),
        "outings" => json!({"date_and_time": "2024-06-02T10:00:00", "tour_name": "Old Town", "employee_id": f.guide}),
        "association_table" => json!({"tourist_id": f.tourist, "outing_id": f.outing}),
        other => panic!("no row for {}", other),
    };
    serde_json::from_value(v).unwrap()
}

#[tokio::test]
async fn every_reference_rejects_missing_targets() {
    let Some(db) = common::test_db().await else { return };
    let f = fixture(&db).await;
    let registry = tourism::registry().unwrap();
    assert_eq!(registry.relationships.len(), 11);

    for rel in &registry.relationships {
        let from = registry.column(&rel.from_column_id).unwrap();
        let entity = db
            .model
            .entities
            .iter()
            .find(|e| e.table_id == from.table_id)
            .unwrap();
        let mut row = valid_row(&from.table_id, &f);
        let missing = if from.type_.base_name() == "integer" {
            json!(999_999)
        } else {
            json!("No Such Thing")
        };
        row.insert(from.name.clone(), missing);

        let err = CrudService::create(&db.pool, entity, &row).await.unwrap_err();
        assert!(err.is_foreign_key_violation(), "{}: {:?}", rel.id, err);
    }

    // The same rows go in once the references hold.
    for table in ["tests", "guide_qualifications", "tour_locations", "outings", "association_table"] {
        let entity = db.model.entities.iter().find(|e| e.table_id == table).unwrap();
        CrudService::create(&db.pool, entity, &valid_row(table, &f)).await.unwrap();
    }
    common::drop_schema(db).await;
}

#[tokio::test]
async fn tourist_phone_is_unique() {
    let Some(db) = common::test_db().await else { return };
    fixture(&db).await;
    let err = db
        .insert(&Tourist {
            id: None,
            name: "Someone Else".into(),
            phone: "555-0100".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "{:?}", err);
    common::drop_schema(db).await;
}

#[tokio::test]
async fn guide_holds_each_qualification_once() {
    let Some(db) = common::test_db().await else { return };
    let f = fixture(&db).await;
    let entity = db.model.require("guide_qualification").unwrap();
    let row = valid_row("guide_qualifications", &f);
    CrudService::create(&db.pool, entity, &row).await.unwrap();

    let mut again = row.clone();
    again.insert("date_of_completion".into(), json!("2024-05-20"));
    let err = CrudService::create(&db.pool, entity, &again).await.unwrap_err();
    assert!(err.is_unique_violation(), "{:?}", err);
    common::drop_schema(db).await;
}

#[tokio::test]
async fn visit_order_is_unique_per_tour() {
    let Some(db) = common::test_db().await else { return };
    let f = fixture(&db).await;
    db.insert(&Location {
        name: "Market".into(),
        kind: "square".into(),
        description: "Saturday stalls".into(),
    })
    .await
    .unwrap();
    let entity = db.model.require("tour_location").unwrap();
    CrudService::create(&db.pool, entity, &valid_row("tour_locations", &f)).await.unwrap();

    let clash: HashMap<String, Value> =
        serde_json::from_value(json!({"tour_name": "Old Town", "location_name": "Market", "visit_order": 1})).unwrap();
    let err = CrudService::create(&db.pool, entity, &clash).await.unwrap_err();
    assert!(err.is_unique_violation(), "{:?}", err);

    let next: HashMap<String, Value> =
        serde_json::from_value(json!({"tour_name": "Old Town", "location_name": "Market", "visit_order": 2})).unwrap();
    CrudService::create(&db.pool, entity, &next).await.unwrap();
    common::drop_schema(db).await;
}

#[tokio::test]
async fn missing_attributes_are_rejected() {
    let Some(db) = common::test_db().await else { return };
    let entity = db.model.require("tourist").unwrap();
    let row: HashMap<String, Value> = serde_json::from_value(json!({"name": "No Phone"})).unwrap();
    let err = CrudService::create(&db.pool, entity, &row).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{:?}", err);

    // The store enforces it too.
    let sql = format!(
        "INSERT INTO \"{}\".\"tourists\" (\"name\", \"phone\") VALUES ('No Phone', NULL)",
        common::schema_of(&db)
    );
    let err: AppError = sqlx::query(&sql).execute(&db.pool).await.unwrap_err().into();
    assert!(err.is_not_null_violation(), "{:?}", err);
    common::drop_schema(db).await;
}
