//! Typed rows for the tourism tables.

use crate::error::AppError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A typed row of one registered entity. Rows travel as JSON objects keyed by column name.
pub trait Record: Serialize + DeserializeOwned {
    /// Entity name in the registry.
    const ENTITY: &'static str;

    /// Reject values a JSON row cannot carry, such as NaN or infinity.
    fn check(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn to_row(&self) -> Result<HashMap<String, Value>, AppError> {
        self.check()?;
        match serde_json::to_value(self) {
            Ok(Value::Object(m)) => Ok(m.into_iter().collect()),
            Ok(_) => Err(AppError::BadRequest(format!("{} must serialize to an object", Self::ENTITY))),
            Err(e) => Err(AppError::BadRequest(e.to_string())),
        }
    }

    fn from_row(row: Value) -> Result<Self, AppError> {
        serde_json::from_value(row)
            .map_err(|e| AppError::Validation(format!("{} row: {}", Self::ENTITY, e)))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub name: String,
    pub description: String,
    pub length_in_hours: i32,
    pub fee: f64,
}

impl Record for Tour {
    const ENTITY: &'static str = "tour";

    fn check(&self) -> Result<(), AppError> {
        if !self.fee.is_finite() {
            return Err(AppError::Validation(format!(
                "fee must be a finite number, got {}",
                self.fee
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    /// Assigned from the sequence when None.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i32>,
    pub name: String,
    pub home_address: String,
    pub date_of_hire: NaiveDate,
}

impl Record for Guide {
    const ENTITY: &'static str = "guide";
}

/// The qualifying test for a tour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub qualification_name: String,
    pub tour_name: String,
}

impl Record for Test {
    const ENTITY: &'static str = "test";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuideQualification {
    pub employee_id: i32,
    pub qualification_name: String,
    pub date_of_completion: NaiveDate,
    pub tour_name: String,
    pub outing_id: i32,
}

impl Record for GuideQualification {
    const ENTITY: &'static str = "guide_qualification";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl Record for Location {
    const ENTITY: &'static str = "location";
}

/// A stop on a tour's itinerary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TourLocation {
    pub tour_name: String,
    pub location_name: String,
    pub visit_order: i32,
}

impl Record for TourLocation {
    const ENTITY: &'static str = "tour_location";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub date_and_time: NaiveDateTime,
    pub tour_name: String,
    /// Guide running this outing.
    pub employee_id: i32,
}

impl Record for Outing {
    const ENTITY: &'static str = "outing";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tourist {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub name: String,
    pub phone: String,
}

impl Record for Tourist {
    const ENTITY: &'static str = "tourist";
}

/// Row of the tourist/outing association table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TouristOuting {
    pub tourist_id: i32,
    pub outing_id: i32,
}

impl Record for TouristOuting {
    const ENTITY: &'static str = "tourist_outing";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve;
    use crate::tourism::registry;
    use serde_json::json;

    #[test]
    fn record_fields_match_table_columns() {
        let model = resolve(&registry().unwrap()).unwrap();
        let check = |entity: &str, row: HashMap<String, Value>| {
            let e = model.entity(entity).unwrap();
            let mut cols: Vec<&str> = e.columns.iter().map(|c| c.name.as_str()).collect();
            let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
            cols.sort_unstable();
            keys.sort_unstable();
            assert_eq!(cols, keys, "columns of {}", entity);
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let when = date.and_hms_opt(9, 30, 0).unwrap();

        check(Tour::ENTITY, Tour { name: "a".into(), description: "b".into(), length_in_hours: 2, fee: 10.0 }.to_row().unwrap());
        check(Guide::ENTITY, Guide { employee_id: Some(1), name: "a".into(), home_address: "b".into(), date_of_hire: date }.to_row().unwrap());
        check(Test::ENTITY, Test { qualification_name: "a".into(), tour_name: "b".into() }.to_row().unwrap());
        check(
            GuideQualification::ENTITY,
            GuideQualification {
                employee_id: 1,
                qualification_name: "a".into(),
                date_of_completion: date,
                tour_name: "b".into(),
                outing_id: 2,
            }
            .to_row()
            .unwrap(),
        );
        check(Location::ENTITY, Location { name: "a".into(), kind: "b".into(), description: "c".into() }.to_row().unwrap());
        check(TourLocation::ENTITY, TourLocation { tour_name: "a".into(), location_name: "b".into(), visit_order: 1 }.to_row().unwrap());
        check(Outing::ENTITY, Outing { id: Some(1), date_and_time: when, tour_name: "a".into(), employee_id: 1 }.to_row().unwrap());
        check(Tourist::ENTITY, Tourist { id: Some(1), name: "a".into(), phone: "1".into() }.to_row().unwrap());
        check(TouristOuting::ENTITY, TouristOuting { tourist_id: 1, outing_id: 2 }.to_row().unwrap());
    }

    #[test]
    fn sequence_keys_are_omitted_when_unset() {
        let row = Tourist { id: None, name: "Bo".into(), phone: "555".into() }.to_row().unwrap();
        assert!(!row.contains_key("id"));
    }

    #[test]
    fn non_finite_fee_is_rejected_by_name() {
        for fee in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let tour = Tour { name: "Old Town".into(), description: "Walk".into(), length_in_hours: 2, fee };
            match tour.to_row() {
                Err(AppError::Validation(msg)) => assert!(msg.starts_with("fee must be a finite number"), "{}", msg),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
        let row = Tour { name: "Old Town".into(), description: "Walk".into(), length_in_hours: 2, fee: 0.0 }
            .to_row()
            .unwrap();
        assert_eq!(row["fee"], json!(0.0));
    }

    #[test]
    fn reads_database_shaped_rows() {
        let outing = Outing::from_row(json!({
            "id": 3,
            "date_and_time": "2024-06-01T09:30:00",
            "tour_name": "Old Town",
            "employee_id": 7
        }))
        .unwrap();
        assert_eq!(outing.id, Some(3));
        assert_eq!(outing.date_and_time.to_string(), "2024-06-01 09:30:00");

        let location = Location::from_row(json!({"name": "Castle", "type": "landmark", "description": "On the hill"})).unwrap();
        assert_eq!(location.kind, "landmark");

        assert!(Tour::from_row(json!({"name": "x"})).is_err());
    }
}
