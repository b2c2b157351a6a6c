//! Itinerary ordering. The store keeps `visit_order` unique per tour; contiguity is checked here.

use crate::error::AppError;
use crate::tourism::TourLocation;
use std::collections::BTreeMap;

/// Check that every tour's stops are numbered 1..=n with no gaps or repeats.
pub fn check_contiguous(stops: &[TourLocation]) -> Result<(), AppError> {
    let mut by_tour: BTreeMap<&str, Vec<i32>> = BTreeMap::new();
    for stop in stops {
        by_tour.entry(stop.tour_name.as_str()).or_default().push(stop.visit_order);
    }
    for (tour, mut orders) in by_tour {
        orders.sort_unstable();
        for (expected, found) in (1..).zip(&orders) {
            if *found != expected {
                return Err(AppError::Validation(format!(
                    "tour {}: expected stop {} but found {}",
                    tour, expected, found
                )));
            }
        }
    }
    Ok(())
}

/// Stops sorted by visit order.
pub fn ordered(mut stops: Vec<TourLocation>) -> Vec<TourLocation> {
    stops.sort_by(|a, b| {
        a.tour_name
            .cmp(&b.tour_name)
            .then(a.visit_order.cmp(&b.visit_order))
    });
    stops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(tour: &str, location: &str, order: i32) -> TourLocation {
        TourLocation {
            tour_name: tour.into(),
            location_name: location.into(),
            visit_order: order,
        }
    }

    #[test]
    fn contiguous_itineraries_pass() {
        let stops = vec![
            stop("Old Town", "Castle", 2),
            stop("Old Town", "Market", 1),
            stop("Harbour", "Pier", 1),
        ];
        check_contiguous(&stops).unwrap();
        check_contiguous(&[]).unwrap();
    }

    #[test]
    fn gap_is_reported() {
        let stops = vec![stop("Old Town", "Market", 1), stop("Old Town", "Castle", 3)];
        let err = check_contiguous(&stops).unwrap_err();
        assert_eq!(err.to_string(), "validation: tour Old Town: expected stop 2 but found 3");
    }

    #[test]
    fn repeat_and_zero_are_reported() {
        assert!(check_contiguous(&[stop("A", "x", 1), stop("A", "y", 1)]).is_err());
        assert!(check_contiguous(&[stop("A", "x", 0)]).is_err());
    }

    #[test]
    fn ordered_sorts_within_tour() {
        let stops = ordered(vec![stop("A", "z", 3), stop("A", "x", 1), stop("A", "y", 2)]);
        let names: Vec<&str> = stops.iter().map(|s| s.location_name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }
}
