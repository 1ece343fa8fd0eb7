use model::base_types::{EmployeeId, Minutes, SeatCount};
use model::census::{Census, Workplace};
use model::geo::GeoPoint;

/// One person in the carpool census: a driver offering seats or a passenger.
#[derive(Debug, Clone)]
pub struct CarpoolPerson {
    id: EmployeeId,
    home: GeoPoint,
    office: GeoPoint,
    is_driver: bool,
    seats: SeatCount,
    effective_capacity: SeatCount,
    target_arrival_min: Option<Minutes>,
}

impl CarpoolPerson {
    pub fn id(&self) -> EmployeeId {
        self.id
    }

    pub fn home(&self) -> GeoPoint {
        self.home
    }

    pub fn office(&self) -> GeoPoint {
        self.office
    }

    pub fn is_driver(&self) -> bool {
        self.is_driver
    }

    pub fn seats(&self) -> SeatCount {
        self.seats
    }

    /// seats available for passengers: the driver's own seat is excluded
    pub fn effective_capacity(&self) -> SeatCount {
        self.effective_capacity
    }

    pub fn target_arrival_min(&self) -> Option<Minutes> {
        self.target_arrival_min
    }
}

/// Convert the shuttle residual into the carpool census. Willing drivers get
/// the workplace's default seat count; a driver whose seat count resolves to
/// zero is dropped entirely, everyone else rides as a passenger.
pub fn prepare_carpool_census(
    census: &Census,
    residual: &[EmployeeId],
    workplace: &Workplace,
) -> Vec<CarpoolPerson> {
    let office = workplace.location();
    let default_seats = workplace.default_seats_driver();

    let mut persons = Vec::with_capacity(residual.len());
    for &id in residual {
        let Some(idx) = census.idx_of(id) else {
            continue;
        };
        let employee = census.get(idx);
        let is_driver = employee.willing_driver();
        let (seats, effective_capacity) = if is_driver {
            (default_seats, default_seats.saturating_sub(1))
        } else {
            (0, 0)
        };
        if is_driver && seats == 0 {
            continue;
        }
        persons.push(CarpoolPerson {
            id,
            home: employee.home(),
            office,
            is_driver,
            seats,
            effective_capacity,
            target_arrival_min: employee.target_arrival_min(),
        });
    }
    persons
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::census::Employee;

    fn census() -> Census {
        Census::new(vec![
            Employee::new(
                EmployeeId::from("emp_drv"),
                GeoPoint::new(40.40, -3.70),
                true,
                Some(540.0),
            ),
            Employee::new(
                EmployeeId::from("emp_pax"),
                GeoPoint::new(40.41, -3.71),
                false,
                None,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn drivers_lose_their_own_seat() {
        let census = census();
        let workplace = Workplace::new(GeoPoint::new(40.4168, -3.7038), 3);
        let residual = vec![EmployeeId::from("emp_drv"), EmployeeId::from("emp_pax")];

        let persons = prepare_carpool_census(&census, &residual, &workplace);

        assert_eq!(persons.len(), 2);
        assert!(persons[0].is_driver());
        assert_eq!(persons[0].seats(), 3);
        assert_eq!(persons[0].effective_capacity(), 2);
        assert_eq!(persons[0].target_arrival_min(), Some(540.0));
        assert!(!persons[1].is_driver());
        assert_eq!(persons[1].effective_capacity(), 0);
    }

    #[test]
    fn seatless_drivers_are_dropped() {
        let census = census();
        let workplace = Workplace::new(GeoPoint::new(40.4168, -3.7038), 0);
        let residual = vec![EmployeeId::from("emp_drv"), EmployeeId::from("emp_pax")];

        let persons = prepare_carpool_census(&census, &residual, &workplace);

        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].id(), EmployeeId::from("emp_pax"));
    }
}
