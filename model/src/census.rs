use std::collections::HashMap;

use crate::base_types::{EmployeeId, EmployeeIdx, Minutes, SeatCount};
use crate::errors::PlanError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone)]
pub struct Employee {
    id: EmployeeId,
    home: GeoPoint,
    willing_driver: bool,
    target_arrival_min: Option<Minutes>,
}

impl Employee {
    pub fn new(
        id: EmployeeId,
        home: GeoPoint,
        willing_driver: bool,
        target_arrival_min: Option<Minutes>,
    ) -> Employee {
        Employee {
            id,
            home,
            willing_driver,
            target_arrival_min,
        }
    }

    pub fn id(&self) -> EmployeeId {
        self.id
    }

    pub fn home(&self) -> GeoPoint {
        self.home
    }

    pub fn willing_driver(&self) -> bool {
        self.willing_driver
    }

    /// preferred arrival at the workplace in minutes from midnight
    pub fn target_arrival_min(&self) -> Option<Minutes> {
        self.target_arrival_min
    }
}

/// The employee census for one planning call. Construction validates the
/// input contract: unique ids and finite home coordinates. The vector order
/// is the canonical employee index order used by all engines.
pub struct Census {
    employees: Vec<Employee>,
    idx_by_id: HashMap<EmployeeId, EmployeeIdx>,
}

impl Census {
    pub fn new(employees: Vec<Employee>) -> Result<Census, PlanError> {
        let mut idx_by_id = HashMap::with_capacity(employees.len());
        for (idx, employee) in employees.iter().enumerate() {
            if !employee.home.is_finite() {
                return Err(PlanError::InvalidInput(format!(
                    "employee {} has non-finite home coordinates {:?}",
                    employee.id, employee.home
                )));
            }
            if idx_by_id.insert(employee.id, idx).is_some() {
                return Err(PlanError::InvalidInput(format!(
                    "duplicate employee id {}",
                    employee.id
                )));
            }
        }
        Ok(Census {
            employees,
            idx_by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    pub fn get(&self, idx: EmployeeIdx) -> &Employee {
        &self.employees[idx]
    }

    pub fn id_of(&self, idx: EmployeeIdx) -> EmployeeId {
        self.employees[idx].id
    }

    pub fn idx_of(&self, id: EmployeeId) -> Option<EmployeeIdx> {
        self.idx_by_id.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Employee> + '_ {
        self.employees.iter()
    }
}

/// The common destination plus its operational defaults.
#[derive(Debug, Clone)]
pub struct Workplace {
    location: GeoPoint,
    default_seats_driver: SeatCount,
    shuttle_speed_kmh: f64,
}

impl Workplace {
    pub fn new(location: GeoPoint, default_seats_driver: SeatCount) -> Workplace {
        Workplace {
            location,
            default_seats_driver,
            shuttle_speed_kmh: 30.0,
        }
    }

    /// assumed driving speed for the constant-speed travel-time adapter,
    /// floored at walking pace
    pub fn with_shuttle_speed(self, speed_kmh: f64) -> Workplace {
        Workplace {
            shuttle_speed_kmh: speed_kmh.max(1.0),
            ..self
        }
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }

    pub fn default_seats_driver(&self) -> SeatCount {
        self.default_seats_driver
    }

    pub fn shuttle_speed_kmh(&self) -> f64 {
        self.shuttle_speed_kmh
    }
}

impl Default for Workplace {
    fn default() -> Workplace {
        // Madrid city centre, the default office of the historical data set
        Workplace::new(GeoPoint::new(40.4168, -3.7038), 3)
    }
}
