use model::base_types::{PassengerCount, Seconds, StopIdx};

/// An open bus route: an ordered stop sequence that terminates at the
/// workplace (no return leg). Load and duration are fixed by the VRP engine
/// when the route is emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct BusRoute {
    seq: Vec<StopIdx>,
    load: PassengerCount,
    duration: Seconds,
}

impl BusRoute {
    pub fn new(seq: Vec<StopIdx>, load: PassengerCount, duration: Seconds) -> BusRoute {
        BusRoute {
            seq,
            load,
            duration,
        }
    }

    pub fn seq(&self) -> &[StopIdx] {
        &self.seq
    }

    pub fn load(&self) -> PassengerCount {
        self.load
    }

    pub fn duration(&self) -> Seconds {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Output of the shuttle VRP engine.
#[derive(Debug, Clone, PartialEq)]
pub struct VrpOutcome {
    routes: Vec<BusRoute>,
    served: Vec<StopIdx>,
    unserved: Vec<StopIdx>,
}

impl VrpOutcome {
    /// `served` and `unserved` are stored in ascending stop order.
    pub fn new(routes: Vec<BusRoute>, mut served: Vec<StopIdx>, mut unserved: Vec<StopIdx>) -> VrpOutcome {
        served.sort_unstable();
        unserved.sort_unstable();
        VrpOutcome {
            routes,
            served,
            unserved,
        }
    }

    pub fn routes(&self) -> &[BusRoute] {
        &self.routes
    }

    pub fn served(&self) -> &[StopIdx] {
        &self.served
    }

    pub fn unserved(&self) -> &[StopIdx] {
        &self.unserved
    }

    pub fn into_routes(self) -> Vec<BusRoute> {
        self.routes
    }
}
