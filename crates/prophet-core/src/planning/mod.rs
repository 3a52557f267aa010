mod planner;

pub use planner::{PlanningError, QueryPlanner, SubQuery};
