// ============================================================================
// Route Engines
// ============================================================================
//
// One strategy per statement shape. Engines are built per statement by the
// dispatcher, hold only borrowed inputs, and never write to the connection:
// pinning the chosen data source is the caller's job once route() returns.
//
// ============================================================================

pub mod broadcast;
pub mod complex;
pub mod ignore;
pub mod standard;
pub mod unicast;

pub use broadcast::{BroadcastRouteEngine, FullRouteEngine, TableBroadcastRouteEngine};
pub use complex::ComplexRouteEngine;
pub use ignore::IgnoreRouteEngine;
pub use standard::StandardRouteEngine;
pub use unicast::UnicastRouteEngine;

use super::RouteContext;
use crate::core::Result;
use crate::rule::ShardingRule;

pub trait RouteEngine {
    /// Engine name for logging
    fn name(&self) -> &'static str;

    /// Map the statement onto physical data sources and tables.
    ///
    /// Pure with respect to its inputs: the same rule and connection snapshot
    /// give the same result, up to the random data source choice.
    fn route(&self, rule: &ShardingRule) -> Result<RouteContext>;
}
