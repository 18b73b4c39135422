// ============================================================================
// Routing
// ============================================================================
//
// Route result types, data source selection, the engine family and the
// dispatcher that picks an engine per statement.
//
// ============================================================================

pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod selector;

pub use context::{RouteContext, RouteMapper, RouteUnit};
pub use dispatcher::RouteEngineDispatcher;
pub use engine::{
    BroadcastRouteEngine, ComplexRouteEngine, FullRouteEngine, IgnoreRouteEngine, RouteEngine,
    StandardRouteEngine, TableBroadcastRouteEngine, UnicastRouteEngine,
};
pub use selector::DataSourceSelector;
