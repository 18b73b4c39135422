use super::RouteEngine;
use crate::core::Result;
use crate::route::RouteContext;
use crate::rule::ShardingRule;

/// Statements the sharding layer has nothing to do with: an empty route.
#[derive(Debug, Default)]
pub struct IgnoreRouteEngine;

impl IgnoreRouteEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RouteEngine for IgnoreRouteEngine {
    fn name(&self) -> &'static str {
        "ignore"
    }

    fn route(&self, _rule: &ShardingRule) -> Result<RouteContext> {
        Ok(RouteContext::new())
    }
}
