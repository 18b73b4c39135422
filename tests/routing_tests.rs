/// Route engine tests
///
/// Engine-level routing properties through the public API
/// Run with: cargo test --test routing_tests
use rand::SeedableRng;
use rand::rngs::StdRng;
use shardroute::binder::{CursorOp, DalKind, DmlKind, ViewOp};
use shardroute::route::UnicastRouteEngine;
use shardroute::{
    ConnectionContext, DataSourceSelector, PinningMode, RouteEngine, RouteEngineDispatcher,
    RouteError, RouteMapper, ShardingRule, ShardingRuleConfig, StatementContext, StatementKind,
};

fn order_item_rule() -> ShardingRule {
    let config = ShardingRuleConfig::new(["ds0", "ds1"])
        .table("t_order", ["ds0.t_order_0", "ds1.t_order_1"])
        .table("t_item", ["ds1.t_item_0"]);
    ShardingRule::new(&config).unwrap()
}

fn statement(kind: StatementKind, tables: &[&str]) -> StatementContext {
    StatementContext::new(kind, tables.iter().copied())
}

fn unicast(
    rule: &ShardingRule,
    stmt: &StatementContext,
    conn: &ConnectionContext,
) -> Result<shardroute::RouteContext, RouteError> {
    UnicastRouteEngine::new(stmt, stmt.tables().to_vec(), conn, DataSourceSelector::default())
        .route(rule)
}

const SELECT: StatementKind = StatementKind::Dml(DmlKind::Select);

#[test]
fn test_join_routes_to_only_common_source() {
    let rule = order_item_rule();
    let stmt = statement(SELECT, &["t_order", "t_item"]);

    for _ in 0..100 {
        let result = unicast(&rule, &stmt, &ConnectionContext::new()).unwrap();
        assert_eq!(result.len(), 1);
        let unit = &result.route_units()[0];
        assert_eq!(unit.data_source_name(), "ds1");
        assert_eq!(
            unit.table_mappers,
            vec![
                RouteMapper::new("t_order", "t_order_0"),
                RouteMapper::new("t_item", "t_item_0"),
            ]
        );
    }
}

#[test]
fn test_single_table_routes_to_first_data_node() {
    let rule = order_item_rule();
    let stmt = statement(SELECT, &["t_order"]);

    for _ in 0..100 {
        let result = unicast(&rule, &stmt, &ConnectionContext::new()).unwrap();
        assert_eq!(result.len(), 1);
        let unit = &result.route_units()[0];
        assert_eq!(unit.data_source_name(), "ds0");
        assert_eq!(unit.table_mappers, vec![RouteMapper::new("t_order", "t_order_0")]);
    }
}

#[test]
fn test_zero_tables_yield_one_unit_without_tables() {
    let rule = order_item_rule();
    let stmt = statement(StatementKind::Dal(DalKind::Show), &[]);

    for _ in 0..50 {
        let result = unicast(&rule, &stmt, &ConnectionContext::new()).unwrap();
        assert_eq!(result.len(), 1);
        let unit = &result.route_units()[0];
        assert!(unit.table_mappers.is_empty());
        assert!(rule.data_source_names().iter().any(|ds| ds == unit.data_source_name()));
    }
}

#[test]
fn test_disjoint_join_fails_before_any_unit() {
    let config = ShardingRuleConfig::new(["ds0", "ds1"])
        .table("t_a", ["ds0.t_a_0"])
        .table("t_b", ["ds1.t_b_0"]);
    let rule = ShardingRule::new(&config).unwrap();
    let stmt = statement(SELECT, &["t_a", "t_b"]);

    let err = unicast(&rule, &stmt, &ConnectionContext::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "No common data source found for logic tables [t_a, t_b]"
    );
}

#[test]
fn test_pinned_connection_is_idempotent() {
    let config = ShardingRuleConfig::new(["ds0", "ds1", "ds2"]);
    let rule = ShardingRule::new(&config).unwrap();
    let stmt = statement(SELECT, &[]);
    let mut conn = ConnectionContext::new();

    let first = unicast(&rule, &stmt, &conn).unwrap();
    conn.record_route(&first).unwrap();
    let pinned = first.route_units()[0].data_source_name().to_string();

    for _ in 0..100 {
        let next = unicast(&rule, &stmt, &conn).unwrap();
        assert_eq!(next.route_units()[0].data_source_name(), pinned);
        conn.record_route(&next).unwrap();
    }
    assert_eq!(conn.used_data_source_names(), [pinned]);
}

#[test]
fn test_pin_cleared_after_commit() {
    let mut conn = ConnectionContext::new();
    conn.begin().unwrap();
    conn.add_used_data_source_name("ds1");
    conn.commit().unwrap();
    assert!(conn.used_data_source_names().is_empty());
}

#[test]
fn test_view_and_cursor_always_use_first_source() {
    let config = ShardingRuleConfig::new(["ds0", "ds1", "ds2"]).broadcast_table("t_config");
    let rule = ShardingRule::new(&config).unwrap();
    let mut conn = ConnectionContext::new();
    conn.add_used_data_source_name("ds2");

    for kind in [
        StatementKind::View(ViewOp::Create),
        StatementKind::View(ViewOp::Alter),
        StatementKind::Cursor(CursorOp::Declare),
        StatementKind::Cursor(CursorOp::Close),
    ] {
        let stmt = statement(kind, &[]);
        for _ in 0..30 {
            let result = unicast(&rule, &stmt, &conn).unwrap();
            assert_eq!(result.route_units()[0].data_source_name(), "ds0");
        }
    }
}

#[test]
fn test_broadcast_table_write_does_not_collapse() {
    let config = ShardingRuleConfig::new(["ds0", "ds1", "ds2"]).broadcast_table("t_config");
    let rule = ShardingRule::new(&config).unwrap();
    let conn = ConnectionContext::new();
    let dispatcher = RouteEngineDispatcher::default();

    let update = statement(StatementKind::Dml(DmlKind::Update), &["t_config"]);
    let result = dispatcher.route(&rule, &update, &conn).unwrap();
    assert_eq!(result.actual_data_source_names(), vec!["ds0", "ds1", "ds2"]);

    let select = statement(SELECT, &["t_config"]);
    let result = dispatcher.route(&rule, &select, &conn).unwrap();
    assert_eq!(result.len(), 1);
}

#[test]
fn test_seeded_selection_is_reproducible() {
    let candidates: Vec<String> = ["ds0", "ds1", "ds2", "ds3"].iter().map(|s| s.to_string()).collect();
    let conn = ConnectionContext::new();
    let selector = DataSourceSelector::new(PinningMode::Trusted);

    let pick = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..10)
            .map(|_| selector.select_with(&mut rng, &candidates, &conn).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(pick(7), pick(7));
    assert!(pick(7).iter().all(|ds| candidates.contains(ds)));
}

#[test]
fn test_candidate_filtered_pinning_respects_intersection() {
    let rule = order_item_rule();
    let stmt = statement(SELECT, &["t_order", "t_item"]);
    let mut conn = ConnectionContext::new();
    conn.set_preferred_data_source_names(["ds0"]);

    let engine = UnicastRouteEngine::new(
        &stmt,
        stmt.tables().to_vec(),
        &conn,
        DataSourceSelector::new(PinningMode::CandidateFiltered),
    );
    let result = engine.route(&rule).unwrap();
    assert_eq!(result.route_units()[0].data_source_name(), "ds1");
}
