/// Integration tests for nested queries used as sources
use querymodel::{
    config::BuilderConfig,
    expression::{BinaryOperator, Expr, LambdaExpr, Parameter, TypeRef},
    parsing::{
        build_query_model,
        structure::{MainSourceNode, SelectNode, SubQuerySourceNode, WhereNode},
        NodeChain, NodeKind, ParserError,
    },
};

fn cook() -> TypeRef {
    TypeRef::named("Cook")
}

fn kitchen() -> TypeRef {
    TypeRef::named("Kitchen")
}

fn source(description: &str, item: TypeRef) -> NodeKind {
    NodeKind::MainSource(MainSourceNode::new(Expr::opaque(
        description,
        TypeRef::array(item),
    )))
}

fn select(param: &Parameter, body: Expr) -> NodeKind {
    NodeKind::Select(SelectNode::new(LambdaExpr::new(vec![param.clone()], body)))
}

/// from c in Cook[] where c.Age > 18 select c
fn adult_cooks() -> NodeChain {
    let c = Parameter::new("c", cook());
    let mut chain = NodeChain::new(TypeRef::queryable(cook()));
    chain.push("c", source("Cook[]", cook()));
    chain.push(
        "c",
        NodeKind::Where(WhereNode::new(LambdaExpr::new(
            vec![c.clone()],
            Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::member(Expr::Parameter(c.clone()), "Age", TypeRef::int32()),
                Expr::integer(18),
            ),
        ))),
    );
    chain.push("c", select(&c, Expr::Parameter(c.clone())));
    chain
}

#[test]
fn test_sub_query_as_main_source() {
    let s = Parameter::new("s", cook());
    let mut chain = NodeChain::new(TypeRef::queryable(TypeRef::string()));
    chain.push("s", NodeKind::SubQuerySource(SubQuerySourceNode::new(adult_cooks())));
    chain.push(
        "s",
        select(&s, Expr::member(Expr::Parameter(s.clone()), "Name", TypeRef::string())),
    );

    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(
        model.to_string(),
        "from Cook s in {from Cook c in value(Cook[]) where ([c].Age > 18) select [c]} select [s].Name"
    );
    assert_eq!(model.main_from_clause().item_type(), &cook());
    assert!(matches!(
        model.main_from_clause().from_expression(),
        Expr::SubQuery(_)
    ));
}

#[test]
fn test_sub_query_from_gets_projection_from_select() {
    let k = Parameter::new("k", kitchen());
    let mut kitchens = NodeChain::new(TypeRef::queryable(kitchen()));
    kitchens.push("k", source("Kitchen[]", kitchen()));
    kitchens.push("k", select(&k, Expr::Parameter(k.clone())));

    let mut chain = NodeChain::new(TypeRef::queryable(TypeRef::string()));
    chain.push("s", source("Cook[]", cook()));
    chain.push("k", NodeKind::SubQuerySource(SubQuerySourceNode::new(kitchens)));
    chain.push(
        "k",
        select(&k, Expr::member(Expr::Parameter(k.clone()), "Name", TypeRef::string())),
    );

    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(model.body_clauses().len(), 1);
    let from = model.body_clauses()[0].as_sub_query_from().unwrap();
    assert_eq!(
        from.sub_query_model().to_string(),
        "from Kitchen k in value(Kitchen[]) select [k]"
    );
    let expected = Expr::member(Expr::source_ref(from.source()), "Name", TypeRef::string());
    assert_eq!(from.projection_expression(), Some(&expected));
    assert_eq!(
        model.select_or_group_clause().unwrap().as_select().unwrap().selector(),
        &expected
    );
}

#[test]
fn test_nested_error_propagates() {
    let mut unprojected = NodeChain::new(TypeRef::queryable(cook()));
    unprojected.push("c", source("Cook[]", cook()));

    let s = Parameter::new("s", cook());
    let mut chain = NodeChain::new(TypeRef::queryable(cook()));
    chain.push("s", NodeKind::SubQuerySource(SubQuerySourceNode::new(unprojected)));
    chain.push("s", select(&s, Expr::Parameter(s.clone())));

    assert_eq!(
        build_query_model(&chain, &BuilderConfig::default()).unwrap_err(),
        ParserError::NoProjection
    );
}

#[test]
fn test_depth_limit_counts_nesting_levels() {
    let s = Parameter::new("s", cook());
    let mut chain = NodeChain::new(TypeRef::queryable(cook()));
    chain.push("s", NodeKind::SubQuerySource(SubQuerySourceNode::new(adult_cooks())));
    chain.push("s", select(&s, Expr::Parameter(s.clone())));

    let config = BuilderConfig {
        max_subquery_depth: 0,
        ..BuilderConfig::default()
    };
    assert_eq!(
        build_query_model(&chain, &config).unwrap_err(),
        ParserError::RecursionLimit { depth: 1, limit: 0 }
    );
}
