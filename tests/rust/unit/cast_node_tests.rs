//! Unit tests for Cast / OfType nodes
//!
//! A cast adds a result operator and turns references to the cast item into
//! explicit conversions of the upstream item.

use querymodel::{
    config::BuilderConfig,
    expression::{BinaryOperator, Expr, LambdaExpr, Parameter, TypeRef},
    parsing::{
        build_query_model, build_query_model_with_context,
        structure::{CastNode, MainSourceNode, SelectNode, WhereNode},
        NodeChain, NodeId, NodeKind, ParserError,
    },
    query_model::ResultOperator,
};

fn cook() -> TypeRef {
    TypeRef::named("Cook")
}

fn chef() -> TypeRef {
    TypeRef::named("Chef")
}

fn cook_chain(cast: CastNode) -> NodeChain {
    let s = Parameter::new("s", cook());
    let mut chain = NodeChain::new(TypeRef::queryable(chef()));
    chain.push(
        "s",
        NodeKind::MainSource(MainSourceNode::new(Expr::opaque(
            "Cook[]",
            TypeRef::array(cook()),
        ))),
    );
    chain.push(
        "s",
        NodeKind::Select(SelectNode::new(LambdaExpr::new(
            vec![s.clone()],
            Expr::Parameter(s),
        ))),
    );
    chain.push("s", NodeKind::Cast(cast));
    chain
}

#[test]
fn test_apply_adds_cast_result_operator() {
    let chain = cook_chain(CastNode::cast(chef()));
    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();

    assert_eq!(
        model.result_operators(),
        &[ResultOperator::Cast {
            cast_item_type: chef()
        }]
    );
    assert_eq!(model.main_from_clause().item_type(), &cook());
}

#[test]
fn test_resolve_wraps_reference_in_conversion() {
    let chain = cook_chain(CastNode::cast(chef()));
    let (model, ctx) = build_query_model_with_context(&chain, &BuilderConfig::default()).unwrap();

    let x = Parameter::new("x", chef());
    let body = Expr::member(
        Expr::Parameter(x.clone()),
        "LetterOfRecommendation",
        TypeRef::string(),
    );
    let resolved = chain.resolve(NodeId(2), &x, &body, &ctx).unwrap();

    let expected = Expr::member(
        Expr::convert(Expr::source_ref(model.main_from_clause().source()), chef()),
        "LetterOfRecommendation",
        TypeRef::string(),
    );
    assert_eq!(resolved, expected);
    assert_eq!(resolved.to_string(), "Convert([s], Chef).LetterOfRecommendation");
}

#[test]
fn test_cast_changes_output_item_type() {
    let chain = cook_chain(CastNode::cast(chef()));
    let (_, ctx) = build_query_model_with_context(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(chain.output_item_type(NodeId(1), &ctx).unwrap(), cook());
    assert_eq!(chain.output_item_type(NodeId(2), &ctx).unwrap(), chef());
}

#[test]
fn test_apply_twice_fails() {
    let chain = cook_chain(CastNode::cast(chef()));
    let (mut model, mut ctx) =
        build_query_model_with_context(&chain, &BuilderConfig::default()).unwrap();

    let err = chain.nodes()[2]
        .apply(&chain, &mut model, &mut ctx)
        .unwrap_err();
    assert!(matches!(err, ParserError::InvalidState(_)));
    assert_eq!(model.result_operators().len(), 1);
}

#[test]
fn test_of_type_closes_clause_chain() {
    let mut chain = cook_chain(CastNode::of_type(chef()));
    let c = Parameter::new("c", chef());
    chain.push(
        "c",
        NodeKind::Where(WhereNode::new(LambdaExpr::new(
            vec![c.clone()],
            Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::member(Expr::Parameter(c), "Stars", TypeRef::int32()),
                Expr::integer(2),
            ),
        ))),
    );

    let err = build_query_model(&chain, &BuilderConfig::default()).unwrap_err();
    assert!(matches!(err, ParserError::InvalidState(_)));
}

#[test]
fn test_where_after_cast_sees_converted_item() {
    let mut chain = cook_chain(CastNode::cast(chef()));
    let c = Parameter::new("c", chef());
    chain.push(
        "c",
        NodeKind::Where(WhereNode::new(LambdaExpr::new(
            vec![c.clone()],
            Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::member(Expr::Parameter(c), "Stars", TypeRef::int32()),
                Expr::integer(2),
            ),
        ))),
    );

    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(
        model.body_clauses()[0].as_where().unwrap().predicate().to_string(),
        "(Convert([s], Chef).Stars > 2)"
    );
}
