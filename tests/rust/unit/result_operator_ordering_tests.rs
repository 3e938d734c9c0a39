//! Unit tests for projections that follow result operators
//!
//! The select clause runs before every result operator in the model, so a
//! projection placed after an operator in the chain cannot be folded in place.

use querymodel::{
    config::BuilderConfig,
    expression::{Expr, LambdaExpr, Parameter, TypeRef},
    parsing::{
        build_query_model,
        structure::{CastNode, GroupByNode, MainSourceNode, ResultOperatorNode, SelectNode},
        NodeChain, NodeKind, ParserError,
    },
    query_model::ResultOperator,
};
use test_case::test_case;

fn cook() -> TypeRef {
    TypeRef::named("Cook")
}

fn chef() -> TypeRef {
    TypeRef::named("Chef")
}

fn cook_chain() -> NodeChain {
    let mut chain = NodeChain::new(TypeRef::queryable(TypeRef::string()));
    chain.push(
        "s",
        NodeKind::MainSource(MainSourceNode::new(Expr::opaque(
            "Cook[]",
            TypeRef::array(cook()),
        ))),
    );
    chain
}

fn select_member(item: TypeRef, name: &str) -> NodeKind {
    let x = Parameter::new("x", item);
    NodeKind::Select(SelectNode::new(LambdaExpr::new(
        vec![x.clone()],
        Expr::member(Expr::Parameter(x), name, TypeRef::string()),
    )))
}

fn select_identity(item: TypeRef) -> NodeKind {
    let x = Parameter::new("x", item);
    NodeKind::Select(SelectNode::new(LambdaExpr::new(
        vec![x.clone()],
        Expr::Parameter(x),
    )))
}

#[test_case(NodeKind::ResultOperator(ResultOperatorNode::new(ResultOperator::Distinct)), cook(), "Name" ; "distinct then select")]
#[test_case(NodeKind::Cast(CastNode::of_type(chef())), chef(), "LetterOfRecommendation" ; "of type then select")]
#[test_case(NodeKind::Cast(CastNode::cast(chef())), chef(), "LetterOfRecommendation" ; "cast then select")]
fn test_projection_after_result_operator_fails(operator: NodeKind, item: TypeRef, member: &str) {
    let mut chain = cook_chain();
    chain.push("s", operator);
    chain.push("s", select_member(item, member));

    let err = build_query_model(&chain, &BuilderConfig::default()).unwrap_err();
    assert!(
        matches!(err, ParserError::InvalidState(_)),
        "unexpected result: {:?}",
        err
    );
}

#[test]
fn test_identity_select_after_cast_is_kept() {
    let mut chain = cook_chain();
    chain.push("s", NodeKind::Cast(CastNode::cast(chef())));
    chain.push("s", select_identity(chef()));

    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(
        model.to_string(),
        "from Cook s in value(Cook[]) select Convert([s], Chef) => Cast<Chef>()"
    );
}

#[test]
fn test_projection_before_operator_is_kept() {
    let mut chain = cook_chain();
    chain.push("s", select_member(cook(), "Name"));
    chain.push(
        "s",
        NodeKind::ResultOperator(ResultOperatorNode::new(ResultOperator::Distinct)),
    );

    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(
        model.to_string(),
        "from Cook s in value(Cook[]) select [s].Name => Distinct()"
    );
}

#[test]
fn test_group_by_after_cast_fails() {
    let c = Parameter::new("c", chef());
    let mut chain = cook_chain();
    chain.push("s", NodeKind::Cast(CastNode::cast(chef())));
    chain.push(
        "c",
        NodeKind::GroupBy(GroupByNode::new(
            LambdaExpr::new(
                vec![c.clone()],
                Expr::member(Expr::Parameter(c), "Age", TypeRef::int32()),
            ),
            None,
        )),
    );

    assert!(matches!(
        build_query_model(&chain, &BuilderConfig::default()),
        Err(ParserError::InvalidState(_))
    ));
}
