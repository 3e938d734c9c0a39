/// Integration tests for chains that mix every body clause kind
///
/// from s in Cook[]
/// from k in s.Kitchens
/// from c in Chef[]
/// where c.Age > 30
/// where c.Name != "x"
/// orderby c.Name asc, c.Age desc
/// orderby c.Id asc
/// select c.Name
use querymodel::{
    config::BuilderConfig,
    expression::{BinaryOperator, Expr, LambdaExpr, Literal, Parameter, TypeRef},
    parsing::{
        build_query_model,
        structure::{MainSourceNode, OrderByNode, SelectManyNode, SelectNode, WhereNode},
        NodeChain, NodeKind,
    },
    query_model::{ClauseRef, OrderingDirection, QueryModel},
};

fn cook() -> TypeRef {
    TypeRef::named("Cook")
}

fn kitchen() -> TypeRef {
    TypeRef::named("Kitchen")
}

fn chef() -> TypeRef {
    TypeRef::named("Chef")
}

fn member(param: &Parameter, name: &str, ty: TypeRef) -> Expr {
    Expr::member(Expr::Parameter(param.clone()), name, ty)
}

fn lambda(param: &Parameter, body: Expr) -> LambdaExpr {
    LambdaExpr::new(vec![param.clone()], body)
}

fn build_chain() -> NodeChain {
    let s = Parameter::new("s", cook());
    let k = Parameter::new("k", kitchen());
    let c = Parameter::new("c", chef());

    let mut chain = NodeChain::new(TypeRef::queryable(TypeRef::string()));
    chain.push(
        "s",
        NodeKind::MainSource(MainSourceNode::new(Expr::opaque(
            "Cook[]",
            TypeRef::array(cook()),
        ))),
    );
    chain.push(
        "k",
        NodeKind::SelectMany(SelectManyNode::new(
            lambda(&s, member(&s, "Kitchens", TypeRef::enumerable(kitchen()))),
            Some(LambdaExpr::new(
                vec![s.clone(), k.clone()],
                Expr::Parameter(k.clone()),
            )),
        )),
    );
    chain.push(
        "c",
        NodeKind::SelectMany(SelectManyNode::new(
            lambda(&k, Expr::opaque("Chef[]", TypeRef::array(chef()))),
            Some(LambdaExpr::new(
                vec![k.clone(), c.clone()],
                Expr::Parameter(c.clone()),
            )),
        )),
    );
    chain.push(
        "c",
        NodeKind::Where(WhereNode::new(lambda(
            &c,
            Expr::binary(
                BinaryOperator::GreaterThan,
                member(&c, "Age", TypeRef::int32()),
                Expr::integer(30),
            ),
        ))),
    );
    chain.push(
        "c",
        NodeKind::Where(WhereNode::new(lambda(
            &c,
            Expr::binary(
                BinaryOperator::NotEqual,
                member(&c, "Name", TypeRef::string()),
                Expr::constant(Literal::String("x".into()), TypeRef::string()),
            ),
        ))),
    );
    chain.push(
        "c",
        NodeKind::OrderBy(OrderByNode::order_by(
            lambda(&c, member(&c, "Name", TypeRef::string())),
            OrderingDirection::Asc,
        )),
    );
    chain.push(
        "c",
        NodeKind::OrderBy(OrderByNode::then_by(
            lambda(&c, member(&c, "Age", TypeRef::int32())),
            OrderingDirection::Desc,
        )),
    );
    chain.push(
        "c",
        NodeKind::OrderBy(OrderByNode::order_by(
            lambda(&c, member(&c, "Id", TypeRef::int32())),
            OrderingDirection::Asc,
        )),
    );
    chain.push(
        "c",
        NodeKind::Select(SelectNode::new(lambda(
            &c,
            member(&c, "Name", TypeRef::string()),
        ))),
    );
    chain
}

fn build() -> QueryModel {
    build_query_model(&build_chain(), &BuilderConfig::default()).expect("Failed to build query model")
}

#[test]
fn test_body_clause_kinds_in_order() {
    let model = build();
    let kinds: Vec<&str> = model.body_clauses().iter().map(|c| c.kind_name()).collect();
    assert_eq!(
        kinds,
        vec![
            "MemberFromClause",
            "AdditionalFromClause",
            "WhereClause",
            "WhereClause",
            "OrderByClause",
            "OrderByClause",
        ]
    );

    let first_order = model.body_clauses()[4].as_order_by().unwrap();
    let directions: Vec<OrderingDirection> =
        first_order.orderings().iter().map(|o| o.direction()).collect();
    assert_eq!(directions, vec![OrderingDirection::Asc, OrderingDirection::Desc]);
    assert_eq!(model.body_clauses()[5].as_order_by().unwrap().orderings().len(), 1);
}

#[test]
fn test_previous_clauses_are_chained() {
    let model = build();
    let previous: Vec<ClauseRef> = model
        .body_clauses()
        .iter()
        .map(|c| c.previous_clause())
        .collect();
    assert_eq!(
        previous,
        vec![
            ClauseRef::MainFrom,
            ClauseRef::Body(0),
            ClauseRef::Body(1),
            ClauseRef::Body(2),
            ClauseRef::Body(3),
            ClauseRef::Body(4),
        ]
    );
    assert_eq!(
        model.select_or_group_clause().unwrap().previous_clause(),
        ClauseRef::Body(5)
    );
    assert_eq!(model.validate(), Ok(()));
}

#[test]
fn test_predicates_reference_the_last_from_clause() {
    let model = build();
    let chef_from = model.body_clauses()[1].as_additional_from().unwrap();
    let chef_ref = Expr::source_ref(chef_from.source());

    let predicate = model.body_clauses()[2].as_where().unwrap().predicate();
    assert_eq!(
        predicate,
        &Expr::binary(
            BinaryOperator::GreaterThan,
            Expr::member(chef_ref.clone(), "Age", TypeRef::int32()),
            Expr::integer(30),
        )
    );
    assert_eq!(
        model.select_or_group_clause().unwrap().as_select().unwrap().selector(),
        &Expr::member(chef_ref, "Name", TypeRef::string())
    );

    let kitchen_from = model.body_clauses()[0].as_member_from().unwrap();
    assert_eq!(kitchen_from.from_expression().to_string(), "[s].Kitchens");
}
