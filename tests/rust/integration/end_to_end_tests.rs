/// End-to-end test for a cast over an in-memory source
///
/// chain = [source(Cook[]), select identity, Cast<Chef>]
///
/// The main from clause keeps the Cook item type, exactly one cast operator
/// carries Chef, and a member access on the cast item resolves to an explicit
/// conversion of the Cook reference.
use querymodel::{
    config::BuilderConfig,
    expression::{Expr, LambdaExpr, Parameter, TypeRef},
    parsing::{
        build_query_model_with_context,
        structure::{CastNode, MainSourceNode, SelectNode},
        NodeChain, NodeKind,
    },
    query_model::ResultOperator,
};

fn cook_to_chef_chain() -> NodeChain {
    let cook = TypeRef::named("Cook");
    let s = Parameter::new("s", cook.clone());
    let mut chain = NodeChain::new(TypeRef::queryable(TypeRef::named("Chef")));
    chain.push(
        "s",
        NodeKind::MainSource(MainSourceNode::new(Expr::opaque(
            "Cook[]",
            TypeRef::array(cook),
        ))),
    );
    chain.push(
        "s",
        NodeKind::Select(SelectNode::new(LambdaExpr::new(
            vec![s.clone()],
            Expr::Parameter(s),
        ))),
    );
    chain.push("s", NodeKind::Cast(CastNode::cast(TypeRef::named("Chef"))));
    chain
}

#[test]
fn test_cast_end_to_end() {
    let chain = cook_to_chef_chain();
    let (model, ctx) = build_query_model_with_context(&chain, &BuilderConfig::default())
        .expect("Failed to build query model");

    println!("Model: {}", model);

    assert_eq!(model.main_from_clause().item_type(), &TypeRef::named("Cook"));
    let casts: Vec<&ResultOperator> = model
        .result_operators()
        .iter()
        .filter(|op| matches!(op, ResultOperator::Cast { .. }))
        .collect();
    assert_eq!(casts.len(), 1);
    assert_eq!(casts[0].cast_item_type(), Some(&TypeRef::named("Chef")));

    let cast_node = chain.nodes().last().expect("chain has nodes");
    let x = Parameter::new("x", TypeRef::named("Chef"));
    let body = Expr::member(
        Expr::Parameter(x.clone()),
        "LetterOfRecommendation",
        TypeRef::string(),
    );
    let resolved = cast_node
        .resolve(&chain, &x, &body, &ctx)
        .expect("Failed to resolve");
    assert_eq!(
        resolved.to_string(),
        "Convert([s], Chef).LetterOfRecommendation"
    );
    assert_eq!(
        model.to_string(),
        "from Cook s in value(Cook[]) select [s] => Cast<Chef>()"
    );
}

#[test]
fn test_transform_identity_keeps_model() {
    let chain = cook_to_chef_chain();
    let (mut model, _) = build_query_model_with_context(&chain, &BuilderConfig::default())
        .expect("Failed to build query model");
    let before = model.clone();

    model.transform_expressions(&mut |e| e);
    assert_eq!(model, before);
    assert_eq!(model.validate(), Ok(()));
}

#[test]
fn test_transform_can_rewrite_every_expression() {
    let chain = cook_to_chef_chain();
    let (mut model, _) = build_query_model_with_context(&chain, &BuilderConfig::default())
        .expect("Failed to build query model");

    let mut visited = 0;
    model.transform_expressions(&mut |e| {
        visited += 1;
        match e {
            Expr::Constant(_) => Expr::opaque(
                "Cook[] (cached)",
                TypeRef::array(TypeRef::named("Cook")),
            ),
            other => other,
        }
    });
    assert_eq!(visited, 2);
    assert_eq!(
        model.main_from_clause().from_expression().to_string(),
        "value(Cook[] (cached))"
    );
}
