/// Integration tests for JSON input, the format the command line tool reads
use querymodel::{
    config::BuilderConfig,
    expression::{BinaryOperator, Expr, Parameter, TypeRef},
    parsing::{
        self, build_query_model, legacy::BodyExpressionData, NodeChain, NodeKind,
        ParseResultCollector,
    },
};

const COOK_CHAIN: &str = r#"{
  "result_type": { "name": "IQueryable", "args": [{ "name": "string" }] },
  "nodes": [
    {
      "id": 0,
      "associated_identifier": "s",
      "kind": { "MainSource": { "expression": { "Constant": {
        "value": { "Opaque": "Cook[]" },
        "ty": { "name": "[]", "args": [{ "name": "Cook" }] }
      } } } }
    },
    {
      "id": 1,
      "source": 0,
      "associated_identifier": "s",
      "call_site": "Where",
      "kind": { "Where": { "predicate": {
        "params": [{ "name": "s", "ty": { "name": "Cook" } }],
        "body": { "Binary": {
          "operator": "GreaterThan",
          "left": { "MemberAccess": {
            "object": { "Parameter": { "name": "s", "ty": { "name": "Cook" } } },
            "member": "Age",
            "ty": { "name": "int" }
          } },
          "right": { "Constant": { "value": { "Integer": 30 }, "ty": { "name": "int" } } },
          "ty": { "name": "bool" }
        } }
      } } }
    },
    {
      "id": 2,
      "source": 1,
      "associated_identifier": "s",
      "kind": { "Select": { "selector": {
        "params": [{ "name": "s", "ty": { "name": "Cook" } }],
        "body": { "MemberAccess": {
          "object": { "Parameter": { "name": "s", "ty": { "name": "Cook" } } },
          "member": "Name",
          "ty": { "name": "string" }
        } }
      } } }
    }
  ]
}"#;

#[test]
fn test_node_chain_from_json() {
    let chain: NodeChain = serde_json::from_str(COOK_CHAIN).expect("Failed to parse chain");
    assert_eq!(chain.len(), 3);
    assert!(matches!(chain.nodes()[1].kind, NodeKind::Where(_)));
    assert!(chain.nodes()[2].call_site.is_empty());

    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();
    assert_eq!(
        model.to_string(),
        "from Cook s in value(Cook[]) where ([s].Age > 30) select [s].Name"
    );
}

#[test]
fn test_built_model_serializes() {
    let chain: NodeChain = serde_json::from_str(COOK_CHAIN).unwrap();
    let model = build_query_model(&chain, &BuilderConfig::default()).unwrap();

    let value = serde_json::to_value(&model).unwrap();
    assert!(value.get("main_from_clause").is_some());
    assert!(value.get("body_clauses").is_some_and(|b| b.is_array()));
}

#[test]
fn test_dangling_source_in_json_is_rejected() {
    let broken = COOK_CHAIN.replace("\"source\": 1", "\"source\": 7");
    let chain: NodeChain = serde_json::from_str(&broken).unwrap();
    assert!(build_query_model(&chain, &BuilderConfig::default()).is_err());
}

#[test]
fn test_collector_survives_json() {
    let student = TypeRef::named("Student");
    let s = Parameter::new("s", student.clone());
    let root = Expr::opaque("query", TypeRef::queryable(TypeRef::int32()));

    let mut collector = ParseResultCollector::new(root.clone());
    collector.add_body_expression(BodyExpressionData::from(
        s.clone(),
        Expr::opaque("Student[]", TypeRef::array(student)),
    ));
    collector.add_body_expression(BodyExpressionData::where_(Expr::binary(
        BinaryOperator::LessThan,
        Expr::member(Expr::Parameter(s.clone()), "Age", TypeRef::int32()),
        Expr::integer(20),
    )));
    collector.add_projection_expression(Expr::member(
        Expr::Parameter(s),
        "Id",
        TypeRef::int32(),
    ));
    collector.set_distinct();

    let json = serde_json::to_string(&collector).unwrap();
    let parsed: ParseResultCollector = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, collector);

    let config = BuilderConfig::default();
    let direct = parsing::create_query_model(&root, collector, &config).unwrap();
    let from_json = parsing::create_query_model(&root, parsed, &config).unwrap();
    assert_eq!(direct.to_string(), from_json.to_string());
    assert_eq!(direct.result_operators().len(), 1);
}
