use anyhow::{Context, Result};
use test_case::test_case;

use shapegen::{
    eval::{self, Value},
    runtime::ResponseParts,
    DefaultNamingRegistry, Error, Generator, ShapeModel,
};

pub mod common;

use crate::common::{body, timestamp, QUERY_MODEL};

fn model() -> Result<ShapeModel> {
    ShapeModel::from_json(QUERY_MODEL).context("failed to load query model")
}

fn serialize(operation: &str, input: &Value) -> Result<String> {
    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let generator = Generator::new(&model, &registry);
    let request = generator.request(model.operation(operation)?)?;
    let parts = eval::serialize(&request.plan, input)?;
    Ok(body(&parts).to_string())
}

#[test]
fn required_scalar_only() -> Result<()> {
    let input = Value::record([("Name", Value::from("demo"))]);
    assert_eq!(
        serialize("CreateTopic", &input)?,
        "Action=CreateTopic&Version=2010-03-31&Name=demo"
    );
    Ok(())
}

/// Maps go under `entry.N`, structure lists under `member.N`, and every
/// scalar is form encoded
#[test]
fn every_member_kind() -> Result<()> {
    let input = Value::record([
        ("Name", Value::from("demo")),
        ("Attributes", Value::map([("DisplayName", Value::from("Demo"))])),
        (
            "Tags",
            Value::from(vec![Value::record([
                ("Key", Value::from("k")),
                ("Value", Value::from("v")),
            ])]),
        ),
        ("Enabled", Value::from(true)),
        ("At", Value::from(timestamp())),
    ]);
    assert_eq!(
        serialize("CreateTopic", &input)?,
        "Action=CreateTopic&Version=2010-03-31&Name=demo\
         &Attributes.entry.1.key=DisplayName&Attributes.entry.1.value=Demo\
         &Tags.member.1.Key=k&Tags.member.1.Value=v\
         &Enabled=true&At=2023-11-14T22%3A13%3A20%2B00%3A00"
    );
    Ok(())
}

#[test]
fn absent_optional_members_write_nothing() -> Result<()> {
    let input = Value::record([
        ("Name", Value::from("demo")),
        ("Enabled", Value::Null),
        ("Labels", Value::from(Vec::new())),
    ]);
    assert_eq!(
        serialize("CreateTopic", &input)?,
        "Action=CreateTopic&Version=2010-03-31&Name=demo"
    );
    Ok(())
}

#[test]
fn flattened_list_uses_member_location_name() -> Result<()> {
    let input =
        Value::record([("ItemList", Value::from(vec![Value::from("a"), Value::from("b")]))]);
    assert_eq!(
        serialize("ListThings", &input)?,
        "Action=ListThings&Version=2010-03-31&Items.1=a&Items.2=b"
    );
    Ok(())
}

#[test]
fn nested_lists_keep_separate_counters() -> Result<()> {
    let input = Value::record([(
        "Matrix",
        Value::from(vec![
            Value::from(vec![Value::from("a"), Value::from("b")]),
            Value::from(vec![Value::from("c")]),
        ]),
    )]);
    assert_eq!(
        serialize("SetMatrix", &input)?,
        "Action=SetMatrix&Version=2010-03-31\
         &Matrix.member.1.member.1=a&Matrix.member.1.member.2=b&Matrix.member.2.member.1=c"
    );

    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let request = Generator::new(&model, &registry).request(model.operation("SetMatrix")?)?;
    assert!(request.body.contains("for (index_1, item_1) in input.matrix.iter().enumerate()"));
    assert!(request.body.contains("for (index_2, item_2) in item_1.iter().enumerate()"));
    assert!(request.body.contains("format!(\"Matrix.member.{}.member.{}\", index_1, index_2)"));
    assert!(request.body.contains("shapegen::runtime::form_encode(&params)"));
    Ok(())
}

#[test_case(Value::from(false), "false" ; "boolean")]
#[test_case(Value::from(timestamp()), "2023-11-14T22%3A13%3A20%2B00%3A00" ; "timestamp is iso8601")]
#[test_case(Value::from("a b&c"), "a+b%26c" ; "string is form encoded")]
fn scalar_formats(value: Value, expected: &str) {
    let member = match &value {
        Value::Bool(_) => "Enabled",
        Value::Timestamp(_) => "At",
        _ => "Name",
    };
    let mut fields = vec![(member, value)];
    if member != "Name" {
        fields.push(("Name", Value::from("n")));
    }
    let encoded = serialize("CreateTopic", &Value::record(fields)).unwrap();
    assert!(encoded.contains(&format!("{member}={expected}")), "{encoded}");
}

#[test]
fn missing_required_member_is_an_error() -> Result<()> {
    let err = serialize("CreateTopic", &Value::record(Vec::<(String, Value)>::new())).unwrap_err();
    let err = err.downcast::<eval::EvalError>()?;
    assert!(matches!(err, eval::EvalError::MissingRequired(ref v) if v == "input.name"));
    Ok(())
}

/// Query responses are xml documents wrapped in the operation's result element
#[test]
fn parses_wrapped_response() -> Result<()> {
    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let response = Generator::new(&model, &registry).response(model.operation("CreateTopic")?)?;
    assert_eq!(response.plan.wrapper.as_deref(), Some("CreateTopicResult"));
    assert!(response.used_types.contains("sns::result::CreateTopicResponse"));
    assert!(response.used_types.contains("sns::value::Tag"));

    let xml = r#"<CreateTopicResponse xmlns="http://sns.amazonaws.com/doc/2010-03-31/">
          <CreateTopicResult>
            <TopicArn>arn:aws:sns:us-east-1:123456789012:demo</TopicArn>
            <Tags>
              <member><Key>k</Key><Value>v</Value></member>
              <member><Key>k2</Key><Value>v2</Value></member>
            </Tags>
          </CreateTopicResult>
        </CreateTopicResponse>"#;
    let value = eval::parse(&response.plan, &ResponseParts::new(200).with_body(xml))?;
    let tag =
        |k: &str, v: &str| Value::record([("Key", Value::from(k)), ("Value", Value::from(v))]);
    assert_eq!(
        value,
        Value::record([
            ("TopicArn", Value::from("arn:aws:sns:us-east-1:123456789012:demo")),
            ("Tags", Value::from(vec![tag("k", "v"), tag("k2", "v2")])),
            // required and absent: the type default
            ("Count", Value::from(0)),
        ])
    );
    Ok(())
}

#[test]
fn operation_without_output_parses_to_unit() -> Result<()> {
    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let response = Generator::new(&model, &registry).response(model.operation("ListThings")?)?;
    assert!(response.signature.contains("_response: &shapegen::runtime::ResponseParts"));
    assert!(response.signature.ends_with("Result<(), shapegen::runtime::DecodeError>"));
    assert_eq!(eval::parse(&response.plan, &ResponseParts::new(200))?, Value::Null);
    Ok(())
}

#[test]
fn map_key_without_location_name() -> Result<()> {
    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let err = Generator::new(&model, &registry)
        .request(model.operation("SetAttributes")?)
        .unwrap_err();
    assert!(matches!(err, Error::Operation { ref operation, .. } if operation == "SetAttributes"));
    assert!(matches!(err.root(), Error::MissingWireMetadata(shape, _) if shape == "UnnamedKeyMap"));
    Ok(())
}

#[test]
fn unsupported_scalar_type() -> Result<()> {
    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let err = Generator::new(&model, &registry).request(model.operation("Describe")?).unwrap_err();
    assert!(matches!(
        err.root(),
        Error::UnsupportedShapeType(shape, ty) if shape == "doc" && ty == "document"
    ));
    Ok(())
}

#[test]
fn operation_source_has_both_functions() -> Result<()> {
    let model = model()?;
    let registry = DefaultNamingRegistry::new(&model, "sns");
    let source =
        Generator::new(&model, &registry).operation_source(model.operation("CreateTopic")?)?;
    assert!(source.starts_with("// CreateTopic (query) marshalling for SNS, generated by"));
    assert!(source.contains("pub fn serialize_create_topic(input: &sns::input::CreateTopicInput)"));
    assert!(
        source.contains("pub fn parse_create_topic(response: &shapegen::runtime::ResponseParts)")
    );
    assert!(source.contains("fn populate_result_tag_list<'a>"));
    Ok(())
}
