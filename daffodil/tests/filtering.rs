use daffodil::prelude::*;

fn people() -> Vec<std::collections::BTreeMap<String, Value>> {
    vec![
        record([("name", Value::from("ann")), ("gender", "female".into()), ("age", 25.into())]),
        record([("name", Value::from("bob")), ("gender", "male".into()), ("age", 25.into())]),
        record([("name", Value::from("cat")), ("gender", "female".into()), ("age", 40.into())]),
        record([("name", Value::from("dan")), ("gender", "male".into()), ("age", 19.into())]),
        record([("name", Value::from("eve")), ("gender", "female".into())]),
    ]
}

fn names(filter: &Daffodil) -> Vec<String> {
    filter
        .filter(people())
        .unwrap()
        .map(|person| match &person.unwrap()["name"] {
            Value::String(name) => name.clone(),
            other => panic!("unexpected name {other:?}"),
        })
        .collect()
}

#[test]
fn newline_separated_conditions_form_an_all_group() {
    let filter = Daffodil::new("gender = \"female\"\nage > 18\nage < 34").unwrap();

    let young_woman = record([("gender", Value::from("female")), ("age", 25.into())]);
    let young_man = record([("gender", Value::from("male")), ("age", 25.into())]);
    let older_woman = record([("gender", Value::from("female")), ("age", 40.into())]);

    assert!(filter.matches(&young_woman).unwrap());
    assert!(!filter.matches(&young_man).unwrap());
    assert!(!filter.matches(&older_woman).unwrap());
}

#[test]
fn any_group_matches_either_value() {
    let filter = Daffodil::new("[ age = 18 age = 21 ]").unwrap();
    assert!(filter.matches(&record([("age", 18)])).unwrap());
    assert!(filter.matches(&record([("age", 21)])).unwrap());
    assert!(!filter.matches(&record([("age", 19)])).unwrap());
}

#[test]
fn empty_groups_are_vacuous() {
    let everything = Daffodil::new("{}").unwrap();
    let nothing = Daffodil::new("[]").unwrap();
    for person in people() {
        assert!(everything.matches(&person).unwrap());
        assert!(!nothing.matches(&person).unwrap());
    }
    assert_eq!(names(&Daffodil::new("   \n ").unwrap()).len(), 5);
}

#[test]
fn quoted_keys_may_contain_anything() {
    let filter = Daffodil::new(r#""weird key!" = 5"#).unwrap();
    assert!(filter.matches(&record([("weird key!", 5)])).unwrap());
    assert!(!filter.matches(&record([("weird key", 5)])).unwrap());
}

#[test]
fn implicit_all_group_equals_explicit_one() {
    let bare = Daffodil::new("gender = 'female', age > 18").unwrap();
    let wrapped = Daffodil::new("{ gender = 'female', age > 18 }").unwrap();
    assert_eq!(names(&bare), names(&wrapped));
    assert_eq!(names(&bare), vec!["ann", "cat"]);
}

#[test]
fn nested_groups() {
    let filter = Daffodil::new(
        r#"
        [
          {
            gender = "female"
            age > 25
            age < 34
          }
          {
            gender = "male"
            age > 18
            age < 34
          }
        ]
        "#,
    )
    .unwrap();
    assert_eq!(names(&filter), vec!["bob", "dan"]);
}

#[test]
fn separators_and_whitespace_are_optional() {
    let spaced = Daffodil::new("{ a = 1 , b = 2 }\n[ c = 3\n d = 4 ]").unwrap();
    let tight = Daffodil::new("{a=1,b=2}[c=3 d=4]").unwrap();
    assert_eq!(spaced.pretty(true).unwrap(), tight.pretty(true).unwrap());
}

#[test]
fn missing_fields_never_raise() {
    let filter = Daffodil::new("age < 100").unwrap();
    assert_eq!(names(&filter), vec!["ann", "bob", "cat", "dan"]);

    let filter = Daffodil::new("age != 25").unwrap();
    assert_eq!(names(&filter), vec!["cat", "dan"]);
}

#[test]
fn filtering_preserves_input_order() {
    let filter = Daffodil::new("[gender = 'male' age = 40]").unwrap();
    assert_eq!(names(&filter), vec!["bob", "cat", "dan"]);
}

#[test]
fn filtering_borrowed_records() {
    let filter = Daffodil::new("age >= 25").unwrap();
    let people = people();
    let kept: Vec<_> = filter
        .filter(people.iter())
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(kept.len(), 3);
    assert!(std::ptr::eq(kept[0], &people[0]));
}

#[test]
fn unsupported_comparison_surfaces_on_use() {
    let filter = Daffodil::new("active >= true").unwrap();
    let err = filter.matches(&record([("active", true)])).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedOperator {
            operator: Operator::Ge,
            ..
        }
    ));
    assert!(filter.filter(people()).is_err());

    // The pretty-printer has no such restriction
    assert_eq!(filter.pretty(true).unwrap(), r#"{"active">=true}"#);
}

#[test]
fn ordering_a_field_of_another_type_is_an_error() {
    let filter = Daffodil::new("age > 18").unwrap();
    let err = filter.matches(&record([("age", "99")])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "operator `>` is not supported here: cannot order string field `age` against 18"
    );

    // Missing fields stay false, everyone else is compared as usual
    let mut people = people();
    people[1].insert("age".to_string(), Value::from("twenty"));
    let outcome: Vec<_> = filter
        .filter(people)
        .unwrap()
        .map(|person| person.map(|p| p["name"].clone()))
        .collect();
    assert_eq!(outcome.len(), 4);
    assert_eq!(outcome[0], Ok(Value::from("ann")));
    assert!(matches!(
        outcome[1],
        Err(Error::UnsupportedOperator {
            operator: Operator::Gt,
            ..
        })
    ));
    assert_eq!(outcome[2], Ok(Value::from("cat")));
    assert_eq!(outcome[3], Ok(Value::from("dan")));
}

#[test]
fn syntax_errors_are_positioned_in_the_source() {
    let source = "age > 18\nname = ";
    let Err(Error::Syntax { errors }) = Daffodil::new(source) else {
        panic!("expected a syntax error");
    };
    let first = &errors[0];
    // Points past the first line, at the missing value
    assert!(first.span.start >= "age > 18\nname".len());
    assert!(first.span.end <= source.len());
    assert!(!first.message.is_empty());
}
