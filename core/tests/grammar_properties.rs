use command_grammar_core::{
    Failure, FieldDescriptor, FieldRegistry, Grammar, GrammarOptions, Template, TemplateToken,
};
use proptest::prelude::*;

/// Required-field kinds with a matching sample generator.
const KINDS: [(&str, &str); 3] = [
    ("word", "[a-z]+"),
    ("count", r"\d+"),
    ("code", "[A-Z][0-9]"),
];

fn registry() -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    for (index, (_, pattern)) in KINDS.iter().enumerate() {
        for slot in 0..4 {
            registry
                .insert(FieldDescriptor::new(&format!("f{index}_{slot}"), pattern).unwrap())
                .unwrap();
        }
    }
    registry
}

fn sample(kind: usize) -> BoxedStrategy<String> {
    match kind {
        0 => "[a-z]{1,8}".boxed(),
        1 => "[0-9]{1,6}".boxed(),
        _ => "[A-Z][0-9]".boxed(),
    }
}

/// A template of one leading literal plus one to four required fields,
/// together with the sample text for each field.
fn template_and_samples() -> impl Strategy<Value = (Vec<TemplateToken>, Vec<(String, String)>)> {
    prop::collection::vec(0..KINDS.len(), 1..=4).prop_flat_map(|kinds| {
        let samples: Vec<BoxedStrategy<String>> = kinds.iter().map(|kind| sample(*kind)).collect();
        (Just(kinds), samples).prop_map(|(kinds, samples)| {
            let mut tokens = vec![TemplateToken::literal("!cmd")];
            let mut fields = Vec::new();
            for (slot, (kind, text)) in kinds.iter().zip(samples).enumerate() {
                let name = format!("f{kind}_{slot}");
                tokens.push(TemplateToken::field(&name));
                fields.push((name, text));
            }
            (tokens, fields)
        })
    })
}

proptest! {
    #[test]
    fn required_fields_round_trip((tokens, fields) in template_and_samples()) {
        let template = Template::from_tokens(tokens).unwrap();
        let grammar = Grammar::compile(&template, &registry(), GrammarOptions::default()).unwrap();
        prop_assert_eq!(grammar.expected_captures(), fields.len());
        prop_assert_eq!(grammar.actual_captures(), fields.len());

        let line = std::iter::once("!cmd".to_string())
            .chain(fields.iter().map(|(_, text)| text.clone()))
            .collect::<Vec<_>>()
            .join(" ");
        let parsed = grammar.parse(&line).unwrap();
        prop_assert!(parsed.is_some(), "{} did not match {}", line, grammar.expression());
        let parsed = parsed.unwrap();

        prop_assert_eq!(parsed.len(), fields.len());
        for (name, text) in &fields {
            prop_assert_eq!(parsed.get(name), Some(text.as_str()));
        }
    }

    #[test]
    fn hidden_captures_always_fail(position in 0usize..3, words in "[a-z]{1,8}") {
        let registry = FieldRegistry::from_descriptors([
            FieldDescriptor::new("left", "[a-z]+").unwrap(),
            FieldDescriptor::new("right", "[a-z]+").unwrap(),
            FieldDescriptor::new("leaky", "(x)(y)?z?").unwrap(),
        ])
        .unwrap();

        let mut names = vec!["left", "right"];
        names.insert(position, "leaky");
        let source = std::iter::once("!cmd".to_string())
            .chain(names.iter().map(|name| format!("{{{{{name}}}}}")))
            .collect::<Vec<_>>()
            .join(" ");
        let template = Template::parse(&source).unwrap();
        let grammar = Grammar::compile(&template, &registry, GrammarOptions::default()).unwrap();

        let line = std::iter::once("!cmd".to_string())
            .chain(names.iter().map(|name| if *name == "leaky" { "xy".to_string() } else { words.clone() }))
            .collect::<Vec<_>>()
            .join(" ");
        let is_mismatch = matches!(
            grammar.parse(&line),
            Err(Failure::MismatchedCaptureCount { expected: 3, actual: 5, .. })
        );
        prop_assert!(is_mismatch);
    }
}

#[test]
fn literal_policy_keeps_legacy_behaviour() {
    let registry =
        FieldRegistry::from_descriptors([FieldDescriptor::new("words", ".+").unwrap()]).unwrap();
    let template = Template::parse("!raid {{boss}} {{words}}").unwrap();

    let strict = Grammar::compile(&template, &registry, GrammarOptions::default());
    assert_eq!(
        strict.unwrap_err(),
        Failure::UnrecognizedField("boss".to_string())
    );

    let lenient = Grammar::compile(
        &template,
        &registry,
        GrammarOptions {
            unknown_fields: command_grammar_core::UnknownFieldPolicy::Literal,
            ..GrammarOptions::default()
        },
    )
    .unwrap();
    let fields = lenient.parse("!raid boss the old mill").unwrap().unwrap();
    assert_eq!(fields.get("words"), Some("the old mill"));
    assert!(lenient.parse("!raid the old mill").unwrap().is_none());
}
