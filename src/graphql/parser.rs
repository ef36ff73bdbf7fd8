//! Nom parser for executable GraphQL documents
//!
//! Covers operations, variable definitions, fields with aliases and arguments,
//! fragments (named and inline) and directives. Commas and `#` comments are
//! insignificant, as in the GraphQL grammar. Block strings and subscriptions are
//! not supported.

use std::collections::hash_map::Entry;
use std::str::Chars;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while_m_n},
    character::complete::{char, digit1, multispace1, not_line_ending, one_of, satisfy},
    combinator::{all_consuming, map, map_opt, map_res, not, opt, recognize, value, verify},
    error::Error,
    multi::{many0, many0_count, many1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
};

use super::ast::{
    Directive, Document, Field, FragmentDefinition, FragmentSpread, InlineFragment,
    OperationDefinition, OperationKind, Selection, TypeRef, Value, VariableDefinition,
};
use crate::{KazeError, Result};

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Deepest bracket nesting (`{`, `[`, `(`) a document may use
pub const MAX_NESTING: usize = 32;

/// Parse a query document
pub fn parse_document(source: &str) -> Result<Document> {
    check_nesting(source)?;
    let parsed = all_consuming(terminated(many1(definition), ignored))(source);

    let definitions = match parsed {
        Ok((_, definitions)) => definitions,
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            return Err(KazeError::query(syntax_error(source, e.input)));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(KazeError::query("Syntax error: unexpected end of document"));
        }
    };

    let mut document = Document::default();
    for definition in definitions {
        match definition {
            Definition::Operation(operation) => document.operations.push(operation),
            Definition::Fragment(fragment) => match document.fragments.entry(fragment.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(KazeError::query(format!(
                        "There can be only one fragment named \"{}\"",
                        fragment.name
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(fragment);
                }
            },
        }
    }

    Ok(document)
}

/// Reject documents nested deeper than [`MAX_NESTING`] before the recursive
/// descent sees them. Brackets inside strings and comments do not count.
fn check_nesting(source: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => skip_string(&mut chars),
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                }
            }
            '{' | '[' | '(' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(KazeError::query("Query is nested too deeply"));
                }
            }
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn skip_string(chars: &mut Chars<'_>) {
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' | '\n' => break,
            _ => {}
        }
    }
}

fn syntax_error(source: &str, remaining: &str) -> String {
    let offset = source.len() - remaining.len();
    let consumed = &source[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    let near: String = remaining.trim_start().chars().take(20).collect();

    if near.is_empty() {
        format!("Syntax error at line {line}, column {column}: unexpected end of document")
    } else {
        format!("Syntax error at line {line}, column {column} near `{near}`")
    }
}

enum Definition {
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

fn definition(input: &str) -> IResult<&str, Definition> {
    alt((
        map(fragment_definition, Definition::Fragment),
        map(operation_definition, Definition::Operation),
    ))(input)
}

// =============================================================================
// LEXICAL HELPERS
// =============================================================================

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), not_line_ending))(input)
}

/// Whitespace, commas, comments and a byte order mark
fn ignored(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((multispace1, tag(","), comment, tag("\u{feff}")))),
    )(input)
}

fn token<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: Parser<&'a str, O, Error<&'a str>>,
{
    preceded(ignored, parser)
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_name_continue),
    ))(input)
}

fn owned_name(input: &str) -> IResult<&str, String> {
    map(token(name), str::to_string)(input)
}

/// A reserved word that is not the prefix of a longer name
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    token(terminated(tag(word), not(satisfy(is_name_continue))))
}

// =============================================================================
// VALUES
// =============================================================================

fn value_literal(input: &str) -> IResult<&str, Value> {
    preceded(
        ignored,
        alt((
            map(preceded(char('$'), name), |n| Value::Variable(n.to_string())),
            number,
            map(string_literal, Value::String),
            list_value,
            object_value,
            map(name, |n| match n {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                "null" => Value::Null,
                other => Value::Enum(other.to_string()),
            }),
        )),
    )(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| {
            if text.contains(['.', 'e', 'E']) {
                text.parse::<f64>().map(Value::Float).map_err(|e| e.to_string())
            } else {
                text.parse::<i64>().map(Value::Int).map_err(|e| e.to_string())
            }
        },
    )(input)
}

fn escape_sequence(input: &str) -> IResult<&str, char> {
    alt((
        value('"', char('"')),
        value('\\', char('\\')),
        value('/', char('/')),
        value('\u{8}', char('b')),
        value('\u{c}', char('f')),
        value('\n', char('n')),
        value('\r', char('r')),
        value('\t', char('t')),
        map_opt(
            preceded(
                char('u'),
                take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
            ),
            |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
        ),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(is_not("\"\\\n"), '\\', escape_sequence)),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn list_value(input: &str) -> IResult<&str, Value> {
    map(
        delimited(char('['), many0(value_literal), token(char(']'))),
        Value::List,
    )(input)
}

fn object_value(input: &str) -> IResult<&str, Value> {
    map(
        delimited(
            char('{'),
            many0(pair(owned_name, preceded(token(char(':')), value_literal))),
            token(char('}')),
        ),
        Value::Object,
    )(input)
}

// =============================================================================
// SELECTIONS
// =============================================================================

fn arguments(input: &str) -> IResult<&str, Vec<(String, Value)>> {
    delimited(
        token(char('(')),
        many0(pair(owned_name, preceded(token(char(':')), value_literal))),
        token(char(')')),
    )(input)
}

fn directives(input: &str) -> IResult<&str, Vec<Directive>> {
    many0(map(
        preceded(token(char('@')), pair(owned_name, opt(arguments))),
        |(name, arguments)| Directive {
            name,
            arguments: arguments.unwrap_or_default(),
        },
    ))(input)
}

fn selection_set(input: &str) -> IResult<&str, Vec<Selection>> {
    delimited(token(char('{')), many1(selection), token(char('}')))(input)
}

fn selection(input: &str) -> IResult<&str, Selection> {
    alt((
        preceded(token(tag("...")), alt((fragment_spread, inline_fragment))),
        map(field, Selection::Field),
    ))(input)
}

fn fragment_name(input: &str) -> IResult<&str, String> {
    verify(owned_name, |name: &String| name != "on")(input)
}

fn fragment_spread(input: &str) -> IResult<&str, Selection> {
    map(pair(fragment_name, directives), |(name, directives)| {
        Selection::FragmentSpread(FragmentSpread { name, directives })
    })(input)
}

fn inline_fragment(input: &str) -> IResult<&str, Selection> {
    map(
        tuple((
            opt(preceded(keyword("on"), owned_name)),
            directives,
            selection_set,
        )),
        |(type_condition, directives, selection_set)| {
            Selection::InlineFragment(InlineFragment {
                type_condition,
                directives,
                selection_set,
            })
        },
    )(input)
}

fn field(input: &str) -> IResult<&str, Field> {
    let (input, (alias, name)) = alt((
        map(
            separated_pair(owned_name, token(char(':')), owned_name),
            |(alias, name)| (Some(alias), name),
        ),
        map(owned_name, |name| (None, name)),
    ))(input)?;
    let (input, arguments) = opt(arguments)(input)?;
    let (input, directives) = directives(input)?;
    let (input, selection_set) = opt(selection_set)(input)?;

    Ok((
        input,
        Field {
            alias,
            name,
            arguments: arguments.unwrap_or_default(),
            directives,
            selection_set: selection_set.unwrap_or_default(),
        },
    ))
}

// =============================================================================
// DEFINITIONS
// =============================================================================

fn type_ref(input: &str) -> IResult<&str, TypeRef> {
    let (input, base) = alt((
        map(
            delimited(token(char('[')), type_ref, token(char(']'))),
            |inner| TypeRef::List(Box::new(inner)),
        ),
        map(owned_name, TypeRef::Named),
    ))(input)?;
    let (input, bang) = opt(token(char('!')))(input)?;

    let type_ref = if bang.is_some() {
        TypeRef::NonNull(Box::new(base))
    } else {
        base
    };
    Ok((input, type_ref))
}

fn variable_definition(input: &str) -> IResult<&str, VariableDefinition> {
    map(
        tuple((
            preceded(token(char('$')), map(name, str::to_string)),
            preceded(token(char(':')), type_ref),
            opt(preceded(token(char('=')), value_literal)),
            directives,
        )),
        |(name, var_type, default_value, _)| VariableDefinition {
            name,
            var_type,
            default_value,
        },
    )(input)
}

fn operation_kind(input: &str) -> IResult<&str, OperationKind> {
    alt((
        value(OperationKind::Query, keyword("query")),
        value(OperationKind::Mutation, keyword("mutation")),
    ))(input)
}

fn operation_definition(input: &str) -> IResult<&str, OperationDefinition> {
    alt((
        map(selection_set, |selection_set| OperationDefinition {
            kind: OperationKind::Query,
            name: None,
            variables: Vec::new(),
            selection_set,
        }),
        map(
            tuple((
                operation_kind,
                opt(owned_name),
                opt(delimited(
                    token(char('(')),
                    many1(variable_definition),
                    token(char(')')),
                )),
                directives,
                selection_set,
            )),
            |(kind, name, variables, _, selection_set)| OperationDefinition {
                kind,
                name,
                variables: variables.unwrap_or_default(),
                selection_set,
            },
        ),
    ))(input)
}

fn fragment_definition(input: &str) -> IResult<&str, FragmentDefinition> {
    map(
        tuple((
            keyword("fragment"),
            fragment_name,
            keyword("on"),
            owned_name,
            directives,
            selection_set,
        )),
        |(_, name, _, type_condition, directives, selection_set)| FragmentDefinition {
            name,
            type_condition,
            directives,
            selection_set,
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_field(selection: &Selection) -> &Field {
        match selection {
            Selection::Field(field) => field,
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_shorthand_query() {
        let document = parse_document("{ powerPlant(id: \"1\") { id name } }").unwrap();
        assert_eq!(document.operations.len(), 1);

        let operation = &document.operations[0];
        assert_eq!(operation.kind, OperationKind::Query);
        assert!(operation.name.is_none());

        let root = single_field(&operation.selection_set[0]);
        assert_eq!(root.name, "powerPlant");
        assert_eq!(root.arguments, vec![("id".to_string(), Value::String("1".into()))]);
        assert_eq!(root.selection_set.len(), 2);
    }

    #[test]
    fn test_parse_named_operation_with_variables() {
        let source = r#"
            # list query used by the dashboard
            query ListPowerPlants($page: Int = 1, $pageSize: Int, $ids: [ID!]!) {
                listPowerPlants(page: $page, pageSize: $pageSize) {
                    powerPlants { id elevation }
                    totalCount
                }
            }
        "#;
        let document = parse_document(source).unwrap();
        let operation = &document.operations[0];

        assert_eq!(operation.name.as_deref(), Some("ListPowerPlants"));
        assert_eq!(operation.variables.len(), 3);
        assert_eq!(operation.variables[0].default_value, Some(Value::Int(1)));
        assert_eq!(
            operation.variables[2].var_type,
            TypeRef::NonNull(Box::new(TypeRef::List(Box::new(TypeRef::NonNull(
                Box::new(TypeRef::Named("ID".into()))
            )))))
        );

        let root = single_field(&operation.selection_set[0]);
        assert_eq!(
            root.arguments[1],
            ("pageSize".to_string(), Value::Variable("pageSize".into()))
        );
    }

    #[test]
    fn test_parse_mutation_with_object_argument() {
        let source = r#"mutation {
            createPowerPlant(input: {name: "Berlin \"Wind\" Farm", latitude: 52.636083, longitude: -1e2}) { id }
        }"#;
        let document = parse_document(source).unwrap();
        let operation = &document.operations[0];
        assert_eq!(operation.kind, OperationKind::Mutation);

        let root = single_field(&operation.selection_set[0]);
        assert_eq!(
            root.arguments[0].1,
            Value::Object(vec![
                ("name".into(), Value::String("Berlin \"Wind\" Farm".into())),
                ("latitude".into(), Value::Float(52.636083)),
                ("longitude".into(), Value::Float(-100.0)),
            ])
        );
    }

    #[test]
    fn test_parse_aliases_directives_and_fragments() {
        let source = r#"
            query($withWeather: Boolean!) {
                plant: powerPlant(id: 1) {
                    ...Basics
                    ... on PowerPlant @include(if: $withWeather) { weatherForecasts { time } }
                    ... { elevation @skip(if: false) }
                }
            }
            fragment Basics on PowerPlant { id name }
        "#;
        let document = parse_document(source).unwrap();
        assert!(document.fragments.contains_key("Basics"));

        let root = single_field(&document.operations[0].selection_set[0]);
        assert_eq!(root.alias.as_deref(), Some("plant"));
        assert_eq!(root.name, "powerPlant");
        assert_eq!(root.arguments[0].1, Value::Int(1));

        assert!(matches!(&root.selection_set[0], Selection::FragmentSpread(s) if s.name == "Basics"));
        match &root.selection_set[1] {
            Selection::InlineFragment(fragment) => {
                assert_eq!(fragment.type_condition.as_deref(), Some("PowerPlant"));
                assert_eq!(fragment.directives[0].name, "include");
            }
            other => panic!("expected inline fragment, got {other:?}"),
        }
        match &root.selection_set[2] {
            Selection::InlineFragment(fragment) => {
                assert!(fragment.type_condition.is_none());
                let elevation = single_field(&fragment.selection_set[0]);
                assert_eq!(elevation.directives[0].arguments[0].1, Value::Boolean(false));
            }
            other => panic!("expected inline fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_string_and_unicode_escape() {
        let document = parse_document(r#"{ a(x: "", y: "café") }"#).unwrap();
        let root = single_field(&document.operations[0].selection_set[0]);
        assert_eq!(root.arguments[0].1, Value::String(String::new()));
        assert_eq!(root.arguments[1].1, Value::String("café".into()));
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = parse_document("query {\n  powerPlant(id: ) { id }\n}").unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, KazeError::Query { .. }));
        assert!(message.contains("line 2"), "{message}");
    }

    #[test]
    fn test_rejects_empty_and_unterminated_documents() {
        assert!(parse_document("").is_err());
        assert!(parse_document("   # only a comment").is_err());
        assert!(parse_document("{ powerPlant(id: 1) { id }").is_err());
        assert!(parse_document("subscription { ticks }").is_err());
    }

    fn nested(depth: usize) -> String {
        let mut query = "{ a ".repeat(depth - 1);
        query.push_str("{ b }");
        query.push_str(&"}".repeat(depth - 1));
        query
    }

    #[test]
    fn test_nesting_up_to_limit_is_accepted() {
        assert!(parse_document(&nested(MAX_NESTING)).is_ok());
    }

    #[test]
    fn test_deep_nesting_is_rejected_without_recursing() {
        let deep = format!("{{ powerPlant(id: 1) {}{}", "{ a ".repeat(50_000), "}".repeat(50_001));
        let err = parse_document(&deep).unwrap_err();
        assert!(matches!(err, KazeError::Query { .. }));
        assert!(err.to_string().contains("nested too deeply"));

        assert!(parse_document(&nested(MAX_NESTING + 1)).is_err());

        let deep_list = format!("{{ a(x: {}1{}) }}", "[".repeat(10_000), "]".repeat(10_000));
        assert!(parse_document(&deep_list).unwrap_err().to_string().contains("nested too deeply"));

        let deep_type = format!("query($v: {}Int{}) {{ a }}", "[".repeat(10_000), "]".repeat(10_000));
        assert!(parse_document(&deep_type).is_err());
    }

    #[test]
    fn test_brackets_in_strings_and_comments_do_not_count() {
        let brackets = "{".repeat(MAX_NESTING * 2);
        let query = format!("# {brackets}\n{{ a(x: \"{brackets}\\\"\") }}");
        assert!(parse_document(&query).is_ok(), "{query}");
    }

    #[test]
    fn test_rejects_duplicate_fragments() {
        let source = "{ a { ...F } } fragment F on A { b } fragment F on A { c }";
        let err = parse_document(source).unwrap_err();
        assert!(err.to_string().contains("only one fragment"));
    }
}
