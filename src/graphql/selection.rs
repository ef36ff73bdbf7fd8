//! Field-selection analysis: which output fields a request actually asks for

use std::collections::{HashMap, HashSet};

use super::ast::{Directive, Document, Field, FragmentDefinition, Selection, Variables};
use super::parser::MAX_NESTING;
use crate::{KazeError, Result};

/// Dotted paths of every field selected below a root field.
///
/// Built once per request and read-only afterwards. `powerPlant { elevation }`
/// yields `elevation`; `listPowerPlants { powerPlants { elevation } }` yields
/// `powerPlants` and `powerPlants.elevation`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedFields(HashSet<String>);

impl RequestedFields {
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Add every path of `other`
    pub fn merge(&mut self, other: RequestedFields) {
        self.0.extend(other.0);
    }
}

impl<S: Into<String>> FromIterator<S> for RequestedFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Evaluate `@skip(if:)` and `@include(if:)`.
///
/// A condition that is missing or not a boolean has no effect.
#[must_use]
pub fn should_include(directives: &[Directive], variables: &Variables) -> bool {
    for directive in directives {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .and_then(|(_, value)| value.resolve(variables))
            .and_then(|value| value.as_bool());

        match (directive.name.as_str(), condition) {
            ("skip", Some(true)) | ("include", Some(false)) => return false,
            _ => {}
        }
    }
    true
}

/// Fragments and variable bindings a selection set is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub fragments: &'a HashMap<String, FragmentDefinition>,
    pub variables: &'a Variables,
}

impl<'a> SelectionContext<'a> {
    #[must_use]
    pub fn new(
        fragments: &'a HashMap<String, FragmentDefinition>,
        variables: &'a Variables,
    ) -> Self {
        Self {
            fragments,
            variables,
        }
    }

    /// Flatten a selection set into the fields it selects, in document order.
    ///
    /// Fragments are expanded and excluded fields dropped. Type conditions are
    /// not checked: every object type in the schema is concrete.
    #[must_use]
    pub fn collect_fields(&self, selection_set: &'a [Selection]) -> Vec<&'a Field> {
        let mut fields = Vec::new();
        let mut visiting = Vec::new();
        self.collect_into(selection_set, &mut visiting, &mut fields);
        fields
    }

    fn collect_into(
        &self,
        selection_set: &'a [Selection],
        visiting: &mut Vec<&'a str>,
        fields: &mut Vec<&'a Field>,
    ) {
        for selection in selection_set {
            match selection {
                Selection::Field(field) => {
                    if should_include(&field.directives, self.variables) {
                        fields.push(field);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if should_include(&fragment.directives, self.variables) {
                        self.collect_into(&fragment.selection_set, visiting, fields);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !should_include(&spread.directives, self.variables)
                        || visiting.contains(&spread.name.as_str())
                    {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(&spread.name) else {
                        continue;
                    };
                    if !should_include(&fragment.directives, self.variables) {
                        continue;
                    }
                    visiting.push(&fragment.name);
                    self.collect_into(&fragment.selection_set, visiting, fields);
                    visiting.pop();
                }
            }
        }
    }

    /// Collect the fields selected under any of `fields`, merging their selection sets
    #[must_use]
    pub fn collect_subfields(&self, fields: &[&'a Field]) -> Vec<&'a Field> {
        fields
            .iter()
            .flat_map(|field| self.collect_fields(&field.selection_set))
            .collect()
    }

    /// Depth-first walk producing the dotted path of every selected field.
    ///
    /// Paths use field names, never aliases.
    #[must_use]
    pub fn requested_fields(&self, selection_set: &'a [Selection]) -> RequestedFields {
        let mut paths = HashSet::new();
        self.walk(selection_set, "", &mut paths);
        RequestedFields(paths)
    }

    fn walk(&self, selection_set: &'a [Selection], prefix: &str, paths: &mut HashSet<String>) {
        for field in self.collect_fields(selection_set) {
            let path = if prefix.is_empty() {
                field.name.clone()
            } else {
                format!("{prefix}.{}", field.name)
            };
            self.walk(&field.selection_set, &path, paths);
            paths.insert(path);
        }
    }
}

/// Group fields by response key, keeping the order of first appearance
#[must_use]
pub fn group_by_response_key<'a>(fields: Vec<&'a Field>) -> Vec<(&'a str, Vec<&'a Field>)> {
    let mut groups: Vec<(&'a str, Vec<&'a Field>)> = Vec::new();
    for field in fields {
        let key = field.response_key();
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, group)) => group.push(field),
            None => groups.push((key, vec![field])),
        }
    }
    groups
}

/// Reject spreads of unknown fragments and fragment cycles
pub fn validate_fragments(document: &Document) -> Result<()> {
    fn check<'a>(
        selection_set: &'a [Selection],
        document: &'a Document,
        visiting: &mut Vec<&'a str>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_NESTING && !selection_set.is_empty() {
            return Err(KazeError::query("Query is nested too deeply"));
        }
        for selection in selection_set {
            match selection {
                Selection::Field(field) => check(&field.selection_set, document, visiting, depth + 1)?,
                Selection::InlineFragment(fragment) => {
                    check(&fragment.selection_set, document, visiting, depth + 1)?;
                }
                Selection::FragmentSpread(spread) => {
                    let fragment = document.fragments.get(&spread.name).ok_or_else(|| {
                        KazeError::query(format!("Unknown fragment \"{}\"", spread.name))
                    })?;
                    if visiting.contains(&fragment.name.as_str()) {
                        return Err(KazeError::query(format!(
                            "Cannot spread fragment \"{}\" within itself",
                            fragment.name
                        )));
                    }
                    visiting.push(&fragment.name);
                    check(&fragment.selection_set, document, visiting, depth + 1)?;
                    visiting.pop();
                }
            }
        }
        Ok(())
    }

    for operation in &document.operations {
        check(&operation.selection_set, document, &mut Vec::new(), 1)?;
    }
    for fragment in document.fragments.values() {
        check(&fragment.selection_set, document, &mut vec![fragment.name.as_str()], 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::parser::parse_document;
    use rstest::rstest;
    use serde_json::json;

    fn root_requested(query: &str, variables: Variables) -> RequestedFields {
        let document = parse_document(query).unwrap();
        let ctx = SelectionContext::new(&document.fragments, &variables);
        let roots = ctx.collect_fields(&document.operations[0].selection_set);
        let mut requested = RequestedFields::default();
        for root in roots {
            requested.merge(ctx.requested_fields(&root.selection_set));
        }
        requested
    }

    fn vars(value: serde_json::Value) -> Variables {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Variables::new(),
        }
    }

    #[test]
    fn test_single_entity_paths_are_bare() {
        let requested = root_requested(
            r#"{ powerPlant(id: "1") { id name elevation } }"#,
            Variables::new(),
        );
        assert!(requested.contains("elevation"));
        assert!(requested.contains("name"));
        assert!(!requested.contains("weatherForecasts"));
        assert_eq!(requested.len(), 3);
    }

    #[test]
    fn test_list_paths_are_prefixed_at_any_depth() {
        let requested = root_requested(
            "{ listPowerPlants { totalCount powerPlants { elevation weatherForecasts { time precipitation } } } }",
            Variables::new(),
        );
        assert!(requested.contains("powerPlants"));
        assert!(requested.contains("powerPlants.elevation"));
        assert!(requested.contains("powerPlants.weatherForecasts"));
        assert!(requested.contains("powerPlants.weatherForecasts.precipitation"));
        assert!(!requested.contains("elevation"));
        assert!(!requested.contains("weatherForecasts"));
    }

    #[test]
    fn test_paths_use_names_not_aliases() {
        let requested = root_requested(
            "{ powerPlant(id: 1) { height: elevation hourly: weatherForecasts { t: time } } }",
            Variables::new(),
        );
        assert!(requested.contains("elevation"));
        assert!(requested.contains("weatherForecasts.time"));
        assert!(!requested.contains("height"));
    }

    #[test]
    fn test_fragments_are_expanded() {
        let requested = root_requested(
            r#"
            { listPowerPlants { powerPlants { ...Geo ... { weatherForecasts { time } } } } }
            fragment Geo on PowerPlant { latitude ...Height }
            fragment Height on PowerPlant { elevation }
            "#,
            Variables::new(),
        );
        assert!(requested.contains("powerPlants.latitude"));
        assert!(requested.contains("powerPlants.elevation"));
        assert!(requested.contains("powerPlants.weatherForecasts.time"));
    }

    #[rstest]
    #[case("elevation @skip(if: true)", json!({}), false)]
    #[case("elevation @skip(if: false)", json!({}), true)]
    #[case("elevation @include(if: false)", json!({}), false)]
    #[case("elevation @include(if: $on)", json!({"on": true}), true)]
    #[case("elevation @include(if: $on)", json!({"on": false}), false)]
    #[case("elevation @skip(if: $on)", json!({}), true)]
    #[case("elevation @skip(if: $on)", json!({"on": "yes"}), true)]
    #[case("... @skip(if: true) { elevation }", json!({}), false)]
    #[case("elevation @include(if: true) @skip(if: true)", json!({}), false)]
    fn test_directives(
        #[case] selection: &str,
        #[case] variables: serde_json::Value,
        #[case] expected: bool,
    ) {
        let query = format!("{{ powerPlant(id: 1) {{ id {selection} }} }}");
        let requested = root_requested(&query, vars(variables));
        assert_eq!(requested.contains("elevation"), expected);
        assert!(requested.contains("id"));
    }

    #[test]
    fn test_cyclic_fragments_do_not_loop() {
        let document =
            parse_document("{ a { ...A } } fragment A on T { b ...B } fragment B on T { c ...A }")
                .unwrap();
        let variables = Variables::new();
        let ctx = SelectionContext::new(&document.fragments, &variables);
        let root = ctx.collect_fields(&document.operations[0].selection_set);
        let names: Vec<&str> = ctx
            .collect_subfields(&root)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "c"]);

        let err = validate_fragments(&document).unwrap_err();
        assert!(err.to_string().contains("within itself"));
    }

    #[test]
    fn test_long_fragment_chains_are_rejected() {
        let mut query = String::from("{ a { ...F0 } }");
        for i in 0..200 {
            query.push_str(&format!(" fragment F{i} on T {{ b{i} ...F{} }}", i + 1));
        }
        query.push_str(" fragment F200 on T { end }");
        let document = parse_document(&query).unwrap();

        let err = validate_fragments(&document).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_short_fragment_chains_are_accepted() {
        let document = parse_document(
            "{ a { ...F0 } } fragment F0 on T { b ...F1 } fragment F1 on T { c { ...F2 } } fragment F2 on T { d }",
        )
        .unwrap();
        assert!(validate_fragments(&document).is_ok());

        let mut deepest = "{ a ".repeat(MAX_NESTING - 1);
        deepest.push_str("{ b }");
        deepest.push_str(&"}".repeat(MAX_NESTING - 1));
        assert!(validate_fragments(&parse_document(&deepest).unwrap()).is_ok());
    }

    #[test]
    fn test_unknown_fragment_is_rejected() {
        let document = parse_document("{ a { ...Missing } }").unwrap();
        let err = validate_fragments(&document).unwrap_err();
        assert!(err.to_string().contains("Unknown fragment"));
    }

    #[test]
    fn test_group_by_response_key_merges_repeated_fields() {
        let document = parse_document("{ a { x } b: a { y } a { z } }").unwrap();
        let variables = Variables::new();
        let ctx = SelectionContext::new(&document.fragments, &variables);
        let groups = group_by_response_key(ctx.collect_fields(&document.operations[0].selection_set));

        let keys: Vec<&str> = groups.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(groups[0].1.len(), 2);
    }
}
