//! Syntax tree of an executable GraphQL document

use std::collections::HashMap;

use serde_json::{Map, Number, Value as Json};

/// Variable bindings sent alongside a query
pub type Variables = Map<String, Json>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    /// Root type name, as reported by `__typename`
    #[must_use]
    pub fn root_type(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub operations: Vec<OperationDefinition>,
    pub fragments: HashMap<String, FragmentDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDefinition {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub var_type: TypeRef,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
}

impl Field {
    /// Key under which this field appears in the response
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Argument value with variables substituted; `None` when the argument is
    /// absent or bound to a variable the request did not supply
    #[must_use]
    pub fn argument(&self, name: &str, variables: &Variables) -> Option<Json> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .and_then(|(_, value)| value.resolve(variables))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    pub name: String,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    pub directives: Vec<Directive>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<(String, Value)>,
}

/// Input value literal
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Convert to JSON, substituting variables.
    ///
    /// Unbound variables resolve to `None`; inside objects they drop the
    /// entry, inside lists they become `null`.
    #[must_use]
    pub fn resolve(&self, variables: &Variables) -> Option<Json> {
        match self {
            Value::Variable(name) => variables.get(name).cloned(),
            Value::Int(i) => Some(Json::from(*i)),
            Value::Float(f) => Some(Number::from_f64(*f).map_or(Json::Null, Json::Number)),
            Value::String(s) | Value::Enum(s) => Some(Json::String(s.clone())),
            Value::Boolean(b) => Some(Json::Bool(*b)),
            Value::Null => Some(Json::Null),
            Value::List(items) => Some(Json::Array(
                items
                    .iter()
                    .map(|item| item.resolve(variables).unwrap_or(Json::Null))
                    .collect(),
            )),
            Value::Object(fields) => Some(Json::Object(
                fields
                    .iter()
                    .filter_map(|(key, value)| value.resolve(variables).map(|v| (key.clone(), v)))
                    .collect(),
            )),
        }
    }
}
