//! Executes GraphQL requests against the power plant service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::{debug, error};

use super::ast::{Field, OperationDefinition, OperationKind, Variables};
use super::parser::parse_document;
use super::schema::{ObjectType, project, validate_selection};
use super::selection::{
    RequestedFields, SelectionContext, group_by_response_key, validate_fragments,
};
use crate::enrichment::EnrichmentPlan;
use crate::models::{NewPowerPlant, PowerPlantPatch};
use crate::pagination::PageRequest;
use crate::service::PowerPlantService;
use crate::{KazeError, Result};

/// Body of a `POST /graphql` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Variables>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorExtensions {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    pub extensions: ErrorExtensions,
}

impl GraphQlError {
    fn from_error(err: &KazeError, path: Vec<String>) -> Self {
        Self {
            message: err.user_message(),
            path,
            extensions: ErrorExtensions {
                code: err.code().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// Request-level failure: nothing was executed
    fn rejected(err: &KazeError) -> Self {
        Self {
            data: None,
            errors: vec![GraphQlError::from_error(err, Vec::new())],
        }
    }
}

/// Executor for the power plant schema
#[derive(Clone)]
pub struct Executor {
    service: PowerPlantService,
}

impl Executor {
    pub fn new(service: PowerPlantService) -> Self {
        Self { service }
    }

    /// Execute a request.
    ///
    /// Errors before execution (syntax, validation, variables) produce
    /// `data: null`. A failing root field is reported in `errors` with its
    /// response key as path and resolves to `null`; other root fields still run.
    pub async fn execute(&self, request: GraphQlRequest) -> GraphQlResponse {
        let document = match parse_document(&request.query).and_then(|document| {
            validate_fragments(&document)?;
            Ok(document)
        }) {
            Ok(document) => document,
            Err(err) => {
                debug!("Rejected query: {}", err);
                return GraphQlResponse::rejected(&err);
            }
        };

        let operation = match select_operation(&document.operations, request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(err) => return GraphQlResponse::rejected(&err),
        };

        let variables = match coerce_variables(operation, request.variables.unwrap_or_default()) {
            Ok(variables) => variables,
            Err(err) => return GraphQlResponse::rejected(&err),
        };

        let ctx = SelectionContext::new(&document.fragments, &variables);
        let root_type = match operation.kind {
            OperationKind::Query => ObjectType::Query,
            OperationKind::Mutation => ObjectType::Mutation,
        };
        let root_fields = ctx.collect_fields(&operation.selection_set);
        if let Err(err) = validate_selection(root_type, &root_fields, &ctx) {
            debug!("Rejected query: {}", err);
            return GraphQlResponse::rejected(&err);
        }

        let mut data = Map::new();
        let mut errors = Vec::new();

        // Root fields run one after another, as mutations require
        for (key, group) in group_by_response_key(root_fields) {
            let field = group[0];
            if field.name == "__typename" {
                data.insert(key.to_string(), Json::String(operation.kind.root_type().to_string()));
                continue;
            }

            let mut requested = RequestedFields::default();
            for selected in &group {
                requested.merge(ctx.requested_fields(&selected.selection_set));
            }

            match self.resolve_root(field, &requested, &variables).await {
                Ok((value, object)) => {
                    data.insert(key.to_string(), project(&value, object, &group, &ctx));
                }
                Err(err) => {
                    error!("Failed to resolve {}: {}", field.name, err);
                    errors.push(GraphQlError::from_error(&err, vec![key.to_string()]));
                    data.insert(key.to_string(), Json::Null);
                }
            }
        }

        GraphQlResponse {
            data: Some(Json::Object(data)),
            errors,
        }
    }

    async fn resolve_root(
        &self,
        field: &Field,
        requested: &RequestedFields,
        variables: &Variables,
    ) -> Result<(Json, ObjectType)> {
        match field.name.as_str() {
            "powerPlant" => {
                let id = required_id(field, variables)?;
                let plant = self
                    .service
                    .get(&id, EnrichmentPlan::for_single(requested))
                    .await?;
                Ok((serde_json::to_value(plant)?, ObjectType::PowerPlant))
            }
            "listPowerPlants" => {
                let page = optional_int(field.argument("page", variables), "page")?;
                let page_size = optional_int(field.argument("pageSize", variables), "pageSize")?;
                let result = self
                    .service
                    .list(
                        PageRequest::new(page, page_size),
                        EnrichmentPlan::for_list(requested),
                    )
                    .await?;
                Ok((serde_json::to_value(result)?, ObjectType::PowerPlantList))
            }
            "createPowerPlant" => {
                let input = required_input(field, variables)?;
                let plant = NewPowerPlant::new(
                    required_string(&input, "name")?,
                    required_float(&input, "latitude")?,
                    required_float(&input, "longitude")?,
                );
                let created = self.service.create(plant).await?;
                Ok((serde_json::to_value(created)?, ObjectType::PowerPlant))
            }
            "updatePowerPlant" => {
                let id = required_id(field, variables)?;
                let input = required_input(field, variables)?;
                let patch = PowerPlantPatch {
                    id,
                    name: optional_string(input.get("name"), "name")?,
                    latitude: optional_float(input.get("latitude"), "latitude")?,
                    longitude: optional_float(input.get("longitude"), "longitude")?,
                };
                let updated = self.service.update(patch).await?;
                Ok((serde_json::to_value(updated)?, ObjectType::PowerPlant))
            }
            other => Err(KazeError::query(format!("Unknown root field \"{other}\""))),
        }
    }
}

fn select_operation<'a>(
    operations: &'a [OperationDefinition],
    name: Option<&str>,
) -> Result<&'a OperationDefinition> {
    match name {
        Some(name) => operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| KazeError::query(format!("Unknown operation named \"{name}\""))),
        None => match operations {
            [single] => Ok(single),
            _ => Err(KazeError::query(
                "Must provide operation name if query contains multiple operations",
            )),
        },
    }
}

/// Apply declared defaults and reject missing required variables
fn coerce_variables(operation: &OperationDefinition, provided: Variables) -> Result<Variables> {
    let empty = Variables::new();
    let mut coerced = Variables::new();

    for definition in &operation.variables {
        let value = match provided.get(&definition.name) {
            Some(value) => Some(value.clone()),
            None => definition
                .default_value
                .as_ref()
                .and_then(|default| default.resolve(&empty)),
        };

        match value {
            Some(Json::Null) | None if definition.var_type.is_non_null() => {
                return Err(KazeError::query(format!(
                    "Variable \"${}\" of non-null type must not be null or missing",
                    definition.name
                )));
            }
            Some(value) => {
                coerced.insert(definition.name.clone(), value);
            }
            None => {}
        }
    }

    Ok(coerced)
}

fn bad_argument(name: &str, expected: &str) -> KazeError {
    KazeError::query(format!("Argument \"{name}\" must be {expected}"))
}

fn required_id(field: &Field, variables: &Variables) -> Result<String> {
    match field.argument("id", variables) {
        Some(Json::String(id)) => Ok(id),
        Some(Json::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Some(Json::Null) | None => Err(KazeError::query("Argument \"id\" of type \"ID!\" is required")),
        Some(_) => Err(bad_argument("id", "an ID")),
    }
}

fn required_input(field: &Field, variables: &Variables) -> Result<Map<String, Json>> {
    match field.argument("input", variables) {
        Some(Json::Object(input)) => Ok(input),
        Some(Json::Null) | None => Err(KazeError::query("Argument \"input\" is required")),
        Some(_) => Err(bad_argument("input", "an input object")),
    }
}

/// GraphQL `Int`: 32-bit; `null` and absence both mean "not supplied"
fn optional_int(value: Option<Json>, name: &str) -> Result<Option<i64>> {
    match value {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Number(n)) => n
            .as_i64()
            .filter(|v| i32::try_from(*v).is_ok())
            .map(Some)
            .ok_or_else(|| bad_argument(name, "a 32-bit integer")),
        Some(_) => Err(bad_argument(name, "an integer")),
    }
}

fn optional_float(value: Option<&Json>, name: &str) -> Result<Option<f64>> {
    match value {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Number(n)) => n.as_f64().map(Some).ok_or_else(|| bad_argument(name, "a number")),
        Some(_) => Err(bad_argument(name, "a number")),
    }
}

fn optional_string(value: Option<&Json>, name: &str) -> Result<Option<String>> {
    match value {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(bad_argument(name, "a string")),
    }
}

fn required_float(input: &Map<String, Json>, name: &str) -> Result<f64> {
    optional_float(input.get(name), name)?
        .ok_or_else(|| KazeError::query(format!("Input field \"{name}\" of type \"Float!\" is required")))
}

fn required_string(input: &Map<String, Json>, name: &str) -> Result<String> {
    optional_string(input.get(name), name)?
        .ok_or_else(|| KazeError::query(format!("Input field \"{name}\" of type \"String!\" is required")))
}
