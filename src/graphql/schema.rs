//! Object types served over GraphQL, selection validation and response shaping

use serde_json::{Map, Value as Json};

use super::ast::Field;
use super::selection::{SelectionContext, group_by_response_key};
use crate::{KazeError, Result};

/// Name of the list field on `PowerPlantList`; list-scoped paths start with it
pub const POWER_PLANTS_FIELD: &str = "powerPlants";

const TYPENAME: &str = "__typename";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Query,
    Mutation,
    PowerPlant,
    WeatherForecast,
    PowerPlantList,
}

/// What a field resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar,
    Object(ObjectType),
}

impl ObjectType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ObjectType::Query => "Query",
            ObjectType::Mutation => "Mutation",
            ObjectType::PowerPlant => "PowerPlant",
            ObjectType::WeatherForecast => "WeatherForecast",
            ObjectType::PowerPlantList => "PowerPlantList",
        }
    }

    /// Type of `field` on this object, `None` when the object has no such field
    #[must_use]
    pub fn field_type(self, field: &str) -> Option<FieldType> {
        use FieldType::{Object, Scalar};

        if field == TYPENAME {
            return Some(Scalar);
        }
        match (self, field) {
            (ObjectType::Query, "powerPlant") => Some(Object(ObjectType::PowerPlant)),
            (ObjectType::Query, "listPowerPlants") => Some(Object(ObjectType::PowerPlantList)),
            (ObjectType::Mutation, "createPowerPlant" | "updatePowerPlant") => {
                Some(Object(ObjectType::PowerPlant))
            }
            (
                ObjectType::PowerPlant,
                "id" | "name" | "latitude" | "longitude" | "elevation" | "hasPrecipitationToday",
            ) => Some(Scalar),
            (ObjectType::PowerPlant, "weatherForecasts") => {
                Some(Object(ObjectType::WeatherForecast))
            }
            (
                ObjectType::WeatherForecast,
                "time" | "temperature" | "precipitation" | "windSpeed" | "windDirection",
            ) => Some(Scalar),
            (ObjectType::PowerPlantList, POWER_PLANTS_FIELD) => {
                Some(Object(ObjectType::PowerPlant))
            }
            (ObjectType::PowerPlantList, "totalCount") => Some(Scalar),
            _ => None,
        }
    }
}

/// Check every selected field exists and that objects, and only objects, have subselections
pub fn validate_selection<'a>(
    object: ObjectType,
    fields: &[&'a Field],
    ctx: &SelectionContext<'a>,
) -> Result<()> {
    for field in fields {
        let field_type = object.field_type(&field.name).ok_or_else(|| {
            KazeError::query(format!(
                "Cannot query field \"{}\" on type \"{}\"",
                field.name,
                object.name()
            ))
        })?;

        match field_type {
            FieldType::Scalar if !field.selection_set.is_empty() => {
                return Err(KazeError::query(format!(
                    "Field \"{}\" must not have a selection since it is a scalar",
                    field.name
                )));
            }
            FieldType::Scalar => {}
            FieldType::Object(child) => {
                if field.selection_set.is_empty() {
                    return Err(KazeError::query(format!(
                        "Field \"{}\" of type \"{}\" must have a selection of subfields",
                        field.name,
                        child.name()
                    )));
                }
                validate_selection(child, &ctx.collect_fields(&field.selection_set), ctx)?;
            }
        }
    }
    Ok(())
}

/// Shape a resolved value to the selection of `fields`.
///
/// Only selected fields are emitted, keyed by alias. Lists are shaped element
/// by element; `null` stays `null`.
#[must_use]
pub fn project<'a>(
    value: &Json,
    object: ObjectType,
    fields: &[&'a Field],
    ctx: &SelectionContext<'a>,
) -> Json {
    match value {
        Json::Array(items) => Json::Array(
            items
                .iter()
                .map(|item| project(item, object, fields, ctx))
                .collect(),
        ),
        Json::Object(source) => {
            let mut shaped = Map::new();
            for (key, group) in group_by_response_key(ctx.collect_subfields(fields)) {
                let name = group[0].name.as_str();
                let projected = if name == TYPENAME {
                    Json::String(object.name().to_string())
                } else {
                    let raw = source.get(name).unwrap_or(&Json::Null);
                    match object.field_type(name) {
                        Some(FieldType::Object(child)) => project(raw, child, &group, ctx),
                        _ => raw.clone(),
                    }
                };
                shaped.insert(key.to_string(), projected);
            }
            Json::Object(shaped)
        }
        other => other.clone(),
    }
}
