//! GraphQL boundary: a `nom` parser for executable documents, the field-selection
//! analyzer and an executor for the power plant schema
//!
//! ```graphql
//! type Query {
//!   powerPlant(id: ID!): PowerPlant
//!   listPowerPlants(page: Int, pageSize: Int): PowerPlantList
//! }
//! type Mutation {
//!   createPowerPlant(input: NewPowerPlantInput!): PowerPlant
//!   updatePowerPlant(id: ID!, input: UpdatePowerPlantInput!): PowerPlant
//! }
//! ```

pub mod ast;
pub mod executor;
pub mod parser;
pub mod schema;
pub mod selection;

pub use ast::{Document, Variables};
pub use executor::{Executor, GraphQlError, GraphQlRequest, GraphQlResponse};
pub use parser::parse_document;
pub use selection::{RequestedFields, SelectionContext};
