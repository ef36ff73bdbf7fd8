use axum::{
    Router,
    extract::State,
    response::{Html, Json},
    routing::{get, post},
};
use serde::Serialize;

use crate::graphql::{Executor, GraphQlRequest, GraphQlResponse};

/// GraphiQL page that talks to `/graphql`
const PLAYGROUND: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>kaze GraphQL playground</title>
    <link rel="stylesheet" href="https://unpkg.com/graphiql@3/graphiql.min.css" />
  </head>
  <body style="margin: 0">
    <div id="graphiql" style="height: 100vh"></div>
    <script crossorigin src="https://unpkg.com/react@18/umd/react.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/graphiql@3/graphiql.min.js"></script>
    <script>
      const fetcher = GraphiQL.createFetcher({ url: "/graphql" });
      ReactDOM.createRoot(document.getElementById("graphiql")).render(
        React.createElement(GraphiQL, { fetcher })
      );
    </script>
  </body>
</html>
"#;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn router(executor: Executor) -> Router {
    Router::new()
        .route("/", get(playground))
        .route("/graphql", post(graphql))
        .route("/health", get(health))
        .with_state(executor)
}

async fn graphql(
    State(executor): State<Executor>,
    Json(request): Json<GraphQlRequest>,
) -> Json<GraphQlResponse> {
    Json(executor.execute(request).await)
}

async fn playground() -> Html<&'static str> {
    Html(PLAYGROUND)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: crate::VERSION,
    })
}
