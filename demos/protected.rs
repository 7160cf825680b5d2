//! A small JSON API behind the inspector.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example protected
//!
//! Point it at a local policy service instead of the hosted one:
//!   BARRICADE_ENDPOINT=http://127.0.0.1:9000/ cargo run --example protected
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/login \
//!        -H 'content-type: application/json' \
//!        -d '{"username":"alice","password":"hunter2"}'

use barricade::inspect::{Inspector, InspectorOptions};
use barricade::middleware::Trace;
use barricade::{Request, Response, Router, Server};
use http::StatusCode;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut options: InspectorOptions = serde_json::from_value(json!({
        "excludeKeys": {
            "headers": ["authorization", "cookie"],
            "body": ["password"],
        },
        "timeout": 150,
    }))?;
    options.endpoint = std::env::var("BARRICADE_ENDPOINT").ok();

    let app = Router::new()
        .get("/users/{id}", get_user)
        .post("/login", login)
        .layer(Trace)
        .layer(Inspector::from_options(options)?);

    Server::bind("0.0.0.0:3000")?.serve(app).await?;
    Ok(())
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /login: the password never reaches the policy service.
async fn login(req: Request) -> Response {
    match req.json_body() {
        Some(body) if body.get("username").is_some() => Response::builder()
            .status(StatusCode::NO_CONTENT)
            .no_body(),
        _ => Response::status(StatusCode::BAD_REQUEST),
    }
}
