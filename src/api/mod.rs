use rocket::{
    http::Status, response::status::Custom, serde::json::Json, Catcher, Request, Route,
};

use crate::error::ErrorBody;

mod comments;
mod incidents;
mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(incidents::routes());
    routes.extend(votes::routes());
    routes.extend(comments::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Render framework-level failures (unknown routes, bad bodies, failed
/// guards) in the same shape as our own errors.
///
/// A body that parses as JSON but has the wrong shape is a validation
/// failure like any other, so Rocket's 422 becomes a 400.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Custom<Json<ErrorBody>> {
    let (status, message) = match status.code {
        400 | 422 => (Status::BadRequest, "Malformed request body"),
        401 => (status, "Authentication required"),
        _ => (status, status.reason().unwrap_or("Request failed")),
    };
    Custom(status, Json(ErrorBody::new(message)))
}
