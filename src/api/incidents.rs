use chrono::Utc;
use rocket::{http::Status, response::status::Created, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AuthToken,
        incident::{IncidentSpec, IncidentUpdate, IncidentView},
    },
    common::incident::IncidentKind,
    db::incident::Incident,
    mongodb::Id,
};
use crate::store::Incidents;

pub fn routes() -> Vec<Route> {
    routes![
        list_incidents,
        user_incidents,
        get_incident,
        create_incident,
        update_incident,
        delete_incident,
    ]
}

/// Decorate a batch of incidents for the (possibly anonymous) viewer.
fn annotate_all(incidents: &[Incident], token: Option<AuthToken>) -> Vec<IncidentView> {
    let viewer = token.map(|token| token.id);
    let now = Utc::now();
    incidents
        .iter()
        .map(|incident| IncidentView::annotate(incident, viewer, now))
        .collect()
}

#[get("/incidents?<kind>")]
async fn list_incidents(
    kind: Option<IncidentKind>,
    token: Option<AuthToken>,
    incidents: Incidents,
) -> Result<Json<Vec<IncidentView>>> {
    let found = incidents.find_incidents(kind).await?;
    Ok(Json(annotate_all(&found, token)))
}

// Ranked below `/incidents/<incident_id>/comments`, which also has three
// segments; a non-ID "user" segment forwards here.
#[get("/incidents/user/<user_id>", rank = 2)]
async fn user_incidents(
    user_id: Id,
    token: Option<AuthToken>,
    incidents: Incidents,
) -> Result<Json<Vec<IncidentView>>> {
    let found = incidents.find_incidents_by_user(user_id).await?;
    Ok(Json(annotate_all(&found, token)))
}

#[get("/incidents/<incident_id>")]
async fn get_incident(
    incident_id: Id,
    token: Option<AuthToken>,
    incidents: Incidents,
) -> Result<Json<IncidentView>> {
    let incident = incidents.get(incident_id).await?;
    Ok(Json(IncidentView::annotate(
        &incident,
        token.map(|token| token.id),
        Utc::now(),
    )))
}

#[post("/incidents", data = "<spec>")]
async fn create_incident(
    token: AuthToken,
    spec: Json<IncidentSpec>,
    incidents: Incidents,
) -> Result<Created<Json<IncidentView>>> {
    let now = Utc::now();
    let incident = spec.0.into_incident(token.id, now)?;
    let incident = incidents.insert_incident(incident).await?;
    info!(
        "User {} posted {} {}",
        token.id,
        incident.kind(),
        incident.id
    );

    let view = IncidentView::annotate(&incident, Some(token.id), now);
    Ok(Created::new(uri!(get_incident(incident.id)).to_string()).body(Json(view)))
}

#[put("/incidents/<incident_id>", data = "<update>")]
async fn update_incident(
    token: AuthToken,
    incident_id: Id,
    update: Json<IncidentUpdate>,
    incidents: Incidents,
) -> Result<Json<IncidentView>> {
    let now = Utc::now();
    let (incident, _) = incidents
        .modify(incident_id, |incident| {
            token.ensure_owner_or_admin(incident.user)?;
            update.apply(incident, now)
        })
        .await?;
    Ok(Json(IncidentView::annotate(&incident, Some(token.id), now)))
}

#[delete("/incidents/<incident_id>")]
async fn delete_incident(
    token: AuthToken,
    incident_id: Id,
    incidents: Incidents,
) -> Result<Status> {
    let incident = incidents.get(incident_id).await?;
    token.ensure_owner_or_admin(incident.user)?;

    if !incidents.delete_incident(incident_id).await? {
        return Err(Error::not_found(format!("Incident {incident_id}")));
    }
    info!("User {} deleted incident {incident_id}", token.id);
    Ok(Status::NoContent)
}
