use chrono::Utc;
use rocket::{response::status::Created, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AuthToken,
        incident::{CommentDesc, CommentSpec, ReplyDesc},
    },
    db::comment::{Comment, Reply},
    mongodb::Id,
};
use crate::store::Incidents;

pub fn routes() -> Vec<Route> {
    routes![comments, add_comment, add_reply]
}

#[get("/incidents/<incident_id>/comments")]
async fn comments(incident_id: Id, incidents: Incidents) -> Result<Json<Vec<CommentDesc>>> {
    let incident = incidents.get(incident_id).await?;
    Ok(Json(incident.comments.iter().map(Into::into).collect()))
}

#[post("/incidents/<incident_id>/comments", data = "<spec>")]
async fn add_comment(
    token: AuthToken,
    incident_id: Id,
    spec: Json<CommentSpec>,
    incidents: Incidents,
) -> Result<Created<Json<CommentDesc>>> {
    let text = spec.0.into_text()?;
    let comment = Comment::new(text, token.id, Utc::now());

    let (_, comment) = incidents
        .modify(incident_id, |incident| {
            incident.comments.push(comment.clone());
            Ok(CommentDesc::from(&comment))
        })
        .await?;

    debug!("User {} commented on incident {incident_id}", token.id);
    Ok(Created::new(uri!(comments(incident_id)).to_string()).body(Json(comment)))
}

#[post("/incidents/<incident_id>/comments/<comment_id>/replies", data = "<spec>")]
async fn add_reply(
    token: AuthToken,
    incident_id: Id,
    comment_id: Id,
    spec: Json<CommentSpec>,
    incidents: Incidents,
) -> Result<Created<Json<ReplyDesc>>> {
    let text = spec.0.into_text()?;
    let reply = Reply::new(text, token.id, Utc::now());

    let (_, reply) = incidents
        .modify(incident_id, |incident| {
            let comment = incident
                .comment_mut(comment_id)
                .ok_or_else(|| Error::not_found(format!("Comment {comment_id}")))?;
            comment.replies.push(reply.clone());
            Ok(ReplyDesc::from(&reply))
        })
        .await?;

    debug!("User {} replied to comment {comment_id}", token.id);
    Ok(Created::new(uri!(comments(incident_id)).to_string()).body(Json(reply)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use super::*;
    use crate::config::Config;
    use crate::model::db::incident::NewIncident;

    fn auth(client: &Client, token: &AuthToken) -> Header<'static> {
        token.header(client.rocket().state::<Config>().unwrap())
    }

    #[backend_test]
    async fn comment_and_reply(client: Client, incidents: Incidents) {
        let incident = incidents
            .insert_incident(NewIncident::question_example(Id::new()))
            .await
            .unwrap();
        let commenter = AuthToken::user_example();
        let replier = AuthToken::user_example();

        let response = client
            .post(uri!(add_comment(incident.id)))
            .header(ContentType::JSON)
            .header(auth(&client, &commenter))
            .body(json!({"text": "  Same here  "}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let comment: CommentDesc =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(comment.text, "Same here");
        assert_eq!(*comment.user, commenter.id);

        let response = client
            .post(uri!(add_reply(incident.id, *comment.id)))
            .header(ContentType::JSON)
            .header(auth(&client, &replier))
            .body(json!({"text": "Fixed now"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = client.get(uri!(comments(incident.id))).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Vec<CommentDesc> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, comment.id);
        assert_eq!(listed[0].replies.len(), 1);
        assert_eq!(listed[0].replies[0].text, "Fixed now");
        assert_eq!(*listed[0].replies[0].user, replier.id);
    }

    #[backend_test]
    async fn reply_to_missing_comment(client: Client, incidents: Incidents) {
        let incident = incidents
            .insert_incident(NewIncident::question_example(Id::new()))
            .await
            .unwrap();
        let response = client
            .post(uri!(add_reply(incident.id, Id::new())))
            .header(ContentType::JSON)
            .header(auth(&client, &AuthToken::user_example()))
            .body(json!({"text": "Hello?"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(incidents.get(incident.id).await.unwrap(), incident);
    }

    #[backend_test]
    async fn blank_comments_are_rejected(client: Client, incidents: Incidents) {
        let incident = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let response = client
            .post(uri!(add_comment(incident.id)))
            .header(ContentType::JSON)
            .header(auth(&client, &AuthToken::user_example()))
            .body(json!({"text": "   "}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client.get(uri!(comments(Id::new()))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
