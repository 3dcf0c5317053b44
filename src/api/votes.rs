use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AuthToken,
        incident::{PollVoteResult, UpvoteResult, VoteRequest},
    },
    mongodb::Id,
};
use crate::voting::VotingEngine;

pub fn routes() -> Vec<Route> {
    routes![cast_vote, remove_vote, upvote]
}

#[post("/incidents/<incident_id>/vote", data = "<vote>")]
async fn cast_vote(
    token: AuthToken,
    incident_id: Id,
    vote: Json<VoteRequest>,
    engine: VotingEngine,
) -> Result<Json<PollVoteResult>> {
    let option_index = vote
        .option_index
        .ok_or_else(|| Error::validation("optionIndex is required"))?;
    let result = engine.cast(incident_id, token.id, option_index).await?;
    Ok(Json(result))
}

#[delete("/incidents/<incident_id>/vote")]
async fn remove_vote(
    token: AuthToken,
    incident_id: Id,
    engine: VotingEngine,
) -> Result<Json<PollVoteResult>> {
    Ok(Json(engine.remove(incident_id, token.id).await?))
}

#[post("/incidents/<incident_id>/upvote")]
async fn upvote(
    token: AuthToken,
    incident_id: Id,
    engine: VotingEngine,
) -> Result<Json<UpvoteResult>> {
    Ok(Json(engine.upvote(incident_id, token.id).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, serde_json},
    };

    use super::*;
    use crate::config::Config;
    use crate::error::ErrorBody;
    use crate::model::db::incident::NewIncident;
    use crate::store::Incidents;

    fn auth(client: &Client, token: &AuthToken) -> Header<'static> {
        token.header(client.rocket().state::<Config>().unwrap())
    }

    async fn vote<'c>(
        client: &'c Client,
        token: &AuthToken,
        incident_id: Id,
        option_index: i64,
    ) -> LocalResponse<'c> {
        client
            .post(uri!(cast_vote(incident_id)))
            .header(ContentType::JSON)
            .header(auth(client, token))
            .body(json!({ "optionIndex": option_index }).to_string())
            .dispatch()
            .await
    }

    async fn counts(response: LocalResponse<'_>) -> (Vec<u32>, PollVoteResult) {
        assert_eq!(response.status(), Status::Ok);
        let result: PollVoteResult =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let counts = result.options.iter().map(|option| option.vote_count).collect();
        (counts, result)
    }

    #[backend_test]
    async fn vote_switch_and_retract(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let token = AuthToken::user_example();

        let (tally, result) = counts(vote(&client, &token, poll.id, 0).await).await;
        assert_eq!(tally, vec![1, 0]);
        assert!(result.has_voted);
        assert_eq!(result.user_voted_option, Some(0));

        let (tally, result) = counts(vote(&client, &token, poll.id, 1).await).await;
        assert_eq!(tally, vec![0, 1]);
        assert_eq!(result.user_voted_option, Some(1));

        let response = client
            .delete(uri!(remove_vote(poll.id)))
            .header(auth(&client, &token))
            .dispatch()
            .await;
        let (tally, result) = counts(response).await;
        assert_eq!(tally, vec![0, 0]);
        assert!(!result.has_voted);
        assert_eq!(result.user_voted_option, None);
    }

    #[backend_test]
    async fn vote_errors(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let ended = incidents
            .insert_incident(NewIncident::ended_poll_example(Id::new()))
            .await
            .unwrap();
        let question = incidents
            .insert_incident(NewIncident::question_example(Id::new()))
            .await
            .unwrap();
        let token = AuthToken::user_example();

        for (incident_id, index) in [(poll.id, 5), (poll.id, -1), (ended.id, 0), (question.id, 0)] {
            let response = vote(&client, &token, incident_id, index).await;
            assert_eq!(response.status(), Status::BadRequest);
        }

        let response = vote(&client, &token, Id::new(), 0).await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .delete(uri!(remove_vote(poll.id)))
            .header(auth(&client, &token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorBody =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.message, "You have not voted on this poll");

        // Nothing was written by any of the failures.
        assert_eq!(incidents.get(poll.id).await.unwrap(), poll);
    }

    #[backend_test]
    async fn missing_option_index_is_a_validation_error(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let response = client
            .post(uri!(cast_vote(poll.id)))
            .header(ContentType::JSON)
            .header(auth(&client, &AuthToken::user_example()))
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[backend_test]
    async fn malformed_bodies_are_bad_requests(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let token = AuthToken::user_example();

        for body in [r#"{"optionIndex":"one"}"#, r#"{"optionIndex":1.5}"#, "not json"] {
            let response = client
                .post(uri!(cast_vote(poll.id)))
                .header(ContentType::JSON)
                .header(auth(&client, &token))
                .body(body)
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest, "{body}");
            let error: ErrorBody =
                serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
            assert_eq!(error.message, "Malformed request body");
        }
        assert_eq!(incidents.get(poll.id).await.unwrap(), poll);
    }

    #[backend_test]
    async fn votes_without_content_type_are_accepted(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let response = client
            .post(uri!(cast_vote(poll.id)))
            .header(auth(&client, &AuthToken::user_example()))
            .body(json!({ "optionIndex": 0 }).to_string())
            .dispatch()
            .await;
        let (tally, _) = counts(response).await;
        assert_eq!(tally, vec![1, 0]);
    }

    #[backend_test]
    async fn votes_require_auth(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let response = client
            .post(uri!(cast_vote(poll.id)))
            .header(ContentType::JSON)
            .body(json!({ "optionIndex": 0 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client
            .post(uri!(cast_vote(poll.id)))
            .header(ContentType::JSON)
            .header(Header::new("Authorization", "Bearer not-a-token"))
            .body(json!({ "optionIndex": 0 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client.post(uri!(upvote(poll.id))).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[backend_test]
    async fn upvote_once(client: Client, incidents: Incidents) {
        let issue = incidents
            .insert_incident(NewIncident::issue_example(Id::new()))
            .await
            .unwrap();
        let token = AuthToken::user_example();

        let response = client
            .post(uri!(upvote(issue.id)))
            .header(auth(&client, &token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let result: UpvoteResult =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(
            result,
            UpvoteResult {
                votes: 1,
                has_voted: true
            }
        );

        let response = client
            .post(uri!(upvote(issue.id)))
            .header(auth(&client, &token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let stored = incidents.get(issue.id).await.unwrap();
        assert_eq!(stored.upvotes().unwrap().votes(), 1);
    }

    #[backend_test]
    async fn cannot_upvote_a_poll(client: Client, incidents: Incidents) {
        let poll = incidents
            .insert_incident(NewIncident::poll_example(Id::new()))
            .await
            .unwrap();
        let response = client
            .post(uri!(upvote(poll.id)))
            .header(auth(&client, &AuthToken::user_example()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }
}
