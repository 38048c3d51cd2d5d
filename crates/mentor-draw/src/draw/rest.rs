use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::domain::{
    ActiveMatchView, EngagedCouple, EngagedCoupleId, Generation, MatchId, MentorCouple,
    MentorCoupleId, MentorshipMatch,
};
use super::gateway::{GatewayError, PersistenceGateway};

const ENGAGED_COUPLES: &str = "engaged_couples";
const MENTOR_COUPLES: &str = "mentor_couples";
const MATCHES: &str = "mentorship_matches";

/// Gateway speaking to a PostgREST-compatible endpoint (`<url>/<table>`).
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::StoreUnavailable(format!("http client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
    }

    fn get(&self, table: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.table_url(table)))
    }

    fn insert<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> RequestBuilder {
        self.authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(body)
    }

    fn deactivate(&self, table: &str) -> RequestBuilder {
        self.authorized(self.client.patch(self.table_url(table)))
            .query(&[("active", "eq.true")])
            .header("Prefer", "return=minimal")
            .json(&json!({ "active": false }))
    }

    async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn fetch_rows<T: DeserializeOwned>(builder: RequestBuilder) -> Result<Vec<T>, GatewayError> {
        Self::send(builder)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(transport_error)
    }

    async fn insert_one<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        Self::fetch_rows::<T>(self.insert(table, body))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                GatewayError::StoreUnavailable(format!("{table} insert returned no row"))
            })
    }

    async fn latest_generation(&self) -> Result<Generation, GatewayError> {
        let rows: Vec<GenerationRow> = Self::fetch_rows(
            self.get(MENTOR_COUPLES)
                .query(&[
                    ("select", "generation"),
                    ("order", "generation.desc.nullslast"),
                    ("limit", "1"),
                ]),
        )
        .await?;
        Ok(rows
            .first()
            .and_then(|row| row.generation)
            .map(Generation)
            .unwrap_or_default())
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::StoreUnavailable(err.to_string())
}

/// Map a non-success PostgREST status onto the gateway error taxonomy.
pub(crate) fn status_error(status: StatusCode, body: &str) -> GatewayError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };

    // 23505 is the Postgres unique_violation code echoed in the error body.
    if status == StatusCode::CONFLICT || body.contains("23505") {
        GatewayError::ConstraintViolation(detail)
    } else {
        GatewayError::StoreUnavailable(detail)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EngagedCoupleRow {
    id: String,
    couple_name: String,
    created_at: DateTime<Utc>,
}

impl From<EngagedCoupleRow> for EngagedCouple {
    fn from(row: EngagedCoupleRow) -> Self {
        EngagedCouple {
            id: EngagedCoupleId(row.id),
            name: row.couple_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MentorCoupleRow {
    id: String,
    mentor_couples_name: String,
    mentee_quantity: u32,
    active: bool,
    generation: u64,
    created_at: DateTime<Utc>,
}

impl From<MentorCoupleRow> for MentorCouple {
    fn from(row: MentorCoupleRow) -> Self {
        MentorCouple {
            id: MentorCoupleId(row.id),
            name: row.mentor_couples_name,
            capacity: row.mentee_quantity,
            active: row.active,
            generation: Generation(row.generation),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchRow {
    id: String,
    engaged_couple_id: String,
    mentor_couple_id: String,
    match_date: DateTime<Utc>,
    active: bool,
    generation: u64,
}

impl From<MatchRow> for MentorshipMatch {
    fn from(row: MatchRow) -> Self {
        MentorshipMatch {
            id: MatchId(row.id),
            engaged_couple_id: EngagedCoupleId(row.engaged_couple_id),
            mentor_couple_id: MentorCoupleId(row.mentor_couple_id),
            matched_at: row.match_date,
            active: row.active,
            generation: Generation(row.generation),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationRow {
    generation: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinedMatchRow {
    engaged_couples: Option<EngagedNameRow>,
    mentor_couples: Option<MentorNameRow>,
}

#[derive(Debug, Deserialize)]
struct EngagedNameRow {
    couple_name: String,
}

#[derive(Debug, Deserialize)]
struct MentorNameRow {
    mentor_couples_name: String,
    mentee_quantity: u32,
}

impl JoinedMatchRow {
    /// `None` when an embedded parent row is missing.
    pub(crate) fn into_view(self) -> Option<ActiveMatchView> {
        let engaged = self.engaged_couples?;
        let mentor = self.mentor_couples?;
        Some(ActiveMatchView {
            engaged_name: engaged.couple_name,
            mentor_name: mentor.mentor_couples_name,
            mentor_capacity: mentor.mentee_quantity,
        })
    }
}

#[async_trait]
impl PersistenceGateway for RestGateway {
    async fn list_engaged_couples(&self) -> Result<Vec<EngagedCouple>, GatewayError> {
        let rows: Vec<EngagedCoupleRow> = Self::fetch_rows(
            self.get(ENGAGED_COUPLES)
                .query(&[("select", "id,couple_name,created_at"), ("order", "created_at.asc")]),
        )
        .await?;
        Ok(rows.into_iter().map(EngagedCouple::from).collect())
    }

    async fn create_engaged_couple(&self, name: &str) -> Result<EngagedCouple, GatewayError> {
        let row: EngagedCoupleRow = self
            .insert_one(ENGAGED_COUPLES, &json!({ "couple_name": name }))
            .await?;
        Ok(row.into())
    }

    async fn find_engaged_couple_by_name(
        &self,
        name: &str,
    ) -> Result<EngagedCouple, GatewayError> {
        let rows: Vec<EngagedCoupleRow> = Self::fetch_rows(self.get(ENGAGED_COUPLES).query(&[
            ("select", "id,couple_name,created_at".to_string()),
            ("couple_name", format!("eq.{name}")),
            ("limit", "1".to_string()),
        ]))
        .await?;
        rows.into_iter()
            .next()
            .map(EngagedCouple::from)
            .ok_or(GatewayError::NotFound)
    }

    async fn deactivate_all_active_matches(&self) -> Result<(), GatewayError> {
        Self::send(self.deactivate(MATCHES)).await?;
        debug!(table = MATCHES, "deactivated active rows");
        Ok(())
    }

    async fn deactivate_all_active_mentors(&self) -> Result<(), GatewayError> {
        Self::send(self.deactivate(MENTOR_COUPLES)).await?;
        debug!(table = MENTOR_COUPLES, "deactivated active rows");
        Ok(())
    }

    async fn open_generation(&self) -> Result<Generation, GatewayError> {
        Ok(self.latest_generation().await?.next())
    }

    async fn create_mentor_couple(
        &self,
        name: &str,
        capacity: u32,
        generation: Generation,
    ) -> Result<MentorCouple, GatewayError> {
        let row: MentorCoupleRow = self
            .insert_one(
                MENTOR_COUPLES,
                &json!({
                    "mentor_couples_name": name,
                    "mentee_quantity": capacity,
                    "active": true,
                    "generation": generation.0,
                }),
            )
            .await?;
        Ok(row.into())
    }

    async fn create_match(
        &self,
        engaged_couple_id: &EngagedCoupleId,
        mentor_couple_id: &MentorCoupleId,
        generation: Generation,
    ) -> Result<MentorshipMatch, GatewayError> {
        let row: MatchRow = self
            .insert_one(
                MATCHES,
                &json!({
                    "engaged_couple_id": engaged_couple_id.0,
                    "mentor_couple_id": mentor_couple_id.0,
                    "match_date": Utc::now().to_rfc3339(),
                    "active": true,
                    "generation": generation.0,
                }),
            )
            .await?;
        Ok(row.into())
    }

    async fn list_active_mentors(&self) -> Result<Vec<MentorCouple>, GatewayError> {
        let generation = self.latest_generation().await?;
        let rows: Vec<MentorCoupleRow> = Self::fetch_rows(self.get(MENTOR_COUPLES).query(&[
            ("select", "*".to_string()),
            ("active", "eq.true".to_string()),
            ("generation", format!("eq.{}", generation.0)),
            ("order", "created_at.asc".to_string()),
        ]))
        .await?;
        Ok(rows.into_iter().map(MentorCouple::from).collect())
    }

    async fn list_active_matches_joined(&self) -> Result<Vec<ActiveMatchView>, GatewayError> {
        let generation = self.latest_generation().await?;
        let rows: Vec<JoinedMatchRow> = Self::fetch_rows(self.get(MATCHES).query(&[
            (
                "select",
                "engaged_couples(couple_name),mentor_couples(mentor_couples_name,mentee_quantity)"
                    .to_string(),
            ),
            ("active", "eq.true".to_string()),
            ("generation", format!("eq.{}", generation.0)),
        ]))
        .await?;

        let fetched = rows.len();
        let views: Vec<ActiveMatchView> =
            rows.into_iter().filter_map(JoinedMatchRow::into_view).collect();
        if views.len() < fetched {
            warn!(
                table = MATCHES,
                %generation,
                skipped = fetched - views.len(),
                "active matches reference missing couples; skipped"
            );
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_status_is_a_constraint_violation() {
        let err = status_error(StatusCode::CONFLICT, r#"{"code":"23505"}"#);
        assert!(matches!(err, GatewayError::ConstraintViolation(_)));
    }

    #[test]
    fn unique_violation_code_is_detected_in_body() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"23505","message":"duplicate key value"}"#,
        );
        assert!(matches!(err, GatewayError::ConstraintViolation(_)));
    }

    #[test]
    fn server_errors_are_store_unavailable() {
        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(
            err,
            GatewayError::StoreUnavailable("503 Service Unavailable".to_string())
        );
    }

    #[test]
    fn engaged_rows_decode_postgrest_timestamps() {
        let row: EngagedCoupleRow = serde_json::from_str(
            r#"{"id":"5b1c","couple_name":"Ana&Bruno","created_at":"2025-03-01T12:30:00.123456+00:00"}"#,
        )
        .expect("row decodes");
        let couple = EngagedCouple::from(row);
        assert_eq!(couple.id, EngagedCoupleId("5b1c".to_string()));
        assert_eq!(couple.name, "Ana&Bruno");
    }

    #[test]
    fn mentor_rows_map_column_names() {
        let row: MentorCoupleRow = serde_json::from_str(
            r#"{"id":"m1","mentor_couples_name":"Silva","mentee_quantity":3,"active":true,"generation":4,"created_at":"2025-03-01T12:30:00Z"}"#,
        )
        .expect("row decodes");
        let mentor = MentorCouple::from(row);
        assert_eq!(mentor.capacity, 3);
        assert_eq!(mentor.generation, Generation(4));
    }

    #[test]
    fn joined_rows_without_parents_are_skipped() {
        let rows: Vec<JoinedMatchRow> = serde_json::from_str(
            r#"[
                {"engaged_couples":{"couple_name":"Ana&Bruno"},"mentor_couples":{"mentor_couples_name":"Silva","mentee_quantity":2}},
                {"engaged_couples":null,"mentor_couples":{"mentor_couples_name":"Silva","mentee_quantity":2}}
            ]"#,
        )
        .expect("rows decode");
        let views: Vec<_> = rows.into_iter().filter_map(JoinedMatchRow::into_view).collect();
        assert_eq!(
            views,
            vec![ActiveMatchView {
                engaged_name: "Ana&Bruno".to_string(),
                mentor_name: "Silva".to_string(),
                mentor_capacity: 2,
            }]
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = RestGateway::new("https://store.local/rest/v1/", "key", Duration::from_secs(5))
            .expect("client builds");
        assert_eq!(
            gateway.table_url(ENGAGED_COUPLES),
            "https://store.local/rest/v1/engaged_couples"
        );
    }

    mod postgrest {
        use super::*;
        use wiremock::matchers::{body_json, header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const KEY: &str = "test-key";

        fn gateway_for(server: &MockServer) -> RestGateway {
            RestGateway::new(server.uri(), KEY, Duration::from_secs(5)).expect("client builds")
        }

        async fn mount_latest_generation(server: &MockServer, rows: serde_json::Value) {
            Mock::given(method("GET"))
                .and(path("/mentor_couples"))
                .and(query_param("select", "generation"))
                .and(query_param("order", "generation.desc.nullslast"))
                .and(query_param("limit", "1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(rows))
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn deactivation_patches_only_active_rows_and_repeats_cleanly() {
            let server = MockServer::start().await;
            Mock::given(method("PATCH"))
                .and(path("/mentorship_matches"))
                .and(query_param("active", "eq.true"))
                .and(header("apikey", KEY))
                .and(header("Authorization", "Bearer test-key"))
                .and(body_json(json!({ "active": false })))
                .respond_with(ResponseTemplate::new(204))
                .expect(2)
                .mount(&server)
                .await;
            Mock::given(method("PATCH"))
                .and(path("/mentor_couples"))
                .and(query_param("active", "eq.true"))
                .and(body_json(json!({ "active": false })))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;

            let gateway = gateway_for(&server);
            gateway
                .deactivate_all_active_matches()
                .await
                .expect("first pass");
            gateway
                .deactivate_all_active_matches()
                .await
                .expect("second pass finds nothing to flip");
            gateway
                .deactivate_all_active_mentors()
                .await
                .expect("mentors deactivated");
        }

        #[tokio::test]
        async fn open_generation_follows_the_highest_stored_generation() {
            let server = MockServer::start().await;
            mount_latest_generation(&server, json!([{ "generation": 4 }])).await;

            let generation = gateway_for(&server)
                .open_generation()
                .await
                .expect("generation");
            assert_eq!(generation, Generation(5));
        }

        #[tokio::test]
        async fn first_generation_starts_at_one_even_with_legacy_null_rows() {
            let empty = MockServer::start().await;
            mount_latest_generation(&empty, json!([])).await;
            assert_eq!(
                gateway_for(&empty).open_generation().await.expect("generation"),
                Generation(1)
            );

            let legacy = MockServer::start().await;
            mount_latest_generation(&legacy, json!([{ "generation": null }])).await;
            assert_eq!(
                gateway_for(&legacy).open_generation().await.expect("generation"),
                Generation(1)
            );
        }

        #[tokio::test]
        async fn joined_read_asks_for_the_latest_active_generation_only() {
            let server = MockServer::start().await;
            mount_latest_generation(&server, json!([{ "generation": 3 }])).await;
            Mock::given(method("GET"))
                .and(path("/mentorship_matches"))
                .and(query_param("active", "eq.true"))
                .and(query_param("generation", "eq.3"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    {
                        "engaged_couples": { "couple_name": "Ana&Bruno" },
                        "mentor_couples": { "mentor_couples_name": "Silva", "mentee_quantity": 2 }
                    },
                    {
                        "engaged_couples": null,
                        "mentor_couples": { "mentor_couples_name": "Silva", "mentee_quantity": 2 }
                    }
                ])))
                .expect(1)
                .mount(&server)
                .await;

            let rows = gateway_for(&server)
                .list_active_matches_joined()
                .await
                .expect("rows");
            assert_eq!(
                rows,
                vec![ActiveMatchView {
                    engaged_name: "Ana&Bruno".to_string(),
                    mentor_name: "Silva".to_string(),
                    mentor_capacity: 2,
                }]
            );
        }

        #[tokio::test]
        async fn active_mentors_are_filtered_by_generation() {
            let server = MockServer::start().await;
            mount_latest_generation(&server, json!([{ "generation": 2 }])).await;
            Mock::given(method("GET"))
                .and(path("/mentor_couples"))
                .and(query_param("select", "*"))
                .and(query_param("active", "eq.true"))
                .and(query_param("generation", "eq.2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                    "id": "m1",
                    "mentor_couples_name": "Silva",
                    "mentee_quantity": 2,
                    "active": true,
                    "generation": 2,
                    "created_at": "2025-03-01T12:30:00Z"
                }])))
                .mount(&server)
                .await;

            let mentors = gateway_for(&server)
                .list_active_mentors()
                .await
                .expect("mentors");
            assert_eq!(mentors.len(), 1);
            assert_eq!(mentors[0].generation, Generation(2));
        }

        #[tokio::test]
        async fn empty_lookup_is_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/engaged_couples"))
                .and(query_param("couple_name", "eq.Nobody"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;

            let err = gateway_for(&server)
                .find_engaged_couple_by_name("Nobody")
                .await
                .expect_err("no row");
            assert_eq!(err, GatewayError::NotFound);
        }

        #[tokio::test]
        async fn inserts_ask_for_the_created_row_and_decode_it() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/mentor_couples"))
                .and(header("Prefer", "return=representation"))
                .and(body_json(json!({
                    "mentor_couples_name": "Silva",
                    "mentee_quantity": 3,
                    "active": true,
                    "generation": 2
                })))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                    "id": "m9",
                    "mentor_couples_name": "Silva",
                    "mentee_quantity": 3,
                    "active": true,
                    "generation": 2,
                    "created_at": "2025-03-01T12:30:00Z"
                }])))
                .expect(1)
                .mount(&server)
                .await;

            let mentor = gateway_for(&server)
                .create_mentor_couple("Silva", 3, Generation(2))
                .await
                .expect("mentor created");
            assert_eq!(mentor.id, MentorCoupleId("m9".to_string()));
            assert_eq!(mentor.capacity, 3);
            assert!(mentor.active);
        }

        #[tokio::test]
        async fn duplicate_insert_is_a_constraint_violation() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/engaged_couples"))
                .respond_with(
                    ResponseTemplate::new(409)
                        .set_body_string(r#"{"code":"23505","message":"duplicate key value"}"#),
                )
                .mount(&server)
                .await;

            let err = gateway_for(&server)
                .create_engaged_couple("Ana&Bruno")
                .await
                .expect_err("duplicate");
            assert!(matches!(err, GatewayError::ConstraintViolation(_)));
        }

        #[tokio::test]
        async fn outage_surfaces_as_store_unavailable() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/engaged_couples"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let err = gateway_for(&server)
                .list_engaged_couples()
                .await
                .expect_err("outage");
            assert!(matches!(err, GatewayError::StoreUnavailable(_)));
        }
    }
}
