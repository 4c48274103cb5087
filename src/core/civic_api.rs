// REST handlers for the civic hierarchy and candidate registry

use crate::core::error::AppError;
use crate::models::civic::{
    Candidate, CandidateFilter, CandidateListing, District, Municipality, NewCandidate, Province,
    Ward,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

type ApiResult<T> = Result<T, AppError>;

/// `GET /api/candidate/` - filtered candidates plus the next level of choices
pub async fn list_candidates(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CandidateFilter>,
) -> ApiResult<Json<CandidateListing>> {
    Ok(Json(state.store.candidate_listing(&filter).await?))
}

/// `POST /api/candidate/`
pub async fn create_candidate(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<(StatusCode, Json<Candidate>)> {
    let candidate: NewCandidate =
        serde_json::from_str(&body).map_err(|e| AppError::MalformedPayload(e.to_string()))?;
    let created = state.store.create_candidate(candidate).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Candidate>> {
    Ok(Json(state.store.get_candidate(id).await?))
}

pub async fn delete_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.store.delete_candidate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ward_candidates(
    State(state): State<Arc<AppState>>,
    Path(ward_id): Path<i64>,
) -> ApiResult<Json<Vec<Candidate>>> {
    Ok(Json(state.store.candidates_in_ward(ward_id).await?))
}

pub async fn list_provinces(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Province>>> {
    Ok(Json(state.store.list_provinces().await?))
}

pub async fn list_districts(
    State(state): State<Arc<AppState>>,
    Path(province_id): Path<i64>,
) -> ApiResult<Json<Vec<District>>> {
    state.store.require_province(province_id).await?;
    Ok(Json(state.store.list_districts(province_id).await?))
}

pub async fn list_municipalities(
    State(state): State<Arc<AppState>>,
    Path(district_id): Path<i64>,
) -> ApiResult<Json<Vec<Municipality>>> {
    state.store.require_district(district_id).await?;
    Ok(Json(state.store.list_municipalities(district_id).await?))
}

pub async fn list_wards(
    State(state): State<Arc<AppState>>,
    Path(municipality_id): Path<i64>,
) -> ApiResult<Json<Vec<Ward>>> {
    state.store.require_municipality(municipality_id).await?;
    Ok(Json(state.store.list_wards(municipality_id).await?))
}

#[cfg(test)]
mod tests {
    use crate::core::test_support::{test_state, ScriptedFactory};
    use crate::build_router;
    use crate::models::civic::MunicipalityKind;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn seeded_app() -> axum::Router {
        let state = test_state(ScriptedFactory::new(vec![])).await;
        let store = &state.store;

        let province = store.get_or_create_province("Koshi").await.unwrap();
        let district = store.get_or_create_district("Sunsari", province.id).await.unwrap();
        let dharan = store
            .get_or_create_municipality("Dharan", district.id, MunicipalityKind::SubMetropolitan)
            .await
            .unwrap();
        store.get_or_create_ward(1, dharan.id).await.unwrap();
        store.get_or_create_ward(2, dharan.id).await.unwrap();

        build_router(state)
    }

    fn candidate_body(post: &str, ward: i64) -> Value {
        json!({
            "name": "Sita Rai",
            "gender": "Female",
            "post": post,
            "email": "sita@example.org",
            "bio": "Teacher",
            "municipality": "Dharan",
            "ward": ward,
        })
    }

    #[tokio::test]
    async fn test_candidate_lifecycle() {
        let app = seeded_app().await;

        let (status, created) =
            send(app.clone(), "POST", "/api/candidate/", Some(candidate_body("Chair", 1))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        let (status, fetched) = send(app.clone(), "GET", &format!("/api/candidate/{}/", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Sita Rai");
        assert_eq!(fetched["bio"], "Teacher");

        let (status, listing) = send(
            app.clone(),
            "GET",
            "/api/candidate/?province=koshi&district=sunsari&municipality=dharan&ward_no=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["candidates"].as_array().unwrap().len(), 1);
        assert_eq!(listing["wards"].as_array().unwrap().len(), 2);

        let (status, _) = send(app.clone(), "DELETE", &format!("/api/candidate/{}/", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(app, "GET", &format!("/api/candidate/{}/", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_candidate_errors() {
        let app = seeded_app().await;

        let (status, _) =
            send(app.clone(), "POST", "/api/candidate/", Some(candidate_body("Chair", 1))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) =
            send(app.clone(), "POST", "/api/candidate/", Some(candidate_body("Chair", 1))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) =
            send(app.clone(), "POST", "/api/candidate/", Some(candidate_body("Chair", 9))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/candidate/",
            Some(json!({"name": "Missing fields"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app, "DELETE", "/api/candidate/999/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hierarchy_browse() {
        let app = seeded_app().await;

        let (status, provinces) = send(app.clone(), "GET", "/api/provinces/", None).await;
        assert_eq!(status, StatusCode::OK);
        let province_id = provinces[0]["id"].as_i64().unwrap();

        let (_, districts) =
            send(app.clone(), "GET", &format!("/api/provinces/{}/districts/", province_id), None).await;
        assert_eq!(districts[0]["name"], "sunsari");
        let district_id = districts[0]["id"].as_i64().unwrap();

        let (_, municipalities) = send(
            app.clone(),
            "GET",
            &format!("/api/districts/{}/municipalities/", district_id),
            None,
        )
        .await;
        assert_eq!(municipalities[0]["type"], "sub_metropolitan");
        let municipality_id = municipalities[0]["id"].as_i64().unwrap();

        let (_, wards) = send(
            app.clone(),
            "GET",
            &format!("/api/municipalities/{}/wards/", municipality_id),
            None,
        )
        .await;
        assert_eq!(wards.as_array().unwrap().len(), 2);
        let ward_id = wards[0]["id"].as_i64().unwrap();

        let (status, candidates) =
            send(app.clone(), "GET", &format!("/api/ward/{}/candidates/", ward_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(candidates.as_array().unwrap().is_empty());

        let (status, _) = send(app, "GET", "/api/provinces/999/districts/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
