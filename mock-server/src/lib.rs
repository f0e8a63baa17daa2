use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: u64,
    #[serde(rename = "type")]
    pub subject_type: i32,
    pub name: String,
    pub name_cn: String,
    pub summary: String,
    pub date: Option<String>,
    pub eps: u32,
}

impl Subject {
    fn small(&self) -> Value {
        json!({
            "id": self.id,
            "url": format!("http://bgm.tv/subject/{}", self.id),
            "type": self.subject_type,
            "name": self.name,
            "name_cn": self.name_cn,
        })
    }
}

#[derive(Debug)]
pub struct Catalog {
    subjects: Vec<Subject>,
}

impl Catalog {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    /// A handful of real entries, one per subject type.
    pub fn seeded() -> Self {
        let subject = |id, subject_type, name: &str, name_cn: &str, date: Option<&str>, eps| Subject {
            id,
            subject_type,
            name: name.to_string(),
            name_cn: name_cn.to_string(),
            summary: String::new(),
            date: date.map(str::to_string),
            eps,
        };
        Self::new(vec![
            subject(2388, 2, "CLANNAD", "团子大家族", Some("2007-10-04"), 23),
            subject(876, 2, "CLANNAD 〜AFTER STORY〜", "CLANNAD 〜AFTER STORY〜", Some("2008-10-02"), 24),
            subject(51, 4, "CLANNAD", "团子大家族", Some("2004-04-28"), 0),
            subject(1836, 1, "CLANNAD オフィシャルアートブック", "", None, 0),
            subject(9717, 3, "CLANNAD ORIGINAL SOUNDTRACK", "", Some("2004-08-13"), 0),
            subject(253, 2, "カウボーイビバップ", "星际牛仔", Some("1998-10-23"), 26),
            subject(290980, 6, "CLANNAD (舞台)", "", None, 0),
        ])
    }

    pub fn get(&self, id: u64) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    fn search(&self, keywords: &str, subject_type: Option<i32>) -> Vec<&Subject> {
        let needle = keywords.to_lowercase();
        self.subjects
            .iter()
            .filter(|s| subject_type.map_or(true, |t| s.subject_type == t))
            .filter(|s| {
                s.name.to_lowercase().contains(&needle) || s.name_cn.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

pub type Db = Arc<Catalog>;

pub fn app() -> Router {
    app_with(Catalog::seeded())
}

pub fn app_with(catalog: Catalog) -> Router {
    let db: Db = Arc::new(catalog);
    Router::new()
        .route("/v0/subjects", get(list_subjects))
        .route("/v0/subjects/{id}", get(get_subject))
        .route("/search/subject/{keywords}", post(search_subjects))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, title: &str, description: &str) -> Response {
    (
        status,
        Json(json!({ "title": title, "description": description })),
    )
        .into_response()
}

/// Reject Authorization headers that are present but not bearer tokens.
fn check_auth(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get(header::AUTHORIZATION) {
        None => Ok(()),
        Some(value) if value.to_str().is_ok_and(|v| v.starts_with("Bearer ")) => Ok(()),
        Some(_) => Err(error(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "authorization header must be a bearer token",
        )),
    }
}

async fn get_subject(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = check_auth(&headers) {
        return resp;
    }
    let Ok(id) = id.parse::<u64>() else {
        return error(StatusCode::BAD_REQUEST, "Bad Request", "subject id must be a number");
    };
    match db.get(id) {
        Some(subject) => Json(subject.clone()).into_response(),
        None => error(
            StatusCode::NOT_FOUND,
            "Not Found",
            "resource can't be found in the database or has been removed",
        ),
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    pub subject_type: i32,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

async fn list_subjects(State(db): State<Db>, Query(params): Query<ListParams>) -> Response {
    let limit = params.limit.unwrap_or(30).min(50);
    let offset = params.offset.unwrap_or(0);
    let matching: Vec<&Subject> = db
        .subjects
        .iter()
        .filter(|s| s.subject_type == params.subject_type)
        .collect();
    let page: Vec<&Subject> = matching.iter().skip(offset).take(limit).copied().collect();
    Json(json!({
        "total": matching.len(),
        "limit": limit,
        "offset": offset,
        "data": page,
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(rename = "type")]
    pub subject_type: Option<i32>,
    #[serde(rename = "responseGroup")]
    pub response_group: Option<String>,
    pub start: Option<usize>,
    pub max_results: Option<usize>,
}

async fn search_subjects(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(keywords): Path<String>,
    Query(params): Query<SearchParams>,
) -> Response {
    if let Err(resp) = check_auth(&headers) {
        return resp;
    }
    let found = db.search(&keywords, params.subject_type);
    let max_results = params.max_results.unwrap_or(25).min(25);
    let small = params.response_group.as_deref().unwrap_or("small") == "small";
    let list: Vec<Value> = found
        .iter()
        .skip(params.start.unwrap_or(0))
        .take(max_results)
        .map(|s| {
            if small {
                s.small()
            } else {
                serde_json::to_value(s).unwrap_or(Value::Null)
            }
        })
        .collect();
    Json(json!({ "results": found.len(), "list": list })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_serializes_type_field() {
        let catalog = Catalog::seeded();
        let json = serde_json::to_value(catalog.get(2388).unwrap()).unwrap();
        assert_eq!(json["type"], 2);
        assert_eq!(json["name"], "CLANNAD");
        assert!(json.get("subject_type").is_none());
    }

    #[test]
    fn search_matches_name_and_name_cn() {
        let catalog = Catalog::seeded();
        assert_eq!(catalog.search("clannad", None).len(), 6);
        assert_eq!(catalog.search("星际", None).len(), 1);
        assert!(catalog.search("missing", None).is_empty());
    }

    #[test]
    fn search_filters_by_type() {
        let catalog = Catalog::seeded();
        let games = catalog.search("CLANNAD", Some(4));
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].id, 51);
    }

    #[test]
    fn small_response_group_trims_fields() {
        let catalog = Catalog::seeded();
        let small = catalog.get(253).unwrap().small();
        assert_eq!(small["url"], "http://bgm.tv/subject/253");
        assert!(small.get("summary").is_none());
    }
}
