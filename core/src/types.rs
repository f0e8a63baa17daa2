//! Request-side domain types for the bangumi API.
//!
//! # Design
//! Responses stay untyped (`JsonMap`), so only the values the client has to
//! validate or encode live here. `SearchRequest` keeps the subject type as a
//! raw wire code because callers may forward codes they received from
//! elsewhere; the code is checked when the request is built.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A decoded JSON object as returned to callers.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Upper bound (and default) for `max_results` in keyword search.
pub const MAX_SEARCH_RESULTS: i64 = 25;

/// Category of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum SubjectType {
    Book,
    Anime,
    Music,
    Game,
    Real,
}

impl SubjectType {
    pub const ALL: [SubjectType; 5] = [
        SubjectType::Book,
        SubjectType::Anime,
        SubjectType::Music,
        SubjectType::Game,
        SubjectType::Real,
    ];

    /// Numeric code used on the wire.
    pub fn code(self) -> i32 {
        match self {
            SubjectType::Book => 1,
            SubjectType::Anime => 2,
            SubjectType::Music => 3,
            SubjectType::Game => 4,
            SubjectType::Real => 6,
        }
    }

    /// Display name as shown on bgm.tv.
    pub fn name(self) -> &'static str {
        match self {
            SubjectType::Book => "书籍",
            SubjectType::Anime => "动画",
            SubjectType::Music => "音乐",
            SubjectType::Game => "游戏",
            SubjectType::Real => "三次元",
        }
    }

    /// Validate a raw code. `0` means "any type" and maps to `None`.
    pub fn from_code(code: i32) -> Result<Option<SubjectType>, ApiError> {
        if code == 0 {
            return Ok(None);
        }
        SubjectType::try_from(code).map(Some)
    }
}

impl TryFrom<i32> for SubjectType {
    type Error = ApiError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        SubjectType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(ApiError::InvalidSubjectType(code))
    }
}

impl From<SubjectType> for i32 {
    fn from(value: SubjectType) -> Self {
        value.code()
    }
}

/// Amount of detail requested from the legacy search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseGroup {
    #[default]
    Small,
    Medium,
    Large,
}

impl ResponseGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseGroup::Small => "small",
            ResponseGroup::Medium => "medium",
            ResponseGroup::Large => "large",
        }
    }
}

impl std::str::FromStr for ResponseGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(ResponseGroup::Small),
            "medium" => Ok(ResponseGroup::Medium),
            "large" => Ok(ResponseGroup::Large),
            other => Err(format!("unknown response group: {other}")),
        }
    }
}

/// Arguments of a keyword search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub keywords: String,
    /// Raw subject type code, `0` for no filter.
    pub subject_type: i32,
    pub response_group: ResponseGroup,
    pub start: i64,
    /// `0` or anything above 25 is sent as 25.
    pub max_results: i64,
}

impl SearchRequest {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            subject_type: 0,
            response_group: ResponseGroup::default(),
            start: 0,
            max_results: 0,
        }
    }

    pub fn subject_type(mut self, subject_type: SubjectType) -> Self {
        self.subject_type = subject_type.code();
        self
    }

    pub fn response_group(mut self, group: ResponseGroup) -> Self {
        self.response_group = group;
        self
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    pub fn max_results(mut self, max_results: i64) -> Self {
        self.max_results = max_results;
        self
    }

    /// Check the arguments and return the query parameters to send.
    pub fn to_query(&self) -> Result<Vec<(String, String)>, ApiError> {
        if self.keywords.is_empty() {
            return Err(ApiError::MissingField("keywords"));
        }
        let subject_type = SubjectType::from_code(self.subject_type)?;
        if self.start < 0 {
            return Err(ApiError::InvalidStart(self.start));
        }
        let max_results = effective_max_results(self.max_results)?;

        Ok(vec![
            (
                "type".to_string(),
                subject_type.map(|t| t.code().to_string()).unwrap_or_default(),
            ),
            (
                "responseGroup".to_string(),
                self.response_group.as_str().to_string(),
            ),
            ("start".to_string(), self.start.to_string()),
            ("max_results".to_string(), max_results.to_string()),
        ])
    }
}

/// Clamp a requested page size: negative is an error, 0 and >25 become 25.
pub fn effective_max_results(requested: i64) -> Result<i64, ApiError> {
    match requested {
        n if n < 0 => Err(ApiError::InvalidMaxResults(n)),
        0 => Ok(MAX_SEARCH_RESULTS),
        n if n > MAX_SEARCH_RESULTS => Ok(MAX_SEARCH_RESULTS),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_value(query: &[(String, String)], key: &str) -> String {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    }

    #[test]
    fn subject_type_codes_and_names() {
        let codes: Vec<i32> = SubjectType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 6]);
        assert_eq!(SubjectType::Anime.name(), "动画");
        assert_eq!(SubjectType::Real.name(), "三次元");
    }

    #[test]
    fn subject_type_rejects_unknown_codes() {
        for code in [-1, 5, 7, 100] {
            let err = SubjectType::from_code(code).unwrap_err();
            assert!(matches!(err, ApiError::InvalidSubjectType(c) if c == code));
        }
        assert_eq!(SubjectType::from_code(0).unwrap(), None);
        assert_eq!(SubjectType::from_code(6).unwrap(), Some(SubjectType::Real));
    }

    #[test]
    fn subject_type_serializes_as_code() {
        assert_eq!(serde_json::to_string(&SubjectType::Game).unwrap(), "4");
        let parsed: SubjectType = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, SubjectType::Anime);
        assert!(serde_json::from_str::<SubjectType>("5").is_err());
    }

    #[test]
    fn max_results_is_clamped() {
        for n in [0, 26, 1000] {
            assert_eq!(effective_max_results(n).unwrap(), 25);
        }
        for n in 1..=25 {
            assert_eq!(effective_max_results(n).unwrap(), n);
        }
        assert!(matches!(
            effective_max_results(-1),
            Err(ApiError::InvalidMaxResults(-1))
        ));
    }

    #[test]
    fn query_contains_all_parameters() {
        let query = SearchRequest::new("CLANNAD")
            .subject_type(SubjectType::Anime)
            .start(10)
            .max_results(5)
            .to_query()
            .unwrap();
        assert_eq!(query_value(&query, "type"), "2");
        assert_eq!(query_value(&query, "responseGroup"), "small");
        assert_eq!(query_value(&query, "start"), "10");
        assert_eq!(query_value(&query, "max_results"), "5");
    }

    #[test]
    fn untyped_search_sends_empty_type() {
        let query = SearchRequest::new("CLANNAD").to_query().unwrap();
        assert_eq!(query_value(&query, "type"), "");
        assert_eq!(query_value(&query, "max_results"), "25");
    }

    #[test]
    fn validation_order_matches_argument_order() {
        let mut req = SearchRequest::new("");
        req.subject_type = 9;
        req.start = -1;
        assert!(matches!(req.to_query(), Err(ApiError::MissingField("keywords"))));

        req.keywords = "x".to_string();
        assert!(matches!(req.to_query(), Err(ApiError::InvalidSubjectType(9))));

        req.subject_type = 0;
        assert!(matches!(req.to_query(), Err(ApiError::InvalidStart(-1))));
    }

    #[test]
    fn response_group_parses() {
        assert_eq!("large".parse::<ResponseGroup>().unwrap(), ResponseGroup::Large);
        assert!("huge".parse::<ResponseGroup>().is_err());
    }
}
