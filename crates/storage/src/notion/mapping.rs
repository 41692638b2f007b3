//! Translation between remote page payloads and the domain model.
//!
//! Page properties are dynamic JSON; decoding recovers optional card
//! fields with their documented defaults (mastery 1, repetitions 0)
//! instead of failing the fetch, while structurally required fields
//! (page id, session start time) surface as `StorageError::Malformed`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use study_core::model::{
    CardId, Flashcard, ReviewStats, SessionId, SessionStatus, StudySession, ValidatedCard,
};
use study_core::time::parse_utc;

use crate::repository::StorageError;

//
// ─── DECODING ──────────────────────────────────────────────────────────────────
//

pub(super) fn page_id(page: &Value) -> Result<String, StorageError> {
    page.get("id")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| StorageError::Malformed("page missing id".into()))
}

pub(super) fn first_data_source_id(meta: &Value) -> Result<String, StorageError> {
    meta.get("data_sources")
        .and_then(Value::as_array)
        .and_then(|sources| sources.first())
        .and_then(|source| source.get("id"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| StorageError::Malformed("database has no data sources".into()))
}

pub(super) fn database_title(meta: &Value) -> String {
    meta.get("title")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// First text fragment of a `title` or `rich_text` property.
fn text_value(prop: Option<&Value>, kind: &str) -> String {
    prop.and_then(|p| p.get(kind))
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.first())
        .and_then(|block| {
            block
                .get("plain_text")
                .and_then(Value::as_str)
                .or_else(|| {
                    block
                        .get("text")
                        .and_then(|text| text.get("content"))
                        .and_then(Value::as_str)
                })
        })
        .unwrap_or_default()
        .to_string()
}

fn select_value(prop: Option<&Value>) -> Option<String> {
    prop.and_then(|p| p.get("select"))
        .and_then(|select| select.get("name"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Number property, tolerating floats the remote editor may have stored.
#[allow(clippy::cast_possible_truncation)]
fn number_value(prop: Option<&Value>) -> Option<i64> {
    let number = prop?.get("number")?;
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|f| f.round() as i64))
}

fn date_value(prop: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = prop?
        .get("date")?
        .get("start")?
        .as_str()?;
    parse_utc(raw).ok()
}

pub(super) fn card_from_page(page: &Value) -> Result<Flashcard, StorageError> {
    let id = CardId::new(page_id(page)?);
    let props = page.get("properties").cloned().unwrap_or_else(|| json!({}));

    Ok(Flashcard::from_persisted(
        id,
        text_value(props.get("Front"), "title"),
        text_value(props.get("Back"), "rich_text"),
        select_value(props.get("Language")).unwrap_or_default(),
        number_value(props.get("Mastery")),
        number_value(props.get("Repetitions")),
        date_value(props.get("Last Review")),
    ))
}

pub(super) fn session_from_page(page: &Value) -> Result<StudySession, StorageError> {
    let id = SessionId::new(page_id(page)?);
    let props = page.get("properties").cloned().unwrap_or_else(|| json!({}));

    let started_at = date_value(props.get("Start Time"))
        .ok_or_else(|| StorageError::Malformed("session missing start time".into()))?;
    let status = select_value(props.get("Status"))
        .ok_or_else(|| StorageError::Malformed("session missing status".into()))?;
    let status = SessionStatus::parse(&status)
        .map_err(|e| StorageError::Malformed(e.to_string()))?;

    StudySession::from_persisted(
        id,
        started_at,
        date_value(props.get("End Time")),
        status,
        number_value(props.get("Duration (min)")),
    )
    .map_err(|e| StorageError::Malformed(e.to_string()))
}

//
// ─── ENCODING ──────────────────────────────────────────────────────────────────
//

fn date_property(at: DateTime<Utc>) -> Value {
    json!({ "date": { "start": at.to_rfc3339_opts(SecondsFormat::Secs, true) } })
}

pub(super) fn card_properties(draft: &ValidatedCard) -> Value {
    json!({
        "Front": { "title": [ { "type": "text", "text": { "content": draft.front } } ] },
        "Back": { "rich_text": [ { "type": "text", "text": { "content": draft.back } } ] },
        "Language": { "select": { "name": draft.language } },
        "Mastery": { "number": 1 },
        "Repetitions": { "number": 0 },
        "Last Review": date_property(draft.created_at),
    })
}

pub(super) fn stats_properties(stats: &ReviewStats) -> Value {
    json!({
        "Mastery": { "number": stats.mastery.value() },
        "Repetitions": { "number": stats.repetitions },
        "Last Review": date_property(stats.last_review),
    })
}

pub(super) fn session_properties(started_at: DateTime<Utc>) -> Value {
    json!({
        "Name": { "title": [ { "type": "text", "text": { "content": "Study Session" } } ] },
        "Start Time": date_property(started_at),
        "Status": { "select": { "name": SessionStatus::Started.as_str() } },
    })
}

pub(super) fn close_properties(ended_at: DateTime<Utc>, duration_min: i64) -> Value {
    json!({
        "End Time": date_property(ended_at),
        "Duration (min)": { "number": duration_min },
        "Status": { "select": { "name": SessionStatus::Stopped.as_str() } },
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::CardDraft;
    use study_core::time::fixed_now;

    fn card_page(properties: Value) -> Value {
        json!({ "id": "page-1", "properties": properties })
    }

    #[test]
    fn full_card_page_decodes() {
        let page = card_page(json!({
            "Front": { "title": [ { "plain_text": "hola" } ] },
            "Back": { "rich_text": [ { "text": { "content": "hello" } } ] },
            "Language": { "select": { "name": "Spanish" } },
            "Mastery": { "number": 3 },
            "Repetitions": { "number": 7 },
            "Last Review": { "date": { "start": "2024-01-01T10:00:00Z" } },
        }));

        let card = card_from_page(&page).unwrap();
        assert_eq!(card.id.as_str(), "page-1");
        assert_eq!(card.front, "hola");
        assert_eq!(card.back, "hello");
        assert_eq!(card.language, "Spanish");
        assert_eq!(card.mastery.value(), 3);
        assert_eq!(card.repetitions, 7);
        assert!(card.last_review.is_some());
    }

    #[test]
    fn sparse_card_page_recovers_defaults() {
        let page = card_page(json!({
            "Front": { "title": [ { "plain_text": "hola" } ] },
        }));

        let card = card_from_page(&page).unwrap();
        assert_eq!(card.mastery.value(), 1);
        assert_eq!(card.repetitions, 0);
        assert_eq!(card.back, "");
        assert_eq!(card.last_review, None);
    }

    #[test]
    fn non_numeric_mastery_defaults_to_one() {
        let page = card_page(json!({
            "Mastery": { "number": null },
        }));
        let card = card_from_page(&page).unwrap();
        assert_eq!(card.mastery.value(), 1);
    }

    #[test]
    fn page_without_id_is_malformed() {
        let err = card_from_page(&json!({ "properties": {} })).unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }

    #[test]
    fn session_page_round_trips_offsetless_start() {
        let page = json!({
            "id": "session-1",
            "properties": {
                "Start Time": { "date": { "start": "2024-01-01T10:00:00" } },
                "Status": { "select": { "name": "Started" } },
            },
        });

        let session = session_from_page(&page).unwrap();
        assert!(session.is_active());
        assert_eq!(session.started_at, parse_utc("2024-01-01T10:00:00Z").unwrap());
        assert_eq!(session.duration_min, None);
    }

    #[test]
    fn session_without_status_is_malformed() {
        let page = json!({
            "id": "session-1",
            "properties": {
                "Start Time": { "date": { "start": "2024-01-01T10:00:00Z" } },
            },
        });
        assert!(matches!(
            session_from_page(&page).unwrap_err(),
            StorageError::Malformed(_)
        ));
    }

    #[test]
    fn stats_properties_cover_exactly_three_fields() {
        let mut card = CardDraft::new("q", "a", "Spanish")
            .validate(fixed_now())
            .unwrap()
            .assign_id(CardId::new("c1"));
        let stats = card.apply_review(true, fixed_now());

        let props = stats_properties(&stats);
        let keys: Vec<&str> = props.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Last Review", "Mastery", "Repetitions"]);
        assert_eq!(props["Mastery"]["number"], 2);
    }

    #[test]
    fn close_properties_mark_session_stopped() {
        let props = close_properties(fixed_now(), 25);
        assert_eq!(props["Status"]["select"]["name"], "Stopped");
        assert_eq!(props["Duration (min)"]["number"], 25);
    }
}
