//! Load-time document validation.
//!
//! A session must never activate over a partially-valid document: partial
//! documents produce undefined dispatch behavior. Everything structural is
//! checked here, once, so the runtime can assume a well-formed document.

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::document::model::{EventAction, EventConditions, Screen, ScreenDocument, ScreenEvent};
use crate::error::DocumentError;
use crate::rules;

/// Parse and validate a document from a JSON value.
pub fn load_document(value: Value) -> Result<ScreenDocument, DocumentError> {
    let document: ScreenDocument = serde_json::from_value(value)?;
    normalize(&document)?;
    Ok(document)
}

/// Parse and validate a document from a JSON file.
pub fn load_document_from_file(path: &Path) -> Result<ScreenDocument, DocumentError> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    load_document(value)
}

/// Validate a parsed document. Fatal problems (duplicate screen ids, empty
/// event ids, malformed rule expressions) are errors; duplicate event ids
/// within one lookup scope are a warning, since first-match-wins lookup
/// gives them defined behavior.
pub fn normalize(document: &ScreenDocument) -> Result<(), DocumentError> {
    if document.screens.is_empty() {
        return Err(DocumentError::Empty);
    }

    let mut seen_screens = std::collections::HashSet::new();
    for screen in &document.screens {
        if !seen_screens.insert(screen.id.as_str()) {
            return Err(DocumentError::DuplicateScreenId {
                id: screen.id.clone(),
            });
        }
        validate_screen(screen)?;
    }
    Ok(())
}

fn validate_screen(screen: &Screen) -> Result<(), DocumentError> {
    check_duplicate_event_ids(&screen.id, "screen", screen.events.iter());
    check_duplicate_event_ids(&screen.id, "element", screen.element_events());

    for event in screen.events.iter().chain(screen.element_events()) {
        validate_event(screen, event)?;
    }
    Ok(())
}

fn check_duplicate_event_ids<'a>(
    screen_id: &str,
    scope: &str,
    events: impl Iterator<Item = &'a ScreenEvent>,
) {
    let mut seen = std::collections::HashSet::new();
    for event in events {
        if !seen.insert(event.id.as_str()) {
            warn!(
                screen = %screen_id,
                event = %event.id,
                scope = %scope,
                "Duplicate event id; first occurrence wins on dispatch"
            );
        }
    }
}

fn validate_event(screen: &Screen, event: &ScreenEvent) -> Result<(), DocumentError> {
    if event.id.is_empty() {
        return Err(DocumentError::EmptyEventId {
            screen: screen.id.clone(),
        });
    }
    validate_conditions(screen, event, &event.conditions)?;
    for action in &event.actions {
        validate_action(screen, event, action)?;
    }
    Ok(())
}

fn validate_action(
    screen: &Screen,
    event: &ScreenEvent,
    action: &EventAction,
) -> Result<(), DocumentError> {
    validate_conditions(screen, event, action.conditions())?;
    if let EventAction::ServiceCall {
        on_success,
        on_error,
        ..
    } = action
    {
        for sub in on_success.iter().chain(on_error.iter()) {
            validate_action(screen, event, sub)?;
        }
    }
    Ok(())
}

fn validate_conditions(
    screen: &Screen,
    event: &ScreenEvent,
    conditions: &[EventConditions],
) -> Result<(), DocumentError> {
    for condition in conditions {
        rules::validate(&condition.rules).map_err(|e| DocumentError::InvalidRule {
            screen: screen.id.clone(),
            event: event.id.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn loads_valid_document() {
        let document = load_document(json!({"screens": [
            {"id": "welcome", "title": "Welcome"},
            {"id": "question", "state": {"answered": false}}
        ]}))
        .unwrap();
        assert_eq!(document.screens.len(), 2);
        assert!(document.screen("question").is_some());
        assert_eq!(document.position("question"), Some(1));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(
            load_document(json!({"screens": []})),
            Err(DocumentError::Empty)
        ));
    }

    #[test]
    fn rejects_duplicate_screen_ids() {
        let result = load_document(json!({"screens": [
            {"id": "a"}, {"id": "b"}, {"id": "a"}
        ]}));
        assert!(matches!(result, Err(DocumentError::DuplicateScreenId { id }) if id == "a"));
    }

    #[test]
    fn rejects_empty_event_id() {
        let result = load_document(json!({"screens": [
            {"id": "a", "events": [{"id": "", "type": "tap"}]}
        ]}));
        assert!(matches!(result, Err(DocumentError::EmptyEventId { .. })));
    }

    #[test]
    fn rejects_malformed_rule_expression() {
        let result = load_document(json!({"screens": [
            {"id": "a", "events": [{
                "id": "e", "type": "tap",
                "conditions": [{"rules": {"frobnicate": [1]}, "state": {}}]
            }]}
        ]}));
        assert!(matches!(result, Err(DocumentError::InvalidRule { .. })));
    }

    #[test]
    fn rejects_malformed_rule_in_service_sub_action() {
        let result = load_document(json!({"screens": [
            {"id": "a", "events": [{
                "id": "e", "type": "tap",
                "action": [{
                    "type": "serviceCall",
                    "serviceName": "crm", "functionName": "lookup",
                    "onSuccess": [{
                        "type": "stateUpdate", "updates": {},
                        "conditions": [{"rules": {"bogus": []}, "state": {}}]
                    }]
                }]
            }]}
        ]}));
        assert!(matches!(result, Err(DocumentError::InvalidRule { .. })));
    }

    #[test]
    fn duplicate_event_ids_load_with_warning() {
        // Defined ambiguity: first occurrence wins, load succeeds
        let document = load_document(json!({"screens": [
            {"id": "a", "events": [
                {"id": "dup", "type": "tap"},
                {"id": "dup", "type": "tap"}
            ]}
        ]}))
        .unwrap();
        assert_eq!(document.screens[0].events.len(), 2);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"screens": [{{"id": "only"}}]}}"#).unwrap();

        let document = load_document_from_file(file.path()).unwrap();
        assert_eq!(document.screens[0].id, "only");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load_document_from_file(file.path()),
            Err(DocumentError::Parse(_))
        ));
    }
}
