#[cfg(test)]
mod tests {
    use crate::client::extract_intent;
    use slotify_common::services::IntentKind;

    #[test]
    fn extracts_json_object_from_prose() {
        let content = r#"Sure! Here is the classification:
{"intent": "book", "confidence": 0.92, "entities": {"service": "haircut"}}
Let me know if you need anything else."#;

        let intent = extract_intent(content).unwrap();
        assert_eq!(intent.intent, IntentKind::Book);
        assert!((intent.confidence - 0.92).abs() < f32::EPSILON);
        assert_eq!(intent.entities.service.as_deref(), Some("haircut"));
    }

    #[test]
    fn applies_defaults_for_missing_fields() {
        let intent = extract_intent(r#"{"intent": "faq"}"#).unwrap();
        assert_eq!(intent.intent, IntentKind::Faq);
        assert_eq!(intent.confidence, 0.0);
        assert!(intent.entities.service.is_none());
    }

    #[test]
    fn tolerates_unknown_extra_fields() {
        let intent =
            extract_intent(r#"{"intent": "cancel", "confidence": 1.0, "rawText": "cancel it"}"#)
                .unwrap();
        assert_eq!(intent.intent, IntentKind::Cancel);
    }

    #[test]
    fn rejects_completions_without_a_verdict() {
        assert!(extract_intent("I could not classify that message.").is_none());
        assert!(extract_intent("").is_none());
        // Closing brace before the opening one
        assert!(extract_intent("} nothing here {").is_none());
        // Unknown intent labels fail the typed parse
        assert!(extract_intent(r#"{"intent": "smalltalk"}"#).is_none());
    }
}
