use super::Application;

#[test]
fn test_topics() {
    let app = Application::ImageClassification;
    assert_eq!(app.work_topic(), "image-classification-sub");
    assert_eq!(app.ack_topic(), "image-classification-pub");

    let app = Application::TextTranslation;
    assert_eq!(app.work_topic(), "text-translation-sub");
    assert_eq!(app.ack_topic(), "text-translation-pub");
}

#[test]
fn test_parse() {
    assert_eq!(
        "image_classification".parse::<Application>().unwrap(),
        Application::ImageClassification
    );
    assert_eq!(
        "Text-Translation".parse::<Application>().unwrap(),
        Application::TextTranslation
    );
    assert!("minecraft".parse::<Application>().is_err());
}

#[test]
fn test_display_round_trips() {
    for app in [Application::ImageClassification, Application::TextTranslation] {
        assert_eq!(app.to_string().parse::<Application>().unwrap(), app);
    }
}

#[test]
fn test_only_translation_acks_carry_result() {
    assert!(!Application::ImageClassification.acks_carry_result());
    assert!(Application::TextTranslation.acks_carry_result());
}
