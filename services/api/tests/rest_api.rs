mod common;

use api_lib::web::rest::{
    create_lesson_handler, create_quiz_handler, create_topic_handler, delete_topic_handler,
    get_quiz_handler, list_lessons_handler, update_quiz_handler, upsert_lesson_handler,
    TopicRequest,
};
use api_lib::web::uploads::store_upload;
use axum::{
    body::to_bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use common::harness;
use lesson_studio_core::media::MediaKind;
use lesson_studio_core::validation::ValidationIssue;
use lesson_studio_core::{LessonForm, QuizForm, Topic};
use serde_json::json;
use uuid::Uuid;

async fn topic(h: &common::Harness) -> Topic {
    h.state.db.create_topic("Biology", None).await.unwrap()
}

fn lesson_form(value: serde_json::Value) -> LessonForm {
    serde_json::from_value(value).unwrap()
}

fn quiz_form(value: serde_json::Value) -> QuizForm {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn lesson_upsert_realigns_timings_before_storing() {
    let h = harness();
    let topic = topic(&h).await;
    let lesson_id = Uuid::new_v4();

    let form = lesson_form(json!({
        "text": "Cells",
        "subHeading": [
            { "text": "Line one // Line two \\\\ Line three", "timingArray": [1.5] },
            { "text": "Only line", "timingArray": [2.0, 3.0, 4.0] }
        ]
    }));

    let Json(stored) = upsert_lesson_handler(State(h.state.clone()), Path((topic.id, lesson_id)), Json(form))
        .await
        .unwrap();

    assert_eq!(stored.sections[0].timing_array, vec![1.5, 0.0, 0.0]);
    assert_eq!(stored.sections[1].timing_array, vec![2.0]);
    let persisted = h.db.stored_lesson(lesson_id).unwrap();
    assert_eq!(persisted.sections, stored.sections);
}

#[tokio::test]
async fn lesson_create_responds_with_created() {
    let h = harness();
    let topic = topic(&h).await;
    let form = lesson_form(json!({
        "text": "Photosynthesis",
        "subHeading": [{ "text": "Light in\nSugar out" }]
    }));

    let response = create_lesson_handler(State(h.state.clone()), Path(topic.id), Json(form))
        .await
        .map_err(|(status, _)| status)
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let lesson: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(lesson["subHeading"][0]["timingArray"], json!([0.0, 0.0]));
    assert_eq!(h.db.lesson_count(), 1);
}

#[tokio::test]
async fn invalid_section_mcq_blocks_the_whole_lesson() {
    let h = harness();
    let topic = topic(&h).await;
    let form = lesson_form(json!({
        "text": "Cells",
        "subHeading": [{
            "text": "Mitochondria",
            "mcqs": [{
                "question": "Powerhouse of the cell?",
                "type": "multiple-choice",
                "options": ["Nucleus", "Mitochondria"],
                "correctAnswer": "Ribosome"
            }]
        }]
    }));

    let Err((status, Json(body))) =
        create_lesson_handler(State(h.state.clone()), Path(topic.id), Json(form)).await
    else {
        panic!("lesson with a mismatched answer was accepted");
    };

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body.error, "validation_failed");
    assert!(matches!(
        body.issues.as_slice(),
        [ValidationIssue::AnswerNotAnOption { .. }]
    ));
    assert_eq!(h.db.lesson_count(), 0);
}

#[tokio::test]
async fn lesson_issues_are_reported_together() {
    let h = harness();
    let topic = topic(&h).await;
    let form = lesson_form(json!({
        "text": "  ",
        "subHeading": [{ "text": "" }]
    }));

    let Err((status, Json(body))) =
        upsert_lesson_handler(State(h.state.clone()), Path((topic.id, Uuid::new_v4())), Json(form)).await
    else {
        panic!("blank lesson was accepted");
    };

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.issues.contains(&ValidationIssue::MissingTitle));
    assert!(body
        .issues
        .contains(&ValidationIssue::MissingSectionText { section: 0 }));
}

#[tokio::test]
async fn lesson_for_unknown_topic_is_not_found() {
    let h = harness();
    let form = lesson_form(json!({ "text": "Orphan", "subHeading": [{ "text": "a" }] }));

    let Err((status, _)) =
        create_lesson_handler(State(h.state.clone()), Path(Uuid::new_v4()), Json(form)).await
    else {
        panic!("lesson stored under a missing topic");
    };
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_quiz_for_a_lesson_conflicts() {
    let h = harness();
    let topic = topic(&h).await;
    let lesson_id = Uuid::new_v4();
    let lesson = lesson_form(json!({ "text": "Cells", "subHeading": [{ "text": "a" }] }));
    upsert_lesson_handler(State(h.state.clone()), Path((topic.id, lesson_id)), Json(lesson))
        .await
        .unwrap();

    let quiz = || {
        quiz_form(json!({
            "questions": [
                { "question": "Describe a cell.", "type": "open-ended" },
                {
                    "question": "Smallest unit of life?",
                    "type": "multiple-choice",
                    "options": ["Cell", "Atom"],
                    "correctAnswer": "Cell"
                }
            ]
        }))
    };

    let first = create_quiz_handler(State(h.state.clone()), Path(lesson_id), Json(quiz()))
        .await
        .map_err(|(status, _)| status)
        .unwrap()
        .into_response();
    assert_eq!(first.status(), StatusCode::CREATED);

    let Err((status, _)) =
        create_quiz_handler(State(h.state.clone()), Path(lesson_id), Json(quiz())).await
    else {
        panic!("second quiz was created");
    };
    assert_eq!(status, StatusCode::CONFLICT);

    let Json(stored) = get_quiz_handler(State(h.state.clone()), Path(lesson_id))
        .await
        .unwrap();
    assert_eq!(stored.questions.len(), 2);
}

#[tokio::test]
async fn quiz_update_requires_an_existing_quiz() {
    let h = harness();
    let form = quiz_form(json!({
        "questions": [{ "question": "Why?", "type": "open-ended" }]
    }));

    let Err((status, _)) = update_quiz_handler(State(h.state.clone()), Path(Uuid::new_v4()), Json(form)).await
    else {
        panic!("updated a quiz that does not exist");
    };
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quiz_with_too_few_options_is_rejected() {
    let h = harness();
    let form = quiz_form(json!({
        "questions": [{
            "question": "Pick one",
            "type": "multiple-choice",
            "options": ["Only"],
            "correctAnswer": "Only"
        }]
    }));

    let Err((status, Json(body))) =
        create_quiz_handler(State(h.state.clone()), Path(Uuid::new_v4()), Json(form)).await
    else {
        panic!("quiz with one option was accepted");
    };
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(matches!(
        body.issues.as_slice(),
        [ValidationIssue::TooFewOptions { found: 1, .. }]
    ));
}

#[tokio::test]
async fn topics_need_a_name_and_deleting_removes_lessons() {
    let h = harness();

    let Err((status, _)) = create_topic_handler(
        State(h.state.clone()),
        Json(TopicRequest {
            name: "   ".to_string(),
            description: None,
        }),
    )
    .await
    else {
        panic!("blank topic name was accepted");
    };
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let topic = topic(&h).await;
    let lesson = lesson_form(json!({ "text": "Cells", "subHeading": [{ "text": "a" }] }));
    upsert_lesson_handler(State(h.state.clone()), Path((topic.id, Uuid::new_v4())), Json(lesson))
        .await
        .unwrap();

    let status = delete_topic_handler(State(h.state.clone()), Path(topic.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(h.db.lesson_count(), 0);

    let Err((status, _)) = list_lessons_handler(State(h.state.clone()), Path(topic.id)).await else {
        panic!("listed lessons of a deleted topic");
    };
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//=========================================================================================
// Uploads
//=========================================================================================

#[tokio::test]
async fn oversized_upload_never_reaches_storage() {
    let h = harness();
    let limit = h.state.config.max_upload_bytes;

    let Err((status, _)) = store_upload(
        &h.state,
        MediaKind::Audio,
        "lecture.mp3",
        "audio/mpeg",
        Bytes::from(vec![0u8; limit + 1]),
    )
    .await
    else {
        panic!("oversized upload was accepted");
    };

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(h.storage.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_content_type_is_unsupported() {
    let h = harness();

    let Err((status, _)) = store_upload(
        &h.state,
        MediaKind::Video,
        "notes.pdf",
        "application/pdf",
        Bytes::from_static(b"%PDF"),
    )
    .await
    else {
        panic!("pdf accepted as video");
    };

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(h.storage.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn accepted_upload_gets_a_fresh_name_and_public_url() {
    let h = harness();

    let stored = store_upload(
        &h.state,
        MediaKind::Image,
        "Diagram.PNG",
        "image/png",
        Bytes::from_static(b"\x89PNG"),
    )
    .await
    .map_err(|(status, _)| status)
    .unwrap();

    let objects = h.storage.objects.lock().unwrap();
    let (kind, name, size) = &objects[0];
    assert_eq!(*kind, MediaKind::Image);
    assert!(name.ends_with(".png"));
    assert_ne!(name, "Diagram.PNG");
    assert_eq!(*size, 4);
    assert_eq!(stored.url, format!("http://media.test/image/{}", name));
    assert_eq!(stored.size, 4);
}
