//! services/api/src/web/editor_handler.rs
//!
//! This is the main entry point and control loop for an editor connection.
//! One connection drives one lesson or quiz form and its draft store.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, EditorError, EditorForm, EditorSession},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use lesson_studio_core::draft::{DraftKind, DraftScope, DraftStore, ExitGuard};
use lesson_studio_core::editor::EditError;
use lesson_studio_core::validation::{validate_lesson, validate_quiz};
use lesson_studio_core::{LessonForm, QuizForm};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to editor connections.
pub async fn editor_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(admin_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, admin_id))
}

async fn send(ws_sender: &WsSender, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    ws_sender.lock().await.send(Message::Text(json.into())).await
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, admin_id: Uuid) {
    info!("New editor connection established for admin: {}", admin_id);

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let mut session = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
                Ok(ClientMessage::Init {
                    kind,
                    topic_id,
                    lesson_id,
                }) => {
                    let scope = DraftScope { topic_id, lesson_id };
                    match EditorSession::open(&app_state, admin_id, kind, scope).await {
                        Ok(session) => session,
                        Err(e) => {
                            error!("Failed to open {} editor: {:?}", kind, e);
                            let message = ServerMessage::Error {
                                message: e.to_string(),
                            };
                            let _ = send(&ws_sender, &message).await;
                            return;
                        }
                    }
                }
                _ => {
                    error!("First message was not a valid Init message.");
                    let message = ServerMessage::Error {
                        message: "The first message must be init.".to_string(),
                    };
                    let _ = send(&ws_sender, &message).await;
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let ready = ServerMessage::EditorReady {
        restored: session.restored,
        form: session.form.to_json().await,
    };
    if send(&ws_sender, &ready).await.is_err() {
        error!("Failed to send editorReady message.");
        return;
    }

    // --- 2. Draft Save Notifications ---
    let notifier_token = CancellationToken::new();
    let notifier = {
        let ws_sender = ws_sender.clone();
        let token = notifier_token.clone();
        let mut saves = session.form.subscribe();
        tokio::spawn(async move {
            let mut last = saves.borrow().last_saved_at;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = saves.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let saved_at = saves.borrow_and_update().last_saved_at;
                        if saved_at == last {
                            continue;
                        }
                        last = saved_at;
                        if let Some(saved_at) = saved_at {
                            if send(&ws_sender, &ServerMessage::DraftSaved { saved_at }).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        })
    };

    // --- 3. Main Message Loop ---
    'connection: while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let msg = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Failed to deserialize client message: {}", e);
                        let message = ServerMessage::Error {
                            message: format!("Unreadable message: {}", e),
                        };
                        if send(&ws_sender, &message).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                let outcome = dispatch(&app_state, &mut session, msg).await;
                for reply in &outcome.replies {
                    if send(&ws_sender, reply).await.is_err() {
                        error!("Failed to send reply; closing editor.");
                        break 'connection;
                    }
                }
                if outcome.close {
                    info!("Admin {} left the editor.", admin_id);
                    let _ = ws_sender.lock().await.send(Message::Close(None)).await;
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Editor connection error: {}", e);
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    // Dropping the session cancels pending draft timers; in-flight writes finish.
    notifier_token.cancel();
    let _ = notifier.await;
    drop(session);
    info!("Editor connection closed.");
}

//=========================================================================================
// Message Dispatch
//=========================================================================================

/// What the connection should do after one client message.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub replies: Vec<ServerMessage>,
    pub close: bool,
}

impl Dispatch {
    fn none() -> Self {
        Self::default()
    }

    fn reply(message: ServerMessage) -> Self {
        Self {
            replies: vec![message],
            close: false,
        }
    }

    fn close() -> Self {
        Self {
            replies: Vec::new(),
            close: true,
        }
    }
}

/// Applies one client message to the session. Failures become an `error` reply.
pub async fn dispatch(app_state: &AppState, session: &mut EditorSession, msg: ClientMessage) -> Dispatch {
    match apply(app_state, session, msg).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Editor message rejected: {}", e);
            Dispatch::reply(ServerMessage::Error {
                message: e.to_string(),
            })
        }
    }
}

async fn apply(
    app_state: &AppState,
    session: &mut EditorSession,
    msg: ClientMessage,
) -> Result<Dispatch, EditorError> {
    match msg {
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
            Ok(Dispatch::none())
        }
        ClientMessage::SaveDraft => {
            // The save notification goes out through the store's state channel.
            match &session.form {
                EditorForm::Lesson(store) => store.save_now().await?,
                EditorForm::Quiz(store) => store.save_now().await?,
            };
            Ok(Dispatch::none())
        }
        ClientMessage::Submit => submit(app_state, session).await,
        ClientMessage::RequestLeave => Ok(Dispatch::reply(match session.form.exit_guard() {
            ExitGuard::Allow => ServerMessage::LeaveAllowed,
            ExitGuard::ConfirmRequired => ServerMessage::LeaveConfirmationRequired,
        })),
        ClientMessage::ConfirmLeave => Ok(Dispatch::close()),
        edit => match &session.form {
            EditorForm::Lesson(store) => edit_lesson(store, edit).await,
            EditorForm::Quiz(store) => edit_quiz(store, edit).await,
        },
    }
}

fn synced(index: usize, timing_array: Option<Vec<f64>>) -> Dispatch {
    match timing_array {
        Some(timing_array) => Dispatch::reply(ServerMessage::SectionSynced {
            index,
            timing_array,
        }),
        None => Dispatch::none(),
    }
}

async fn edit_lesson(store: &DraftStore<LessonForm>, msg: ClientMessage) -> Result<Dispatch, EditorError> {
    match msg {
        ClientMessage::SetTitle { text } => store.edit(|f| f.set_title(text)).await,
        ClientMessage::SetLessonMedia { media, url } => store.edit(|f| f.set_media(media, url)).await,
        ClientMessage::AddSection => {
            store.edit(|f| f.add_section()).await;
        }
        ClientMessage::RemoveSection { index } => {
            store.try_edit(|f| f.remove_section(index)).await?;
        }
        ClientMessage::SetSectionText { index, text } => {
            let timings = store
                .try_edit(|f| {
                    let changed = f.set_section_text(index, text)?;
                    Ok::<_, EditError>(if changed {
                        f.sections.get(index).map(|s| s.timing_array.clone())
                    } else {
                        None
                    })
                })
                .await?;
            return Ok(synced(index, timings));
        }
        ClientMessage::SetTiming { index, line, seconds } => {
            let timings = store
                .try_edit(|f| {
                    f.set_timing(index, line, seconds)?;
                    Ok::<_, EditError>(f.sections.get(index).map(|s| s.timing_array.clone()))
                })
                .await?;
            return Ok(synced(index, timings));
        }
        ClientMessage::SetSectionField { index, field, value } => {
            store.try_edit(|f| f.set_section_field(index, field, value)).await?;
        }
        ClientMessage::AddMcq { index } => {
            store.try_edit(|f| f.add_mcq(index)).await?;
        }
        ClientMessage::RemoveMcq { index, mcq } => {
            store.try_edit(|f| f.remove_mcq(index, mcq)).await?;
        }
        ClientMessage::SetMcq { index, mcq, question } => {
            store.try_edit(|f| f.set_mcq(index, mcq, question)).await?;
        }
        _ => return Err(EditorError::WrongEditor(DraftKind::Lesson)),
    }
    Ok(Dispatch::none())
}

async fn edit_quiz(store: &DraftStore<QuizForm>, msg: ClientMessage) -> Result<Dispatch, EditorError> {
    match msg {
        ClientMessage::AddQuestion { question_type } => {
            store.edit(|f| f.add_question(question_type)).await;
        }
        ClientMessage::RemoveQuestion { index } => {
            store.try_edit(|f| f.remove_question(index)).await?;
        }
        ClientMessage::SetQuestionText { index, text } => {
            store.try_edit(|f| f.set_question_text(index, text)).await?;
        }
        ClientMessage::SetQuestionType { index, question_type } => {
            store.try_edit(|f| f.set_question_type(index, question_type)).await?;
        }
        ClientMessage::AddOption { index, text } => {
            store.try_edit(|f| f.add_option(index, text)).await?;
        }
        ClientMessage::SetOption { index, option, text } => {
            store.try_edit(|f| f.set_option(index, option, text)).await?;
        }
        ClientMessage::RemoveOption { index, option } => {
            store.try_edit(|f| f.remove_option(index, option)).await?;
        }
        ClientMessage::SetCorrectAnswer { index, answer } => {
            store.try_edit(|f| f.set_correct_answer(index, answer)).await?;
        }
        _ => return Err(EditorError::WrongEditor(DraftKind::Quiz)),
    }
    Ok(Dispatch::none())
}

//=========================================================================================
// Submission
//=========================================================================================

/// Validates, stores and then clears the draft. Nothing is stored while any
/// validation issue remains, and a failed store keeps the draft.
async fn submit(app_state: &AppState, session: &mut EditorSession) -> Result<Dispatch, EditorError> {
    match &session.form {
        EditorForm::Lesson(store) => {
            let topic_id = session
                .scope
                .topic_id
                .ok_or(EditorError::MissingId(session.form.kind(), "topicId"))?;
            if let Err(report) = store.read(|f| validate_lesson(&f.text, &f.sections)).await {
                return Ok(Dispatch::reply(ServerMessage::ValidationFailed {
                    issues: report.issues,
                }));
            }

            let mut form = store.begin_submit().await;
            form.resync_all();
            let result = match session.scope.lesson_id {
                Some(lesson_id) => app_state.db.upsert_lesson(topic_id, lesson_id, &form).await,
                None => app_state.db.create_lesson(topic_id, &form).await,
            };
            match result {
                Ok(lesson) => {
                    if session.scope.lesson_id.is_none() {
                        let scope = DraftScope {
                            lesson_id: Some(lesson.id),
                            ..session.scope
                        };
                        // Further drafts belong to the created lesson, not the "new lesson" route.
                        if let Err(e) = store.rekey(scope).await {
                            warn!("Failed to drop the new-lesson draft: {}", e);
                        }
                        session.scope = scope;
                    }
                    settle(store, true).await;
                    info!("Lesson {} submitted by admin {}", lesson.id, session.admin_id);
                    Ok(Dispatch::reply(ServerMessage::Submitted { id: lesson.id }))
                }
                Err(e) => {
                    error!("Failed to store lesson: {:?}", e);
                    settle(store, false).await;
                    Ok(Dispatch::reply(ServerMessage::SubmitFailed {
                        message: e.to_string(),
                    }))
                }
            }
        }
        EditorForm::Quiz(store) => {
            let lesson_id = session
                .scope
                .lesson_id
                .ok_or(EditorError::MissingId(session.form.kind(), "lessonId"))?;
            if let Err(report) = store.read(|f| validate_quiz(&f.questions)).await {
                return Ok(Dispatch::reply(ServerMessage::ValidationFailed {
                    issues: report.issues,
                }));
            }

            let form = store.begin_submit().await;
            match app_state.db.upsert_quiz(lesson_id, &form).await {
                Ok(quiz) => {
                    settle(store, true).await;
                    info!("Quiz for lesson {} submitted by admin {}", lesson_id, session.admin_id);
                    Ok(Dispatch::reply(ServerMessage::Submitted { id: quiz.lesson_id }))
                }
                Err(e) => {
                    error!("Failed to store quiz: {:?}", e);
                    settle(store, false).await;
                    Ok(Dispatch::reply(ServerMessage::SubmitFailed {
                        message: e.to_string(),
                    }))
                }
            }
        }
    }
}

/// Leaves `Submitting`. If the draft cannot be cleared it is kept and rescheduled.
async fn settle<T>(store: &DraftStore<T>, succeeded: bool)
where
    T: serde::Serialize + Send + 'static,
{
    if let Err(e) = store.finish_submit(succeeded).await {
        let key = store.key().await;
        warn!(%key, "Failed to clear submitted draft: {}", e);
        let _ = store.finish_submit(false).await;
    }
}
