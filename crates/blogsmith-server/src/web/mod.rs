// ABOUTME: Web UI route handlers serving HTML via Askama templates and HTMX.
// ABOUTME: Covers the topic form, the generating panel with live steps, the result preview, and download.

use std::convert::Infallible;

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::extract::{Form, Path, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use blogsmith_core::{
    BlogArtifact, Event, EventPayload, SessionError, SessionHandle, StepEvent, Topic, ToolStep,
};
use futures::stream::{self, BoxStream, StreamExt};
use pulldown_cmark::{Options, Parser};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use ulid::Ulid;

use crate::app_state::SharedState;
use crate::run::start_run;

/// Full page: sidebar with the topic form and the main panel.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub session_id: String,
    pub model: String,
}

/// GET / - Start a fresh session and render the page for it.
pub async fn index(State(state): State<SharedState>) -> IndexTemplate {
    let handle = state.create_session().await;
    IndexTemplate {
        session_id: handle.session_id.to_string(),
        model: state.runner.model_name().to_string(),
    }
}

/// Partial: shown while the crew works, wired to the session's SSE stream.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "partials/generating.html")]
pub struct GeneratingTemplate {
    pub session_id: String,
    pub topic: String,
}

/// Partial: the outcome of the last run.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "partials/result.html")]
pub struct ResultTemplate {
    pub session_id: String,
    pub topic: String,
    pub has_blog: bool,
    pub blog_html: String,
    pub error: Option<String>,
}

/// Fragment: one agent step, streamed into the generating panel.
#[derive(Template)]
#[template(path = "partials/step.html")]
pub struct StepTemplate {
    pub agent: String,
    pub kind: &'static str,
    pub output: String,
    pub payload_type: String,
    pub tools: Vec<ToolStep>,
}

impl StepTemplate {
    pub fn from_step(step: &StepEvent) -> Self {
        match step {
            StepEvent::FinishResult { agent, output } => Self {
                agent: agent.clone(),
                kind: "finish",
                output: output.clone(),
                payload_type: String::new(),
                tools: Vec::new(),
            },
            StepEvent::ActionObservation { agent, steps } => Self {
                agent: agent.clone(),
                kind: "action",
                output: String::new(),
                payload_type: String::new(),
                tools: steps.clone(),
            },
            StepEvent::RawPayload {
                agent,
                payload_type,
                raw,
            } => Self {
                agent: agent.clone(),
                kind: "raw",
                output: raw.clone(),
                payload_type: payload_type.clone(),
                tools: Vec::new(),
            },
        }
    }
}

/// Fragment: banner announcing the task an agent just picked up.
#[derive(Template)]
#[template(path = "partials/task.html")]
pub struct TaskTemplate {
    pub task: String,
    pub agent: String,
}

/// Form data for starting a run.
#[derive(Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub topic: String,
}

fn error_fragment(status: StatusCode, message: &str) -> Response {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    (
        status,
        Html(format!("<p class=\"error-msg\">{}</p>", escaped)),
    )
        .into_response()
}

fn parse_session_id(id: &str) -> Result<Ulid, Box<Response>> {
    id.parse::<Ulid>()
        .map_err(|_| Box::new(error_fragment(StatusCode::BAD_REQUEST, "Invalid session ID.")))
}

async fn find_session(state: &SharedState, id: &str) -> Result<SessionHandle, Box<Response>> {
    let session_id = parse_session_id(id)?;
    state.session(&session_id).await.ok_or_else(|| {
        Box::new(error_fragment(
            StatusCode::NOT_FOUND,
            "Session not found. Reload the page to start a new one.",
        ))
    })
}

/// Render markdown to HTML for the preview. Raw HTML in the source is shown as text.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        pulldown_cmark::Event::Html(raw) | pulldown_cmark::Event::InlineHtml(raw) => {
            pulldown_cmark::Event::Text(raw)
        }
        other => other,
    });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// POST /web/sessions/{id}/generate - Start a run and return the generating panel.
pub async fn generate(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Form(form): Form<GenerateForm>,
) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };

    let topic = match Topic::new(&form.topic) {
        Ok(t) => t,
        Err(e) => return error_fragment(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match start_run(handle, state.runner.clone(), topic.clone()).await {
        Ok(_) => GeneratingTemplate {
            session_id: id,
            topic: topic.to_string(),
        }
        .into_response(),
        Err(SessionError::AlreadyGenerating) => error_fragment(
            StatusCode::CONFLICT,
            "A blog is already being generated. Wait for it to finish.",
        ),
        Err(e) => {
            tracing::error!(session_id = %id, error = %e, "failed to start run");
            error_fragment(StatusCode::INTERNAL_SERVER_ERROR, "Failed to start generation.")
        }
    }
}

/// GET /web/sessions/{id}/result - Render the outcome of the most recent run.
pub async fn result(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };

    let run = handle.read_state().await;
    ResultTemplate {
        session_id: id,
        topic: run.topic.clone(),
        has_blog: run.has_blog(),
        blog_html: render_markdown(&run.blog),
        error: run.error.clone(),
    }
    .into_response()
}

/// GET /web/sessions/{id}/download - The last blog as `blog.md`.
pub async fn download(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };

    let artifact = {
        let run = handle.read_state().await;
        if !run.has_blog() {
            return (StatusCode::NOT_FOUND, "no blog has been generated yet").into_response();
        }
        BlogArtifact::new(run.blog.clone())
    };

    (
        [
            (header::CONTENT_TYPE, artifact.mime().to_string()),
            (header::CONTENT_DISPOSITION, artifact.content_disposition()),
        ],
        artifact.into_bytes(),
    )
        .into_response()
}

/// SSE data may not contain carriage returns.
fn step_message(html: &str) -> SseEvent {
    SseEvent::default().event("step").data(html.replace('\r', ""))
}

/// Render an event as an SSE message for the generating panel.
///
/// Progress events become `step` messages carrying an HTML fragment; the end of
/// a run becomes a `done` message that tells the page to fetch the result.
fn sse_for_event(payload: &EventPayload) -> Option<SseEvent> {
    let html = match payload {
        EventPayload::TaskStarted { task, agent } => TaskTemplate {
            task: task.clone(),
            agent: agent.clone(),
        }
        .render(),
        EventPayload::StepRecorded { step } => StepTemplate::from_step(step).render(),
        EventPayload::RunFinished { .. } | EventPayload::RunFailed { .. } => {
            return Some(SseEvent::default().event("done").data(payload.type_name()));
        }
        EventPayload::RunStarted { .. } => return None,
    };

    match html {
        Ok(html) => Some(step_message(&html)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to render step fragment");
            None
        }
    }
}

/// Cursor over a session's live events, used by the SSE stream once replay is done.
struct LiveFeed {
    events: BroadcastStream<Event>,
    handle: SessionHandle,
    last_seen: u64,
    finished: bool,
}

impl LiveFeed {
    /// The next message for the page, or `None` once the run has ended.
    async fn next_message(&mut self) -> Option<SseEvent> {
        while !self.finished {
            match self.events.next().await? {
                Ok(event) => {
                    if event.event_id <= self.last_seen {
                        continue;
                    }
                    self.last_seen = event.event_id;
                    self.finished = event.payload.is_terminal();
                    if let Some(message) = sse_for_event(&event.payload) {
                        return Some(message);
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %self.handle.session_id, skipped, "event stream lagged");
                    let generating = self.handle.read_state().await.generating;
                    if !generating {
                        self.finished = true;
                        return Some(SseEvent::default().event("done").data("lagged"));
                    }
                }
            }
        }
        None
    }
}

/// Build the SSE stream for a session: replay what the run has recorded so
/// far, then follow live events until the run ends.
pub(crate) async fn session_sse_stream(
    handle: &SessionHandle,
) -> BoxStream<'static, Result<SseEvent, Infallible>> {
    // Subscribe before reading state so no event falls between the two.
    let rx = handle.subscribe();
    let (mut replay, last_seen, generating) = {
        let run = handle.read_state().await;
        let mut replay: Vec<SseEvent> = Vec::new();
        if let Some(task) = &run.current_task {
            if let Ok(html) = (TaskTemplate {
                task: task.clone(),
                agent: run.current_agent.clone().unwrap_or_default(),
            })
            .render()
            {
                replay.push(step_message(&html));
            }
        }
        for step in &run.steps {
            if let Ok(html) = StepTemplate::from_step(step).render() {
                replay.push(step_message(&html));
            }
        }
        (replay, run.last_event_id, run.generating)
    };

    if !generating {
        replay.push(SseEvent::default().event("done").data("idle"));
        return stream::iter(replay.into_iter().map(Ok)).boxed();
    }

    let feed = LiveFeed {
        events: BroadcastStream::new(rx),
        handle: handle.clone(),
        last_seen,
        finished: false,
    };
    let live = stream::unfold(feed, |mut feed| async move {
        let message = feed.next_message().await?;
        Some((Ok(message), feed))
    });

    stream::iter(replay.into_iter().map(Ok)).chain(live).boxed()
}

/// GET /web/sessions/{id}/events - SSE stream of rendered progress fragments.
pub async fn events(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };

    Sse::new(session_sse_stream(&handle).await)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use blogsmith_core::{Command, RunState, spawn};

    async fn generating_session() -> SessionHandle {
        let handle = spawn(Ulid::new(), RunState::new());
        handle
            .send_command(Command::StartRun {
                topic: Topic::new("Bonds").unwrap(),
            })
            .await
            .unwrap();
        handle
    }

    #[test]
    fn index_template_renders() {
        let rendered = IndexTemplate {
            session_id: "01HTEST".to_string(),
            model: "gpt-4o".to_string(),
        }
        .render()
        .unwrap();
        assert!(rendered.contains("Blog Builder"));
        assert!(rendered.contains("USA Stock Market"));
        assert!(rendered.contains("Generate Blog"));
        assert!(rendered.contains("/web/sessions/01HTEST/generate"));
    }

    #[test]
    fn generating_template_connects_to_events() {
        let rendered = GeneratingTemplate {
            session_id: "01HTEST".to_string(),
            topic: "Bonds & Stocks".to_string(),
        }
        .render()
        .unwrap();
        assert!(rendered.contains("/web/sessions/01HTEST/events"));
        assert!(rendered.contains("/web/sessions/01HTEST/result"));
        assert!(rendered.contains("Bonds &#38; Stocks"));
        assert!(!rendered.contains("Bonds & Stocks"));
    }

    #[test]
    fn result_template_renders_blog_and_download() {
        let rendered = ResultTemplate {
            session_id: "01HTEST".to_string(),
            topic: "Bonds".to_string(),
            has_blog: true,
            blog_html: render_markdown("# Hello\n\nWorld"),
            error: None,
        }
        .render()
        .unwrap();
        assert!(rendered.contains("Blog generated successfully!"));
        assert!(rendered.contains("/web/sessions/01HTEST/download"));
        assert!(rendered.contains("<h1>Hello</h1>"));
        assert!(!rendered.contains("error-banner"));
    }

    #[test]
    fn result_template_renders_error_banner() {
        let rendered = ResultTemplate {
            session_id: "01HTEST".to_string(),
            topic: "Bonds".to_string(),
            has_blog: false,
            blog_html: String::new(),
            error: Some("task 'outline' failed: Rate limited".to_string()),
        }
        .render()
        .unwrap();
        assert!(rendered.contains("error-banner"));
        assert!(rendered.contains("Rate limited"));
        assert!(!rendered.contains("/download"));
    }

    #[test]
    fn step_template_renders_each_kind() {
        let finish = StepTemplate::from_step(&StepEvent::FinishResult {
            agent: "Tech Blogger".to_string(),
            output: "All done".to_string(),
        })
        .render()
        .unwrap();
        assert!(finish.contains("Tech Blogger"));
        assert!(finish.contains("All done"));

        let action = StepTemplate::from_step(&StepEvent::ActionObservation {
            agent: "Senior Content Strategist".to_string(),
            steps: vec![ToolStep {
                tool: "search_notes".to_string(),
                tool_input: "{\"search_query\":\"bonds\"}".to_string(),
                log: "Checking notes".to_string(),
                observation: "Bonds are loans".to_string(),
            }],
        })
        .render()
        .unwrap();
        assert!(action.contains("search_notes"));
        assert!(action.contains("Checking notes"));
        assert!(action.contains("Bonds are loans"));

        let raw = StepTemplate::from_step(&StepEvent::RawPayload {
            agent: "Editor".to_string(),
            payload_type: "number".to_string(),
            raw: "42".to_string(),
        })
        .render()
        .unwrap();
        assert!(raw.contains("number"));
        assert!(raw.contains("42"));
    }

    #[test]
    fn markdown_preview_escapes_raw_html() {
        let html = render_markdown("# Title\n\n<script>alert(1)</script>\n\n| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn error_fragment_sets_status() {
        let resp = error_fragment(StatusCode::BAD_REQUEST, "<b>bad</b>");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn done_event_only_for_terminal_payloads() {
        assert!(sse_for_event(&EventPayload::RunStarted { topic: "t".into() }).is_none());
        assert!(sse_for_event(&EventPayload::RunFinished { blog: "b".into() }).is_some());
        assert!(sse_for_event(&EventPayload::TaskStarted {
            task: "outline".into(),
            agent: "a".into()
        })
        .is_some());
    }

    #[tokio::test]
    async fn live_stream_ends_after_terminal_event() {
        let handle = generating_session().await;
        handle
            .send_command(Command::StartTask {
                task: "outline".into(),
                agent: "Senior Content Strategist".into(),
            })
            .await
            .unwrap();

        let stream = session_sse_stream(&handle).await;
        handle
            .send_command(Command::FinishRun {
                blog: "# Bonds".into(),
            })
            .await
            .unwrap();

        let items = tokio::time::timeout(Duration::from_secs(2), stream.collect::<Vec<_>>())
            .await
            .expect("stream should end once the run finishes");
        // Replayed task banner, then done.
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn lagged_stream_still_ends_when_run_is_over() {
        let handle = generating_session().await;
        let stream = session_sse_stream(&handle).await;

        for i in 0..300 {
            handle
                .send_command(Command::RecordStep {
                    step: StepEvent::RawPayload {
                        agent: "Tech Blogger".into(),
                        payload_type: "string".into(),
                        raw: format!("note {}", i),
                    },
                })
                .await
                .unwrap();
        }
        handle
            .send_command(Command::FinishRun {
                blog: "# Bonds".into(),
            })
            .await
            .unwrap();

        let items = tokio::time::timeout(Duration::from_secs(2), stream.collect::<Vec<_>>())
            .await
            .expect("stream should end even after missing events");
        assert_eq!(items.len(), 1);
    }
}
