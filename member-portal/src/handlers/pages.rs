use askama::Template;
use axum::response::IntoResponse;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {}

#[derive(Template)]
#[template(path = "journey.html")]
pub struct JourneyTemplate {}

#[derive(Template)]
#[template(path = "feedback.html")]
pub struct FeedbackTemplate {}

pub async fn index() -> impl IntoResponse {
    IndexTemplate {}
}

pub async fn about() -> impl IntoResponse {
    AboutTemplate {}
}

pub async fn journey() -> impl IntoResponse {
    JourneyTemplate {}
}

/// Feedback form. Handled entirely in the browser; nothing is posted.
pub async fn feedback() -> impl IntoResponse {
    FeedbackTemplate {}
}

pub async fn health_check() -> &'static str {
    "OK"
}
