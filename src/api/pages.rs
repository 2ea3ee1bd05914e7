//! Landing page

use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::session::{load_session, save_session};
use crate::error::AppError;

/// Create pages router
pub fn pages_router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET /
///
/// Renders sign-in links for each enabled provider and any pending flash
/// messages. Flashes are cleared from the session once rendered.
async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let mut session = load_session(&jar, &state.config);
    let flashes = session.take_flashes();

    let providers: String = state
        .providers
        .iter()
        .map(|provider| {
            format!(
                r#"<li><a href="/authorize/{}">Sign in with {}</a></li>"#,
                provider.name(),
                provider.kind.display_name()
            )
        })
        .collect();

    let messages: String = flashes
        .iter()
        .map(|message| {
            format!(
                "<li>{}</li>",
                html_escape::encode_text(message)
            )
        })
        .collect();

    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>loginbridge</title></head>
<body>
    <h1>loginbridge</h1>
    <ul class="flashes">{messages}</ul>
    <ul class="providers">{providers}</ul>
</body>
</html>
"#
    );

    // Only rewrite the cookie when something was consumed
    let jar = if flashes.is_empty() {
        jar
    } else {
        save_session(jar, &session, &state.config)?
    };

    Ok((jar, Html(body)))
}
