// Common test server application shared between tests and standalone binary

use axum::{Router, extract::Query, response::Html, routing::get};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

#[derive(Deserialize)]
struct DelayQuery {
    ms: Option<u64>,
}

pub async fn create_app() -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/form", get(form_page))
        .route("/elements", get(elements_page))
        .route("/slow", get(slow_page))
        .layer(CorsLayer::permissive())
}

async fn home_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>webscribe test server</title></head>
<body>
    <h1 id="title">Test Pages</h1>
    <ul>
        <li><a href="/form">Login form</a></li>
        <li><a href="/elements">Elements</a></li>
        <li><a href="/slow">Slow page</a></li>
    </ul>
</body>
</html>"#,
    )
}

async fn form_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Login</title></head>
<body>
    <form id="login" action="/form" method="get">
        <input type="email" id="email" name="email" placeholder="Email">
        <input type="password" name="password" placeholder="Password">
        <input type="checkbox" id="remember" name="remember">
        <select name="country">
            <option value="de">Germany</option>
            <option value="us">United States</option>
        </select>
        <textarea name="notes"></textarea>
        <button type="submit">Sign in</button>
    </form>
    <a id="forgot" href="/">Forgot password?</a>
</body>
</html>"#,
    )
}

async fn elements_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Elements</title></head>
<body>
    <div>
        <p>First paragraph</p>
        <p>Second paragraph</p>
    </div>
    <div>
        <span>Inside second div</span>
    </div>
    <section id="main">
        <div><p>Anchored paragraph</p></div>
    </section>
</body>
</html>"#,
    )
}

async fn slow_page(Query(query): Query<DelayQuery>) -> Html<String> {
    let delay = query.ms.unwrap_or(3000);
    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Slow</title></head>
<body><p id="done">Loaded after {} ms</p></body>
</html>"#,
        delay
    ))
}
