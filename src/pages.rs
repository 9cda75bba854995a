//! Server-rendered pages.
//!
//! Every page is a single inline document sharing [`layout`]. Anything that
//! came from a request, the database or the weather upstream is HTML-encoded
//! before it is interpolated.

use warp::{
    http::StatusCode,
    reply::{self, Html, Reply, Response},
};

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::{auth::SessionUser, weather::WeatherReport};

fn layout(title: &str, user: Option<&SessionUser>, body: &str) -> Html<String> {
    let nav = match user {
        Some(user) => format!(
            r#"<span>Signed in as <strong>{}</strong></span> <a href="/joey-chat">Chat</a> <a href="/logout">Logout</a>"#,
            encode_text(&user.username)
        ),
        None => r#"<a href="/login">Login</a> <a href="/register">Register</a>"#.to_owned(),
    };

    reply::html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8">
        <title>{title}</title>
    </head>
    <body>
        <nav><a href="/">Home</a> <a href="/weather">Weather</a> {nav}</nav>
        <main>
{body}
        </main>
    </body>
</html>
"#,
        title = encode_text(title),
        nav = nav,
        body = body
    ))
}

fn notice(error: Option<&str>, message: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(error) = error {
        out.push_str(&format!(r#"<p class="error">{}</p>"#, encode_text(error)));
    }
    if let Some(message) = message {
        out.push_str(&format!(r#"<p class="message">{}</p>"#, encode_text(message)));
    }
    out
}

pub fn index(user: Option<&SessionUser>) -> Html<String> {
    let greeting = match user {
        Some(user) => format!("<p>Welcome back, {}!</p>", encode_text(&user.username)),
        None => "<p>Log in to join the chat.</p>".to_owned(),
    };
    layout(
        "Welcome to WeatherApp",
        user,
        &format!("<h1>Welcome to WeatherApp</h1>\n{}", greeting),
    )
}

pub fn weather_form(user: Option<&SessionUser>) -> Html<String> {
    layout(
        "Weather",
        user,
        r#"<h1>Weather</h1>
<form method="get" action="/weather">
    <input type="text" name="city" placeholder="City" required>
    <button type="submit">Look up</button>
</form>"#,
    )
}

pub fn weather(user: Option<&SessionUser>, city: &str, report: &WeatherReport) -> Html<String> {
    let conditions = report
        .conditions
        .iter()
        .map(|c| encode_text(&c.description))
        .collect::<Vec<_>>()
        .join(", ");
    let place = match &report.sys.country {
        Some(country) => format!("{}, {}", encode_text(&report.name), encode_text(country)),
        None => encode_text(&report.name).into_owned(),
    };

    layout(
        "Weather Results",
        user,
        &format!(
            r#"<h1>Weather for {city}</h1>
<h2>{place}</h2>
<ul>
    <li>Conditions: {conditions}</li>
    <li>Temperature: {temp:.1} &deg;C (feels like {feels:.1} &deg;C)</li>
    <li>Humidity: {humidity}%</li>
    <li>Pressure: {pressure} hPa</li>
    <li>Wind: {wind:.1} m/s</li>
</ul>
<a href="/weather">Another city</a>"#,
            city = encode_text(city),
            place = place,
            conditions = conditions,
            temp = report.main.temp,
            feels = report.main.feels_like,
            humidity = report.main.humidity,
            pressure = report.main.pressure,
            wind = report.wind.speed,
        ),
    )
}

pub fn weather_error(
    user: Option<&SessionUser>,
    status: StatusCode,
    title: &str,
    message: &str,
    city: &str,
) -> Response {
    let page = layout(
        title,
        user,
        &format!(
            r#"<h1>{title}</h1>
<p class="error">{message}</p>
<p>City: {city}</p>
<a href="/weather">Try again</a>"#,
            title = encode_text(title),
            message = encode_text(message),
            city = encode_text(city),
        ),
    );
    reply::with_status(page, status).into_response()
}

pub fn login(error: Option<&str>) -> Html<String> {
    layout(
        "Login",
        None,
        &format!(
            r#"<h1>Login</h1>
{notice}
<form method="post" action="/login">
    <input type="text" name="username" placeholder="Username" required>
    <input type="password" name="password" placeholder="Password" required>
    <button type="submit">Login</button>
</form>
<a href="/forgot-password">Forgot your password?</a>"#,
            notice = notice(error, None)
        ),
    )
}

pub fn register(error: Option<&str>) -> Html<String> {
    layout(
        "Register",
        None,
        &format!(
            r#"<h1>Register</h1>
{notice}
<form method="post" action="/register">
    <input type="text" name="username" placeholder="Username" required>
    <input type="password" name="password" placeholder="Password" required>
    <button type="submit">Register</button>
</form>"#,
            notice = notice(error, None)
        ),
    )
}

pub fn forgot_password(error: Option<&str>, message: Option<&str>) -> Html<String> {
    layout(
        "Forgot Password",
        None,
        &format!(
            r#"<h1>Forgot Password</h1>
{notice}
<form method="post" action="/forgot-password">
    <input type="text" name="username" placeholder="Username" required>
    <button type="submit">Send reset link</button>
</form>"#,
            notice = notice(error, message)
        ),
    )
}

pub fn reset_password(token: &str, error: Option<&str>) -> Html<String> {
    layout(
        "Reset Password",
        None,
        &format!(
            r#"<h1>Reset Password</h1>
{notice}
<form method="post" action="/reset-password/{token}">
    <input type="password" name="password" placeholder="New password" required>
    <button type="submit">Reset password</button>
</form>"#,
            notice = notice(error, None),
            token = encode_double_quoted_attribute(token)
        ),
    )
}

pub fn chat(user: &SessionUser) -> Html<String> {
    layout(
        "Joey Chat",
        Some(user),
        &format!(
            r#"<h1>Joey Chat</h1>
<div id="chat"><p><em>Connecting...</em></p></div>
<input type="text" id="text" />
<button type="button" id="send">Send</button>
<script type="text/javascript">
const chat = document.getElementById('chat');
const text = document.getElementById('text');
const username = {username};
const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
const ws = new WebSocket(scheme + location.host + '/chat/ws');
function message(data) {{
    const line = document.createElement('p');
    line.innerText = data;
    chat.appendChild(line);
}}
ws.onopen = function() {{
    chat.innerHTML = '<p><em>Connected!</em></p>';
}};
ws.onmessage = function(msg) {{
    message(msg.data);
}};
ws.onclose = function() {{
    chat.getElementsByTagName('em')[0].innerText = 'Disconnected!';
}};
document.getElementById('send').onclick = function() {{
    ws.send(username + ': ' + text.value);
    text.value = '';
}};
</script>"#,
            username = js_string(&user.username)
        ),
    )
}

pub fn not_found(user: Option<&SessionUser>) -> Response {
    let page = layout(
        "404 - Page Not Found",
        user,
        "<h1>404 - Page Not Found</h1>\n<a href=\"/\">Back home</a>",
    );
    reply::with_status(page, StatusCode::NOT_FOUND).into_response()
}

// JSON string literal that is also safe inside a <script> block.
fn js_string(raw: &str) -> String {
    serde_json::to_string(raw)
        .unwrap_or_else(|_| "\"\"".to_owned())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}
