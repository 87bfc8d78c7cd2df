//! Server-side HTML rendering.
//!
//! Pages are assembled with `format!`; every user-supplied value goes through
//! [`escape`]. Handles render as `<p>@name</p>` in user cards and as the
//! `sidebar-username` heading on profiles. The navigation bar never shows the
//! current user's handle.

use axum::{
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::fmt::Write;

use super::{
    flash::{clear_flash_cookie, Flash},
    visitor::Visitor,
};
use crate::{
    models::{Message, User, MAX_MESSAGE_LEN},
    store::AuthoredMessage,
};

/// Counts and relationship shown in a profile header.
#[derive(Clone, Debug)]
pub struct Profile<'a> {
    pub user: &'a User,
    pub messages: usize,
    pub following: usize,
    pub followers: usize,
    /// Whether the viewer follows `user`; `None` when the viewer is anonymous
    /// or is `user`.
    pub viewer_follows: Option<bool>,
    pub is_viewer: bool,
}

/// Sticky values for a re-rendered signup form.
#[derive(Clone, Debug, Default)]
pub struct SignupValues<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub image_url: &'a str,
}

#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full HTML response for `visitor`; a rendered flash is cleared.
pub fn render(visitor: &Visitor, status: StatusCode, title: &str, content: &str) -> Response {
    let body = layout(visitor.user.as_ref(), visitor.flash.as_ref(), title, content);
    let mut headers = HeaderMap::new();
    if visitor.flash.is_some() {
        headers.insert(SET_COOKIE, clear_flash_cookie());
    }
    (status, headers, Html(body)).into_response()
}

/// Error page rendered without a visitor.
pub fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let content = format!(
        r#"<div class="error-page"><h1>{status_code}</h1><h2>{title}</h2><p>{message}</p><a href="/">Go home</a></div>"#,
        status_code = status.as_u16(),
        title = escape(title),
        message = escape(message),
    );
    (status, Html(layout(None, None, title, &content))).into_response()
}

fn layout(user: Option<&User>, flash: Option<&Flash>, title: &str, content: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<li><form class="search" action="/users" method="GET"><input name="q" placeholder="Search Warbler"><button>Search</button></form></li>
<li><a href="/users/{id}"><img src="{image}" alt="{username}"></a></li>
<li><a href="/messages/new">New Message</a></li>
<li><a href="/logout">Log out</a></li>"#,
            id = user.id,
            image = escape(user.image()),
            username = escape(&user.username),
        ),
        None => r#"<li><a href="/signup">Sign up</a></li>
<li><a href="/login">Log in</a></li>"#
            .to_string(),
    };

    let flash = flash.map_or_else(String::new, |flash| {
        format!(
            r#"<div class="alert alert-{category}">{message}</div>"#,
            category = escape(&flash.category),
            message = escape(&flash.message),
        )
    });

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<nav class="navbar">
<a href="/" class="navbar-brand">Warbler</a>
<ul class="nav">
{nav}
</ul>
</nav>
<main class="container">
{flash}
{content}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

#[must_use]
pub fn landing() -> String {
    r#"<div class="home-hero">
<h1>What's Happening?</h1>
<h4>New to Warbler?</h4>
<a href="/signup" class="btn btn-primary">Sign up now</a>
<a href="/login" class="btn btn-outline">Log in</a>
</div>"#
        .to_string()
}

/// Home timeline for a logged-in user.
#[must_use]
pub fn home(profile: &Profile<'_>, timeline: &[AuthoredMessage]) -> String {
    let mut messages = String::new();
    for entry in timeline {
        messages.push_str(&message_item(&entry.message, &entry.author));
    }
    format!(
        r#"<div class="row">
{sidebar}
<section class="timeline">
<ul class="list-group" id="messages">
{messages}
</ul>
</section>
</div>"#,
        sidebar = sidebar(profile),
    )
}

fn sidebar(profile: &Profile<'_>) -> String {
    let user = profile.user;
    format!(
        r#"<aside class="sidebar">
<img src="{image}" alt="Image for {username}" id="sidebar-image">
<h4 id="sidebar-username">@{username}</h4>
<ul class="user-stats">
<li><a href="/users/{id}">Messages <span>{messages}</span></a></li>
<li><a href="/users/{id}/following">Following <span>{following}</span></a></li>
<li><a href="/users/{id}/followers">Followers <span>{followers}</span></a></li>
</ul>
{actions}
</aside>"#,
        image = escape(user.image()),
        username = escape(&user.username),
        id = user.id,
        messages = profile.messages,
        following = profile.following,
        followers = profile.followers,
        actions = profile_actions(profile),
    )
}

fn profile_actions(profile: &Profile<'_>) -> String {
    let id = profile.user.id;
    if profile.is_viewer {
        return r#"<form method="POST" action="/users/delete" class="delete-account"><button class="btn btn-danger">Delete Profile</button></form>"#
            .to_string();
    }
    match profile.viewer_follows {
        Some(true) => format!(
            r#"<form method="POST" action="/users/stop-following/{id}"><button class="btn btn-primary">Unfollow</button></form>"#
        ),
        Some(false) => format!(
            r#"<form method="POST" action="/users/follow/{id}"><button class="btn btn-outline-primary">Follow</button></form>"#
        ),
        None => String::new(),
    }
}

fn user_card(user: &User) -> String {
    format!(
        r#"<div class="card user-card">
<a href="/users/{id}">
<img src="{image}" alt="Image for {username}" class="card-image">
<p>@{username}</p>
</a>
</div>"#,
        id = user.id,
        image = escape(user.image()),
        username = escape(&user.username),
    )
}

fn user_cards(users: &[User]) -> String {
    users.iter().fold(String::new(), |mut out, user| {
        let _ = writeln!(out, "{}", user_card(user));
        out
    })
}

/// Search results, or everyone when no query was given.
#[must_use]
pub fn users_index(users: &[User], query: Option<&str>) -> String {
    if users.is_empty() {
        let query = query.unwrap_or_default();
        return format!(
            r#"<h3>Sorry, no users found matching "{query}"</h3>"#,
            query = escape(query)
        );
    }
    format!(
        r#"<div class="user-cards">
{cards}
</div>"#,
        cards = user_cards(users)
    )
}

/// Profile page listing the user's own messages.
#[must_use]
pub fn user_show(profile: &Profile<'_>, messages: &[Message]) -> String {
    let items = messages.iter().fold(String::new(), |mut out, message| {
        out.push_str(&message_item(message, profile.user));
        out
    });
    format!(
        r#"<div class="row">
{sidebar}
<section class="messages">
<ul class="list-group" id="messages">
{items}
</ul>
</section>
</div>"#,
        sidebar = sidebar(profile),
    )
}

/// Profile header followed by user cards, for the following and followers pages.
#[must_use]
pub fn user_relations(profile: &Profile<'_>, heading: &str, users: &[User]) -> String {
    format!(
        r#"<div class="row">
{sidebar}
<section class="user-cards">
<h3>{heading}</h3>
{cards}
</section>
</div>"#,
        sidebar = sidebar(profile),
        heading = escape(heading),
        cards = user_cards(users),
    )
}

fn message_item(message: &Message, author: &User) -> String {
    format!(
        r#"<li class="list-group-item">
<a href="/messages/{id}" class="message-link"></a>
<a href="/users/{user_id}"><img src="{image}" alt="Image for {username}" class="timeline-image"></a>
<div class="message-area">
<a href="/users/{user_id}">@{username}</a>
<span class="text-muted">{timestamp}</span>
<p>{text}</p>
</div>
</li>
"#,
        id = message.id,
        user_id = author.id,
        image = escape(author.image()),
        username = escape(&author.username),
        timestamp = message.timestamp.format("%d %B %Y"),
        text = escape(&message.text),
    )
}

/// A single message with a delete button for its owner.
#[must_use]
pub fn message_show(message: &Message, author: &User, viewer: Option<&User>) -> String {
    let delete = if viewer.is_some_and(|viewer| message.is_owned_by(viewer.id)) {
        format!(
            r#"<form method="POST" action="/messages/{id}/delete"><button class="btn btn-outline-danger">Delete</button></form>"#,
            id = message.id
        )
    } else {
        String::new()
    };
    format!(
        r#"<div class="message-detail">
<ul class="list-group">
{item}
</ul>
{delete}
</div>"#,
        item = message_item(message, author),
    )
}

#[must_use]
pub fn message_form(error: Option<&str>, text: &str) -> String {
    format!(
        r#"<div class="form-message">
<h2>Add my message!</h2>
{error}
<form method="POST" action="/messages/new">
<textarea name="text" maxlength="{MAX_MESSAGE_LEN}" placeholder="What's happening?">{text}</textarea>
<button class="btn btn-success">Add my message!</button>
</form>
</div>"#,
        error = form_error(error),
        text = escape(text),
    )
}

#[must_use]
pub fn signup_form(error: Option<&str>, values: &SignupValues<'_>) -> String {
    format!(
        r#"<div class="form-signup">
<h2>Join Warbler today.</h2>
{error}
<form method="POST" action="/signup">
<input name="username" placeholder="Username" value="{username}" required>
<input name="email" type="email" placeholder="E-mail" value="{email}" required>
<input name="password" type="password" placeholder="Password" minlength="6" required>
<input name="image_url" placeholder="(Optional) Image URL" value="{image_url}">
<button class="btn btn-primary">Sign me up!</button>
</form>
</div>"#,
        error = form_error(error),
        username = escape(values.username),
        email = escape(values.email),
        image_url = escape(values.image_url),
    )
}

#[must_use]
pub fn login_form(error: Option<&str>, username: &str) -> String {
    format!(
        r#"<div class="form-login">
<h2>Welcome back.</h2>
{error}
<form method="POST" action="/login">
<input name="username" placeholder="Username" value="{username}" required>
<input name="password" type="password" placeholder="Password" required>
<button class="btn btn-primary">Log in</button>
</form>
</div>"#,
        error = form_error(error),
        username = escape(username),
    )
}

fn form_error(error: Option<&str>) -> String {
    error.map_or_else(String::new, |error| {
        format!(
            r#"<div class="alert alert-danger form-error">{}</div>"#,
            escape(error)
        )
    })
}
