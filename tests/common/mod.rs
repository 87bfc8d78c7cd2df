#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, Method, Request, StatusCode,
    },
    Router,
};
use std::{collections::BTreeMap, sync::Arc};
use tower::ServiceExt;
use warbler::{
    credentials::Credentials,
    models::{Follows, Message, SignupForm, User},
    store::{DynStore, MemoryStore, Store},
    warbler::{
        router,
        session::{create_session, SESSION_COOKIE_NAME},
        AuthConfig, AuthState,
    },
};

/// Argon2 with minimal costs so the suites stay fast.
pub fn cheap_credentials() -> Credentials {
    Credentials::with_costs(8, 1, 1).unwrap()
}

pub async fn signup(store: &dyn Store, username: &str, email: &str, password: &str) -> User {
    User::signup(
        store,
        &cheap_credentials(),
        SignupForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            image_url: None,
        },
    )
    .await
    .unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Router over a fresh [`MemoryStore`], plus a client with a cookie jar.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<AuthState>,
    router: Router,
    cookies: BTreeMap<String, String>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(AuthState::new(AuthConfig::new(), cheap_credentials()));
        let dyn_store: DynStore = store.clone();
        let router = router(dyn_store, auth.clone());
        Self {
            store,
            auth,
            router,
            cookies: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Log in as `user_id` without going through the login form.
    pub async fn login_as(&mut self, user_id: i64) {
        let token = create_session(self.store(), self.auth.config(), user_id)
            .await
            .unwrap();
        self.cookies.insert(SESSION_COOKIE_NAME.to_string(), token);
    }

    pub fn cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    /// POST with no body and no content type.
    pub async fn post_empty(&mut self, path: &str) -> TestResponse {
        self.send(Method::POST, path, None).await
    }

    pub async fn post_form(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn get_following_redirects(&mut self, path: &str) -> TestResponse {
        let response = self.get(path).await;
        self.follow_redirects(response).await
    }

    pub async fn post_form_following_redirects(
        &mut self,
        path: &str,
        form: &[(&str, &str)],
    ) -> TestResponse {
        let response = self.post_form(path, form).await;
        self.follow_redirects(response).await
    }

    async fn follow_redirects(&mut self, mut response: TestResponse) -> TestResponse {
        for _ in 0..5 {
            if !response.status.is_redirection() {
                break;
            }
            let location = response
                .headers
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap()
                .to_string();
            response = self.get(&location).await;
        }
        response
    }

    async fn send(&mut self, method: Method, path: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, cookie);
        }
        let request = match form {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        for set_cookie in headers.get_all(SET_COOKIE) {
            self.store_cookie(set_cookie.to_str().unwrap());
        }

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    fn store_cookie(&mut self, set_cookie: &str) {
        let mut attributes = set_cookie.split(';');
        let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let expired = attributes.any(|attr| attr.trim().eq_ignore_ascii_case("Max-Age=0"));
        if expired || value.is_empty() {
            self.cookies.remove(name.trim());
        } else {
            self.cookies
                .insert(name.trim().to_string(), value.trim().to_string());
        }
    }
}

/// Three users: testuser follows testuser2, testuser2 follows testuser3,
/// and testuser has one message.
pub struct Fixture {
    pub app: TestApp,
    pub testuser: User,
    pub testuser2: User,
    pub testuser3: User,
    pub message: Message,
}

impl Fixture {
    pub async fn new() -> Self {
        let app = TestApp::new();
        let store = app.store();

        let testuser = signup(store, "testuser", "test@test.com", "testuser").await;
        let testuser2 = signup(store, "testuser2", "test2@test.com", "testuser2").await;
        let testuser3 = signup(store, "testuser3", "test3@test.com", "testuser3").await;

        let message = Message::create(store, testuser.id, "test message")
            .await
            .unwrap();
        store
            .insert_follow(Follows::new(testuser.id, testuser2.id))
            .await
            .unwrap();
        store
            .insert_follow(Follows::new(testuser2.id, testuser3.id))
            .await
            .unwrap();

        Self {
            app,
            testuser,
            testuser2,
            testuser3,
            message,
        }
    }
}
