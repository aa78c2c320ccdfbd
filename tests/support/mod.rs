//! Scripted HTTP origin for integration tests
//!
//! Serves reader pages and page images from a `tiny_http` server on a
//! background thread, records every request path in arrival order and tracks
//! how many requests are being answered at once.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use manga_fetcher::app::{ClientConfig, Endpoints};

/// How the stub answers one path
#[derive(Debug, Clone)]
pub enum StubResponse {
    Html(String),
    Bytes(Vec<u8>),
    Status(u16),
    Delayed(Duration, Box<StubResponse>),
    /// Answers in order; the last step repeats once the others are used up
    Sequence(Vec<StubResponse>),
}

pub struct StubServer {
    pub base_url: String,
    /// `127.0.0.1:<port>`, usable as a resolved resource path
    pub authority: String,
    routes: Arc<Mutex<HashMap<String, StubResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start stub origin");
        let authority = server.server_addr().to_string();
        let base_url = format!("http://{authority}");

        let routes: Arc<Mutex<HashMap<String, StubResponse>>> = Arc::default();
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = {
            let routes = Arc::clone(&routes);
            let requests = Arc::clone(&requests);
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);

            thread::spawn(move || loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                requests.lock().unwrap().push(path.clone());
                let response = match routes.lock().unwrap().get_mut(&path) {
                    Some(StubResponse::Sequence(steps)) if steps.len() > 1 => steps.remove(0),
                    Some(StubResponse::Sequence(steps)) => {
                        steps.first().cloned().unwrap_or(StubResponse::Status(404))
                    }
                    Some(response) => response.clone(),
                    None => StubResponse::Status(404),
                };

                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(current, Ordering::SeqCst);

                let in_flight = Arc::clone(&in_flight);
                thread::spawn(move || {
                    let mut response = response;
                    while let StubResponse::Delayed(delay, inner) = response {
                        thread::sleep(delay);
                        response = *inner;
                    }
                    // Released before the body goes out, so the count never
                    // exceeds the requests the client still holds open
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    let _ = match response {
                        StubResponse::Html(body) => request.respond(
                            tiny_http::Response::from_string(body).with_header(
                                tiny_http::Header::from_bytes(
                                    &b"Content-Type"[..],
                                    &b"text/html; charset=utf-8"[..],
                                )
                                .expect("build header"),
                            ),
                        ),
                        StubResponse::Bytes(bytes) => {
                            request.respond(tiny_http::Response::from_data(bytes))
                        }
                        StubResponse::Status(code) => request.respond(
                            tiny_http::Response::from_string("stub").with_status_code(code),
                        ),
                        StubResponse::Delayed(..) => unreachable!("delays are unwrapped above"),
                        StubResponse::Sequence(_) => unreachable!("sequences are stepped on receipt"),
                    };
                });
            })
        };

        Self {
            base_url,
            authority,
            routes,
            requests,
            in_flight,
            max_in_flight,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn route(&self, path: impl Into<String>, response: StubResponse) {
        self.routes.lock().unwrap().insert(path.into(), response);
    }

    /// Every request path received so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|path| path.starts_with(prefix))
            .count()
    }

    /// Largest number of requests answered at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Endpoints pointing both lookups and images at this server
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.base_url.clone(), "http").expect("stub endpoints")
    }

    /// Serve a readable chapter: reader page plus `pages` images
    pub fn serve_chapter(&self, slug: &str, code: &str, pages: u32, advertise_count: bool) {
        let count = advertise_count.then_some(pages);
        self.route(
            lookup_path(slug, code),
            StubResponse::Html(reader_page(Some(&self.authority), count)),
        );
        for page in 1..=pages {
            self.route(image_path(slug, code, page), StubResponse::Bytes(page_bytes(page)));
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn lookup_path(slug: &str, code: &str) -> String {
    format!("/read-online/{slug}-chapter-{code}.html")
}

pub fn fallback_path(slug: &str, code: &str) -> String {
    format!("/read-online/{slug}-chapter-{code}-index-2.html")
}

pub fn image_path(slug: &str, code: &str, page: u32) -> String {
    format!("/manga/{slug}/{code}-{page:03}.png")
}

/// A reader page, optionally naming the resource host and the page count
pub fn reader_page(resource_path: Option<&str>, page_count: Option<u32>) -> String {
    let mut script = String::new();
    if let Some(count) = page_count {
        script.push_str(&format!(
            "vm.CurChapter = {{\"Chapter\":\"100010\",\"Type\":\"Chapter\",\"Page\":\"{count}\",\"Directory\":\"\"}};\n"
        ));
    }
    if let Some(path) = resource_path {
        script.push_str(&format!("vm.CurPathName = \"{path}\";\n"));
    }

    format!(
        "<!DOCTYPE html>\n<html><head><title>Reader</title></head>\n<body>\n<div id=\"reader\"></div>\n<script>\n{script}</script>\n</body></html>\n"
    )
}

pub fn page_bytes(page: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(format!("page-{page:03}").as_bytes());
    bytes
}

/// Client settings that never throttle a test
pub fn test_client_config() -> ClientConfig {
    ClientConfig {
        rate_limit_rps: 10_000,
        request_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}
