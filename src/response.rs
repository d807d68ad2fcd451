use hyper::{header, Response, StatusCode};

use crate::{body::Body, listing::escape_html};

const HTML_UTF8: &str = "text/html;charset=utf-8";

fn html(status: StatusCode, page: String, is_head: bool) -> Response<Body> {
    let len = page.len();
    let body = if is_head { Body::Empty } else { Body::full(page) };
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(HTML_UTF8));
    headers.insert(header::CONTENT_LENGTH, len.into());
    resp
}

/// Error page for `status`; `explain` is a short human readable message.
pub fn error(status: StatusCode, explain: &str, is_head: bool) -> Response<Body> {
    let reason = status.canonical_reason().unwrap_or("Unknown");
    let page = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Error response</title>\n</head>\n<body>\n<h1>Error response</h1>\n\
         <p>Error code: {}</p>\n<p>Message: {}.</p>\n<p>Error code explanation: {} - {}.</p>\n\
         </body>\n</html>\n",
        status.as_u16(),
        escape_html(reason),
        status.as_u16(),
        escape_html(explain),
    );
    html(status, page, is_head)
}

pub fn not_implemented(method: &hyper::Method) -> Response<Body> {
    let mut resp = error(
        StatusCode::NOT_IMPLEMENTED,
        &format!("Unsupported method ('{}')", method),
        false,
    );
    resp.headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("GET, HEAD"));
    resp
}

pub fn redirect(location: &str) -> Response<Body> {
    let mut resp = Response::new(Body::Empty);
    *resp.status_mut() = StatusCode::MOVED_PERMANENTLY;
    if let Ok(location) = header::HeaderValue::from_str(location) {
        resp.headers_mut().insert(header::LOCATION, location);
    }
    resp.headers_mut().insert(header::CONTENT_LENGTH, header::HeaderValue::from_static("0"));
    resp
}

pub fn listing(page: String, is_head: bool) -> Response<Body> {
    html(StatusCode::OK, page, is_head)
}
