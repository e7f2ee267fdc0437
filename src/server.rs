//! Native host: actix-web in front of the same router the Spin component uses.

use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config::{bind_addr, seed_demo_data_enabled};
use crate::core::db::seed_demo_data;
use crate::core::store::MemoryStore;
use crate::router::route;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn spin_method(method: &str) -> Option<Method> {
        Some(match method {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => return None,
        })
    }

    pub fn actix_to_spin_request(req: &HttpRequest, method: Method, body: actix_web::web::Bytes) -> Request {
        let uri = req.uri().to_string();

        let mut builder = Request::builder();
        builder.method(method).uri(uri);

        // Copy headers
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = spin_resp.body().to_vec();

        let mut response = actix_web::HttpResponse::build(status);
        if body.is_empty() {
            response.finish()
        } else {
            response.content_type("application/json").body(body)
        }
    }
}

async fn handle_all(req: HttpRequest, body: web::Bytes, store: web::Data<MemoryStore>) -> HttpResponse {
    let method = match adapter::spin_method(req.method().as_str()) {
        Some(m) => m,
        None => {
            return HttpResponse::MethodNotAllowed()
                .json(serde_json::json!({"error": "Method not allowed"}))
        }
    };

    let spin_req = adapter::actix_to_spin_request(&req, method, body);
    adapter::spin_to_actix_response(route(store.get_ref(), spin_req))
}

/// Builds a server on an already-bound listener; the caller drives the returned future.
pub fn build(listener: TcpListener, store: web::Data<MemoryStore>) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .default_service(web::route().to(handle_all))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub async fn run() -> std::io::Result<()> {
    let store = web::Data::new(MemoryStore::new());

    if seed_demo_data_enabled() {
        if let Err(err) = seed_demo_data(store.get_ref()) {
            tracing::error!("Failed to seed demo data: {}", err);
        }
    }

    let addr = bind_addr();
    let listener = TcpListener::bind(&addr)?;
    tracing::info!("Server listening on http://{}", addr);

    build(listener, store)?.await
}
