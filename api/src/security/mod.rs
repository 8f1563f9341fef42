use actix_cors::Cors;
use actix_web::http;

pub fn configure_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ])
        .max_age(3600);

    if allowed_origins.is_empty() {
        // Default to the local frontend dev server
        cors = cors.allowed_origin("http://localhost:5173");
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
