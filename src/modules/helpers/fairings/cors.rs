use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Request, Response};

/// Adds the cross origin headers to every response.
pub struct CORS {
    pub origins: Vec<String>,
}

impl CORS {
    pub fn new(origins: Vec<String>) -> CORS {
        CORS { origins }
    }

    /// the value for `Access-Control-Allow-Origin`, if the origin may read the response
    pub fn allowed_origin(&self, origin: Option<&str>) -> Option<String> {
        if self.origins.iter().any(|allowed| allowed == "*") {
            return Some("*".to_string());
        }

        let origin = origin?;
        self.origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/') == origin.trim_end_matches('/'))
            .then(|| origin.to_string())
    }
}

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(allowed) = self.allowed_origin(request.headers().get_one("Origin")) else {
            return;
        };

        response.set_header(Header::new("Access-Control-Allow-Origin", allowed));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Vary", "Origin"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_allows_everyone() {
        let cors = CORS::new(vec!["*".to_string()]);
        assert_eq!(cors.allowed_origin(None), Some("*".to_string()));
    }

    #[test]
    fn listed_origins_only() {
        let cors = CORS::new(vec!["https://kaizenlap.example/".to_string()]);
        assert_eq!(
            cors.allowed_origin(Some("https://kaizenlap.example")),
            Some("https://kaizenlap.example".to_string())
        );
        assert_eq!(cors.allowed_origin(Some("https://other.example")), None);
        assert_eq!(cors.allowed_origin(None), None);
    }
}
