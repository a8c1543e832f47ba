use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use tracing::debug;

use super::{GeocodeError, Geocoder, Place};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenStreetMap Nominatim search client
pub struct Nominatim {
    client: Client,
    search_url: String,
}

impl Nominatim {
    /// `base_url` is the service root, e.g. `https://nominatim.openstreetmap.org`.
    /// The service rejects requests without an identifying user agent.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, GeocodeError> {
        Ok(Self::with_client(client_builder(user_agent).build()?, base_url))
    }

    fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            search_url: search_url(base_url),
        }
    }

    fn search(&self, params: &[(&str, &str)]) -> Result<Vec<Place>, GeocodeError> {
        debug!("GET {} {:?}", self.search_url, params);
        let response = self.client.get(&self.search_url).query(params).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        parse_places(&response.text()?)
    }
}

fn client_builder(user_agent: &str) -> ClientBuilder {
    Client::builder().user_agent(user_agent).timeout(REQUEST_TIMEOUT)
}

fn search_url(base_url: &str) -> String {
    format!("{}/search", base_url.trim_end_matches('/'))
}

impl Geocoder for Nominatim {
    fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Place>, GeocodeError> {
        let limit = limit.to_string();
        self.search(&[
            ("format", "json"),
            ("addressdetails", "1"),
            ("limit", &limit),
            ("q", query),
        ])
    }

    fn lookup_region(&self, query: &str) -> Result<Place, GeocodeError> {
        let places = self.search(&[("q", query), ("format", "json"), ("polygon_geojson", "1")])?;
        first_with_geometry(places)
    }
}

/// Decode a search response body
pub fn parse_places(body: &str) -> Result<Vec<Place>, GeocodeError> {
    Ok(serde_json::from_str(body)?)
}

/// Only the top result counts; it must carry a geometry
fn first_with_geometry(places: Vec<Place>) -> Result<Place, GeocodeError> {
    places
        .into_iter()
        .next()
        .filter(|p| p.geometry.is_some())
        .ok_or(GeocodeError::NoGeometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_search_url_trims_slash() {
        assert_eq!(
            search_url("https://nominatim.openstreetmap.org/"),
            "https://nominatim.openstreetmap.org/search"
        );
        assert_eq!(search_url("http://localhost:8080"), "http://localhost:8080/search");
    }

    #[test]
    fn test_empty_result_has_no_geometry() {
        let places = parse_places("[]").unwrap();
        assert!(matches!(first_with_geometry(places), Err(GeocodeError::NoGeometry)));
    }

    #[test]
    fn test_only_first_result_is_considered() {
        let places = parse_places(
            r#"[
                {"lat": "46.0", "lon": "7.0", "display_name": "No shape"},
                {"lat": "46.0", "lon": "7.0", "display_name": "Shape",
                 "geojson": {"type": "Point", "coordinates": [7.0, 46.0]}}
            ]"#,
        )
        .unwrap();
        assert!(matches!(first_with_geometry(places), Err(GeocodeError::NoGeometry)));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        assert!(matches!(parse_places("<html>"), Err(GeocodeError::Decode(_))));
    }

    #[test]
    fn test_client_builds() {
        assert!(Nominatim::new("https://nominatim.openstreetmap.org", "ski-map-test/0.1").is_ok());
    }

    /// Serve one canned HTTP response on loopback; the handle yields the
    /// request head (request line and headers) as received.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            head
        });

        (base_url, handle)
    }

    /// Production client settings, minus any proxy from the environment
    fn local_client(base_url: &str) -> Nominatim {
        let client = client_builder("ski-map-test/1").no_proxy().build().unwrap();
        Nominatim::with_client(client, base_url)
    }

    const TYROL: &str = r#"[{"lat": "47.2", "lon": "11.4", "display_name": "Tyrol, Austria",
        "geojson": {"type": "Polygon",
                    "coordinates": [[[10.1, 46.6], [12.9, 46.6], [12.9, 47.7], [10.1, 46.6]]]}}]"#;

    #[test]
    fn test_suggest_request_line_and_user_agent() {
        let (base_url, server) = serve_once("200 OK", TYROL);
        let nominatim = local_client(&base_url);

        let places = nominatim.suggest("Zerm", 5).unwrap();
        assert_eq!(places[0].display_name, "Tyrol, Austria");

        let head = server.join().unwrap();
        let request_line = head.lines().next().unwrap();
        assert_eq!(
            request_line,
            "GET /search?format=json&addressdetails=1&limit=5&q=Zerm HTTP/1.1"
        );
        assert!(head.to_lowercase().contains("user-agent: ski-map-test/1\r\n"));
    }

    #[test]
    fn test_region_request_is_percent_encoded() {
        let (base_url, server) = serve_once("200 OK", TYROL);
        let nominatim = local_client(&base_url);

        let place = nominatim.lookup_region("São Paulo & co").unwrap();
        assert!(place.geometry.is_some());

        let head = server.join().unwrap();
        assert_eq!(
            head.lines().next().unwrap(),
            "GET /search?q=S%C3%A3o+Paulo+%26+co&format=json&polygon_geojson=1 HTTP/1.1"
        );
    }

    #[test]
    fn test_error_status_is_reported() {
        let (base_url, server) = serve_once("503 Service Unavailable", "");
        let nominatim = local_client(&base_url);

        assert!(matches!(nominatim.lookup_region("Tyrol"), Err(GeocodeError::Status(503))));
        server.join().unwrap();
    }
}
