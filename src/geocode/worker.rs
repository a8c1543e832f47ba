use std::thread;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, info};

use super::{GeocodeError, Geocoder, Place};

pub enum Request {
    /// Autocomplete for a partially typed query
    Suggest {
        generation: u64,
        query: String,
        limit: usize,
    },
    /// Full lookup of the region to highlight
    Region { query: String },
}

pub enum Response {
    Suggestions {
        generation: u64,
        result: Result<Vec<Place>, GeocodeError>,
    },
    Region {
        query: String,
        result: Result<Place, GeocodeError>,
    },
}

/// Runs a geocoder on a background thread so lookups never stall the UI.
/// The thread exits once the worker is dropped.
pub struct GeocodeWorker {
    requests: Sender<Request>,
    responses: Receiver<Response>,
}

impl GeocodeWorker {
    pub fn spawn(geocoder: Box<dyn Geocoder + Send>) -> Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (response_tx, response_rx) = crossbeam_channel::unbounded();

        thread::Builder::new()
            .name("geocoder".into())
            .spawn(move || serve(geocoder.as_ref(), request_rx, response_tx))?;

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
        })
    }

    /// Queue a request. Returns false if the worker thread has gone away.
    pub fn send(&self, request: Request) -> bool {
        self.requests.send(request).is_ok()
    }

    /// Next finished response, if any
    pub fn try_recv(&self) -> Option<Response> {
        match self.responses.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

fn serve(geocoder: &dyn Geocoder, requests: Receiver<Request>, responses: Sender<Response>) {
    while let Ok(request) = requests.recv() {
        // Only the newest pending suggestion matters
        let request = match request {
            Request::Suggest { .. } => latest_suggestion(request, &requests),
            other => other,
        };

        let response = match request {
            Request::Suggest {
                generation,
                query,
                limit,
            } => {
                debug!("Suggest #{} {:?}", generation, query);
                Response::Suggestions {
                    generation,
                    result: geocoder.suggest(&query, limit),
                }
            }
            Request::Region { query } => {
                info!("Looking up region {:?}", query);
                let result = geocoder.lookup_region(&query);
                Response::Region { query, result }
            }
        };

        if responses.send(response).is_err() {
            break;
        }
    }
    debug!("Geocoder worker stopped");
}

/// Drain queued suggestion requests, keeping the last one.
/// A region request found while draining takes precedence and the pending
/// suggestion is dropped.
fn latest_suggestion(mut current: Request, requests: &Receiver<Request>) -> Request {
    for next in requests.try_iter() {
        match next {
            Request::Suggest { .. } => current = next,
            region @ Request::Region { .. } => return region,
        }
    }
    current
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// Geocoder that answers from canned data and records queries
    pub(crate) struct FakeGeocoder {
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl Geocoder for FakeGeocoder {
        fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Place>, GeocodeError> {
            self.calls.lock().unwrap().push(format!("suggest:{query}"));
            Ok((0..limit.min(2))
                .map(|i| Place {
                    display_name: format!("{query} {i}"),
                    lat: 0.0,
                    lon: 0.0,
                    bbox: None,
                    geometry: None,
                })
                .collect())
        }

        fn lookup_region(&self, query: &str) -> Result<Place, GeocodeError> {
            self.calls.lock().unwrap().push(format!("region:{query}"));
            if query == "Atlantis" {
                return Err(GeocodeError::NoGeometry);
            }
            let geometry = geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![10.0, 46.0],
                vec![12.0, 46.0],
                vec![12.0, 47.0],
                vec![10.0, 46.0],
            ]]));
            Ok(Place {
                display_name: query.to_string(),
                lat: 46.5,
                lon: 11.0,
                bbox: None,
                geometry: Some(geometry),
            })
        }
    }

    fn recv_within(worker: &GeocodeWorker, timeout: Duration) -> Option<Response> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(response) = worker.try_recv() {
                return Some(response);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_region_request_round_trip() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let worker = GeocodeWorker::spawn(Box::new(FakeGeocoder { calls: calls.clone() })).unwrap();

        assert!(worker.send(Request::Region {
            query: "Tyrol".into()
        }));
        match recv_within(&worker, Duration::from_secs(5)) {
            Some(Response::Region { query, result }) => {
                assert_eq!(query, "Tyrol");
                assert_eq!(result.unwrap().display_name, "Tyrol");
            }
            _ => panic!("expected a region response"),
        }
        assert_eq!(*calls.lock().unwrap(), vec!["region:Tyrol".to_string()]);
    }

    #[test]
    fn test_suggestions_carry_generation() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let worker = GeocodeWorker::spawn(Box::new(FakeGeocoder { calls })).unwrap();

        worker.send(Request::Suggest {
            generation: 7,
            query: "Zerm".into(),
            limit: 5,
        });
        match recv_within(&worker, Duration::from_secs(5)) {
            Some(Response::Suggestions { generation, result }) => {
                assert_eq!(generation, 7);
                assert_eq!(result.unwrap().len(), 2);
            }
            _ => panic!("expected suggestions"),
        }
    }

    #[test]
    fn test_latest_suggestion_wins() {
        let (tx, rx) = crossbeam_channel::unbounded();
        for generation in 2..=4 {
            tx.send(Request::Suggest {
                generation,
                query: format!("q{generation}"),
                limit: 5,
            })
            .unwrap();
        }
        let first = Request::Suggest {
            generation: 1,
            query: "q1".into(),
            limit: 5,
        };
        match latest_suggestion(first, &rx) {
            Request::Suggest { generation, .. } => assert_eq!(generation, 4),
            Request::Region { .. } => panic!("expected a suggestion"),
        }
    }

    #[test]
    fn test_region_request_not_dropped_while_draining() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Request::Region { query: "Valais".into() }).unwrap();
        let first = Request::Suggest {
            generation: 1,
            query: "Val".into(),
            limit: 5,
        };
        assert!(matches!(latest_suggestion(first, &rx), Request::Region { .. }));
    }
}
