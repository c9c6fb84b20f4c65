use std::collections::HashMap;
use std::fmt;

use framewire_source::{FrameError, ResultBody, SharedSink, SharedSource};
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::message::{ExecuteBody, Reply, Request, RequestType};

/// Answers one request type. Receives the request body, if any.
pub type Handler = Box<dyn Fn(Option<&ResultBody>) -> Result<Reply> + Send + Sync>;

/// Maps request tags to handlers.
///
/// Shared by every session of a server; handlers must synchronize access to
/// whatever they share.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `tag`.
    pub fn route(
        mut self,
        tag: impl Into<String>,
        handler: impl Fn(Option<&ResultBody>) -> Result<Reply> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(tag.into(), Box::new(handler));
        self
    }

    /// Serve `metadata`, `frame` and `execute` from `source`.
    ///
    /// `result` is answered with `notImplemented` until a sink is attached
    /// with [`Router::with_sink`].
    ///
    /// A `frame` request advances the source and returns the new frame. Sources
    /// that keep frames in [`Bytes`](bytes::Bytes) are answered without copying.
    pub fn for_source(source: SharedSource) -> Self {
        let metadata_source = SharedSource::clone(&source);
        let frame_source = SharedSource::clone(&source);
        let execute_source = source;

        Router::new()
            .route(RequestType::Metadata.as_str(), move |_| {
                let metadata = metadata_source.lock().map_err(FrameError::from)?.metadata()?;
                Reply::json(&metadata)
            })
            .route(RequestType::Frame.as_str(), move |_| {
                let mut source = frame_source.lock().map_err(FrameError::from)?;
                source.next_frame()?;
                Ok(Reply::Binary(source.frame_bytes()?))
            })
            .route(RequestType::Execute.as_str(), move |body| {
                let body: ExecuteBody = parse_body(RequestType::Execute, body)?;
                debug!(action = %body.action, "executing action");
                execute_source
                    .lock()
                    .map_err(FrameError::from)?
                    .execute(&body.action)?;
                Ok(Reply::ack())
            })
            .route(RequestType::Result.as_str(), |_| {
                Err(FrameError::NotImplemented("no results sink attached".to_string()).into())
            })
    }

    /// Forward `result` bodies to `sink`.
    pub fn with_sink(self, sink: SharedSink) -> Self {
        self.route(RequestType::Result.as_str(), move |body| {
            let body = body.ok_or_else(|| {
                ProtocolError::MalformedRequest("result request without a body".to_string())
            })?;
            sink.lock().map_err(FrameError::from)?.send(body)?;
            Ok(Reply::ack())
        })
    }

    /// Run the handler for `request`.
    pub fn dispatch(&self, request: &Request) -> Result<Reply> {
        let handler = self
            .handlers
            .get(&request.request)
            .ok_or_else(|| ProtocolError::UnknownRequest(request.request.clone()))?;
        handler(request.body.as_ref())
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("tags", &self.tags()).finish()
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(
    kind: RequestType,
    body: Option<&ResultBody>,
) -> Result<T> {
    let body = body.ok_or_else(|| ProtocolError::MalformedRequest(format!("{kind} request without a body")))?;
    serde_json::from_value(serde_json::Value::Object(body.clone()))
        .map_err(|err| ProtocolError::MalformedRequest(format!("{kind} body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use framewire_image::{ColorSpace, DataLayout, ElementType, ImageMetadata};
    use framewire_source::{
        shared_sink, shared_source, HandoffSource, MemorySink, Pattern, PatternSource, Publish,
    };
    use serde_json::json;
    use std::thread;
    use std::time::Duration;

    fn router_with_sink() -> (Router, MemorySink) {
        let metadata = ImageMetadata::new(4, 3, ColorSpace::Rgb, DataLayout::Planar, ElementType::Uint8);
        let source = shared_source(PatternSource::new(metadata, Pattern::Ramp));
        let sink = MemorySink::new();
        let router = Router::for_source(source).with_sink(shared_sink(sink.clone()));
        (router, sink)
    }

    #[test]
    fn metadata_reply_is_wire_json() {
        let (router, _) = router_with_sink();
        let reply = router.dispatch(&Request::metadata()).unwrap();
        match reply {
            Reply::Json(value) => {
                assert_eq!(value["width"], 4);
                assert_eq!(value["colorSpace"], "RGB");
                assert_eq!(value["dataType"], "uint8");
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn frame_reply_advances_source() {
        let (router, _) = router_with_sink();
        let first = router.dispatch(&Request::frame()).unwrap();
        let second = router.dispatch(&Request::frame()).unwrap();
        match (first, second) {
            (Reply::Binary(a), Reply::Binary(b)) => {
                assert_eq!(a.len(), 36);
                assert_ne!(a, b);
            }
            other => panic!("unexpected replies {other:?}"),
        }
    }

    #[test]
    fn frame_reply_shares_producer_buffer() {
        let metadata = ImageMetadata::new(2, 2, ColorSpace::Grayscale, DataLayout::Planar, ElementType::Uint8);
        let (source, producer) = HandoffSource::new(metadata.clone(), Duration::from_secs(5));
        let router = Router::for_source(shared_source(source));

        let published = Bytes::from(vec![1u8, 2, 3, 4]);
        let sent = published.clone();
        let worker = thread::spawn(move || {
            let ticket = producer.wait_for_request().unwrap();
            producer.publish(ticket, metadata, sent)
        });

        let reply = router.dispatch(&Request::frame()).unwrap();
        assert_eq!(worker.join().unwrap(), Publish::Delivered);
        match reply {
            Reply::Binary(data) => {
                assert_eq!(data, published);
                assert_eq!(data.as_ptr(), published.as_ptr());
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn result_reaches_sink() {
        let (router, sink) = router_with_sink();
        let body = json!({"status": "success"}).as_object().cloned().unwrap();
        assert_eq!(router.dispatch(&Request::result(body.clone())).unwrap(), Reply::ack());
        assert_eq!(sink.received(), vec![body]);
    }

    #[test]
    fn source_errors_do_not_end_the_session() {
        let (router, _) = router_with_sink();
        let err = router.dispatch(&Request::execute("zoom")).unwrap_err();
        assert!(!err.ends_session());
        assert!(matches!(err, ProtocolError::Source(FrameError::UnsupportedAction(_))));
    }

    #[test]
    fn protocol_violations_end_the_session() {
        let (router, _) = router_with_sink();
        let unknown = Request {
            request: "teleport".to_string(),
            body: None,
        };
        assert!(router.dispatch(&unknown).unwrap_err().ends_session());

        let no_action = Request::new(RequestType::Execute, Some(ResultBody::new()));
        assert!(matches!(
            router.dispatch(&no_action),
            Err(ProtocolError::MalformedRequest(_))
        ));
    }

    #[test]
    fn result_without_sink_is_not_implemented() {
        let metadata = ImageMetadata::new(1, 1, ColorSpace::Grayscale, DataLayout::Planar, ElementType::Uint8);
        let router = Router::for_source(shared_source(PatternSource::new(metadata, Pattern::Checker)));
        let err = router.dispatch(&Request::result(ResultBody::new())).unwrap_err();
        assert!(matches!(err, ProtocolError::Source(FrameError::NotImplemented(_))));
        assert_eq!(router.tags(), vec!["execute", "frame", "metadata", "result"]);
    }
}
