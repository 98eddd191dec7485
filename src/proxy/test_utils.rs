//! Test utilities for proxy module testing
//!
//! A scripted in-process upstream plus a builder that wires it into a full
//! [`ProxyService`] with an in-memory cache.

#[cfg(test)]
pub mod test_helpers {
    use crate::config::ProxySettings;
    use crate::domain::types::CacheTtlHours;
    use crate::proxy::cache::{InMemoryCacheStore, TtlCache};
    use crate::proxy::cache_writer::{CacheWriteOutcome, CacheWriter};
    use crate::proxy::types::*;
    use crate::proxy::upstream::UpstreamFetcher;
    use crate::proxy::ProxyService;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// GML with two brokers around (127.0, 37.5), one listed twice
    pub const BROKER_GML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:sop="https://www.vworld.kr">
  <gml:featureMember>
    <sop:dt_d170>
      <sop:bsnm_cmpnm>Far Realty</sop:bsnm_cmpnm>
      <sop:jurirno>R-2</sop:jurirno>
      <sop:x_crdnt>127.0</sop:x_crdnt>
      <sop:y_crdnt>37.505</sop:y_crdnt>
    </sop:dt_d170>
  </gml:featureMember>
  <gml:featureMember>
    <sop:dt_d170>
      <sop:bsnm_cmpnm>Near Realty</sop:bsnm_cmpnm>
      <sop:jurirno>R-1</sop:jurirno>
      <sop:x_crdnt>127.0</sop:x_crdnt>
      <sop:y_crdnt>37.5001</sop:y_crdnt>
    </sop:dt_d170>
  </gml:featureMember>
  <gml:featureMember>
    <sop:dt_d170>
      <sop:bsnm_cmpnm>Near Realty (branch listing)</sop:bsnm_cmpnm>
      <sop:jurirno>R-1</sop:jurirno>
      <sop:x_crdnt>127.0</sop:x_crdnt>
      <sop:y_crdnt>37.5002</sop:y_crdnt>
    </sop:dt_d170>
  </gml:featureMember>
</wfs:FeatureCollection>"#;

    /// Well-formed collection without features
    pub const EMPTY_GML: &str = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs"></wfs:FeatureCollection>"#;

    pub fn response(status: u16, content_type: &str, body: &str) -> UpstreamResponse {
        UpstreamResponse {
            status,
            content_type: Some(content_type.to_string()),
            body: Bytes::from(body.to_string()),
        }
    }

    type Reply = Arc<dyn Fn() -> ProxyResult<UpstreamResponse> + Send + Sync>;

    /// Upstream double answering by URL substring, first match wins
    #[derive(Default)]
    pub struct FakeUpstream {
        routes: Mutex<Vec<(String, Reply)>>,
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl FakeUpstream {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn respond(&self, url_contains: &str, reply: UpstreamResponse) {
            self.routes
                .lock()
                .push((url_contains.to_string(), Arc::new(move || Ok(reply.clone()))));
        }

        pub fn fail(&self, url_contains: &str, make: fn() -> ProxyError) {
            self.routes
                .lock()
                .push((url_contains.to_string(), Arc::new(move || Err(make()))));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn calls(&self) -> Vec<(String, Duration)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl UpstreamFetcher for FakeUpstream {
        async fn fetch(&self, url: &str, timeout: Duration) -> ProxyResult<UpstreamResponse> {
            self.calls.lock().push((url.to_string(), timeout));

            let reply = self
                .routes
                .lock()
                .iter()
                .find(|(pattern, _)| url.contains(pattern.as_str()))
                .map(|(_, reply)| Arc::clone(reply));

            match reply {
                Some(reply) => reply(),
                None => Ok(response(404, "text/plain", "no route")),
            }
        }
    }

    /// A proxy wired to `upstream`, with its cache and writer observable
    pub struct TestProxy {
        pub service: Arc<ProxyService>,
        pub store: Arc<InMemoryCacheStore>,
        pub outcomes: mpsc::UnboundedReceiver<CacheWriteOutcome>,
        _shutdown: mpsc::Sender<()>,
    }

    impl TestProxy {
        pub fn new(upstream: Arc<FakeUpstream>) -> Self {
            Self::with_settings(upstream, &ProxySettings::default())
        }

        pub fn with_settings(upstream: Arc<FakeUpstream>, settings: &ProxySettings) -> Self {
            let store = Arc::new(InMemoryCacheStore::new());
            let (outcome_tx, outcomes) = mpsc::unbounded_channel();
            let (writer, handle, shutdown) =
                CacheWriter::new(store.clone(), 16, Some(outcome_tx));
            tokio::spawn(writer.run());

            let cache = TtlCache::new(store.clone(), CacheTtlHours::default());
            let service = Arc::new(ProxyService::new(settings, cache, handle, upstream));

            Self {
                service,
                store,
                outcomes,
                _shutdown: shutdown,
            }
        }

        /// Wait for the next background cache write
        pub async fn next_write(&mut self) -> CacheWriteOutcome {
            tokio::time::timeout(Duration::from_secs(1), self.outcomes.recv())
                .await
                .expect("cache write within a second")
                .expect("writer still running")
        }
    }
}
