//! Mock MacPorts mirror on top of wiremock.

use super::fixtures::{PackageFixture, TEST_PUBKEY_PEM, sign};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockMirror {
    pub server: MockServer,
}

impl MockMirror {
    /// Start a mirror serving the fixture signing key
    pub async fn start() -> Self {
        Self::start_with_key(TEST_PUBKEY_PEM).await
    }

    pub async fn start_with_key(pem: &str) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/macports-pubkey.pem"))
            .respond_with(ResponseTemplate::new(200).set_body_string(pem))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn mirror_url(&self) -> String {
        format!("{}/packages", self.server.uri())
    }

    pub fn pubkey_url(&self) -> String {
        format!("{}/macports-pubkey.pem", self.server.uri())
    }

    /// Serve a directory listing for `name`
    pub async fn listing(&self, name: &str, filenames: &[String]) {
        let mut html = format!("<html><head><title>Index of /{}/</title></head><body><pre>\n", name);
        for f in filenames {
            html.push_str(&format!("<a href=\"{f}\">{f}</a>    16-Mar-2023 10:02   20K\n"));
        }
        html.push_str("</pre></body></html>\n");

        Mock::given(method("GET"))
            .and(path(format!("/packages/{}/", name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&self.server)
            .await;
    }

    /// Serve an artifact and a signature over `signed`
    pub async fn artifact(&self, pkg: &PackageFixture, signed: &[u8]) {
        let base = format!("/packages/{}/{}", pkg.name, pkg.filename());
        Mock::given(method("GET"))
            .and(path(base.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pkg.build()))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}.rmd160", base)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(sign(signed)))
            .mount(&self.server)
            .await;
    }

    /// Publish a correctly signed package as the only listing entry
    pub async fn publish(&self, pkg: &PackageFixture) {
        self.listing(&pkg.name, &[pkg.filename()]).await;
        self.artifact(pkg, &pkg.build()).await;
    }

    /// A listing for `name` that must never be requested
    pub async fn forbid(&self, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/packages/{}/", name)))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Number of `.tbz2` artifact downloads served so far
    pub async fn artifact_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with(".tbz2"))
            .count()
    }

    pub async fn total_requests(&self) -> usize {
        self.server.received_requests().await.unwrap_or_default().len()
    }
}
