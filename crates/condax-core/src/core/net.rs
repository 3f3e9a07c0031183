use std::fs::File;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::config::DownloadConfig;
use crate::{CondaError, Result};

const USER_AGENT: &str = concat!("condax/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_http_client(url: &str, config: &DownloadConfig) -> Result<Client> {
    // The blocking client applies `timeout` to the request and to each body
    // read, so it doubles as a read timeout for long installer downloads.
    let builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout);
    let builder = if config.keep_proxies {
        builder
    } else {
        builder.no_proxy()
    };
    builder
        .build()
        .map_err(|err| CondaError::download(url, err))
}

/// Stream `url` into `dest`, truncating whatever is there.
pub(crate) fn download_to(url: &str, dest: &Path, config: &DownloadConfig) -> Result<u64> {
    let client = build_http_client(url, config)?;
    info!(%url, "downloading conda installer");
    let mut response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|err| CondaError::download(url, err))?;
    let mut file = File::create(dest).map_err(|err| CondaError::download(url, err))?;
    let written = response
        .copy_to(&mut file)
        .map_err(|err| CondaError::download(url, err))?;
    file.sync_all().map_err(|err| CondaError::download(url, err))?;
    debug!(%url, bytes = written, dest = %dest.display(), "download complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::request, responders::status_code, Expectation, Server};
    use std::fs;

    #[test]
    fn download_writes_response_body() {
        let body = "#!/bin/sh\necho installer\n";
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/Miniconda3.sh"))
                .respond_with(status_code(200).body(body)),
        );
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("installer.sh");
        let url = server.url("/Miniconda3.sh").to_string();

        let written = download_to(&url, &dest, &DownloadConfig::default()).unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(fs::read_to_string(&dest).unwrap(), body);
    }

    #[test]
    fn http_error_status_is_a_download_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/missing.sh"))
                .respond_with(status_code(404)),
        );
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("installer.sh");
        let url = server.url("/missing.sh").to_string();

        let err = download_to(&url, &dest, &DownloadConfig::default()).unwrap_err();

        assert!(
            matches!(err, CondaError::Download { url: ref failed, .. } if failed == &url),
            "unexpected error {err:?}"
        );
        assert!(!dest.exists(), "no file should be written on HTTP errors");
    }
}
