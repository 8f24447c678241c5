use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::debug;
use url::Url;

use super::{AuthFlowController, CallbackParams, MemorySessionStorage, Token};
use crate::error::{FitbitError, FitbitResult};

const SUCCESS_HTML: &str = r#"<html><body><h1>Fitbit authorization complete</h1><p>You may close this window and return to the terminal.</p></body></html>"#;
const ERROR_HTML: &str = r#"<html><body><h1>Fitbit authorization failed</h1><p>Please return to the terminal for details.</p></body></html>"#;

/// Run the authorization-code flow against a loopback listener bound to the
/// configured redirect URI, which must point at this machine.
pub async fn run_loopback_flow<F>(
    flow: &AuthFlowController,
    open_browser: bool,
    notify_authorization_url: F,
) -> FitbitResult<Token>
where
    F: Fn(&Url) -> FitbitResult<()>,
{
    let redirect_uri = flow.oauth().config().redirect_uri.clone();
    let host = redirect_uri
        .host_str()
        .ok_or_else(|| FitbitError::InvalidAuthorizationResponse("redirect URI has no host".into()))?
        .to_owned();
    let port = redirect_uri.port_or_known_default().unwrap_or(80);
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    debug!(%host, port, "listening for authorization redirect");

    let session = MemorySessionStorage::new();
    let auth_url = flow.begin(&session)?;

    notify_authorization_url(&auth_url)?;

    if open_browser {
        open::that(auth_url.as_str()).map_err(|err| FitbitError::BrowserLaunch(err.to_string()))?;
    }

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = accept_callback(listener).await;
        let _ = tx.send(result);
    });

    let (mut stream, params) = rx.await.map_err(|_| FitbitError::ListenerClosed)??;

    let result = match &params.error {
        Some(reason) => Err(FitbitError::AccessDenied(reason.clone())),
        None => flow.complete(&params, &session).await,
    };

    finish(&mut stream, result).await
}

/// Report the outcome to the browser. A failed reply never replaces the flow's result.
async fn finish<W>(stream: &mut W, result: FitbitResult<Token>) -> FitbitResult<Token>
where
    W: AsyncWrite + Unpin,
{
    let (status, body) = match result {
        Ok(_) => (200, SUCCESS_HTML),
        Err(_) => (400, ERROR_HTML),
    };
    if let Err(err) = respond(stream, status, body).await {
        debug!(error = %err, "failed to write authorization reply");
    }
    let _ = stream.shutdown().await;
    result
}

async fn accept_callback(listener: TcpListener) -> FitbitResult<(TcpStream, CallbackParams)> {
    let (mut stream, _addr) = listener.accept().await?;
    let mut buffer = [0u8; 4096];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);
    let path = parse_request_path(&request)?;
    let url = Url::parse(&format!("http://localhost{path}"))?;
    Ok((stream, CallbackParams::from_url(&url)))
}

fn parse_request_path(request: &str) -> FitbitResult<&str> {
    let first_line = request.lines().next().ok_or_else(|| {
        FitbitError::InvalidAuthorizationResponse("missing request line".into())
    })?;
    let mut parts = first_line.split_whitespace();
    let _method = parts
        .next()
        .ok_or_else(|| FitbitError::InvalidAuthorizationResponse("missing method".into()))?;
    let path = parts
        .next()
        .ok_or_else(|| FitbitError::InvalidAuthorizationResponse("missing path".into()))?;
    Ok(path)
}

async fn respond<W>(stream: &mut W, status: u16, body: &str) -> FitbitResult<()>
where
    W: AsyncWrite + Unpin,
{
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let response = format!(
        "{status_line}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    Ok(())
}
