//! Capture boundary
//!
//! The engine never renders pages itself. A [`Renderer`] (a headless browser
//! driver, or the [`snapshot`] replayer) produces one [`Capture`] per
//! [`RenderState`]; [`capture_rendered_page`] runs those renders concurrently
//! and merges them into a single [`RenderedPage`].

#[cfg(feature = "snapshot")]
pub mod snapshot;

use crate::dom::DomNode;
use crate::page::{ElementGeometry, RenderState, RenderedPage, Screenshot};
use crate::{CaptureConfig, Error, Result, Viewport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Output of a single render
#[derive(Debug, Clone)]
pub struct Capture {
    pub screenshot: Screenshot,
    /// Interactive components located in `screenshot`
    pub elements: Vec<ElementGeometry>,
    /// DOM text tree, if this render exported one
    pub dom: Option<DomNode>,
}

/// A blocking page renderer.
///
/// Implementations are called from tokio's blocking pool, possibly for
/// several states at once.
pub trait Renderer: Send + Sync {
    fn render(&self, url: &Url, state: RenderState, viewport: Viewport) -> Result<Capture>;
}

/// Render `url` once per requested state and assemble the page.
///
/// Renders run concurrently, at most `config.max_concurrent_renders` at a
/// time. Each state must be rendered within `config.timeout_ms`, counted
/// from the start of the capture and including the wait for a free render
/// slot. The first timeout or render failure aborts the whole capture and
/// drops the renders still pending; no partial page is returned.
pub async fn capture_rendered_page<R>(
    renderer: Arc<R>,
    url: &str,
    states: &[RenderState],
    config: &CaptureConfig,
) -> Result<RenderedPage>
where
    R: Renderer + ?Sized + 'static,
{
    let parsed = Url::parse(url).map_err(|e| Error::InvalidPage(format!("bad url `{}`: {}", url, e)))?;

    let mut wanted: Vec<RenderState> = Vec::with_capacity(states.len());
    for s in states {
        if !wanted.contains(s) {
            wanted.push(*s);
        }
    }
    if wanted.is_empty() {
        return Err(Error::ConfigError("no render states requested".to_string()));
    }

    let permits = Arc::new(Semaphore::new(config.max_concurrent_renders.max(1)));
    let deadline = Duration::from_millis(config.timeout_ms);
    let viewport = config.viewport;

    let jobs = wanted.iter().map(|&state| {
        let renderer = Arc::clone(&renderer);
        let permits = Arc::clone(&permits);
        let url = parsed.clone();
        let job = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| Error::RenderFailure(format!("capture pool closed: {}", e)))?;
            log::debug!("rendering {} ({})", url, state);
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                renderer.render(&url, state, viewport)
            });
            match handle.await {
                Err(join) => Err(Error::RenderFailure(format!("{} render panicked: {}", state, join))),
                Ok(res) => res.map(|capture| (state, capture)),
            }
        };
        async move {
            tokio::time::timeout(deadline, job)
                .await
                .unwrap_or_else(|_| Err(Error::RenderTimeout(deadline.as_millis() as u64)))
        }
    });

    let captures = futures::future::try_join_all(jobs).await?;
    assemble(url, captures)
}

/// Merge per-state captures. Elements are re-tagged with the state they were
/// captured in; the DOM comes from the default capture when there is one.
fn assemble(url: &str, captures: Vec<(RenderState, Capture)>) -> Result<RenderedPage> {
    let mut fallback_dom = None;
    let mut default_dom = None;
    let mut screenshots = Vec::with_capacity(captures.len());
    let mut elements = Vec::new();

    for (state, capture) in captures {
        match (state, capture.dom) {
            (RenderState::Default, Some(dom)) => default_dom = Some(dom),
            (_, Some(dom)) if fallback_dom.is_none() => fallback_dom = Some(dom),
            _ => {}
        }
        elements.extend(capture.elements.into_iter().map(|el| el.in_state(state)));
        screenshots.push((state, capture.screenshot));
    }

    let dom = default_dom
        .or(fallback_dom)
        .ok_or_else(|| Error::RenderFailure("no capture exported a DOM tree".to_string()))?;

    let mut page = RenderedPage::new(url, dom);
    for (state, shot) in screenshots {
        page = page.with_screenshot(state, shot);
    }
    page.elements = elements;
    Ok(page)
}
