//! Open a page, print its interaction tree and click the first button
//!
//! Start Chrome with `--remote-debugging-port=9222`, then pass the browser
//! WebSocket URL from `http://localhost:9222/json/version`:
//!
//! ```text
//! cargo run -p interact-browser --example interaction_tree -- ws://localhost:9222/devtools/browser/<id> https://example.com
//! ```

use interact_browser::cdp::CDPEvent;
use interact_browser::{CDPClient, CDPSession, InteractionSession};
use interact_dom::{DomSerializer, TypeCode};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let cdp_url = args
        .next()
        .unwrap_or_else(|| "ws://localhost:9222/devtools/browser".to_string());
    let page_url = args
        .next()
        .unwrap_or_else(|| "https://example.com".to_string());

    println!("Connecting to Chrome at: {}", cdp_url);
    let client = CDPClient::connect(&cdp_url).await?;

    client.subscribe(
        "Page.frameNavigated",
        Arc::new(|event: CDPEvent| {
            tracing::info!(params = ?event.params, "frame navigated; identifiers are now stale");
        }),
    );

    let page = CDPSession::open(client.clone(), &page_url).await?;
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
    println!("Attached to {} ({})", page.url, page.title);

    let mut session = InteractionSession::new(page);
    let extraction = session.extract().await?;

    println!("{}", DomSerializer::new().to_text(&extraction.descriptors));
    println!("report: {}", serde_json::to_string(&extraction.report)?);

    if let Some(first) = extraction
        .descriptors
        .iter()
        .find(|d| d.kind == TypeCode::Button || d.kind == TypeCode::Link)
    {
        println!("Clicking [{}] {:?}", first.id, first.label);
        session.click(first.id).await?;
        tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;

        // Whatever the click did, old identifiers only resolve if their markers survived
        match session.click(first.id).await {
            Ok(()) => println!("[{}] still present", first.id),
            Err(e) if e.is_stale() => println!("[{}] is stale: {}", first.id, e),
            Err(e) => return Err(e.into()),
        }
    }

    client.close().await?;
    println!("Disconnected");

    Ok(())
}
