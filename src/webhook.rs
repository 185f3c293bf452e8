use tracing::warn;

async fn post_embed(webhook_url: &str, payload: serde_json::Value) {
    let client = match reqwest::Client::builder().build() {
        Ok(c) => c,
        Err(e) => {
            warn!("[Webhook] Failed to build HTTP client: {}", e);
            return;
        }
    };
    if let Err(e) = client.post(webhook_url).json(&payload).send().await {
        warn!("[Webhook] Failed to send webhook: {}", e);
    }
}

fn embed(title: &str, color: u32, fields: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "embeds": [{
            "title": title,
            "color": color,
            "fields": fields,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }]
    })
}

pub async fn send_webhook_logged_on(account: &str, steam3: &str, webhook_url: &str) {
    let payload = embed(
        "✓ Crate bot online",
        0x00ff00,
        serde_json::json!([
            {"name": "Account", "value": account, "inline": true},
            {"name": "Steam ID", "value": steam3, "inline": true},
        ]),
    );
    post_embed(webhook_url, payload).await;
}

pub async fn send_webhook_offer_received(
    partner: &str,
    offer_id: &str,
    item_names: &[String],
    webhook_url: &str,
) {
    let items = if item_names.is_empty() {
        "unknown".to_string()
    } else {
        item_names.join(", ")
    };
    let payload = embed(
        "📥 Offer Accepted",
        0x00ff99,
        serde_json::json!([
            {"name": "Partner", "value": partner, "inline": true},
            {"name": "Offer", "value": offer_id, "inline": true},
            {"name": "Received", "value": items, "inline": false},
        ]),
    );
    post_embed(webhook_url, payload).await;
}

pub async fn send_webhook_crates_sent(
    partner: &str,
    series: &str,
    offer_url: &str,
    webhook_url: &str,
) {
    let payload = embed(
        "📦 Crates Sent",
        0x0099ff,
        serde_json::json!([
            {"name": "Partner", "value": partner, "inline": true},
            {"name": "Series", "value": series, "inline": true},
            {"name": "Offer", "value": offer_url, "inline": false},
        ]),
    );
    post_embed(webhook_url, payload).await;
}
