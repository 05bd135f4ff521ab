//! Alert and summary message texts.

use pricetrack_core::types::{NotificationEvent, StockStatus, Tracking};

/// Render a notification event as a Telegram-Markdown message.
pub fn render_event(event: &NotificationEvent) -> String {
    match event {
        NotificationEvent::PriceAlert {
            tracking,
            old_price,
            new_price,
            change_percent,
        } => price_alert(tracking, *old_price, *new_price, *change_percent),
        NotificationEvent::StockAlert { tracking, status } => stock_alert(tracking, *status),
    }
}

fn product_title(tracking: &Tracking) -> String {
    escape_markdown(tracking.product_name.as_deref().unwrap_or("Tracked product"))
}

pub fn price_alert(tracking: &Tracking, old: f64, new: f64, change_percent: f64) -> String {
    let (emoji, change_text) = if new < old {
        ("📉", format!("dropped by {:.1}%", change_percent.abs()))
    } else {
        ("📈", format!("increased by {:.1}%", change_percent.abs()))
    };
    format!(
        "{emoji} *Price Alert!*\n\n\
         📦 *{}*\n\
         🏪 Platform: {}\n\n\
         💵 Old Price: {} {:.2}\n\
         💵 New Price: {} {:.2}\n\
         Change: {change_text}\n\n\
         🔗 {}",
        product_title(tracking),
        escape_markdown(&tracking.platform),
        tracking.currency,
        old,
        tracking.currency,
        new,
        tracking.product_url,
    )
}

pub fn stock_alert(tracking: &Tracking, status: StockStatus) -> String {
    let status_text = match status {
        StockStatus::OutOfStock => "Out of Stock",
        StockStatus::Unknown => "Availability unknown",
        StockStatus::InStock => "Back in Stock!",
    };
    format!(
        "⚠️ *Stock Alert!*\n\n\
         📦 *{}*\n\
         🏪 Platform: {}\n\n\
         📊 Status: *{status_text}*\n\n\
         🔗 {}",
        product_title(tracking),
        escape_markdown(&tracking.platform),
        tracking.product_url,
    )
}

/// Daily/weekly summary body from a user's trackings. Returns `None`
/// when no tracking moved since its previous check — no noise.
pub fn summary(title: &str, trackings: &[Tracking]) -> Option<String> {
    let mut drops: Vec<(&Tracking, f64)> = Vec::new();
    let mut increases: Vec<(&Tracking, f64)> = Vec::new();

    for tracking in trackings {
        let (Some(previous), Some(latest)) = (
            tracking.previous_price(),
            tracking.price_history.last().map(|p| p.price),
        ) else {
            continue;
        };
        if previous <= 0.0 || latest == previous {
            continue;
        }
        let change = ((latest - previous) / previous) * 100.0;
        if change < 0.0 {
            drops.push((tracking, change.abs()));
        } else {
            increases.push((tracking, change));
        }
    }

    if drops.is_empty() && increases.is_empty() {
        return None;
    }

    drops.sort_by(|a, b| b.1.total_cmp(&a.1));
    increases.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut message = format!("📊 *{title}*\n\n");
    if !drops.is_empty() {
        message.push_str("📉 *Price Drops:*\n");
        for (tracking, change) in drops.iter().take(5) {
            message.push_str(&format!(
                "• {} — {} {:.2} (-{change:.1}%)\n",
                product_title(tracking),
                tracking.currency,
                tracking.current_price.unwrap_or_default(),
            ));
        }
        message.push('\n');
    }
    if !increases.is_empty() {
        message.push_str("📈 *Price Increases:*\n");
        for (tracking, change) in increases.iter().take(5) {
            message.push_str(&format!(
                "• {} — {} {:.2} (+{change:.1}%)\n",
                product_title(tracking),
                tracking.currency,
                tracking.current_price.unwrap_or_default(),
            ));
        }
        message.push('\n');
    }
    message.push_str(&format!("📦 Total Tracked: {}", trackings.len()));
    Some(message)
}

/// Escape Telegram MarkdownV1 special characters.
pub fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}
