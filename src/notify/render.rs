//! Message rendering for the chat layer
//!
//! All output is Telegram HTML; every value that came from the data source
//! or the user passes through `escape_html`.

use chrono::{DateTime, Utc};

use crate::core::commands::{
    CommandError, GraduatingToken, Monitored, SubscriptionSummary, TokenStatus, TrendingToken,
};
use crate::core::evaluator::AlertKind;
use crate::notify::Notification;

const PROGRESS_SEGMENTS: usize = 20;
const EXAMPLE_ADDRESS: &str = "2Z4FzKBcw48KBD2PaR4wtxo4sYGbS7QqTQCLoQnUpump";

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 20-segment bar, one segment per 5%; out-of-range progress saturates
pub fn progress_bar(progress: f64) -> String {
    let filled = if progress.is_finite() {
        ((progress / 5.0).floor().max(0.0) as usize).min(PROGRESS_SEGMENTS)
    } else {
        0
    };
    format!(
        "▓{}{}▓",
        "█".repeat(filled),
        "░".repeat(PROGRESS_SEGMENTS - filled)
    )
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Whole dollars with thousands separators: `$1,234,567`
pub fn format_usd(value: f64) -> String {
    let rounded = value.round();
    let grouped = group_thousands(rounded.abs() as u64);
    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// First and last 8 characters: `2Z4FzKBc...oQnUpump`
pub fn short_mint(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{}...{}", head, tail)
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn label(name: Option<&str>, symbol: Option<&str>) -> String {
    format!(
        "{} ({})",
        escape_html(name.unwrap_or("Unknown")),
        escape_html(symbol.unwrap_or("Unknown"))
    )
}

/// Threshold crossing alert
pub fn alert(notification: &Notification) -> String {
    let token = escape_html(&notification.token_address);
    let mut message = match notification.kind {
        AlertKind::BondingCurve if notification.graduated => format!(
            "🎓 <b>Graduation Alert!</b>\n\nToken: <code>{}</code>\nBonding curve complete: <b>{:.1}%</b>\n",
            token, notification.current_value
        ),
        AlertKind::BondingCurve => format!(
            "🚨 <b>Bonding Curve Alert!</b>\n\nToken: <code>{}</code>\n📈 Crossed {}%: <b>{:.1}%</b>\n",
            token, notification.threshold, notification.current_value
        ),
        AlertKind::MarketCap => format!(
            "💥 <b>Market Cap Alert!</b>\n\nToken: <code>{}</code>\n📊 Crossed {}: <b>{}</b>\n",
            token,
            format_usd(notification.threshold),
            format_usd(notification.current_value)
        ),
    };

    if let Some(progress) = notification.progress {
        message.push_str(&format!("{} {:.1}%\n", progress_bar(progress), progress));
    }
    if notification.kind != AlertKind::MarketCap {
        if let Some(cap) = notification.market_cap {
            message.push_str(&format!("📊 Market Cap: {}\n", format_usd(cap)));
        }
    }
    message.push_str(&format!("⏰ {}", timestamp(&notification.timestamp)));
    message
}

/// On-demand token status
pub fn status(status: &TokenStatus) -> String {
    let mut message = format!(
        "📊 <b>Token Status</b>\n\n🏷️ Address: <code>{}</code>\n\n",
        escape_html(&status.token_address)
    );

    if status.name.is_some() || status.symbol.is_some() {
        message.push_str(&format!(
            "📛 <b>{}</b>\n",
            label(status.name.as_deref(), status.symbol.as_deref())
        ));
    }
    if let Some(price) = status.price_usd {
        message.push_str(&format!("💰 Price: ${:.8}\n", price));
    }
    if let Some(price) = status.price_quote {
        message.push_str(&format!("🪙 Price (SOL): {:.8}\n", price));
    }
    if let Some(cap) = status.market_cap {
        message.push_str(&format!("📊 Market Cap: {}\n", format_usd(cap)));
    }

    if let Some(progress) = status.progress {
        message.push_str(&format!("\n📈 <b>Bonding Curve Progress: {:.1}%</b>\n", progress));
        if let Some(balance) = status.balance {
            message.push_str(&format!("🏦 Token Balance: {}\n", group_thousands(balance)));
        }
        if let Some(liquidity) = status.quote_liquidity {
            message.push_str(&format!("💧 SOL Liquidity: {:.2}\n", liquidity));
        }
        message.push_str(&format!("{} {:.1}%\n", progress_bar(progress), progress));

        if status.graduated {
            message.push_str("\n🎓 <b>Token has graduated!</b>\n");
        } else if status.about_to_graduate {
            message.push_str("\n🚨 <b>Token is about to graduate!</b>\n");
        }
    }

    if status.progress.is_none() && status.market_cap.is_none() {
        message.push_str("❌ No data available for this token.\n");
    }

    message.push_str(&format!("\n⏰ {}", timestamp(&status.observed_at)));
    message
}

/// The user's monitoring list
pub fn list(rows: &[SubscriptionSummary]) -> String {
    if rows.is_empty() {
        return "📝 You are not monitoring any tokens.".to_string();
    }

    let mut message = format!("📝 <b>Monitored Tokens ({})</b>\n\n", rows.len());
    for (i, row) in rows.iter().enumerate() {
        message.push_str(&format!(
            "{}. <code>{}</code>\n",
            i + 1,
            escape_html(&short_mint(&row.token_address))
        ));
        if row.progress.is_none() && row.market_cap.is_none() {
            message.push_str("   ⏳ Waiting for first poll...\n\n");
            continue;
        }
        if let Some(cap) = row.market_cap {
            message.push_str(&format!("   📊 Market Cap: {}\n", format_usd(cap)));
        }
        if let Some(progress) = row.progress {
            message.push_str(&format!("   📈 Bonding: {:.1}%\n", progress));
        }
        if row.graduated {
            message.push_str("   🎓 Graduated\n");
        }
        message.push('\n');
    }
    message
}

pub fn trending(rows: &[TrendingToken]) -> String {
    if rows.is_empty() {
        return "📊 No trending tokens found at the moment.".to_string();
    }

    let mut message = "🔥 <b>Trending Tokens</b>\n\n".to_string();
    for (i, row) in rows.iter().enumerate() {
        message.push_str(&format!(
            "{}. <b>{}</b>\n   🏷️ <code>{}</code>\n   💰 ${:.8}\n   📊 {}\n\n",
            i + 1,
            label(row.name.as_deref(), row.symbol.as_deref()),
            escape_html(&short_mint(&row.token_address)),
            row.price_usd,
            format_usd(row.market_cap)
        ));
    }
    message
}

pub fn graduating(rows: &[GraduatingToken], cutoff: f64) -> String {
    if rows.is_empty() {
        return "🎓 No tokens about to graduate found at the moment.".to_string();
    }

    let mut message = format!("🎓 <b>About to Graduate ({:.0}%+)</b>\n\n", cutoff);
    for (i, row) in rows.iter().enumerate() {
        message.push_str(&format!(
            "{}. <b>{}</b>\n   🏷️ <code>{}</code>\n   📈 Bonding: {:.1}%\n",
            i + 1,
            label(row.name.as_deref(), row.symbol.as_deref()),
            escape_html(&short_mint(&row.token_address)),
            row.progress
        ));
        if let Some(liquidity) = row.quote_liquidity {
            message.push_str(&format!("   💧 SOL Liquidity: {:.2}\n", liquidity));
        }
        message.push('\n');
    }
    message
}

pub fn help(graduating_cutoff: f64) -> String {
    format!(
        "🎯 <b>Solana Bonding Curve Monitor</b>\n\n\
         Tracks bonding curve progress and market cap of pump.fun tokens and alerts you \
         when they cross configured thresholds.\n\n\
         <b>Commands</b>\n\
         • /monitor &lt;token_address&gt; - Start monitoring a token\n\
         • /unmonitor &lt;token_address&gt; - Stop monitoring a token\n\
         • /status &lt;token_address&gt; - Current token status\n\
         • /list - Your monitored tokens\n\
         • /trending - Trending tokens by market cap\n\
         • /graduating - Tokens about to graduate ({:.0}%+ bonding curve)\n\
         • /help - Show this message\n\n\
         Example: <code>/monitor {}</code>",
        graduating_cutoff, EXAMPLE_ADDRESS
    )
}

pub fn monitoring_started(monitored: &Monitored) -> String {
    let token = escape_html(&monitored.token_address);
    if monitored.created {
        format!("🔄 Started monitoring <code>{}</code>", token)
    } else {
        format!("ℹ️ Already monitoring <code>{}</code>", token)
    }
}

pub fn monitoring_stopped(token_address: &str) -> String {
    format!("✅ Stopped monitoring <code>{}</code>", escape_html(token_address))
}

pub fn usage(command: &str) -> String {
    format!(
        "❌ Please provide a token address.\nUsage: <code>/{} &lt;token_address&gt;</code>",
        command
    )
}

pub fn unknown_command() -> String {
    "❓ Unknown command. Send /help for the list of commands.".to_string()
}

pub fn command_error(error: &CommandError) -> String {
    match error {
        CommandError::InvalidTokenAddress(reason) => format!(
            "❌ Invalid token address: {}.\nSolana addresses are 32-44 base58 characters.",
            escape_html(reason)
        ),
        CommandError::NotSubscribed(token) => format!(
            "❌ You are not monitoring <code>{}</code>",
            escape_html(token)
        ),
        CommandError::Source(e) => format!(
            "⚠️ Could not fetch token data right now: {}",
            escape_html(&e.to_string())
        ),
    }
}
