//! Chat message templates
//!
//! All text uses Telegram's legacy `Markdown` parse mode. Anything that comes
//! from upstream goes through [`escape_markdown`], or [`bold`] when it is
//! shown in bold.

use polygram_core::{short_address, Market, PnlSummary, Position, ADDRESS_FORMAT};

use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const CB_ENTER_WALLET: &str = "enter_wallet";
pub const CB_WALLET_HELP: &str = "wallet_help";
pub const CB_BACK_TO_CONNECT: &str = "back_to_connect";
pub const CB_CONFIRM_WALLET: &str = "confirm_wallet:";
pub const CB_DISMISS_WALLET: &str = "dismiss_wallet";

const EXAMPLE_ADDRESS: &str = "0x742d35Cc6634C0532925a3b8D4C9db96590c6C87";

pub fn welcome() -> String {
    "🎯 *Welcome to Polygram!*\n\n\
     Your Polymarket companion. I can show you:\n\n\
     📊 *Positions* - your open Polymarket positions\n\
     💰 *PNL* - profit and loss across your wallet\n\
     🏪 *Markets* - the most traded markets right now\n\n\
     *Commands:*\n\
     /start - This message\n\
     /help - Detailed help\n\
     /connect - Link your wallet\n\
     /positions - Your current positions\n\
     /pnl - Your profit and loss\n\
     /markets - Active markets\n\
     /status - Connection status\n\n\
     Use /connect to get started!"
        .to_string()
}

pub fn help() -> String {
    "🆘 *Polygram Help*\n\n\
     *Commands:*\n\
     • /start - Overview\n\
     • /help - This message\n\
     • /connect - Link your Polymarket wallet\n\
     • /positions - Open positions with current price and PNL\n\
     • /pnl - Realized and unrealized profit and loss\n\
     • /markets - Active markets by 24h volume\n\
     • /status - Bot and wallet status\n\n\
     *Connecting a wallet:*\n\
     1. Send /connect\n\
     2. Tap *Enter Wallet Address* and paste your address\n\
     3. Use /positions and /pnl\n\n\
     Only your public address is needed. Polygram reads public data and never asks for keys."
        .to_string()
}

pub fn connect_prompt() -> String {
    "🔗 *Connect Your Polymarket Wallet*\n\n\
     I need the Polygon wallet address you use with Polymarket.\n\n\
     Tap *Enter Wallet Address* below, or just send the address now.\n\n\
     ⚠️ *Security Note:*\n\
     • Only your public address is needed\n\
     • Never share private keys or seed phrases\n\
     • This bot only reads public data"
        .to_string()
}

pub fn connect_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::callback("📝 Enter Wallet Address", CB_ENTER_WALLET)],
            vec![InlineKeyboardButton::callback(
                "❓ What is my wallet address?",
                CB_WALLET_HELP,
            )],
        ],
    }
}

pub fn enter_wallet_prompt() -> String {
    format!(
        "📝 *Enter Your Wallet Address*\n\n\
         Send your Polygon wallet address in the next message.\n\n\
         *Format:* {ADDRESS_FORMAT}\n\
         *Example:* `{EXAMPLE_ADDRESS}`\n\n\
         ⚠️ Only send your PUBLIC address. Never share private keys or seed phrases."
    )
}

pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::callback(
            "🔙 Back to Connect Options",
            CB_BACK_TO_CONNECT,
        )]],
    }
}

pub fn wallet_help() -> String {
    format!(
        "❓ *What is my wallet address?*\n\n\
         It is the public Polygon address you use with Polymarket.\n\n\
         🦊 *MetaMask:* open the extension and click your account name to copy it.\n\
         🔗 *Other wallets:* look for a *Receive* or *Account* section.\n\
         💡 *Polymarket:* your profile page shows the connected address.\n\n\
         *Example:* `{EXAMPLE_ADDRESS}`\n\n\
         Addresses are public information. Never share your private key."
    )
}

pub fn wallet_help_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::callback(
                "📝 I found my address",
                CB_ENTER_WALLET,
            )],
            vec![InlineKeyboardButton::callback(
                "🔙 Back to Connect Options",
                CB_BACK_TO_CONNECT,
            )],
        ],
    }
}

pub fn wallet_connected(address: &str) -> String {
    format!(
        "✅ *Wallet Connected!*\n\n\
         📍 *Address:* `{}`\n\n\
         You can now use:\n\
         • /positions - View your positions\n\
         • /pnl - Check your profit/loss\n\
         • /status - Check connection status",
        short_address(address)
    )
}

pub fn invalid_address(input: &str) -> String {
    format!(
        "❌ *That doesn't look like a wallet address.*\n\n\
         Received: `{}`\n\
         Expected: {ADDRESS_FORMAT}\n\
         Example: `{EXAMPLE_ADDRESS}`\n\n\
         Please send your address again.",
        truncate(&input.replace('`', "'"), 64)
    )
}

pub fn confirm_wallet(address: &str) -> String {
    format!(
        "👀 That looks like a wallet address: `{}`\n\n\
         Do you want to connect it?",
        short_address(address)
    )
}

pub fn confirm_wallet_keyboard(address: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::callback(
                "✅ Connect",
                &format!("{CB_CONFIRM_WALLET}{}", address.to_ascii_lowercase()),
            ),
            InlineKeyboardButton::callback("✖️ Ignore", CB_DISMISS_WALLET),
        ]],
    }
}

pub fn wallet_dismissed() -> String {
    "👍 Okay, nothing was connected. Use /connect whenever you're ready.".to_string()
}

pub fn no_wallet() -> String {
    "❌ No wallet connected. Use /connect to link your wallet first.".to_string()
}

pub fn fetching_positions() -> String {
    "🔄 Fetching your positions...".to_string()
}

pub fn no_positions() -> String {
    "📊 No active positions found.".to_string()
}

pub fn positions(positions: &[Position]) -> String {
    let mut text = String::from("📊 *Your Polymarket Positions:*\n\n");

    for (index, position) in positions.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}\n   Position: {} {}\n   Avg Price: {} | Current: {}\n   Value: {}\n   PNL: {} {} ({:+.1}%)\n",
            index + 1,
            bold(&position.title),
            escape_markdown(&position.outcome.to_string()),
            format_shares(position.size),
            format_price(position.avg_price),
            format_price(position.current_price),
            format_usd(position.current_value),
            pnl_marker(position.pnl),
            format_usd(position.pnl),
            position.percent_pnl,
        ));
        if position.redeemable {
            text.push_str("   🏁 Redeemable\n");
        }
        text.push('\n');
    }

    text
}

pub fn calculating_pnl() -> String {
    "💰 Calculating your PNL...".to_string()
}

pub fn pnl(summary: &PnlSummary) -> String {
    format!(
        "💰 *Your Polymarket PNL Summary*\n\n\
         📈 *Total PNL:* {} {}\n\
         📊 *Total Volume:* {}\n\
         🎯 *Win Rate:* {:.1}%\n\
         📅 *Active Since:* {}\n\n\
         *Breakdown:*\n\
         • Realized PNL: {}\n\
         • Unrealized PNL: {}\n\
         • Total Trades: {}",
        pnl_marker(summary.total_pnl),
        format_usd(summary.total_pnl),
        format_usd(summary.total_volume),
        summary.win_rate,
        summary.active_since,
        format_usd(summary.realized_pnl),
        format_usd(summary.unrealized_pnl),
        summary.total_trades,
    )
}

pub fn fetching_markets() -> String {
    "🔄 Fetching market data...".to_string()
}

pub fn markets(markets: &[Market]) -> String {
    if markets.is_empty() {
        return "🏪 No active markets found right now.".to_string();
    }

    let mut text = String::from("🏪 *Active Polymarket Markets:*\n\n");
    for (index, market) in markets.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}\n   Volume (24h): {}\n   Yes: {:.1}¢ | No: {:.1}¢\n\n",
            index + 1,
            bold(&market.question),
            format_usd(market.volume_24h),
            market.yes_price,
            market.no_price,
        ));
    }
    text.push_str("💡 Use /connect to track your positions in these markets!");
    text
}

pub fn status(wallet: Option<&str>) -> String {
    let mut text = String::from("🔍 *Bot Status*\n\n🤖 *Bot:* ✅ Online\n");
    match wallet {
        Some(address) => text.push_str(&format!(
            "🔗 *Wallet:* ✅ Connected\n📍 *Address:* `{}`",
            short_address(address)
        )),
        None => text.push_str(
            "🔗 *Wallet:* ❌ Not connected\n\n💡 Use /connect to link your wallet and access all features!",
        ),
    }
    text
}

pub fn positions_failed() -> String {
    "❌ Error fetching positions. Please try again later.".to_string()
}

pub fn pnl_failed() -> String {
    "❌ Error calculating PNL. Please try again later.".to_string()
}

pub fn markets_failed() -> String {
    "❌ Error fetching market data. Please try again later.".to_string()
}

pub fn generic_error() -> String {
    "❌ Something went wrong. Please try again.".to_string()
}

pub fn callback_error() -> String {
    "An error occurred. Please try again.".to_string()
}

// =============================================================================
// Formatting helpers
// =============================================================================

/// Escape the characters legacy Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if is_markdown_marker(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render `text` in bold.
///
/// Legacy Markdown cannot escape inside an entity, so the bold run is closed
/// around each marker character, which is escaped outside it:
/// `BTC_2026` becomes `*BTC*\_*2026*`.
pub fn bold(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut run = String::new();
    for c in text.chars() {
        if is_markdown_marker(c) {
            push_bold_run(&mut out, &mut run);
            out.push('\\');
            out.push(c);
        } else {
            run.push(c);
        }
    }
    push_bold_run(&mut out, &mut run);
    out
}

fn push_bold_run(out: &mut String, run: &mut String) {
    if !run.is_empty() {
        out.push('*');
        out.push_str(run);
        out.push('*');
        run.clear();
    }
}

fn is_markdown_marker(c: char) -> bool {
    matches!(c, '_' | '*' | '`' | '[')
}

/// `$1,234.56`, `-$12.00`
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// Outcome token prices are quoted in dollars per share.
fn format_price(price: f64) -> String {
    format!("${price:.3}")
}

fn format_shares(size: f64) -> String {
    if size.fract() == 0.0 {
        format!("{size:.0}")
    } else {
        format!("{size:.2}")
    }
}

fn pnl_marker(value: f64) -> &'static str {
    if value >= 0.0 {
        "🟢"
    } else {
        "🔴"
    }
}

fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if n < 1000 {
            groups.push(n.to_string());
            break;
        }
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
