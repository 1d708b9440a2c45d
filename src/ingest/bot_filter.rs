//! Crawler detection by User-Agent keyword.

/// Case-insensitive substrings that mark a request as automated.
const BOT_KEYWORDS: &[&str] = &["bot", "crawl", "spider"];

/// True when the User-Agent looks like a crawler. A missing UA is not
/// treated as a bot.
pub fn is_bot(user_agent: Option<&str>) -> bool {
    let Some(ua) = user_agent else {
        return false;
    };
    let ua = ua.to_lowercase();
    BOT_KEYWORDS.iter().any(|keyword| ua.contains(keyword))
}
