//! Per-platform DOM extraction scripts and row parsing.
//!
//! Each script runs in the page context and returns the visible chat rows
//! as plain objects in DOM order (oldest-first). The Rust side normalizes
//! them into [`ChatEntry`] values, reverses to newest-first, and drops rows
//! that parsed to nothing.

use {
    chatspout_protocol::{Badge, ChatEntry, ERR_USER, Platform},
    serde_json::Value,
};

/// Kick chat rows. The username color is an inline `rgb(...)` style; message
/// content interleaves text spans and emote containers, joined with single
/// spaces so emote names read inline.
const KICK_CHAT_JS: &str = r#"
(() => {
    const rows = document.querySelectorAll('div.chat-entry > div');
    const out = [];
    for (const el of rows) {
        const badge = el.querySelector('img.icon');
        const nameEl = el.querySelector('.chat-entry-username');
        let userColor = null;
        const style = nameEl ? nameEl.getAttribute('style') : null;
        if (style) {
            const m = style.match(/\((\d+)\s*,\s*(\d+)\s*,\s*(\d+)/);
            if (m) userColor = [Number(m[1]), Number(m[2]), Number(m[3])];
        }
        let content = '';
        const emotes = {};
        const body = el.querySelector('.font-bold.text-white + span');
        for (const child of body ? body.children : []) {
            const emoteImg = child.querySelector('.chat-emote-container > div > img');
            if (emoteImg) {
                const name = emoteImg.getAttribute('alt');
                if (name) {
                    content = content.length > 0 ? content + ' ' + name : name;
                    emotes[name] = emoteImg.getAttribute('src') || 'ERR';
                }
            } else {
                const text = child.querySelector('.chat-entry-content');
                if (text && text.textContent) {
                    content = content.length > 0
                        ? content + ' ' + text.textContent
                        : text.textContent;
                }
            }
        }
        out.push({
            badgeName: badge ? badge.getAttribute('alt') : null,
            badgeImg: badge ? badge.getAttribute('src') : null,
            userName: nameEl ? nameEl.textContent : null,
            userColor: userColor,
            content: content,
            emotes: emotes
        });
    }
    return out;
})()
"#;

/// Twitch chat rows, read from the 7tv overlay's chat list (the extension is
/// loaded into every page). Emote image URLs come from the last `srcset`
/// entry and are protocol-relative, hence the `https:` prefix.
const TWITCH_CHAT_JS: &str = r#"
(() => {
    const rows = document.querySelectorAll('main.seventv-chat-list > div');
    const out = [];
    for (const el of rows) {
        const badgeImg = el.querySelector('.seventv-chat-badge > img');
        let badgeSrc = null;
        if (badgeImg) {
            const srcset = badgeImg.getAttribute('srcset');
            if (srcset) {
                const last = srcset.split(', ').at(-1);
                if (last) badgeSrc = last.slice(0, -3);
            }
        }
        const nameEl = el.querySelector('.seventv-chat-user-username');
        const userEl = el.querySelector('.seventv-chat-user');
        let userColor = null;
        const style = userEl ? userEl.getAttribute('style') : null;
        if (style) {
            const m = style.match(/\((\d+)\s*,\s*(\d+)\s*,\s*(\d+)/);
            if (m) userColor = [Number(m[1]), Number(m[2]), Number(m[3])];
        }
        let content = '';
        const emotes = {};
        const tokens = el.querySelectorAll('.text-token, .emote-token, .mention-token');
        for (const token of tokens) {
            if (token.children.length !== 0) {
                const img = token.firstElementChild;
                const name = img ? img.getAttribute('alt') : null;
                if (name) {
                    content = content.length > 0 ? content + ' ' + name : name;
                    const srcset = img.getAttribute('srcset');
                    const entry = srcset ? srcset.split(',').at(-1) : null;
                    const src = entry ? entry.trim().split(' ')[0] : null;
                    emotes[name] = src ? 'https:' + src : 'ERR';
                }
            } else if (token.textContent) {
                content = content.length > 0
                    ? content + ' ' + token.textContent
                    : token.textContent;
            }
        }
        out.push({
            badgeName: badgeImg ? badgeImg.getAttribute('alt') : null,
            badgeImg: badgeSrc,
            userName: nameEl ? nameEl.textContent : null,
            userColor: userColor,
            content: content.split('  ').join(' ').trim(),
            emotes: emotes
        });
    }
    return out;
})()
"#;

/// The extraction script for a platform, or `None` where no extraction
/// support exists.
pub fn chat_script(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Kick => Some(KICK_CHAT_JS),
        Platform::Twitch => Some(TWITCH_CHAT_JS),
        Platform::Twitter | Platform::Youtube => None,
    }
}

/// Normalize raw script output into chat entries, newest-first.
///
/// Rows arrive in DOM order (oldest-first). Missing usernames become the
/// "ERR" sentinel and missing colors default to black; rows that are both
/// unparseable and empty are dropped.
pub fn parse_rows(value: &Value) -> Vec<ChatEntry> {
    let rows = value.as_array().map(Vec::as_slice).unwrap_or_default();

    rows.iter()
        .rev()
        .map(parse_row)
        .filter(|entry| !entry.is_blank_err())
        .collect()
}

fn parse_row(row: &Value) -> ChatEntry {
    let user_name = row["userName"]
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or(ERR_USER)
        .to_string();

    let user_color = row["userColor"]
        .as_array()
        .and_then(|parts| {
            let mut rgb = [0u8; 3];
            for (slot, part) in rgb.iter_mut().zip(parts) {
                *slot = u8::try_from(part.as_u64()?).ok()?;
            }
            (parts.len() == 3).then_some(rgb)
        })
        .unwrap_or([0, 0, 0]);

    let badges = match (row["badgeName"].as_str(), row["badgeImg"].as_str()) {
        (Some(name), Some(img)) => Some(vec![Badge {
            name: name.to_string(),
            img: img.to_string(),
        }]),
        _ => None,
    };

    let emote_container = row["emotes"].as_object().and_then(|emotes| {
        if emotes.is_empty() {
            return None;
        }
        Some(
            emotes
                .iter()
                .map(|(name, src)| {
                    (
                        name.clone(),
                        src.as_str().unwrap_or(ERR_USER).to_string(),
                    )
                })
                .collect(),
        )
    });

    ChatEntry {
        user_name,
        user_color,
        content: row["content"].as_str().unwrap_or_default().to_string(),
        badges,
        emote_container,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_implemented_platforms_have_scripts() {
        assert!(chat_script(Platform::Kick).is_some());
        assert!(chat_script(Platform::Twitch).is_some());
        assert!(chat_script(Platform::Twitter).is_none());
        assert!(chat_script(Platform::Youtube).is_none());
    }

    #[test]
    fn rows_are_reversed_to_newest_first() {
        let raw = serde_json::json!([
            { "userName": "old", "userColor": null, "content": "first", "emotes": {} },
            { "userName": "new", "userColor": null, "content": "second", "emotes": {} },
        ]);
        let entries = parse_rows(&raw);
        assert_eq!(entries[0].user_name, "new");
        assert_eq!(entries[1].user_name, "old");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let raw = serde_json::json!([
            { "userName": null, "userColor": null, "content": "orphan line", "emotes": {} },
        ]);
        let entries = parse_rows(&raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_name, "ERR");
        assert_eq!(entries[0].user_color, [0, 0, 0]);
        assert!(entries[0].badges.is_none());
        assert!(entries[0].emote_container.is_none());
    }

    #[test]
    fn blank_unparseable_rows_are_dropped() {
        let raw = serde_json::json!([
            { "userName": null, "userColor": null, "content": "", "emotes": {} },
            { "userName": "alice", "userColor": [255, 128, 0], "content": "hi", "emotes": {} },
        ]);
        let entries = parse_rows(&raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_name, "alice");
        assert_eq!(entries[0].user_color, [255, 128, 0]);
    }

    #[test]
    fn badges_and_emotes_carry_through() {
        let raw = serde_json::json!([
            {
                "userName": "mod",
                "userColor": [0, 255, 0],
                "content": "welcome KEKW",
                "emotes": { "KEKW": "https://cdn.example/kekw.webp" },
                "badgeName": "Moderator",
                "badgeImg": "https://cdn.example/mod.png"
            },
        ]);
        let entries = parse_rows(&raw);
        let badges = entries[0].badges.as_ref().unwrap();
        assert_eq!(badges[0].name, "Moderator");
        let emotes = entries[0].emote_container.as_ref().unwrap();
        assert_eq!(emotes["KEKW"], "https://cdn.example/kekw.webp");
    }

    #[test]
    fn malformed_color_arrays_fall_back_to_black() {
        let raw = serde_json::json!([
            { "userName": "a", "userColor": [1, 2], "content": "x", "emotes": {} },
            { "userName": "b", "userColor": [500, 0, 0], "content": "y", "emotes": {} },
        ]);
        for entry in parse_rows(&raw) {
            assert_eq!(entry.user_color, [0, 0, 0]);
        }
    }

    #[test]
    fn non_array_script_output_is_empty() {
        assert!(parse_rows(&serde_json::json!(null)).is_empty());
        assert!(parse_rows(&serde_json::json!({"oops": true})).is_empty());
    }
}
